use criterion::{criterion_group, criterion_main, Criterion};
use newsdex_core::bm25::Bm25Ranker;
use newsdex_core::builder::IndexBuilder;
use newsdex_core::corpus::Document;
use newsdex_core::snippet;
use newsdex_core::tokenizer::tokenize;

const TEXT: &str = "The City Council voted Tuesday to expand the downtown bus network, \
    adding three routes and extending evening service. Council members said the plan, \
    which costs $4.2 million, answers years of complaints from riders in the eastern \
    neighborhoods. Opponents argued the money would be better spent on road repairs!";

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_article", |b| b.iter(|| tokenize(TEXT)));
}

fn bench_rank(c: &mut Criterion) {
    let mut builder = IndexBuilder::new();
    for i in 0..2000u32 {
        let raw = format!("<DOCNO>LA010189-{i:04}</DOCNO><TEXT>{TEXT} story {}</TEXT>", i % 97);
        if let Ok(doc) = Document::parse(&raw) {
            let _ = builder.add_document(&doc);
        }
    }
    let index = builder.finish();
    let query = tokenize("council bus routes");
    c.bench_function("bm25_top10", |b| b.iter(|| Bm25Ranker::new(&index).rank(&query, 10)));
    c.bench_function("snippet", |b| b.iter(|| snippet::extract(TEXT, &query)));
}

criterion_group!(benches, bench_tokenize, bench_rank);
criterion_main!(benches);
