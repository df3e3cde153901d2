use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use newsdex_core::bm25::Bm25Ranker;
use newsdex_core::boolean::BooleanEvaluator;
use newsdex_core::config::{DEFAULT_RUN_TAG, DEFAULT_TOP_K};
use newsdex_core::eval::{evaluate, parse_topic_range, Qrels, RankedResults};
use newsdex_core::persist::{load_document, load_document_text, load_index, IndexPaths};
use newsdex_core::snippet::{display_heading, extract};
use newsdex_core::tokenizer::tokenize;
use newsdex_core::topics::load_topics;
use newsdex_core::trec::parse_run;
use newsdex_core::{DocId, InvertedIndex};
use std::fs;
use std::io::{self, BufRead, BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "newsdex-search")]
#[command(about = "Query a newsdex index and evaluate result files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every topic in a topics file as a boolean AND query
    Boolean {
        /// Index directory
        #[arg(long)]
        index: String,
        /// Topics file: topic id line, then query line, repeated
        #[arg(long)]
        queries: String,
        /// Results file to write
        #[arg(long)]
        output: String,
        /// Run tag written in the last column
        #[arg(long, default_value = DEFAULT_RUN_TAG)]
        run_tag: String,
    },
    /// Interactive BM25 search with snippets
    Interactive {
        /// Index directory
        #[arg(long)]
        index: String,
        /// Results shown per query
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
    },
    /// Compute AP, P@10 and NDCG for a results file
    Evaluate {
        /// Results file in six-column format
        #[arg(long)]
        results: String,
        /// Relevance judgments file
        #[arg(long)]
        qrels: String,
        /// Accepted topic ids, e.g. 401-450
        #[arg(long, value_parser = parse_topic_range)]
        topics: Option<RangeInclusive<u32>>,
        /// Also write per-topic metrics as CSV
        #[arg(long)]
        csv: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Boolean { index, queries, output, run_tag } => {
            run_boolean(&index, &queries, &output, &run_tag)
        }
        Commands::Interactive { index, k } => interactive(&index, k),
        Commands::Evaluate { results, qrels, topics, csv } => {
            run_evaluate(&results, &qrels, topics, csv.as_deref())
        }
    }
}

fn run_boolean(index_dir: &str, queries: &str, output: &str, run_tag: &str) -> Result<()> {
    let index = load_index(&IndexPaths::new(index_dir))?;
    let topics = load_topics(Path::new(queries)).with_context(|| format!("reading topics {queries}"))?;
    let evaluator = BooleanEvaluator::new(&index);

    let mut out = BufWriter::new(fs::File::create(output).with_context(|| format!("creating {output}"))?);
    let mut total = 0usize;
    for topic in &topics {
        let lines = evaluator.run_lines(topic, run_tag);
        tracing::debug!(topic = %topic.id, matches = lines.len(), "topic done");
        total += lines.len();
        for line in lines {
            writeln!(out, "{line}")?;
        }
    }
    out.flush()?;
    tracing::info!(topics = topics.len(), lines = total, output = %output, "boolean run written");
    Ok(())
}

fn interactive(index_dir: &str, k: usize) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let index = load_index(&paths)?;
    let stdin = io::stdin();
    let mut input = stdin.lock().lines();

    loop {
        print!("Enter your query: ");
        io::stdout().flush()?;
        let Some(query) = input.next().transpose()? else { return Ok(()) };

        let start = Instant::now();
        let terms = tokenize(&query);
        let top = Bm25Ranker::new(&index).rank(&terms, k);
        for (i, hit) in top.iter().enumerate() {
            print_hit(&paths, &index, i + 1, hit.doc_id, &terms);
        }
        if top.is_empty() {
            println!("No results.");
        }
        println!("Retrieval took {:.2} seconds.", start.elapsed().as_secs_f64());

        loop {
            print!("Enter the rank to see the document, 'N' for next query, 'Q' to quit: ");
            io::stdout().flush()?;
            let Some(action) = input.next().transpose()? else { return Ok(()) };
            match action.trim() {
                "N" => break,
                "Q" => {
                    println!("Quitting...");
                    return Ok(());
                }
                other => match other.parse::<usize>() {
                    Ok(rank) if (1..=top.len()).contains(&rank) => {
                        let doc_id = top[rank - 1].doc_id;
                        match index.docno(doc_id).map(|d| load_document_text(&paths, d)) {
                            Some(Ok(text)) => println!("{text}"),
                            Some(Err(e)) => eprintln!("{e:#}"),
                            None => eprintln!("unknown document id {doc_id}"),
                        }
                    }
                    Ok(_) => println!("Invalid rank, please enter a rank between 1 and {}", top.len()),
                    Err(_) => println!("Invalid input. Please enter 'N', 'Q', or a rank number."),
                },
            }
        }
    }
}

fn print_hit(paths: &IndexPaths, index: &InvertedIndex, rank: usize, doc_id: DocId, terms: &[String]) {
    let (Some(docno), Some(meta)) = (index.docno(doc_id), index.meta(doc_id)) else { return };
    let snippet = match load_document(paths, docno) {
        Ok(doc) => extract(&doc.body_text(), terms),
        Err(e) => {
            tracing::warn!(docno = %docno, error = %e, "stored document unavailable");
            String::new()
        }
    };
    println!("{rank}. {} ({})", display_heading(&meta.headline, &snippet), meta.date);
    println!("{snippet} ({docno})\n");
}

fn run_evaluate(results_path: &str, qrels_path: &str, topics: Option<RangeInclusive<u32>>, csv: Option<&str>) -> Result<()> {
    let run_text = fs::read_to_string(results_path).with_context(|| format!("reading results {results_path}"))?;
    let qrels_text = fs::read_to_string(qrels_path).with_context(|| format!("reading qrels {qrels_path}"))?;
    let lines = parse_run(&run_text).with_context(|| format!("in {results_path}"))?;
    let ranked = RankedResults::from_lines(lines, topics.as_ref()).with_context(|| format!("in {results_path}"))?;
    let qrels = Qrels::parse(&qrels_text).with_context(|| format!("in {qrels_path}"))?;
    if qrels.is_empty() {
        bail!("no relevance judgments in {qrels_path}");
    }

    let report = evaluate(&ranked, &qrels);
    println!("{:<10}{:<15}{:<15}{:<15}{:<15}", "Topic ID", "AP", "P@10", "NDCG@10", "NDCG@1000");
    println!("{}", "-".repeat(60));
    for m in &report.topics {
        println!(
            "{:<10}{:<15.3}{:<15.3}{:<15.3}{:<15.3}",
            m.topic, m.average_precision, m.precision_at_10, m.ndcg_at_10, m.ndcg_at_1000
        );
    }
    println!("\nOverall Averages:");
    println!("Mean AP: {:.3}", report.mean_average_precision);
    println!("Mean P@10: {:.3}", report.mean_precision_at_10);
    println!("Mean NDCG@10: {:.3}", report.mean_ndcg_at_10);
    println!("Mean NDCG@1000: {:.3}", report.mean_ndcg_at_1000);

    if let Some(csv) = csv {
        fs::write(csv, report.to_csv()).with_context(|| format!("writing {csv}"))?;
    }
    Ok(())
}
