//! BM25 ranking over the inverted index.
//!
//! Uses the Robertson-Sparck-Jones IDF `ln((N - df + 0.5) / (df + 0.5))`,
//! which goes negative for terms in more than half of the documents. Those
//! negative contributions are kept as they are.

use crate::config::{BM25_B, BM25_K1};
use crate::index::{DocId, InvertedIndex, TermId};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

pub struct Bm25Ranker<'a> {
    index: &'a InvertedIndex,
}

impl<'a> Bm25Ranker<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index }
    }

    pub fn idf(&self, df: u32) -> f64 {
        let n = self.index.num_docs() as f64;
        let df = df as f64;
        ((n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Saturating term frequency `(k1 + 1) f / (K + f)` with
    /// `K = k1 (1 - b + b * len / avg_len)`.
    pub fn tf_weight(&self, freq: u32, doc_len: u32) -> f64 {
        let avg = self.index.avg_doc_length();
        let norm_len = if avg > 0.0 { doc_len as f64 / avg } else { 0.0 };
        let k = BM25_K1 * (1.0 - BM25_B + BM25_B * norm_len);
        let freq = freq as f64;
        let denom = k + freq;
        if denom <= 0.0 {
            return 0.0;
        }
        (BM25_K1 + 1.0) * freq / denom
    }

    /// Accumulate scores for every document that contains at least one of the
    /// terms. Repeated term ids contribute once per occurrence.
    pub fn score_all(&self, term_ids: &[TermId]) -> HashMap<DocId, f64> {
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for &tid in term_ids {
            let postings = self.index.postings(tid);
            let idf = self.idf(postings.len() as u32);
            for p in postings {
                let doc_len = self.index.doc_length(p.doc_id).unwrap_or(0);
                *scores.entry(p.doc_id).or_insert(0.0) += idf * self.tf_weight(p.freq, doc_len);
            }
        }
        scores
    }

    /// The `k` best documents for the query terms, best first.
    pub fn rank<S: AsRef<str>>(&self, terms: &[S], k: usize) -> Vec<ScoredDoc> {
        let term_ids = self.index.resolve(terms);
        let scores = self.score_all(&term_ids);
        tracing::debug!(terms = term_ids.len(), candidates = scores.len(), k, "bm25 query");
        top_k(scores, k)
    }
}

/// Select the `k` highest scores with a bounded min-heap, returned best first.
/// Equal scores are ordered by ascending document id.
pub fn top_k(scores: HashMap<DocId, f64>, k: usize) -> Vec<ScoredDoc> {
    if k == 0 {
        return Vec::new();
    }
    // larger key = better: higher score, then lower doc id
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, Reverse<DocId>)>> =
        BinaryHeap::with_capacity(k + 1);
    for (doc_id, score) in scores {
        heap.push(Reverse((OrderedFloat(score), Reverse(doc_id))));
        if heap.len() > k {
            heap.pop();
        }
    }
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse((score, Reverse(doc_id)))| ScoredDoc { doc_id, score: score.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_index;
    use crate::corpus::Document;

    fn corpus(texts: &[&str]) -> InvertedIndex {
        build_index(texts.iter().enumerate().map(|(i, text)| {
            Document::parse(&format!("<DOCNO>LA010189-{i:04}</DOCNO><TEXT>{text}</TEXT>"))
        }))
        .unwrap()
    }

    #[test]
    fn matching_document_beats_non_matching() {
        let idx = corpus(&[
            "rust memory safety",
            "python scripting tools",
            "java enterprise beans",
            "go channels tools",
        ]);
        let results = Bm25Ranker::new(&idx).rank(&["rust"], 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, 0);
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn unknown_terms_rank_nothing() {
        let idx = corpus(&["alpha beta", "gamma"]);
        assert!(Bm25Ranker::new(&idx).rank(&["zeta"], 10).is_empty());
        assert!(Bm25Ranker::new(&idx).rank::<&str>(&[], 10).is_empty());
    }

    #[test]
    fn frequency_saturates() {
        let idx = corpus(&["a b c d", "e f g h", "i j k l"]);
        let r = Bm25Ranker::new(&idx);
        let w: Vec<f64> = (1..=4).map(|f| r.tf_weight(f, 4)).collect();
        assert!(w[0] < w[1] && w[1] < w[2] && w[2] < w[3]);
        assert!(w[1] - w[0] > w[2] - w[1]);
        assert!(w[2] - w[1] > w[3] - w[2]);
        assert!(w[3] < BM25_K1 + 1.0);
    }

    #[test]
    fn common_terms_get_negative_idf() {
        let idx = corpus(&["cat", "cat", "cat dog"]);
        let r = Bm25Ranker::new(&idx);
        assert!(r.idf(idx.df(idx.term_id("cat").unwrap())) < 0.0);
        let results = r.rank(&["cat"], 10);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|s| s.score < 0.0));
    }

    #[test]
    fn top_k_truncates_and_breaks_ties_by_doc_id() {
        let scores = HashMap::from([(4, 1.0), (2, 3.0), (7, 1.0), (1, 1.0), (3, -0.5)]);
        let top = top_k(scores.clone(), 3);
        let ids: Vec<DocId> = top.iter().map(|s| s.doc_id).collect();
        assert_eq!(ids, vec![2, 1, 4]);
        assert_eq!(top_k(scores.clone(), 10).len(), 5);
        assert!(top_k(scores, 0).is_empty());
    }

    #[test]
    fn repeated_query_terms_add_up() {
        let idx = corpus(&["owl", "lark", "wren", "finch"]);
        let r = Bm25Ranker::new(&idx);
        let once = r.rank(&["owl"], 1)[0].score;
        let twice = r.rank(&["owl", "owl"], 1)[0].score;
        assert!((twice - 2.0 * once).abs() < 1e-12);
    }
}
