use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub docno: String,
    pub headline: String,
    /// Publication date rendered for display, e.g. "January 1, 1989".
    pub date: String,
}

/// One document's entry in a term's postings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub freq: u32,
    pub doc_id: DocId,
}

/// Read-only inverted index produced by [`crate::builder::IndexBuilder`].
///
/// Term ids and document ids are dense and zero-based, so postings, document
/// lengths and document metadata are plain vectors indexed by id. Only the
/// string lookups (lexicon, external id) go through hash maps.
#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    pub(crate) lexicon: HashMap<String, TermId>,
    pub(crate) postings: Vec<Vec<Posting>>,
    pub(crate) doc_lengths: Vec<u32>,
    pub(crate) docnos: Vec<String>,
    pub(crate) docno_to_id: HashMap<String, DocId>,
    pub(crate) docs: Vec<DocMeta>,
    avg_doc_length: f64,
}

impl InvertedIndex {
    /// Assemble an index from its artifacts, checking that every per-document
    /// array covers the same documents and every term has a postings list.
    pub fn from_parts(
        lexicon: HashMap<String, TermId>,
        postings: Vec<Vec<Posting>>,
        doc_lengths: Vec<u32>,
        docnos: Vec<String>,
        docs: Vec<DocMeta>,
    ) -> Result<Self> {
        ensure!(
            lexicon.len() == postings.len(),
            "lexicon has {} terms but there are {} postings lists",
            lexicon.len(),
            postings.len()
        );
        ensure!(
            doc_lengths.len() == docnos.len() && docnos.len() == docs.len(),
            "document arrays disagree: {} lengths, {} docnos, {} metadata records",
            doc_lengths.len(),
            docnos.len(),
            docs.len()
        );
        let mut docno_to_id = HashMap::with_capacity(docnos.len());
        for (id, docno) in docnos.iter().enumerate() {
            let previous = docno_to_id.insert(docno.clone(), id as DocId);
            ensure!(previous.is_none(), "document number {docno:?} appears twice");
        }
        let avg_doc_length = average(&doc_lengths);
        Ok(Self { lexicon, postings, doc_lengths, docnos, docno_to_id, docs, avg_doc_length })
    }

    pub(crate) fn from_built(
        lexicon: HashMap<String, TermId>,
        postings: Vec<Vec<Posting>>,
        doc_lengths: Vec<u32>,
        docnos: Vec<String>,
        docno_to_id: HashMap<String, DocId>,
        docs: Vec<DocMeta>,
    ) -> Self {
        let avg_doc_length = average(&doc_lengths);
        Self { lexicon, postings, doc_lengths, docnos, docno_to_id, docs, avg_doc_length }
    }

    pub fn num_docs(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    pub fn num_terms(&self) -> usize {
        self.lexicon.len()
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.lexicon.get(term).copied()
    }

    /// Map query terms to term ids, keeping order and silently dropping terms
    /// the lexicon has never seen.
    pub fn resolve<S: AsRef<str>>(&self, terms: &[S]) -> Vec<TermId> {
        terms.iter().filter_map(|t| self.term_id(t.as_ref())).collect()
    }

    pub fn postings(&self, term_id: TermId) -> &[Posting] {
        self.postings.get(term_id as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of documents containing the term.
    pub fn df(&self, term_id: TermId) -> u32 {
        self.postings(term_id).len() as u32
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> {
        self.doc_lengths.get(doc_id as usize).copied()
    }

    pub fn doc_lengths(&self) -> &[u32] {
        &self.doc_lengths
    }

    /// Mean document length in tokens; 0.0 for an empty corpus.
    pub fn avg_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    pub fn docno(&self, doc_id: DocId) -> Option<&str> {
        self.docnos.get(doc_id as usize).map(String::as_str)
    }

    pub fn doc_id(&self, docno: &str) -> Option<DocId> {
        self.docno_to_id.get(docno).copied()
    }

    pub fn meta(&self, doc_id: DocId) -> Option<&DocMeta> {
        self.docs.get(doc_id as usize)
    }
}

fn average(lengths: &[u32]) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    let total: u64 = lengths.iter().map(|&l| l as u64).sum();
    total as f64 / lengths.len() as f64
}
