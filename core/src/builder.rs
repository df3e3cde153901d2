use crate::config::BUILD_PROGRESS_EVERY;
use crate::corpus::Document;
use crate::error::{Error, Result};
use crate::index::{DocId, DocMeta, InvertedIndex, Posting, TermId};
use crate::tokenizer::tokenize;
use std::collections::HashMap;

/// Single-pass index construction.
///
/// Ids are handed out in arrival order by counters owned by the builder, so
/// independent builders never interfere. Because documents arrive with
/// increasing ids and contribute one posting per term, every postings list
/// comes out ordered by document id without any sorting.
#[derive(Default)]
pub struct IndexBuilder {
    lexicon: HashMap<String, TermId>,
    postings: Vec<Vec<Posting>>,
    doc_lengths: Vec<u32>,
    docnos: Vec<String>,
    docno_to_id: HashMap<String, DocId>,
    docs: Vec<DocMeta>,
    next_doc_id: DocId,
    next_term_id: TermId,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_docs(&self) -> u32 {
        self.next_doc_id
    }

    /// Index one document and return its internal id.
    ///
    /// A repeated external id is rejected before anything is recorded, so a
    /// failed call leaves the builder unchanged.
    pub fn add_document(&mut self, doc: &Document) -> Result<DocId> {
        if self.docno_to_id.contains_key(&doc.docno) {
            return Err(Error::DuplicateDocno(doc.docno.clone()));
        }
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;

        let tokens = tokenize(&doc.content_text());
        self.doc_lengths.push(tokens.len() as u32);

        // term id -> frequency; `order` keeps first occurrence order
        let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
        let mut order: Vec<TermId> = Vec::new();
        for token in tokens {
            let tid = self.term_id_or_insert(token);
            let count = tf_counts.entry(tid).or_insert(0);
            if *count == 0 {
                order.push(tid);
            }
            *count += 1;
        }
        for tid in order {
            let freq = tf_counts[&tid];
            self.postings[tid as usize].push(Posting { freq, doc_id });
        }

        self.docnos.push(doc.docno.clone());
        self.docno_to_id.insert(doc.docno.clone(), doc_id);
        self.docs.push(DocMeta {
            docno: doc.docno.clone(),
            headline: doc.headline.clone(),
            date: doc.display_date(),
        });

        if self.next_doc_id % BUILD_PROGRESS_EVERY == 0 {
            tracing::info!(num_docs = self.next_doc_id, num_terms = self.lexicon.len(), "indexing");
        }
        Ok(doc_id)
    }

    fn term_id_or_insert(&mut self, term: String) -> TermId {
        if let Some(&tid) = self.lexicon.get(&term) {
            return tid;
        }
        let tid = self.next_term_id;
        self.next_term_id += 1;
        self.lexicon.insert(term, tid);
        self.postings.push(Vec::new());
        tid
    }

    /// Publish the index. Nothing can be added afterwards.
    pub fn finish(self) -> InvertedIndex {
        tracing::info!(num_docs = self.next_doc_id, num_terms = self.lexicon.len(), "index built");
        InvertedIndex::from_built(
            self.lexicon,
            self.postings,
            self.doc_lengths,
            self.docnos,
            self.docno_to_id,
            self.docs,
        )
    }
}

/// Build an index from a document stream, aborting on the first bad record.
pub fn build_index<I>(docs: I) -> Result<InvertedIndex>
where
    I: IntoIterator<Item = Result<Document>>,
{
    let mut builder = IndexBuilder::new();
    for doc in docs {
        builder.add_document(&doc?)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusReader;
    use std::io::Cursor;

    fn doc(docno: &str, text: &str) -> Document {
        Document::parse(&format!("<DOCNO>{docno}</DOCNO>\n<TEXT>{text}</TEXT>\n")).unwrap()
    }

    #[test]
    fn assigns_ids_in_arrival_order() {
        let mut b = IndexBuilder::new();
        assert_eq!(b.add_document(&doc("LA010189-0001", "red fish blue fish")).unwrap(), 0);
        assert_eq!(b.add_document(&doc("LA010189-0002", "blue whale")).unwrap(), 1);
        let idx = b.finish();

        assert_eq!(idx.term_id("red"), Some(0));
        assert_eq!(idx.term_id("fish"), Some(1));
        assert_eq!(idx.term_id("blue"), Some(2));
        assert_eq!(idx.term_id("whale"), Some(3));
        assert_eq!(idx.doc_lengths(), &[4, 2]);
        assert_eq!(idx.postings(1), &[Posting { freq: 2, doc_id: 0 }]);
        assert_eq!(
            idx.postings(2),
            &[Posting { freq: 1, doc_id: 0 }, Posting { freq: 1, doc_id: 1 }]
        );
    }

    #[test]
    fn headline_counts_towards_length() {
        let raw = "<DOCNO>LA010189-0001</DOCNO><HEADLINE>Big news</HEADLINE><TEXT>small story</TEXT>";
        let idx = build_index([Document::parse(raw)]).unwrap();
        assert_eq!(idx.doc_lengths(), &[4]);
        assert_eq!(idx.meta(0).unwrap().headline, "Big news");
        assert_eq!(idx.meta(0).unwrap().date, "January 1, 1989");
    }

    #[test]
    fn duplicate_docno_is_rejected() {
        let mut b = IndexBuilder::new();
        b.add_document(&doc("LA010189-0001", "one")).unwrap();
        let err = b.add_document(&doc("LA010189-0001", "two")).unwrap_err();
        assert!(matches!(err, Error::DuplicateDocno(_)));
        assert_eq!(b.num_docs(), 1);
    }

    #[test]
    fn malformed_record_aborts_build() {
        let corpus = "<DOCNO>LA010189-0001</DOCNO>\n</DOC>\n<TEXT>no id</TEXT>\n</DOC>\n";
        assert!(build_index(CorpusReader::new(Cursor::new(corpus))).is_err());
    }

    #[test]
    fn id_mapping_round_trips() {
        let idx = build_index([
            Ok(doc("LA010189-0001", "a")),
            Ok(doc("LA010289-0007", "b")),
            Ok(doc("LA010389-0003", "")),
        ])
        .unwrap();
        assert_eq!(idx.num_docs(), 3);
        for id in 0..idx.num_docs() {
            let docno = idx.docno(id).unwrap();
            assert_eq!(idx.doc_id(docno), Some(id));
        }
        assert_eq!(idx.doc_length(2), Some(0));
    }
}
