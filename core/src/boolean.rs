//! Conjunctive (AND) query evaluation by sorted postings intersection.

use crate::index::{DocId, InvertedIndex, Posting};
use crate::topics::Topic;
use crate::tokenizer::tokenize;
use crate::trec::RunLine;
use std::borrow::Cow;

/// Merge-intersect two postings lists ordered by document id.
///
/// Walks both lists with two cursors and keeps the posting from `a` on every
/// document id the lists share. O(len(a) + len(b)).
pub fn intersect(a: &[Posting], b: &[Posting]) -> Vec<Posting> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (da, db) = (a[i].doc_id, b[j].doc_id);
        if da == db {
            result.push(a[i]);
            i += 1;
            j += 1;
        } else if da < db {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// Intersect any number of postings lists, in any order.
///
/// Lists are processed shortest first and each one is brought into document
/// id order before merging. An empty intermediate result ends the work early.
/// No lists means no matches.
pub fn intersect_all(lists: &[&[Posting]]) -> Vec<Posting> {
    let mut sorted: Vec<Cow<'_, [Posting]>> = lists.iter().map(|l| by_doc_id(l)).collect();
    sorted.sort_by_key(|l| l.len());

    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else { return Vec::new() };
    let mut result = first.into_owned();
    for list in iter {
        if result.is_empty() {
            break;
        }
        result = intersect(&result, &list);
    }
    result
}

fn by_doc_id(list: &[Posting]) -> Cow<'_, [Posting]> {
    if list.windows(2).all(|w| w[0].doc_id <= w[1].doc_id) {
        Cow::Borrowed(list)
    } else {
        let mut owned = list.to_vec();
        owned.sort_unstable_by_key(|p| p.doc_id);
        Cow::Owned(owned)
    }
}

/// A boolean match in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanHit {
    pub doc_id: DocId,
    /// 1-based, ascending by document id.
    pub rank: usize,
    /// `matches - rank`. Only there so result files carry a descending score
    /// column; it says nothing about relevance.
    pub pseudo_score: usize,
}

pub struct BooleanEvaluator<'a> {
    index: &'a InvertedIndex,
}

impl<'a> BooleanEvaluator<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index }
    }

    /// Documents containing every recognised query term, ascending by id.
    /// Unknown terms are ignored; if none are recognised nothing matches.
    pub fn evaluate<S: AsRef<str>>(&self, terms: &[S]) -> Vec<DocId> {
        let term_ids = self.index.resolve(terms);
        let lists: Vec<&[Posting]> = term_ids.iter().map(|&t| self.index.postings(t)).collect();
        let mut docs: Vec<DocId> = intersect_all(&lists).into_iter().map(|p| p.doc_id).collect();
        docs.sort_unstable();
        tracing::debug!(terms = term_ids.len(), matches = docs.len(), "boolean query");
        docs
    }

    pub fn ranked<S: AsRef<str>>(&self, terms: &[S]) -> Vec<BooleanHit> {
        let docs = self.evaluate(terms);
        let total = docs.len();
        docs.into_iter()
            .enumerate()
            .map(|(i, doc_id)| BooleanHit { doc_id, rank: i + 1, pseudo_score: total - (i + 1) })
            .collect()
    }

    /// Result lines for one topic, ready to be written to a run file.
    pub fn run_lines(&self, topic: &Topic, run_tag: &str) -> Vec<RunLine> {
        let terms = tokenize(&topic.query);
        self.ranked(&terms)
            .into_iter()
            .filter_map(|hit| {
                let docno = self.index.docno(hit.doc_id)?;
                Some(RunLine {
                    topic: topic.id.clone(),
                    docno: docno.to_string(),
                    rank: hit.rank,
                    score: hit.pseudo_score as f64,
                    run_tag: run_tag.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn list(ids: &[DocId]) -> Vec<Posting> {
        ids.iter().map(|&doc_id| Posting { freq: 1, doc_id }).collect()
    }

    fn ids(postings: &[Posting]) -> BTreeSet<DocId> {
        postings.iter().map(|p| p.doc_id).collect()
    }

    #[test]
    fn intersect_is_symmetric_as_a_set() {
        let a = list(&[1, 3, 5, 7, 9]);
        let b = list(&[2, 3, 4, 9, 10]);
        assert_eq!(ids(&intersect(&a, &b)), ids(&intersect(&b, &a)));
        assert_eq!(ids(&intersect(&a, &b)), BTreeSet::from([3, 9]));
    }

    #[test]
    fn intersect_with_self_and_empty() {
        let a = list(&[0, 4, 8]);
        assert_eq!(intersect(&a, &a), a);
        assert!(intersect(&a, &[]).is_empty());
        assert!(intersect(&[], &a).is_empty());
    }

    #[test]
    fn intersect_all_handles_unsorted_input() {
        let a = list(&[9, 1, 5, 3]);
        let b = list(&[3, 9, 4]);
        let c = list(&[8, 9, 3, 2, 1]);
        let result = intersect_all(&[a.as_slice(), b.as_slice(), c.as_slice()]);
        assert_eq!(ids(&result), BTreeSet::from([3, 9]));
        assert!(ids(&result).is_subset(&ids(&b)));
    }

    #[test]
    fn intersect_all_of_nothing_is_empty() {
        assert!(intersect_all(&[]).is_empty());
        let a = list(&[1, 2]);
        assert!(intersect_all(&[a.as_slice(), &[]]).is_empty());
    }

    #[test]
    fn keeps_frequency_of_shortest_list() {
        let a = vec![Posting { freq: 4, doc_id: 2 }];
        let b = vec![Posting { freq: 1, doc_id: 1 }, Posting { freq: 7, doc_id: 2 }];
        assert_eq!(intersect_all(&[b.as_slice(), a.as_slice()]), vec![Posting { freq: 4, doc_id: 2 }]);
    }
}
