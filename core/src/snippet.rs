//! Query-biased extractive snippets.
//!
//! The document body is cut into sentences, every sentence is scored against
//! the query, and the best sentences are concatenated until the snippet is
//! long enough.

use crate::config::{HEADING_FALLBACK_CHARS, MIN_SENTENCE_CHARS, SNIPPET_CHAR_BUDGET};
use crate::tokenizer::tokenize;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Split after every `.`, `!` or `?`, keeping the terminator with the text
/// before it. Empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = i + c.len_utf8();
            pieces.push(&text[start..end]);
            start = end;
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Glue short pieces onto their successors until the accumulated sentence is
/// longer than [`MIN_SENTENCE_CHARS`]. Leftovers become the last sentence.
pub fn merge_fragments(pieces: &[&str]) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut pending = String::new();
    for piece in pieces {
        pending.push_str(piece);
        if pending.chars().count() > MIN_SENTENCE_CHARS {
            sentences.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        sentences.push(pending);
    }
    sentences
}

/// Breakdown of a sentence's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentenceScore {
    /// 2 for the first sentence, 1 for the second, 0 otherwise.
    pub position_bonus: usize,
    /// Query term occurrences in the sentence.
    pub occurrences: usize,
    /// Distinct query terms present.
    pub distinct_terms: usize,
    /// Longest run of adjacent tokens that are all query terms.
    pub longest_run: usize,
    pub num_tokens: usize,
}

impl SentenceScore {
    pub fn raw(&self) -> usize {
        self.position_bonus + self.occurrences + self.distinct_terms + self.longest_run
    }

    /// Raw score per token; a sentence without tokens scores 0.
    pub fn normalized(&self) -> f64 {
        if self.num_tokens == 0 {
            return 0.0;
        }
        self.raw() as f64 / self.num_tokens as f64
    }
}

pub fn score_sentence(sentence: &str, position: usize, query: &HashSet<&str>) -> SentenceScore {
    let tokens = tokenize(sentence);
    let mut occurrences = 0;
    let mut present: HashSet<&str> = HashSet::new();
    // run[i] = length of the query-term run ending at token i
    let mut run = vec![0usize; tokens.len()];
    for (i, token) in tokens.iter().enumerate() {
        if let Some(&term) = query.get(token.as_str()) {
            occurrences += 1;
            present.insert(term);
            run[i] = if i > 0 { run[i - 1] + 1 } else { 1 };
        }
    }
    SentenceScore {
        position_bonus: match position {
            0 => 2,
            1 => 1,
            _ => 0,
        },
        occurrences,
        distinct_terms: present.len(),
        longest_run: run.into_iter().max().unwrap_or(0),
        num_tokens: tokens.len(),
    }
}

/// Build a snippet for `body` (document text without its headline).
///
/// `query_terms` are tokenized query terms; duplicates are ignored. Sentences
/// are taken best first, ties going to the earlier sentence, and taking stops
/// as soon as the snippet holds at least [`SNIPPET_CHAR_BUDGET`] characters,
/// so the last sentence may run past the budget.
pub fn extract<S: AsRef<str>>(body: &str, query_terms: &[S]) -> String {
    let query: HashSet<&str> = query_terms.iter().map(|t| t.as_ref()).collect();
    let sentences = merge_fragments(&split_sentences(body));

    let mut heap: BinaryHeap<(OrderedFloat<f64>, Reverse<usize>)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (OrderedFloat(score_sentence(s, i, &query).normalized()), Reverse(i)))
        .collect();

    let mut snippet = String::new();
    let mut chars = 0;
    while chars < SNIPPET_CHAR_BUDGET {
        let Some((_, Reverse(i))) = heap.pop() else { break };
        snippet.push_str(&sentences[i]);
        chars += sentences[i].chars().count();
    }
    snippet.trim().to_string()
}

/// Heading for a result listing: the headline, or the start of the snippet
/// followed by an ellipsis when the document has no headline.
pub fn display_heading(headline: &str, snippet: &str) -> String {
    if !headline.trim().is_empty() {
        return headline.to_string();
    }
    let head: String = snippet.chars().take(HEADING_FALLBACK_CHARS).collect();
    format!("{head}...")
}
