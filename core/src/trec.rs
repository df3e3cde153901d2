//! The six-column result line format: `<topic> Q0 <docno> <rank> <score> <run_tag>`.

use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct RunLine {
    pub topic: String,
    pub docno: String,
    pub rank: usize,
    pub score: f64,
    pub run_tag: String,
}

impl fmt::Display for RunLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q0 {} {} {} {}", self.topic, self.docno, self.rank, self.score, self.run_tag)
    }
}

impl RunLine {
    /// Parse one line; `line_no` is 1-based and only used in errors.
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let bad = |reason: String| Error::MalformedRunLine { line: line_no, reason };
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [topic, _q0, docno, rank, score, run_tag] = fields[..] else {
            return Err(bad(format!("expected 6 fields, found {}", fields.len())));
        };
        let rank = rank.parse().map_err(|_| bad(format!("rank {rank:?} is not an integer")))?;
        let score = score.parse().map_err(|_| bad(format!("score {score:?} is not a number")))?;
        Ok(Self {
            topic: topic.to_string(),
            docno: docno.to_string(),
            rank,
            score,
            run_tag: run_tag.to_string(),
        })
    }
}

/// Parse a whole results file. Blank lines are skipped; anything else must be
/// a well-formed line.
pub fn parse_run(text: &str) -> Result<Vec<RunLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| RunLine::parse(l, i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_six_fields() {
        let line = RunLine {
            topic: "401".into(),
            docno: "LA010189-0001".into(),
            rank: 1,
            score: 2.0,
            run_tag: "newsdexAND".into(),
        };
        assert_eq!(line.to_string(), "401 Q0 LA010189-0001 1 2 newsdexAND");
        assert_eq!(RunLine::parse(&line.to_string(), 1).unwrap(), line);
    }

    #[test]
    fn rejects_wrong_field_count_and_bad_numbers() {
        assert!(RunLine::parse("401 Q0 LA010189-0001 1 2", 3).is_err());
        assert!(RunLine::parse("401 Q0 LA010189-0001 one 2 tag", 3).is_err());
        let err = parse_run("401 Q0 D 1 1.5 t\n\n401 Q0 D 2 x t\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }
}
