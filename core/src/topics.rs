use crate::error::{Error, Result};
use std::path::Path;

/// A numbered query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub query: String,
}

/// Parse a topics file: a topic id line followed by its query line, repeated.
/// Blank lines are skipped.
pub fn parse_topics(text: &str) -> Result<Vec<Topic>> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() % 2 != 0 {
        return Err(Error::MalformedTopics(format!(
            "topic {:?} has no query line",
            lines[lines.len() - 1]
        )));
    }
    Ok(lines
        .chunks_exact(2)
        .map(|pair| Topic { id: pair[0].to_string(), query: pair[1].to_string() })
        .collect())
}

pub fn load_topics(path: &Path) -> Result<Vec<Topic>> {
    parse_topics(&std::fs::read_to_string(path)?)
}
