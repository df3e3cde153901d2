//! Reader for the tagged news-article corpus.
//!
//! Records look like
//!
//! ```text
//! <DOC>
//! <DOCNO> LA010189-0001 </DOCNO>
//! <HEADLINE><P>...</P></HEADLINE>
//! <TEXT><P>...</P></TEXT>
//! </DOC>
//! ```
//!
//! Each record ends at a line starting with `</DOC>`. The publication date is
//! encoded in the document number as `LAMMDDYY-NNNN`.

use crate::error::{Error, Result};
use flate2::read::MultiGzDecoder;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use time::{Date, Month};
use walkdir::WalkDir;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
}

const CLOSING_TAG: &str = "</DOC>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub docno: String,
    pub headline: String,
    pub date: Date,
    /// Cleaned `<TEXT>` region.
    pub text: String,
    /// Cleaned `<GRAPHIC>` region.
    pub graphic: String,
    /// The record exactly as read, without the closing tag line.
    pub raw: String,
}

impl Document {
    /// Parse one raw record. `<DOCNO>` is required; the other regions are
    /// optional but must be closed when opened.
    pub fn parse(raw: &str) -> Result<Self> {
        let docno = region(raw, "DOCNO")?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::MalformedDocument("missing <DOCNO>".into()))?;
        let date = docno_date(&docno)?;
        let headline = region(raw, "HEADLINE")?.map(clean).unwrap_or_default();
        let text = region(raw, "TEXT")?.map(clean).unwrap_or_default();
        let graphic = region(raw, "GRAPHIC")?.map(clean).unwrap_or_default();
        Ok(Self { docno, headline, date, text, graphic, raw: raw.to_string() })
    }

    /// Text used for indexing: body, headline and graphic caption.
    pub fn content_text(&self) -> String {
        join_regions(&[&self.text, &self.headline, &self.graphic])
    }

    /// Text used for snippets: everything indexed except the headline.
    pub fn body_text(&self) -> String {
        join_regions(&[&self.text, &self.graphic])
    }

    pub fn display_date(&self) -> String {
        format_date(self.date)
    }
}

/// Render a date the way result listings show it, e.g. "January 1, 1989".
pub fn format_date(date: Date) -> String {
    format!("{} {}, {}", date.month(), date.day(), date.year())
}

/// Decode the `MMDDYY` part of an `LAMMDDYY-NNNN` document number.
pub fn docno_date(docno: &str) -> Result<Date> {
    let invalid = |reason: String| Error::InvalidDate { docno: docno.to_string(), reason };
    let field = |start: usize, name: &str| -> Result<u8> {
        docno
            .get(start..start + 2)
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| invalid(format!("no two-digit {name} at offset {start}")))
    };
    let month = field(2, "month")?;
    let day = field(4, "day")?;
    let year = field(6, "year")?;
    let month = Month::try_from(month).map_err(|e| invalid(e.to_string()))?;
    Date::from_calendar_date(1900 + year as i32, month, day).map_err(|e| invalid(e.to_string()))
}

fn region<'a>(raw: &'a str, tag: &str) -> Result<Option<&'a str>> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let Some(start) = raw.find(&open) else { return Ok(None) };
    let rest = &raw[start + open.len()..];
    match rest.find(&close) {
        Some(end) => Ok(Some(&rest[..end])),
        None => Err(Error::MalformedDocument(format!("<{tag}> is never closed"))),
    }
}

fn clean(region: &str) -> String {
    let stripped = TAG.replace_all(region, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_regions(parts: &[&str]) -> String {
    parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join(" ")
}

/// Streams documents out of a corpus, one record per closing tag.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    ordinal: u64,
    last_docno: Option<String>,
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines(), ordinal: 0, last_docno: None }
    }

    fn next_record(&mut self) -> Option<Result<String>> {
        let mut record = String::new();
        for line in self.lines.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.starts_with(CLOSING_TAG) {
                return Some(Ok(record));
            }
            record.push_str(&line);
            record.push('\n');
        }
        // text after the last closing tag is not a record
        None
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.next_record()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        self.ordinal += 1;
        let parsed = Document::parse(&record).map_err(|e| match e {
            Error::MalformedDocument(reason) => {
                let after = self
                    .last_docno
                    .as_deref()
                    .map(|d| format!(" (after {d})"))
                    .unwrap_or_default();
                Error::MalformedDocument(format!("record #{}{after}: {reason}", self.ordinal))
            }
            other => other,
        });
        if let Ok(doc) = &parsed {
            self.last_docno = Some(doc.docno.clone());
        }
        Some(parsed)
    }
}

/// Open a corpus file, transparently decompressing `.gz` input.
pub fn open_corpus(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// The corpus files under `input`: the file itself, or every file below a
/// directory in sorted path order so document ids are reproducible.
pub fn corpus_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}
