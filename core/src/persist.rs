use crate::config::INDEX_FORMAT_VERSION;
use crate::corpus::{docno_date, Document};
use crate::{DocId, DocMeta, InvertedIndex, Posting, TermId};
use anyhow::{bail, ensure, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::Date;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

/// Per-document metadata stored next to the raw document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub id: DocId,
    pub docno: String,
    pub headline: String,
    pub date: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn lexicon(&self) -> PathBuf { self.root.join("lexicon.bin") }
    fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    fn doc_lengths(&self) -> PathBuf { self.root.join("doc_lengths.bin") }
    fn docnos(&self) -> PathBuf { self.root.join("docnos.bin") }
    fn docs_meta(&self) -> PathBuf { self.root.join("docs_meta.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// `docs/YY/MM/DD`, taken from the date in the document number.
    fn document_dir(&self, date: Date) -> PathBuf {
        self.root
            .join("docs")
            .join(format!("{:02}", date.year() % 100))
            .join(format!("{:02}", u8::from(date.month())))
            .join(format!("{:02}", date.day()))
    }

    pub fn document_text(&self, docno: &str) -> Result<PathBuf> {
        let date = docno_date(docno)?;
        Ok(self.document_dir(date).join(format!("{docno}.txt")))
    }

    pub fn document_metadata(&self, docno: &str) -> Result<PathBuf> {
        let date = docno_date(docno)?;
        Ok(self.document_dir(date).join(format!("{docno}.metadata.json")))
    }
}

/// Create the index root, refusing to reuse a directory that already exists.
pub fn create_fresh_root(paths: &IndexPaths) -> Result<()> {
    if paths.root.exists() {
        bail!("output directory {} already exists", paths.root.display());
    }
    create_dir_all(&paths.root).with_context(|| format!("creating {}", paths.root.display()))?;
    Ok(())
}

fn write_bincode<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    bincode::serialize_into(&mut w, value).with_context(|| format!("writing {}", path.display()))?;
    w.flush()?;
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("missing index artifact {}", path.display()))?;
    let value = bincode::deserialize_from(BufReader::new(f))
        .with_context(|| format!("corrupt index artifact {}", path.display()))?;
    Ok(value)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(paths.meta(), json).with_context(|| format!("writing {}", paths.meta().display()))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let buf = fs::read_to_string(&path).with_context(|| format!("missing index artifact {}", path.display()))?;
    let meta: MetaFile = serde_json::from_str(&buf).with_context(|| format!("corrupt {}", path.display()))?;
    Ok(meta)
}

/// Write every index artifact plus `meta.json`.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(&paths.lexicon(), &index.lexicon)?;
    write_bincode(&paths.postings(), &index.postings)?;
    write_bincode(&paths.doc_lengths(), &index.doc_lengths)?;
    write_bincode(&paths.docnos(), &index.docnos)?;
    write_bincode(&paths.docs_meta(), &index.docs)?;
    let meta = MetaFile {
        num_docs: index.num_docs(),
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: INDEX_FORMAT_VERSION,
    };
    save_meta(paths, &meta)
}

/// Load a published index. Any missing or inconsistent artifact is an error;
/// there is no partial-index fallback.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    ensure!(
        meta.version == INDEX_FORMAT_VERSION,
        "index format version {} is not supported (expected {})",
        meta.version,
        INDEX_FORMAT_VERSION
    );
    let lexicon: HashMap<String, TermId> = read_bincode(&paths.lexicon())?;
    let postings: Vec<Vec<Posting>> = read_bincode(&paths.postings())?;
    let doc_lengths: Vec<u32> = read_bincode(&paths.doc_lengths())?;
    let docnos: Vec<String> = read_bincode(&paths.docnos())?;
    let docs: Vec<DocMeta> = read_bincode(&paths.docs_meta())?;
    ensure!(
        doc_lengths.len() == meta.num_docs as usize,
        "meta.json lists {} documents but doc_lengths.bin has {}",
        meta.num_docs,
        doc_lengths.len()
    );
    let index = InvertedIndex::from_parts(lexicon, postings, doc_lengths, docnos, docs)
        .with_context(|| format!("inconsistent index at {}", paths.root.display()))?;
    tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "index loaded");
    Ok(index)
}

/// Store the raw record and its metadata under `docs/YY/MM/DD/`.
pub fn save_document(paths: &IndexPaths, doc: &Document, doc_id: DocId) -> Result<()> {
    let text_path = paths.document_text(&doc.docno)?;
    if let Some(dir) = text_path.parent() {
        create_dir_all(dir)?;
    }
    fs::write(&text_path, &doc.raw).with_context(|| format!("writing {}", text_path.display()))?;
    let metadata = StoredMetadata {
        id: doc_id,
        docno: doc.docno.clone(),
        headline: doc.headline.clone(),
        date: doc.display_date(),
    };
    fs::write(paths.document_metadata(&doc.docno)?, serde_json::to_string(&metadata)?)?;
    Ok(())
}

pub fn load_document_text(paths: &IndexPaths, docno: &str) -> Result<String> {
    let path = paths.document_text(docno)?;
    fs::read_to_string(&path).with_context(|| format!("missing stored document {}", path.display()))
}

/// Re-parse a stored document, e.g. to build a snippet from its body.
pub fn load_document(paths: &IndexPaths, docno: &str) -> Result<Document> {
    let raw = load_document_text(paths, docno)?;
    Ok(Document::parse(&raw)?)
}

pub fn load_document_metadata(paths: &IndexPaths, docno: &str) -> Result<StoredMetadata> {
    let path = paths.document_metadata(docno)?;
    let buf = fs::read_to_string(&path).with_context(|| format!("missing {}", path.display()))?;
    Ok(serde_json::from_str(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use tempfile::tempdir;

    fn doc(docno: &str, headline: &str, text: &str) -> Document {
        Document::parse(&format!(
            "<DOC>\n<DOCNO> {docno} </DOCNO>\n<HEADLINE>{headline}</HEADLINE>\n<TEXT>{text}</TEXT>\n"
        ))
        .unwrap()
    }

    #[test]
    fn index_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("idx"));
        create_fresh_root(&paths).unwrap();

        let mut b = IndexBuilder::new();
        for d in [doc("LA010189-0001", "Rain", "wet wet day"), doc("LA020289-0002", "", "dry day")] {
            let id = b.add_document(&d).unwrap();
            save_document(&paths, &d, id).unwrap();
        }
        let built = b.finish();
        save_index(&paths, &built).unwrap();

        let loaded = load_index(&paths).unwrap();
        assert_eq!(loaded.num_docs(), 2);
        assert_eq!(loaded.doc_lengths(), built.doc_lengths());
        assert_eq!(loaded.term_id("wet"), built.term_id("wet"));
        assert_eq!(loaded.postings(loaded.term_id("day").unwrap()).len(), 2);
        assert_eq!(loaded.doc_id("LA020289-0002"), Some(1));
        assert_eq!(loaded.avg_doc_length(), built.avg_doc_length());

        let stored = load_document(&paths, "LA010189-0001").unwrap();
        assert_eq!(stored.body_text(), "wet wet day");
        let meta = load_document_metadata(&paths, "LA020289-0002").unwrap();
        assert_eq!(meta.id, 1);
        assert_eq!(meta.date, "February 2, 1989");
        assert!(dir.path().join("idx/docs/89/02/02/LA020289-0002.txt").exists());
    }

    #[test]
    fn existing_root_is_refused() {
        let dir = tempdir().unwrap();
        assert!(create_fresh_root(&IndexPaths::new(dir.path())).is_err());
    }

    #[test]
    fn missing_artifacts_are_fatal() {
        let dir = tempdir().unwrap();
        let err = load_index(&IndexPaths::new(dir.path())).unwrap_err();
        assert!(err.to_string().contains("meta.json"), "{err}");
    }
}
