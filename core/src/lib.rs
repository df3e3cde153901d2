pub mod bm25;
pub mod boolean;
pub mod builder;
pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod index;
pub mod persist;
pub mod snippet;
pub mod tokenizer;
pub mod topics;
pub mod trec;

pub use error::{Error, Result};
pub use index::{DocId, DocMeta, InvertedIndex, Posting, TermId};
