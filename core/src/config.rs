//! Fixed tuning constants shared by the builder, the evaluators and the front ends.

/// BM25 term frequency saturation.
pub const BM25_K1: f64 = 1.2;

/// BM25 document length normalization.
pub const BM25_B: f64 = 0.75;

/// A snippet stops growing once it reaches this many characters.
pub const SNIPPET_CHAR_BUDGET: usize = 200;

/// Split pieces are merged until the accumulated sentence is longer than this.
pub const MIN_SENTENCE_CHARS: usize = 20;

/// Characters of the snippet used as a heading when a document has no headline.
pub const HEADING_FALLBACK_CHARS: usize = 50;

/// Default number of ranked results shown per query.
pub const DEFAULT_TOP_K: usize = 10;

/// Upper bound accepted for `k` by the HTTP front end.
pub const MAX_TOP_K: usize = 1000;

/// Emit a build progress line every this many documents.
pub const BUILD_PROGRESS_EVERY: u32 = 10_000;

/// Run tag written in the last column of boolean result lines.
pub const DEFAULT_RUN_TAG: &str = "newsdexAND";

/// Version stamped into `meta.json`.
pub const INDEX_FORMAT_VERSION: u32 = 1;
