use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use newsdex_core::bm25::{top_k, Bm25Ranker};
use newsdex_core::boolean::BooleanEvaluator;
use newsdex_core::config::{DEFAULT_TOP_K, MAX_TOP_K};
use newsdex_core::persist::{load_document, load_document_text, load_index, IndexPaths};
use newsdex_core::snippet::{display_heading, extract};
use newsdex_core::tokenizer::tokenize;
use newsdex_core::InvertedIndex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Deserialize)]
pub struct BooleanParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub docno: String,
    pub score: f64,
    pub heading: String,
    pub date: String,
    pub snippet: String,
}

#[derive(Serialize)]
pub struct BooleanResponse {
    pub query: String,
    pub total_hits: usize,
    pub results: Vec<BooleanMatch>,
}

#[derive(Serialize)]
pub struct BooleanMatch {
    pub rank: usize,
    pub docno: String,
    pub pseudo_score: usize,
}

/// The index is published once at startup and only read afterwards, so every
/// request shares it through an `Arc` without locking.
#[derive(Clone)]
pub struct AppState {
    pub index_root: PathBuf,
    pub index: Arc<InvertedIndex>,
}

pub fn build_app(index_dir: String) -> Result<Router> {
    let paths = IndexPaths::new(&index_dir);
    let index = load_index(&paths)?;
    let app_state = AppState { index_root: paths.root, index: Arc::new(index) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/boolean", get(boolean_handler))
        .route("/doc/:docno", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let index = state.index.as_ref();
    let terms = tokenize(&params.q);
    let term_ids = index.resolve(&terms);

    let scores = Bm25Ranker::new(index).score_all(&term_ids);
    let total_hits = scores.len();
    let k = params.k.clamp(1, MAX_TOP_K);
    let paths = IndexPaths::new(&state.index_root);

    let mut results = Vec::new();
    for (i, hit) in top_k(scores, k).into_iter().enumerate() {
        let (Some(docno), Some(meta)) = (index.docno(hit.doc_id), index.meta(hit.doc_id)) else { continue };
        let snippet = match load_document(&paths, docno) {
            Ok(doc) => extract(&doc.body_text(), &terms),
            Err(e) => {
                tracing::warn!(docno = %docno, error = %e, "stored document unavailable");
                String::new()
            }
        };
        results.push(SearchHit {
            rank: i + 1,
            docno: docno.to_string(),
            score: hit.score,
            heading: display_heading(&meta.headline, &snippet),
            date: meta.date.clone(),
            snippet,
        });
    }

    Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results })
}

pub async fn boolean_handler(State(state): State<AppState>, Query(params): Query<BooleanParams>) -> Json<BooleanResponse> {
    let index = state.index.as_ref();
    let terms = tokenize(&params.q);
    let results: Vec<BooleanMatch> = BooleanEvaluator::new(index)
        .ranked(&terms)
        .into_iter()
        .filter_map(|hit| {
            Some(BooleanMatch { rank: hit.rank, docno: index.docno(hit.doc_id)?.to_string(), pseudo_score: hit.pseudo_score })
        })
        .collect();
    Json(BooleanResponse { query: params.q, total_hits: results.len(), results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(docno): Path<String>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let Some(doc_id) = state.index.doc_id(&docno) else {
        return Err((StatusCode::NOT_FOUND, format!("unknown document {docno}")));
    };
    let meta = state.index.meta(doc_id);
    let text = load_document_text(&IndexPaths::new(&state.index_root), &docno)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "docno": docno,
        "headline": meta.map(|m| m.headline.as_str()),
        "date": meta.map(|m| m.date.as_str()),
        "text": text,
    })))
}
