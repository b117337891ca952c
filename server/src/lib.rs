use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use keyword_core::persist::{self, IndexPaths};
use keyword_core::{search, DocId, Document, InvertedIndex, SearchError, DEFAULT_SEARCH_LIMIT};
use parking_lot::RwLock;
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
fn default_k() -> usize { DEFAULT_SEARCH_LIMIT }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub id: DocId,
    pub title: String,
    pub description: String,
    pub snippet: String,
}

#[derive(Deserialize)]
pub struct TfParams {
    pub id: DocId,
    pub term: String,
}

#[derive(Serialize)]
pub struct TfResponse {
    pub id: DocId,
    pub term: String,
    pub tf: u32,
}

/// JSON error body `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let status = match &err {
            SearchError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            SearchError::IndexNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, err.to_string())
    }
}

/// Where the snapshot lives and who may reload it.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// Admin token comes from `ADMIN_TOKEN`.
    pub fn from_env(index_dir: impl Into<PathBuf>) -> Self {
        Self { index_dir: index_dir.into(), admin_token: std::env::var("ADMIN_TOKEN").ok() }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    /// `None` until a snapshot has been loaded; swapped wholesale on reload.
    pub index: Arc<RwLock<Option<Arc<InvertedIndex>>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Result<Arc<InvertedIndex>, ApiError> {
        self.index.read().clone().ok_or_else(|| {
            ApiError(
                StatusCode::SERVICE_UNAVAILABLE,
                format!(
                    "no index loaded from {}; run `keyword-search build` and POST /index/reload",
                    self.index_paths_root.display()
                ),
            )
        })
    }
}

pub fn build_app(config: ServerConfig) -> Router {
    // A missing or unreadable snapshot leaves the server up, answering 503 until reload.
    let index = match persist::load(&IndexPaths::new(&config.index_dir)) {
        Ok(index) => Some(Arc::new(index)),
        Err(err) => {
            tracing::warn!(error = %err, "starting without an index");
            None
        }
    };
    let app_state = AppState {
        index_paths_root: config.index_dir,
        index: Arc::new(RwLock::new(index)),
        admin_token: config.admin_token,
    };

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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/tf", get(tf_handler))
        .route("/index/reload", post(index_reload))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let index = state.current()?;
    let k = params.k.clamp(1, 100);
    let total_hits = index.documents_for(&params.q).len();

    let raw_terms: Vec<String> = params
        .q
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    let results = search(&index, &params.q, k)
        .into_iter()
        .map(|doc| SearchHit {
            id: doc.id,
            title: doc.title.clone(),
            description: doc.description.clone(),
            snippet: highlight_terms(&doc.description, &raw_terms),
        })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<Document>, ApiError> {
    state
        .current()?
        .document(doc_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("document {doc_id} not found")))
}

pub async fn tf_handler(State(state): State<AppState>, Query(params): Query<TfParams>) -> Result<Json<TfResponse>, ApiError> {
    let tf = state.current()?.term_frequency(params.id, &params.term)?;
    Ok(Json(TfResponse { id: params.id, term: params.term, tf }))
}

/// Wrap every case-insensitive occurrence of a raw query word in `<em>`.
///
/// All words go into one alternation, longest first, and are replaced in a
/// single pass so inserted tags are never matched again.
fn highlight_terms(text: &str, terms: &[String]) -> String {
    let mut words: Vec<&str> = terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
    if words.is_empty() {
        return text.to_string();
    }
    words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    words.dedup();
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    match regex::RegexBuilder::new(&alternation).case_insensitive(true).build() {
        Ok(pat) => pat.replace_all(text, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).into_owned(),
        Err(_) => text.to_string(),
    }
}

// --- Admin endpoints ---
async fn index_reload(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_paths_root);
    let fresh = persist::load(&paths)?;
    let num_docs = fresh.num_docs();
    let num_terms = fresh.num_terms();
    *state.index.write() = Some(Arc::new(fresh));
    tracing::info!(num_docs, num_terms, "reloaded index");
    Ok(Json(serde_json::json!({ "num_docs": num_docs, "num_terms": num_terms })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError(StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
