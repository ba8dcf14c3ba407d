use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        multipart::MultipartRejection,
        DefaultBodyLimit, Json, Multipart, Path, Query, State,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use docnote_composer::Composer;
use docnote_schemas::{
    combine_file_texts, CreateCardsRequest, CreateConnectionsRequest, ExtractConceptsRequest,
    SearchQuery, UpdateAnalysisRequest,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::analyzer::HeuristicAnalyzer;
use crate::extractor::TextExtractor;
use crate::store::AnalysisStore;

/// Multipart field carrying uploaded documents.
pub const UPLOAD_FIELD: &str = "files";

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    pub store: AnalysisStore,
    pub extractor: Arc<TextExtractor>,
    pub analyzer: Arc<HeuristicAnalyzer>,
    pub composer: Arc<Composer>,
}

impl AppState {
    pub fn new(store: AnalysisStore, extractor: TextExtractor, analyzer: HeuristicAnalyzer) -> Self {
        Self {
            store,
            extractor: Arc::new(extractor),
            analyzer: Arc::new(analyzer),
            composer: Arc::new(Composer::new()),
        }
    }
}

/// Failure envelope. Always sent with HTTP 200 so the browser client can
/// read `success` uniformly.
#[derive(Debug)]
pub struct ApiError(String);

impl ApiError {
    pub fn new(message: impl Display) -> Self {
        Self(message.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Json(json!({ "success": false, "error": self.0 })).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_upload))
        .route("/analyses", get(list_analyses))
        .route("/analyses/search", get(search_analyses))
        .route(
            "/analyses/:id",
            get(get_analysis).put(update_analysis).delete(delete_analysis),
        )
        .route("/card-notes/extract-concepts", post(extract_concepts))
        .route("/card-notes/create-cards", post(create_cards))
        .route("/card-notes/create-connections", post(create_connections))
        .route("/card-notes/generate", post(generate_card_notes))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "docnote",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "database": state.store.dialect().as_str(),
    }))
}

async fn analyze_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let mut multipart = multipart.map_err(|e| ApiError::new(e.body_text()))?;

    let mut files: Vec<(String, String)> = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read upload: {}", e);
        ApiError::new(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", files.len() + 1));

        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read upload {}: {}", file_name, e);
            ApiError::new(format!("Failed to read upload {}: {}", file_name, e))
        })?;

        let text = state.extractor.extract_bytes(&bytes, &file_name).await;
        files.push((file_name, text));
    }

    if files.is_empty() {
        return Err(ApiError::new("No files uploaded"));
    }

    let file_names: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
    let content_text =
        combine_file_texts(files.iter().map(|(name, text)| (name.as_str(), text.as_str())));

    let report = state.analyzer.analyze(&content_text, &file_names).await;
    let analysis = report.to_markdown();

    let id = state.store.insert(&analysis, &content_text).await.map_err(|e| {
        error!("Failed to store analysis: {:#}", e);
        ApiError::new(e)
    })?;

    info!("Stored analysis {} for {} file(s)", id, file_names.len());

    Ok(Json(json!({
        "success": true,
        "id": id,
        "analysis": analysis,
    })))
}

async fn list_analyses(State(state): State<AppState>) -> ApiResult {
    let records = state.store.list().await.map_err(|e| {
        error!("Failed to list analyses: {:#}", e);
        ApiError::new(e)
    })?;

    Ok(Json(json!(records)))
}

async fn search_analyses(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query.map_err(|e| ApiError::new(e.body_text()))?;

    let records = state.store.search(&query.keyword).await.map_err(|e| {
        error!("Failed to search analyses: {:#}", e);
        ApiError::new(e)
    })?;

    Ok(Json(json!(records)))
}

async fn get_analysis(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult {
    let Path(id) = id.map_err(|e| ApiError::new(e.body_text()))?;

    match state.store.get(id).await {
        Ok(Some(record)) => Ok(Json(json!(record))),
        Ok(None) => Err(ApiError::new("Analysis not found")),
        Err(e) => {
            error!("Failed to load analysis {}: {:#}", id, e);
            Err(ApiError::new(e))
        }
    }
}

async fn update_analysis(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateAnalysisRequest>, JsonRejection>,
) -> ApiResult {
    let Path(id) = id.map_err(|e| ApiError::new(e.body_text()))?;
    let Json(body) = body.map_err(|e| ApiError::new(e.body_text()))?;

    let changes = state
        .store
        .update(id, &body.analysis_summary, &body.content_text)
        .await
        .map_err(|e| {
            error!("Failed to update analysis {}: {:#}", id, e);
            ApiError::new(e)
        })?;

    if changes == 0 {
        return Err(ApiError::new("Analysis not found"));
    }

    Ok(Json(json!({ "success": true, "changes": changes })))
}

async fn delete_analysis(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult {
    let Path(id) = id.map_err(|e| ApiError::new(e.body_text()))?;

    let changes = state.store.delete(id).await.map_err(|e| {
        error!("Failed to delete analysis {}: {:#}", id, e);
        ApiError::new(e)
    })?;

    if changes == 0 {
        return Err(ApiError::new("Analysis not found"));
    }

    info!("Deleted analysis {}", id);
    Ok(Json(json!({ "success": true, "message": "Analysis deleted" })))
}

// ========== CARD NOTES ==========

async fn extract_concepts(
    State(state): State<AppState>,
    body: Result<Json<ExtractConceptsRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(|e| ApiError::new(e.body_text()))?;

    let record = state
        .store
        .get(body.analysis_id)
        .await
        .map_err(|e| {
            error!("Failed to load analysis {}: {:#}", body.analysis_id, e);
            ApiError::new(e)
        })?
        .ok_or_else(|| ApiError::new("Analysis not found"))?;

    let concepts = state.composer.extract_concepts(&record.analysis_summary);
    Ok(Json(json!({ "success": true, "data": concepts })))
}

async fn create_cards(
    State(state): State<AppState>,
    body: Result<Json<CreateCardsRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(|e| ApiError::new(e.body_text()))?;

    let cards = state
        .composer
        .create_cards(&body.concepts, body.analysis_id, &state.store)
        .await;
    Ok(Json(json!({ "success": true, "data": cards })))
}

async fn create_connections(
    State(state): State<AppState>,
    body: Result<Json<CreateConnectionsRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(|e| ApiError::new(e.body_text()))?;

    let connections = state.composer.create_connections(&body.cards);
    Ok(Json(json!({ "success": true, "data": connections })))
}

async fn generate_card_notes(
    State(state): State<AppState>,
    body: Result<Json<ExtractConceptsRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(|e| ApiError::new(e.body_text()))?;

    let bundle = state
        .composer
        .generate(body.analysis_id, &state.store)
        .await
        .map_err(|e| {
            warn!("Card-note generation failed for {}: {:#}", body.analysis_id, e);
            ApiError::new(e)
        })?;

    Ok(Json(json!({ "success": true, "data": bundle })))
}
