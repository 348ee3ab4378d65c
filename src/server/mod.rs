// Server module
// HTTP query endpoint over an indexed collection


use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::database::Collection;
use crate::{RagError, search};

/// Shared state handed to every route handler.
#[derive(Clone)]
struct AppState {
    collection: Collection,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    results: Vec<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// JSON error body: `{ "error": { "code": ..., "message": ... } }`
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Handler error that renders as a JSON error response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Malformed queries are the caller's fault, everything else is ours.
fn classify_error(error: RagError) -> AppError {
    match error {
        RagError::Query(message) => bad_request(message),
        other => internal(other.to_string()),
    }
}

/// Builds the HTTP router: `POST /query` and `GET /health`.
///
/// All origins, methods, and headers are permitted so browser-based
/// clients can call the endpoint directly.
#[inline]
#[must_use]
pub fn router(collection: Collection, top_k: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { collection, top_k })
}

/// Binds the configured address and serves queries until the process stops.
#[inline]
pub async fn serve(config: &Config, collection: Collection) -> crate::Result<()> {
    let bind_addr = config.server.bind_addr();
    let app = router(collection, config.search.top_k);

    info!("Query server listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Handler for `POST /query`.
///
/// Runs the query against the collection and returns the matching chunk
/// texts, nearest first. Empty queries are a `400`, store failures a `500`.
async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let AppState { collection, top_k } = state;
    let QueryRequest { query } = request;

    let results = search::query(&query, &collection, top_k)
        .await
        .map_err(classify_error)?;
    Ok(Json(QueryResponse { results }))
}

/// Handler for `GET /health`.
#[expect(clippy::unused_async, reason = "route handlers must be async for axum")]
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
