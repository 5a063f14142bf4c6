use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::answerer::{AskError, Question};

use super::AppState;
use super::schema::{AskRequest, AskResponse, ErrorResponse};

/// Builds the API router with permissive CORS.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/v1/ask", post(ask_handler))
        .route("/ask", post(ask_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the TerraNaut QnA API. POST a question to /v1/ask.",
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.answerer().model(),
    }))
}

async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(%rejection, "rejected ask payload");
            return error_response(rejection.status(), rejection.body_text());
        }
    };

    let question = Question::from(req);
    match state.answerer().answer(&question).await {
        Ok(result) => Json(AskResponse::from(result)).into_response(),
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for AskError {
    fn into_response(self) -> Response {
        let status = if self.is_user_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            error!(err = %self, "failed to produce an answer");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error_response(status, self.to_string())
    }
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { detail })).into_response()
}
