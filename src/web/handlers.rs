use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::domain::clone::{CloneOutcome, CloneRequest, CloneResponse};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

pub async fn clone_site(
    State(state): State<AppState>,
    body: std::result::Result<Json<CloneRequest>, JsonRejection>,
) -> Response {
    match run_clone(&state, body).await {
        Ok(outcome) => {
            let status = if state.strict_status && !outcome.is_generated() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::OK
            };
            (status, Json(CloneResponse::from(outcome))).into_response()
        }
        Err(e) => {
            let status = e.strict_status();
            let mut resp = e.into_response();
            if state.strict_status {
                *resp.status_mut() = status;
            }
            resp
        }
    }
}

async fn run_clone(
    state: &AppState,
    body: std::result::Result<Json<CloneRequest>, JsonRejection>,
) -> Result<CloneOutcome> {
    let Json(req) = body.map_err(|r| AppError::BadRequest(r.body_text()))?;
    let url = req.target().ok_or(AppError::MissingUrl)?.to_string();

    // A panic anywhere in the pipeline surfaces here as a join error.
    let cloner = state.cloner.clone();
    let outcome = tokio::spawn(async move { cloner.clone_site(&url).await })
        .await
        .map_err(|e| anyhow::anyhow!("clone task failed: {e}"))?;

    tracing::info!(generated = outcome.is_generated(), bytes = outcome.html().len(), "clone response ready");
    Ok(outcome)
}
