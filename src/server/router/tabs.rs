use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, instrument};

use tabguard_core_types::{GateError, TabId, TabStatus};

use crate::server::BridgeState;

pub(crate) fn router() -> Router<BridgeState> {
    Router::new()
        .route("/v1/tabs/:tab/updated", post(tab_updated_handler))
        .route("/v1/tabs/:tab/removed", post(tab_removed_handler))
        .route("/v1/tabs/:tab/content", post(tab_content_handler))
        .route("/v1/directives", get(directives_handler))
}

#[derive(Deserialize)]
struct TabUpdateRequest {
    status: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct TabContentRequest {
    text: String,
    /// Page the text was read from.
    #[serde(default)]
    url: Option<String>,
}

#[instrument(name = "tabguard.tabs.updated", skip(state, request))]
async fn tab_updated_handler(
    State(state): State<BridgeState>,
    Path(tab): Path<u64>,
    Json(request): Json<TabUpdateRequest>,
) -> Response {
    let status = TabStatus::parse(&request.status);
    accepted(state.gate.tab_updated(TabId(tab), status, request.url))
}

#[instrument(name = "tabguard.tabs.removed", skip(state))]
async fn tab_removed_handler(State(state): State<BridgeState>, Path(tab): Path<u64>) -> Response {
    accepted(state.gate.tab_removed(TabId(tab)))
}

#[instrument(name = "tabguard.tabs.content", skip(state, request))]
async fn tab_content_handler(
    State(state): State<BridgeState>,
    Path(tab): Path<u64>,
    Json(request): Json<TabContentRequest>,
) -> StatusCode {
    state
        .gate
        .record_sample(TabId(tab), request.url.as_deref(), &request.text);
    StatusCode::NO_CONTENT
}

async fn directives_handler(State(state): State<BridgeState>) -> Response {
    Json(state.gate.drain_directives()).into_response()
}

fn accepted(result: Result<(), GateError>) -> Response {
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => {
            error!(%err, "failed to publish navigation event");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
