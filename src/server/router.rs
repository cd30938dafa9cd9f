use axum::{http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

mod tabs;

use super::state::BridgeState;

/// Builds the bridge router. `cors` enables a permissive CORS layer so the
/// extension can call the host from any origin.
pub fn build_router(state: BridgeState, cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(tabs::router())
        .with_state(state);
    if cors {
        router.layer(cors_layer())
    } else {
        router
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
