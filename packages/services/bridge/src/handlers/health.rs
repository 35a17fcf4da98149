//! 헬스 체크

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let entities = state.permissions.snapshot().entity_names().count();
    Json(json!({ "status": "ok", "entities": entities }))
}
