//! 관리 엔드포인트

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{BridgeError, Result};
use crate::state::AppState;

/// `POST /admin/reload`
///
/// 설정/스키마 파일을 다시 읽어 권한 인덱스를 교체합니다.
/// 실패하면 이전 인덱스가 유지되고 설정 에러가 반환됩니다.
pub async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    if !state.config.reload_enabled {
        return Err(BridgeError::Forbidden {
            message: "hot reload is disabled".to_string(),
        });
    }

    let entities = tokio::task::spawn_blocking(move || state.reload())
        .await
        .map_err(|e| BridgeError::Internal {
            message: format!("reload task failed: {}", e),
        })??;

    Ok(Json(json!({ "status": "reloaded", "entities": entities })))
}
