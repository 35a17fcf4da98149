//! DGW Bridge
//!
//! 권한 엔진을 HTTP로 노출하는 얇은 서비스입니다.
//! REST 요청을 권한 파이프라인에 통과시키고 허용된 쿼리 계획을 돌려줍니다.

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{any, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use config::Config;
pub use state::AppState;

/// 라우터 생성
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // REST authorization
        .route("/api/:entity", any(handlers::rest::handle_collection))
        .route("/api/:entity/*key", any(handlers::rest::handle_item))
        // Admin
        .route("/admin/reload", post(handlers::admin::reload))
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(from_fn(middleware::request_id))
        // State
        .with_state(state)
}
