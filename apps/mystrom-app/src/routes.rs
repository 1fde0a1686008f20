//! 路由定义：/health 与 /metrics。

use crate::AppState;
use crate::handlers::{get_metrics, health};
use crate::middleware::request_context;
use axum::{Router, middleware, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // 注入 request_id/trace_id
                .layer(middleware::from_fn(request_context)),
        )
}
