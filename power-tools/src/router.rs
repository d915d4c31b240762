use std::future::ready;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::endpoint;
use crate::metrics::{setup_metrics_recorder, track_metrics};
use crate::tools::ToolRegistry;

#[derive(Clone)]
pub struct State {
    pub tools: ToolRegistry,
}

pub fn router(tools: ToolRegistry, config: &Config) -> Router {
    let state = State { tools };

    // Agent frontends call us from the browser
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS, Method::HEAD])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .allow_origin(AllowOrigin::mirror_request());

    let status_router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(|| ready("ok")))
        .route("/_liveness", get(|| ready("ok")));

    let tools_router = Router::new()
        .route("/tools", get(endpoint::list_tools))
        .route("/tools/:name", post(endpoint::call_tool))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrency));

    let rest_router = Router::new()
        .route("/api/mongo/databases", get(endpoint::databases))
        .route("/api/mongo/collections", get(endpoint::collections))
        .route("/api/mongo/indexes", get(endpoint::indexes))
        .route(
            "/api/mongo/create-collection",
            post(endpoint::create_collection),
        )
        .route("/api/mongo/query", post(endpoint::query))
        .route("/api/mongo/first", get(endpoint::first_document))
        .route("/api/power/realtime", get(endpoint::realtime_power))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrency));

    let router = Router::new()
        .merge(status_router)
        .merge(tools_router)
        .merge(rest_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Global metrics recorders can play poorly with e.g. tests
    if !config.enable_metrics {
        return router;
    }
    match setup_metrics_recorder() {
        Ok(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        Err(e) => {
            tracing::error!("failed to install metrics recorder: {}", e);
            router
        }
    }
}

pub async fn index() -> &'static str {
    "power tools"
}
