// HTTP routes: agent endpoint, dashboard, version

mod dashboard;
mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::FleetAggregator;
use crate::collector::LocalCollector;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) collector: Arc<LocalCollector>,
    pub(crate) aggregator: Arc<FleetAggregator>,
}

pub fn app(collector: Arc<LocalCollector>, aggregator: Arc<FleetAggregator>) -> Router {
    let state = AppState {
        collector,
        aggregator,
    };
    Router::new()
        .route("/", get(dashboard::index_handler)) // GET /
        .route("/gpustat", get(http::gpustat_handler)) // GET /gpustat
        .route("/version", get(http::version_handler)) // GET /version
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
