// GET / — fleet dashboard rendered with askama

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::AppState;
use crate::models::HostSnapshot;

#[derive(Template)]
#[template(path = "index.html")]
struct DashboardTemplate {
    gpustats: Vec<HostSnapshot>,
    update_time: String,
}

pub(super) async fn index_handler(State(state): State<AppState>) -> Response {
    let gpustats = state.aggregator.aggregate_all().await;
    let update_time = chrono::Local::now()
        .format("Updated at %Y-%m-%d %H-%M-%S")
        .to_string();
    let page = DashboardTemplate {
        gpustats,
        update_time,
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "render_dashboard", "template render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
