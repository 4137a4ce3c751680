use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use domain::expose;
use infrastructure::config::EmptyScrape;

use super::state::AppState;

/// Serves the current snapshot in Prometheus text exposition format.
///
/// Before the first cycle publishes, the response is driven by the
/// configured empty-scrape policy: an empty 200 exposition or a 503.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.store.current() {
        Some(snapshot) => {
            let body = expose::encode(&snapshot);
            ([(header::CONTENT_TYPE, expose::CONTENT_TYPE)], body).into_response()
        }
        None => match state.empty_scrape {
            EmptyScrape::Empty => {
                ([(header::CONTENT_TYPE, expose::CONTENT_TYPE)], String::new()).into_response()
            }
            EmptyScrape::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "no snapshot published yet\n").into_response()
            }
        },
    }
}
