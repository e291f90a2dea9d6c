//! HTTP handlers: the admission middleware and the administrative surface.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::warn;

use crate::config::TimeUnit;
use crate::metrics::DecisionStats;
use crate::ratelimit::AdmissionController;

/// Header carrying the client key on guarded routes.
pub const CLIENT_ID_HEADER: &str = "x-client-id";
/// Header carrying the retry hint, in seconds, on rejected requests.
pub const RATELIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AdmissionController>,
    pub stats: Arc<DecisionStats>,
}

/// Build the service router: a guarded echo route behind the admission
/// middleware, plus the administrative rule and stats endpoints.
pub fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/", get(echo))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ));

    Router::new()
        .merge(guarded)
        .route("/rule", put(put_rule))
        .route("/stats", get(get_stats))
        .with_state(state)
}

/// Admission check applied to guarded routes.
///
/// Reads the client key from [`CLIENT_ID_HEADER`], decides, and reports the
/// outcome to the stats sink. Rejections answer 429 with the retry hint in
/// [`RATELIMIT_RESET_HEADER`].
async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = match request
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => {
            warn!("Request without a client id header");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("{} header is required", CLIENT_ID_HEADER)
                })),
            )
                .into_response();
        }
    };

    let decision = state.controller.decide(&client_key);
    state.stats.record(&client_key, decision.admitted);

    if decision.admitted {
        return next.run(request).await;
    }

    let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
    if let Some(retry_after) = decision.retry_after {
        let seconds = format!("{:.3}", retry_after.as_secs_f64());
        if let Ok(value) = HeaderValue::from_str(&seconds) {
            response.headers_mut().insert(RATELIMIT_RESET_HEADER, value);
        }
    }
    response
}

async fn echo() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct RuleBody {
    max_requests: u64,
    unit: TimeUnit,
}

/// Install a new rate rule. Invalid rules map to 400 and leave any prior
/// rule active.
async fn put_rule(State(state): State<AppState>, Json(body): Json<RuleBody>) -> Response {
    match state
        .controller
        .set_rule(body.max_requests, body.unit.duration())
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(error = %e, "Rejected rule update");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Snapshot of per-client accepted/rejected counters.
async fn get_stats(State(state): State<AppState>) -> Response {
    Json(state.stats.snapshot()).into_response()
}
