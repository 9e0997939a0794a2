use axum::extract::{Request as AxRequest, State};
use axum::http::HeaderValue;
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::app_state::AppState;

const LOGGED_HEADERS: [&str; 3] = ["user-agent", "referer", "accept"];

// Access log with a short request id echoed back as X-Request-ID.
pub(crate) async fn log_requests_mw(
    State(state): State<AppState>,
    req: AxRequest,
    next: axum::middleware::Next,
) -> Response {
    if !state.log_requests {
        return next.run(req).await;
    }

    let req_id = Uuid::new_v4().simple().to_string()[..12].to_string();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let headers: Vec<String> = LOGGED_HEADERS
        .iter()
        .filter_map(|k| {
            req.headers()
                .get(*k)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{k}={v}"))
        })
        .collect();

    info!(target: "photo_site", "[{}] HTTP {} {} {}", req_id, method, uri, headers.join(" "));

    let started = std::time::Instant::now();
    let mut resp = next.run(req).await;
    let dur_ms = started.elapsed().as_millis();
    let status = resp.status();
    let _ = resp.headers_mut().insert(
        "X-Request-ID",
        HeaderValue::from_str(&req_id).unwrap_or_else(|_| HeaderValue::from_static("-")),
    );
    let resp_ct = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    info!(
        target: "photo_site",
        "[{}] Response {} {} -> {} ({} ms) ct={}",
        req_id,
        method,
        uri.path(),
        status.as_u16(),
        dur_ms,
        resp_ct,
    );
    resp
}
