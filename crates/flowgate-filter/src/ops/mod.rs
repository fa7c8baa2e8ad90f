//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format
//! - fallback   : upstream stub answering admitted requests

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let fc = &state.cfg().flow_control;
    let extra = [
        ("flowgate_enabled", u64::from(fc.global_switch)),
        ("flowgate_monitor", u64::from(fc.monitor)),
    ];
    let body = state.metrics().render(&extra);

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

pub async fn upstream(uri: Uri) -> impl IntoResponse {
    (StatusCode::OK, format!("passed: {}", uri.path()))
}
