//! Axum router wiring.
//!
//! Ops endpoints are served directly; everything else goes through the
//! flow-control middleware to the upstream stub.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(ops::upstream)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            transport::http::flow_control,
        ))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
