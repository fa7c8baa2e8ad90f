//! Axum middleware bridging HTTP requests to the stream filter.
//!
//! - Request line -> `RequestContext`, request headers -> `HeaderMap`
//! - Direct responses become the HTTP response; trailers are appended as
//!   headers since the upstream stub answers over plain HTTP/1
//! - The filter is dropped at the end of the request or on cancellation,
//!   which runs its teardown

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, StatusCode, Version},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use flowgate_core::protocol::{HeaderMap, Protocol, RequestContext, HEADER_STATUS};

use crate::app_state::AppState;
use crate::filter::{FilterStatus, StreamFilterHandler};

/// Response captured from `send_direct_response`.
#[derive(Debug, Clone)]
pub struct DirectResponse {
    pub headers: HeaderMap,
    pub body: Bytes,
    pub trailers: HeaderMap,
}

impl IntoResponse for DirectResponse {
    fn into_response(self) -> Response {
        let status = self
            .headers
            .get(HEADER_STATUS)
            .and_then(|s| s.parse::<u16>().ok())
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut resp = Response::new(Body::from(self.body));
        *resp.status_mut() = status;

        // Request-describing headers never leak into the response; the body
        // is the configured plain-text block message.
        let out = resp.headers_mut();
        for (k, v) in self.headers.iter().chain(self.trailers.iter()) {
            if !is_response_safe(k) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
                out.append(name, value);
            }
        }
        out.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        resp
    }
}

fn is_response_safe(name: &str) -> bool {
    const SKIP: [&str; 11] = [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "host",
        "upgrade",
        "te",
        "trailer",
        "cookie",
        "set-cookie",
        "authorization",
        "proxy-authorization",
    ];
    const SKIP_PREFIX: [&str; 3] = ["content-", "accept", "proxy-"];

    let lower = name.to_ascii_lowercase();
    !lower.starts_with(':')
        && !SKIP.contains(&lower.as_str())
        && !SKIP_PREFIX.iter().any(|p| lower.starts_with(p))
}

/// Per-request handler; holds at most one direct response.
#[derive(Default)]
pub struct HttpStreamHandler {
    direct: Mutex<Option<DirectResponse>>,
}

impl HttpStreamHandler {
    pub fn take_direct_response(&self) -> Option<DirectResponse> {
        self.direct.lock().ok().and_then(|mut g| g.take())
    }
}

impl StreamFilterHandler for HttpStreamHandler {
    fn send_direct_response(&self, headers: HeaderMap, body: Bytes, trailers: HeaderMap) {
        if let Ok(mut g) = self.direct.lock() {
            *g = Some(DirectResponse { headers, body, trailers });
        }
    }
}

fn protocol_of(version: Version) -> Protocol {
    if version == Version::HTTP_2 {
        Protocol::Http2
    } else {
        Protocol::Http1
    }
}

fn header_map_of(req: &Request) -> HeaderMap {
    req.headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}

/// Flow-control middleware (`axum::middleware::from_fn_with_state`).
pub async fn flow_control(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let ctx = RequestContext::from_request(protocol_of(req.version()), req.method().as_str(), &target);
    let mut headers = header_map_of(&req);
    let mut trailers = HeaderMap::new();
    // The body is streamed to the upstream untouched.
    let body = Bytes::new();

    let handler = Arc::new(HttpStreamHandler::default());
    let mut filter = app.filter_factory().create_filter(handler.clone());

    let status = filter.on_receive(&ctx, &mut headers, &body, &mut trailers).await;
    if status == FilterStatus::Stop {
        filter.on_destroy();
        return match handler.take_direct_response() {
            Some(direct) => direct.into_response(),
            None => {
                tracing::error!(uri = %target, "filter stopped without a direct response");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    let resp = next.run(req).await;
    filter.on_destroy();
    resp
}
