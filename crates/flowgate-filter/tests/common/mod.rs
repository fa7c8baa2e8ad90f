//! Test doubles shared by the filter integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use flowgate_core::error::{FlowGateError, Result};
use flowgate_core::protocol::{HeaderMap, ProtocolResolver, RequestContext};
use flowgate_core::resource::{ResourceDescriptor, ResourceKeySource};
use flowgate_filter::callbacks::{
    AdapterConfig, BlockAction, DefaultCallbacks, FlowControlCallbacks, SharedCallbacks,
};
use flowgate_filter::engine::{BlockReason, DecisionEngine, EntryHandle, Verdict};
use flowgate_filter::filter::StreamFilterHandler;

pub type Sent = (HeaderMap, Bytes, HeaderMap);

/// Handler that records direct responses.
#[derive(Default)]
pub struct RecordingHandler {
    pub sent: Mutex<Vec<Sent>>,
}

impl RecordingHandler {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

impl StreamFilterHandler for RecordingHandler {
    fn send_direct_response(&self, headers: HeaderMap, body: Bytes, trailers: HeaderMap) {
        self.sent.lock().unwrap().push((headers, body, trailers));
    }
}

pub fn adapter_config(key_source: ResourceKeySource, enabled: bool) -> Arc<AdapterConfig> {
    Arc::new(AdapterConfig {
        key_source,
        global_switch: enabled,
        action: BlockAction {
            status: 429,
            body: Bytes::from_static(b"blocked"),
        },
    })
}

pub fn default_callbacks(key_source: ResourceKeySource, enabled: bool) -> DefaultCallbacks {
    DefaultCallbacks::new(
        adapter_config(key_source, enabled),
        Arc::new(ProtocolResolver),
        tracing::Span::none(),
    )
}

/// Call counters per callback operation.
#[derive(Default)]
pub struct Calls {
    pub parse: AtomicUsize,
    pub block: AtomicUsize,
    pub pass: AtomicUsize,
    pub exit: AtomicUsize,
}

impl Calls {
    pub fn snapshot(&self) -> [usize; 4] {
        [
            self.parse.load(Ordering::SeqCst),
            self.block.load(Ordering::SeqCst),
            self.pass.load(Ordering::SeqCst),
            self.exit.load(Ordering::SeqCst),
        ]
    }
}

/// Wraps the default callbacks and counts every hook invocation.
pub struct CountingCallbacks {
    pub inner: DefaultCallbacks,
    pub calls: Arc<Calls>,
}

impl CountingCallbacks {
    pub fn shared(key_source: ResourceKeySource, enabled: bool) -> (SharedCallbacks, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let cb: SharedCallbacks = Arc::new(Self {
            inner: default_callbacks(key_source, enabled),
            calls: Arc::clone(&calls),
        });
        (cb, calls)
    }
}

impl FlowControlCallbacks for CountingCallbacks {
    fn init(&self) {
        self.inner.init();
    }

    fn parse_resource(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
        body: &Bytes,
        trailers: &HeaderMap,
    ) -> Option<ResourceDescriptor> {
        self.calls.parse.fetch_add(1, Ordering::SeqCst);
        self.inner.parse_resource(ctx, headers, body, trailers)
    }

    fn after_block(
        &self,
        handler: &dyn StreamFilterHandler,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
        body: &Bytes,
        trailers: &mut HeaderMap,
    ) {
        self.calls.block.fetch_add(1, Ordering::SeqCst);
        self.inner.after_block(handler, ctx, headers, body, trailers);
    }

    fn after_pass(
        &self,
        handler: &dyn StreamFilterHandler,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
        body: &Bytes,
        trailers: &mut HeaderMap,
    ) {
        self.calls.pass.fetch_add(1, Ordering::SeqCst);
        self.inner.after_pass(handler, ctx, headers, body, trailers);
    }

    fn exit(&self, handler: &dyn StreamFilterHandler) {
        self.calls.exit.fetch_add(1, Ordering::SeqCst);
        self.inner.exit(handler);
    }

    fn enabled(&self) -> bool {
        self.inner.enabled()
    }
}

/// Engine with a fixed behavior.
pub enum FixedEngine {
    Pass(Arc<AtomicUsize>),
    Block,
    Fail,
    Slow(Duration),
}

impl FixedEngine {
    /// Pass engine plus a counter of released entries.
    pub fn passing() -> (Self, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        (FixedEngine::Pass(Arc::clone(&released)), released)
    }
}

#[async_trait]
impl DecisionEngine for FixedEngine {
    async fn entry(&self, resource: &ResourceDescriptor) -> Result<Verdict> {
        match self {
            FixedEngine::Pass(released) => {
                let released = Arc::clone(released);
                Ok(Verdict::Pass(EntryHandle::with_release(resource.name(), move || {
                    released.fetch_add(1, Ordering::SeqCst);
                })))
            }
            FixedEngine::Block => Ok(Verdict::Blocked(BlockReason::Qps { limit: 1 })),
            FixedEngine::Fail => Err(FlowGateError::EngineUnavailable("down".into())),
            FixedEngine::Slow(d) => {
                tokio::time::sleep(*d).await;
                Ok(Verdict::Pass(EntryHandle::noop(resource.name())))
            }
        }
    }
}

pub fn request(target: &str) -> (RequestContext, HeaderMap, Bytes, HeaderMap) {
    let ctx = RequestContext::from_request(flowgate_core::protocol::Protocol::Http1, "GET", target);
    let headers: HeaderMap = [("host", "example.test"), ("x-request-id", "r-1")]
        .into_iter()
        .collect();
    let trailers: HeaderMap = [("x-trailer", "t")].into_iter().collect();
    (ctx, headers, Bytes::from_static(b"payload"), trailers)
}
