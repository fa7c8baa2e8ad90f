//! Flow-control stream filter.
//!
//! One [`StreamFilter`] is created per request by a [`FilterFactory`]. It
//! drives the callbacks and the decision engine:
//!
//! `enabled? -> parse_resource -> engine verdict -> after_block | after_pass`
//!
//! at most once per request, and runs `exit` exactly once on destroy, also
//! when the request is dropped mid-flight. In monitor mode a block verdict is
//! only counted; neither verdict hook runs.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;

use flowgate_core::protocol::{HeaderMap, RequestContext};

use crate::callbacks::SharedCallbacks;
use crate::config::{FailMode, FlowControlConfig};
use crate::engine::{BlockReason, DecisionEngine, EntryHandle, Verdict};
use crate::obs::FlowMetrics;

/// Runtime side of a stream: the filter's way to answer the client directly.
pub trait StreamFilterHandler: Send + Sync {
    /// Terminate the pipeline and write this response to the client.
    fn send_direct_response(&self, headers: HeaderMap, body: Bytes, trailers: HeaderMap);
}

/// Whether the pipeline continues after this filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    Continue,
    Stop,
}

/// Shared, immutable pieces of a flow-control filter chain.
pub struct FilterFactory {
    callbacks: SharedCallbacks,
    engine: Arc<dyn DecisionEngine>,
    metrics: Arc<FlowMetrics>,
    monitor: bool,
    fail_mode: FailMode,
    engine_timeout: Duration,
}

impl FilterFactory {
    pub fn new(
        cfg: &FlowControlConfig,
        callbacks: SharedCallbacks,
        engine: Arc<dyn DecisionEngine>,
        metrics: Arc<FlowMetrics>,
    ) -> Self {
        Self {
            callbacks,
            engine,
            metrics,
            monitor: cfg.monitor,
            fail_mode: cfg.fail_mode,
            engine_timeout: Duration::from_millis(cfg.engine_timeout_ms),
        }
    }

    pub fn callbacks(&self) -> &SharedCallbacks {
        &self.callbacks
    }

    /// Filter for one request, bound to that request's handler.
    pub fn create_filter(&self, handler: Arc<dyn StreamFilterHandler>) -> StreamFilter {
        StreamFilter {
            callbacks: Arc::clone(&self.callbacks),
            engine: Arc::clone(&self.engine),
            metrics: Arc::clone(&self.metrics),
            handler,
            monitor: self.monitor,
            fail_mode: self.fail_mode,
            engine_timeout: self.engine_timeout,
            entry: None,
            block_reason: None,
            ran_complete: false,
            destroyed: false,
        }
    }
}

pub struct StreamFilter {
    callbacks: SharedCallbacks,
    engine: Arc<dyn DecisionEngine>,
    metrics: Arc<FlowMetrics>,
    handler: Arc<dyn StreamFilterHandler>,
    monitor: bool,
    fail_mode: FailMode,
    engine_timeout: Duration,

    entry: Option<EntryHandle>,
    block_reason: Option<BlockReason>,
    ran_complete: bool,
    destroyed: bool,
}

impl StreamFilter {
    /// Run flow control for the request headers/body/trailers.
    pub async fn on_receive(
        &mut self,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
        body: &Bytes,
        trailers: &mut HeaderMap,
    ) -> FilterStatus {
        if self.destroyed || self.ran_complete || !self.callbacks.enabled() {
            return FilterStatus::Continue;
        }
        // One decision per request, whichever branch ends it.
        self.ran_complete = true;

        let resource = match self.callbacks.parse_resource(ctx, headers, body, trailers) {
            Some(r) => r,
            None => {
                self.metrics.parse_failures.inc(&[]);
                tracing::warn!("flow control skipped: resource unavailable");
                return FilterStatus::Continue;
            }
        };

        let verdict = match timeout(self.engine_timeout, self.engine.entry(&resource)).await {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                self.metrics.engine_errors.inc(&[("kind", e.kind())]);
                tracing::warn!(resource = resource.name(), error = %e, "decision engine failed");
                return self.on_engine_unavailable(ctx, headers, body, trailers);
            }
            Err(_) => {
                self.metrics.engine_errors.inc(&[("kind", "timeout")]);
                tracing::warn!(
                    resource = resource.name(),
                    timeout_ms = self.engine_timeout.as_millis() as u64,
                    "decision engine timed out"
                );
                return self.on_engine_unavailable(ctx, headers, body, trailers);
            }
        };

        match verdict {
            Verdict::Pass(handle) => {
                self.metrics.verdicts.inc(&[("verdict", "pass")]);
                self.metrics.entries_active.inc(&[]);
                self.entry = Some(handle);
                self.callbacks
                    .after_pass(self.handler.as_ref(), ctx, headers, body, trailers);
                FilterStatus::Continue
            }
            Verdict::Blocked(reason) if self.monitor => {
                self.metrics.verdicts.inc(&[("verdict", "monitor_block")]);
                tracing::info!(resource = resource.name(), reason = %reason, "monitor mode, block not enforced");
                self.block_reason = Some(reason);
                FilterStatus::Continue
            }
            Verdict::Blocked(reason) => {
                self.metrics.verdicts.inc(&[("verdict", "block")]);
                tracing::debug!(resource = resource.name(), reason = %reason, "request blocked");
                self.block_reason = Some(reason);
                self.block(ctx, headers, body, trailers)
            }
        }
    }

    fn on_engine_unavailable(
        &mut self,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
        body: &Bytes,
        trailers: &mut HeaderMap,
    ) -> FilterStatus {
        match self.fail_mode {
            FailMode::Open => FilterStatus::Continue,
            FailMode::Closed => {
                self.block_reason = Some(BlockReason::Other("engine_unavailable".into()));
                self.block(ctx, headers, body, trailers)
            }
        }
    }

    fn block(
        &mut self,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
        body: &Bytes,
        trailers: &mut HeaderMap,
    ) -> FilterStatus {
        self.callbacks
            .after_block(self.handler.as_ref(), ctx, headers, body, trailers);
        FilterStatus::Stop
    }

    /// Reason of the last block verdict, enforced or monitored.
    pub fn block_reason(&self) -> Option<&BlockReason> {
        self.block_reason.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear down: run `exit` and release the engine entry. Idempotent; also
    /// invoked on drop.
    pub fn on_destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.callbacks.exit(self.handler.as_ref());

        if let Some(entry) = self.entry.take() {
            tracing::debug!(
                resource = entry.resource(),
                elapsed_us = entry.elapsed().as_micros() as u64,
                "releasing flow control entry"
            );
            self.metrics.entries_active.dec(&[]);
            self.metrics.entry_duration.observe(&[], entry.elapsed());
            entry.exit();
        }
    }
}

impl Drop for StreamFilter {
    fn drop(&mut self) {
        self.on_destroy();
    }
}
