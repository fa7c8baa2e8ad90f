//! Shared application state for the flowgate gateway.
//!
//! Built once at startup: compiles the flow-control config into an immutable
//! adapter config, selects callbacks from the registry, loads engine rules,
//! and keeps the resulting filter factory for the transport layer.

use std::sync::Arc;

use flowgate_core::error::Result;
use flowgate_core::protocol::ProtocolResolver;

use crate::callbacks::{AdapterConfig, CallbacksRegistry};
use crate::config::GatewayConfig;
use crate::engine::{DecisionEngine, LocalEngine};
use crate::filter::FilterFactory;
use crate::obs::FlowMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    factory: FilterFactory,
    metrics: Arc<FlowMetrics>,
}

impl AppState {
    /// Default callbacks registry and the local engine.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let engine = Arc::new(LocalEngine::from_rules(&cfg.flow_control.rules));
        Self::with_parts(cfg, &CallbacksRegistry::new(), engine)
    }

    /// Explicit registry and engine. Returns Result so callers can surface
    /// config errors instead of panicking.
    pub fn with_parts(
        cfg: GatewayConfig,
        registry: &CallbacksRegistry,
        engine: Arc<dyn DecisionEngine>,
    ) -> Result<Self> {
        cfg.validate()?;

        let fc = &cfg.flow_control;
        let adapter_cfg = Arc::new(AdapterConfig::from(fc));
        if !flowgate_core::resource::ResourceKeySource::is_known_key_type(&fc.limit_key_type) {
            tracing::warn!(
                limit_key_type = %fc.limit_key_type,
                "unknown limit_key_type, falling back to PATH"
            );
        }

        let callbacks = registry.build(&fc.callback_name, adapter_cfg, Arc::new(ProtocolResolver));
        let metrics = Arc::new(FlowMetrics::default());
        let factory = FilterFactory::new(fc, callbacks, engine, Arc::clone(&metrics));

        tracing::info!(
            enabled = fc.global_switch,
            monitor = fc.monitor,
            rules = fc.rules.len(),
            "flow control configured"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, factory, metrics }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn filter_factory(&self) -> &FilterFactory {
        &self.inner.factory
    }

    pub fn metrics(&self) -> &FlowMetrics {
        &self.inner.metrics
    }
}
