//! Callbacks registry: selects an adapter implementation by configured name.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::Span;

use flowgate_core::protocol::VariableResolver;

use super::{AdapterConfig, DefaultCallbacks, SharedCallbacks};

/// Builds one callbacks implementation for a filter chain.
pub trait CallbacksFactory: Send + Sync {
    fn name(&self) -> &'static str;
    fn create(
        &self,
        config: Arc<AdapterConfig>,
        resolver: Arc<dyn VariableResolver>,
        span: Span,
    ) -> SharedCallbacks;
}

/// Name -> factory table. Owned by whoever builds filter chains.
#[derive(Default)]
pub struct CallbacksRegistry {
    factories: DashMap<&'static str, Arc<dyn CallbacksFactory>>,
}

impl CallbacksRegistry {
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Register a factory; a later registration under the same name wins.
    pub fn register(&self, factory: Arc<dyn CallbacksFactory>) {
        if self.factories.insert(factory.name(), factory).is_some() {
            tracing::warn!("callbacks factory replaced");
        }
    }

    pub fn registered_names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|e| *e.key()).collect()
    }

    /// Build and initialize the callbacks registered as `name`. An empty or
    /// unknown name yields [`DefaultCallbacks`].
    pub fn build(
        &self,
        name: &str,
        config: Arc<AdapterConfig>,
        resolver: Arc<dyn VariableResolver>,
    ) -> SharedCallbacks {
        let factory = if name.is_empty() {
            None
        } else {
            let found = self.factories.get(name).map(|e| Arc::clone(e.value()));
            if found.is_none() {
                tracing::warn!(callback_name = %name, "unknown callbacks, using default");
            }
            found
        };

        let callbacks: SharedCallbacks = match factory {
            Some(f) => {
                let span = tracing::info_span!("flow_control", callbacks = f.name());
                f.create(config, resolver, span)
            }
            None => {
                let span = tracing::info_span!("flow_control", callbacks = "default");
                Arc::new(DefaultCallbacks::new(config, resolver, span))
            }
        };
        callbacks.init();
        callbacks
    }
}
