//! Decision engine seam.
//!
//! The stream filter asks an engine for a verdict on a resource. A pass
//! verdict carries an [`EntryHandle`] that must be released when the request
//! ends so engine-side counters (e.g. in-flight permits) stay correct.

pub mod local;

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use flowgate_core::error::Result;
use flowgate_core::resource::ResourceDescriptor;

pub use local::LocalEngine;

/// Admission engine consulted once per request.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn entry(&self, resource: &ResourceDescriptor) -> Result<Verdict>;
}

/// Engine outcome for one admission check.
#[derive(Debug)]
pub enum Verdict {
    Pass(EntryHandle),
    Blocked(BlockReason),
}

/// Why a resource was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    Qps { limit: u32 },
    Concurrency { limit: u32 },
    Other(String),
}

impl BlockReason {
    pub fn as_str(&self) -> &str {
        match self {
            BlockReason::Qps { .. } => "qps",
            BlockReason::Concurrency { .. } => "concurrency",
            BlockReason::Other(s) => s,
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::Qps { limit } => write!(f, "qps limit {limit} exceeded"),
            BlockReason::Concurrency { limit } => write!(f, "concurrency limit {limit} exceeded"),
            BlockReason::Other(s) => f.write_str(s),
        }
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Admitted entry. Released exactly once, by [`EntryHandle::exit`] or on drop.
pub struct EntryHandle {
    resource: String,
    started: Instant,
    release: Option<Release>,
}

impl EntryHandle {
    /// Entry with nothing to give back.
    pub fn noop(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            started: Instant::now(),
            release: None,
        }
    }

    pub fn with_release(resource: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            resource: resource.into(),
            started: Instant::now(),
            release: Some(Box::new(release)),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn exit(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for EntryHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryHandle")
            .field("resource", &self.resource)
            .field("releasable", &self.release.is_some())
            .finish()
    }
}
