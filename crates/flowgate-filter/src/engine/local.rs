//! In-process decision engine.
//!
//! Rules are keyed by resource name. A resource without a rule always
//! passes. Per rule:
//! - `qps` + `burst`: shared token bucket, one permit per batch unit.
//! - `max_concurrency`: in-flight counter released by the entry handle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use flowgate_core::error::{FlowGateError, Result};
use flowgate_core::resource::ResourceDescriptor;

use super::{BlockReason, DecisionEngine, EntryHandle, Verdict};
use crate::config::RuleConfig;

#[derive(Default)]
pub struct LocalEngine {
    rules: DashMap<String, Arc<ResourceRule>>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
        }
    }

    pub fn from_rules(rules: &[RuleConfig]) -> Self {
        let engine = Self::new();
        engine.load_rules(rules);
        engine
    }

    /// Replace the whole rule set. Entries admitted under old rules still
    /// release into their own counters.
    pub fn load_rules(&self, rules: &[RuleConfig]) {
        self.rules.clear();
        for r in rules {
            self.rules
                .insert(r.resource.clone(), Arc::new(ResourceRule::new(r)));
        }
        tracing::info!(rules = rules.len(), "flow rules loaded");
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Entries currently admitted for `resource` (0 without a concurrency rule).
    pub fn in_flight(&self, resource: &str) -> u32 {
        self.rules
            .get(resource)
            .map(|r| r.in_flight.load(Ordering::Acquire))
            .unwrap_or(0)
    }
}

#[async_trait]
impl DecisionEngine for LocalEngine {
    async fn entry(&self, resource: &ResourceDescriptor) -> Result<Verdict> {
        let rule = match self.rules.get(resource.name()) {
            Some(r) => Arc::clone(r.value()),
            None => return Ok(Verdict::Pass(EntryHandle::noop(resource.name()))),
        };
        rule.entry(resource)
    }
}

struct ResourceRule {
    bucket: Option<Mutex<TokenBucket>>,
    qps: u32,
    max_concurrency: Option<u32>,
    in_flight: Arc<AtomicU32>,
}

impl ResourceRule {
    fn new(cfg: &RuleConfig) -> Self {
        let bucket = cfg.qps.map(|qps| {
            let burst = cfg.burst.unwrap_or(qps);
            Mutex::new(TokenBucket::new(qps, burst))
        });
        Self {
            bucket,
            qps: cfg.qps.unwrap_or(0),
            max_concurrency: cfg.max_concurrency,
            in_flight: Arc::new(AtomicU32::new(0)),
        }
    }

    fn entry(&self, resource: &ResourceDescriptor) -> Result<Verdict> {
        if let Some(limit) = self.max_concurrency {
            let acquired = self
                .in_flight
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < limit).then_some(n + 1)
                })
                .is_ok();
            if !acquired {
                return Ok(Verdict::Blocked(BlockReason::Concurrency { limit }));
            }
        }

        if let Some(bucket) = &self.bucket {
            let allowed = match bucket.lock() {
                Ok(mut b) => b.allow(resource.batch_count()),
                Err(_) => {
                    self.rollback_concurrency();
                    return Err(FlowGateError::Internal("token bucket poisoned".into()));
                }
            };
            if !allowed {
                self.rollback_concurrency();
                return Ok(Verdict::Blocked(BlockReason::Qps { limit: self.qps }));
            }
        }

        if self.max_concurrency.is_none() {
            return Ok(Verdict::Pass(EntryHandle::noop(resource.name())));
        }
        let in_flight = Arc::clone(&self.in_flight);
        Ok(Verdict::Pass(EntryHandle::with_release(resource.name(), move || {
            in_flight.fetch_sub(1, Ordering::AcqRel);
        })))
    }

    fn rollback_concurrency(&self) {
        if self.max_concurrency.is_some() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

const MICROS_PER_SEC: u128 = 1_000_000;

/// Token bucket refilled at `rps` tokens per second. Refill only consumes
/// the time that produced whole tokens, so fractional progress carries over
/// to the next call. Whole tokens beyond `capacity` are discarded.
#[derive(Debug)]
struct TokenBucket {
    rps: u32,
    capacity: u32,
    tokens: u32,
    last: Instant,
}

impl TokenBucket {
    fn new(rps: u32, burst: u32) -> Self {
        Self::new_at(rps, burst, Instant::now())
    }

    fn new_at(rps: u32, burst: u32, now: Instant) -> Self {
        let rps = rps.max(1);
        let capacity = burst.max(1);
        Self {
            rps,
            capacity,
            tokens: capacity,
            last: now,
        }
    }

    fn allow(&mut self, permits: u32) -> bool {
        self.allow_at(permits, Instant::now())
    }

    fn allow_at(&mut self, permits: u32, now: Instant) -> bool {
        self.refill(now);

        if self.tokens < permits {
            return false;
        }
        self.tokens -= permits;
        true
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_micros();
        let rps = u128::from(self.rps);
        let add = elapsed.saturating_mul(rps) / MICROS_PER_SEC;
        if add == 0 {
            return;
        }

        let whole = u32::try_from(add).unwrap_or(u32::MAX);
        self.tokens = self.tokens.saturating_add(whole).min(self.capacity);

        // Round up so the carried remainder never exceeds what was elapsed.
        let spent = add.saturating_mul(MICROS_PER_SEC).div_ceil(rps);
        self.last += Duration::from_micros(u64::try_from(spent).unwrap_or(u64::MAX));
    }
}
