//! Counter runtime registration.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Handle to the counter runtime.
///
/// Registration happens at code generation time, once a method is known to
/// be sampled. Implementations must make repeated registration of the same
/// method id harmless.
pub trait CounterRegistry: Send + Sync {
    /// Register the sampling counter for `method_id`.
    fn register_counter(&self, method_id: u32, mean: u32);
}

/// In-process counter table keyed by method id.
///
/// The first registration of a method id wins.
#[derive(Debug, Default)]
pub struct MethodCounters {
    counters: RwLock<FxHashMap<u32, u32>>,
}

impl MethodCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered mean for a method id.
    pub fn mean(&self, method_id: u32) -> Option<u32> {
        self.counters.read().get(&method_id).copied()
    }

    pub fn len(&self) -> usize {
        self.counters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.read().is_empty()
    }

    /// Registered counters sorted by method id.
    pub fn snapshot(&self) -> Vec<(u32, u32)> {
        let mut counters: Vec<(u32, u32)> = self
            .counters
            .read()
            .iter()
            .map(|(&id, &mean)| (id, mean))
            .collect();
        counters.sort_unstable();
        counters
    }
}

impl CounterRegistry for MethodCounters {
    fn register_counter(&self, method_id: u32, mean: u32) {
        let mut counters = self.counters.write();
        if !counters.contains_key(&method_id) {
            trace!(method_id, mean, "registering counter");
            counters.insert(method_id, mean);
        }
    }
}
