//! Mutable code generation state for one method.

use mtrack_ir::{Label, Slot};

/// Slots and labels materialized while expanding one method.
///
/// Every handle starts unallocated (`None`) and is bound lazily the first
/// time an expansion needs it. A RESET marker starts a new cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodegenState {
    /// Entry timestamp.
    pub(crate) entry_ts: Option<Slot>,
    /// Sample-hit flag.
    pub(crate) sample_hit: Option<Slot>,
    /// Measured duration. Survives RESET and is reused by later cycles.
    pub(crate) duration: Option<Slot>,
    /// Cached global level value.
    pub(crate) level: Option<Slot>,
    /// Duration stored for the current cycle.
    pub(crate) duration_computed: bool,
    /// Not-sampled target of a pending TEST, consumed by ELSE.
    pub(crate) else_label: Option<Label>,
    /// Merge label of the TEST being expanded.
    pub(crate) sampler_label: Option<Label>,
}

impl CodegenState {
    /// Start a fresh entry/measurement cycle.
    pub fn reset_cycle(&mut self) {
        self.entry_ts = None;
        self.sample_hit = None;
        self.level = None;
        self.duration_computed = false;
    }

    pub const fn entry_ts(&self) -> Option<Slot> {
        self.entry_ts
    }

    pub const fn sample_hit(&self) -> Option<Slot> {
        self.sample_hit
    }

    pub const fn duration(&self) -> Option<Slot> {
        self.duration
    }

    pub const fn level(&self) -> Option<Slot> {
        self.level
    }

    pub const fn is_duration_computed(&self) -> bool {
        self.duration_computed
    }

    pub const fn has_pending_else(&self) -> bool {
        self.else_label.is_some()
    }
}
