//! Marker expansion state machine.

mod entry;
mod gate;

use std::sync::Arc;

use mtrack_ir::{Assembler, CodeSink, Const, JumpCond, Slot, ValueType};
use tracing::trace;

use crate::config::ExpandConfig;
use crate::counters::CounterRegistry;
use crate::marker::{Marker, MarkerKind, tags};
use crate::runtime::RuntimeFn;
use crate::state::CodegenState;
use crate::tracking::{SamplerKind, TrackingConfig};
use crate::{ConfigError, Result};

/// Expands method-tracking markers for a single method.
///
/// Holds the accumulated [`TrackingConfig`] and the mutable
/// [`CodegenState`]. One instance per instrumented method; instances share
/// nothing but the counter registry.
pub struct MethodTrackingExpander {
    method_id: u32,
    config: ExpandConfig,
    tracking: TrackingConfig,
    state: CodegenState,
    counters: Arc<dyn CounterRegistry>,
}

impl MethodTrackingExpander {
    /// Create an expander for the method with the given static id.
    pub fn new(method_id: u32, config: ExpandConfig, counters: Arc<dyn CounterRegistry>) -> Self {
        Self {
            method_id,
            config,
            tracking: TrackingConfig::new(),
            state: CodegenState::default(),
            counters,
        }
    }

    pub const fn method_id(&self) -> u32 {
        self.method_id
    }

    pub const fn tracking(&self) -> &TrackingConfig {
        &self.tracking
    }

    pub const fn state(&self) -> &CodegenState {
        &self.state
    }

    /// Fold a marker into the tracking configuration (first pass).
    pub fn record(&mut self, marker: &Marker) -> Result<()> {
        self.tracking.record(marker, self.config.default_mean)
    }

    /// Forget the computed duration, keeping every slot.
    pub fn reset_state(&mut self) {
        self.state.duration_computed = false;
    }

    /// Expand a marker into `sink` (second pass).
    pub fn expand(&mut self, marker: &Marker, sink: &mut dyn CodeSink) -> Result<()> {
        let id = marker.method_id()?.unwrap_or(self.method_id);
        let mid = i32::try_from(id).map_err(|_| ConfigError::InvalidInteger {
            tag: tags::METHOD_ID.to_string(),
            value: id.to_string(),
        })?;
        trace!(marker = %marker.kind(), method_id = mid, "expanding marker");

        match marker.kind() {
            MarkerKind::Entry => self.expand_entry(mid, sink)?,
            MarkerKind::Test => self.expand_test(marker.has_tag(tags::TIMED), mid, sink)?,
            MarkerKind::Else => self.expand_else(sink),
            MarkerKind::Duration => self.expand_duration(sink),
            MarkerKind::Exit => self.expand_exit(mid, sink),
            MarkerKind::Reset => self.state.reset_cycle(),
        }
        Ok(())
    }

    fn expand_entry(&mut self, mid: i32, sink: &mut dyn CodeSink) -> Result<()> {
        let timed = self.tracking.is_timed();
        let sampling = self
            .tracking
            .sampler_mean()
            .get()
            .zip(self.tracking.sampler_kind().hit_fn(timed));
        if let Some((mean, hit)) = sampling {
            // `mid` was checked non-negative.
            self.counters.register_counter(mid.unsigned_abs(), mean);
            if timed {
                self.timing_sampler_entry(mid, hit, sink)
            } else {
                self.sampler_entry(mid, hit, sink)
            }
        } else if timed {
            self.timing_entry(sink)
        } else {
            Ok(())
        }
    }

    fn expand_test(
        &mut self,
        collect_time: bool,
        mid: i32,
        sink: &mut dyn CodeSink,
    ) -> Result<()> {
        let merge = sink.new_label();
        self.state.sampler_label = Some(merge);

        let measure = self.tracking.is_timed() && collect_time;
        let expanded = if self.tracking.is_sampled() {
            self.sampler_test(sink)?;
            if measure {
                self.timing_sampler_test(mid, sink)?;
            }
            true
        } else if measure {
            self.timing_test(sink)?;
            true
        } else {
            false
        };

        if expanded {
            Assembler::new(sink).merge_point(merge);
        }
        self.state.sampler_label = None;
        Ok(())
    }

    /// Branch to a fresh else target when the sample was not hit.
    fn sampler_test(&mut self, sink: &mut dyn CodeSink) -> Result<()> {
        let Some(hit) = self.state.sample_hit else {
            return Ok(());
        };
        let else_label = sink.new_label();
        self.state.else_label = Some(else_label);
        self.level_checks(sink, self.state.sampler_label, GateInit::Nothing)?;
        Assembler::new(sink)
            .load(ValueType::Int, hit)
            .jump(JumpCond::IfZero, else_label);
        Ok(())
    }

    /// Store `getEndTs(mid) - entryTs` as the duration.
    fn timing_sampler_test(&mut self, mid: i32, sink: &mut dyn CodeSink) -> Result<()> {
        if self.state.duration_computed {
            return Ok(());
        }
        let mut asm = Assembler::new(sink);
        match self.state.entry_ts {
            Some(entry_ts) => {
                asm.ldc(mid_const(mid))
                    .invoke(RuntimeFn::GetEndTs.extern_fn())
                    .load(ValueType::Long, entry_ts)
                    .sub(ValueType::Long);
            }
            None => {
                asm.ldc(0_i64);
            }
        }
        asm.store_or_new(ValueType::Long, &mut self.state.duration)?;
        self.state.duration_computed = true;
        Ok(())
    }

    /// Store `nanoTime() - entryTs` as the duration, under the level gate.
    ///
    /// The duration slot is defined before the gate so DURATION reads a zero
    /// on the skipped path.
    fn timing_test(&mut self, sink: &mut dyn CodeSink) -> Result<()> {
        if self.state.duration_computed {
            return Ok(());
        }
        define_zero(&mut self.state.duration, ValueType::Long, sink)?;
        self.level_checks(sink, self.state.sampler_label, GateInit::Nothing)?;
        let mut asm = Assembler::new(sink);
        match self.state.entry_ts {
            Some(entry_ts) => {
                asm.invoke(RuntimeFn::NanoTime.extern_fn())
                    .load(ValueType::Long, entry_ts)
                    .sub(ValueType::Long);
            }
            None => {
                asm.ldc(0_i64);
            }
        }
        asm.store_or_new(ValueType::Long, &mut self.state.duration)?;
        self.state.duration_computed = true;
        Ok(())
    }

    fn expand_else(&mut self, sink: &mut dyn CodeSink) {
        if let Some(else_label) = self.state.else_label.take() {
            Assembler::new(sink).merge_point(else_label);
        }
    }

    fn expand_duration(&self, sink: &mut dyn CodeSink) {
        match (self.state.duration_computed, self.state.duration) {
            (true, Some(duration)) => sink.load(ValueType::Long, duration),
            _ => sink.push_const(Const::Long(0)),
        }
    }

    fn expand_exit(&self, mid: i32, sink: &mut dyn CodeSink) {
        if self.tracking.sampler_kind() != SamplerKind::Adaptive {
            return;
        }
        let Some(hit) = self.state.sample_hit else {
            return;
        };
        let done = sink.new_label();
        Assembler::new(sink)
            .load(ValueType::Int, hit)
            .jump(JumpCond::IfZero, done)
            .ldc(mid_const(mid))
            .invoke(RuntimeFn::UpdateEndTs.extern_fn())
            .merge_point(done);
    }
}

/// Slots a level gate must define before its first branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateInit {
    Nothing,
    EntryTs,
    SampleHit,
    EntryTsAndSampleHit,
}

/// Allocate `slot` holding a zero of `ty` unless it already exists.
fn define_zero(
    slot: &mut Option<Slot>,
    ty: ValueType,
    sink: &mut dyn CodeSink,
) -> Result<()> {
    if slot.is_none() {
        let zero = if ty.is_wide() { Const::Long(0) } else { Const::Int(0) };
        sink.push_const(zero);
        *slot = Some(sink.store_new(ty)?);
    }
    Ok(())
}

/// Method ids travel as int constants.
const fn mid_const(mid: i32) -> Const {
    Const::Int(mid)
}

#[cfg(test)]
mod tests;
