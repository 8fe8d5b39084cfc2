//! ENTRY expansion variants.
//!
//! Each variant emits its runtime call only while the slot it fills is still
//! unallocated in the current cycle, so several ENTRY expansions in one cycle
//! produce the call once.

use mtrack_ir::{Assembler, CodeSink, ValueType};

use super::{GateInit, MethodTrackingExpander, define_zero, mid_const};
use crate::Result;
use crate::runtime::RuntimeFn;

impl MethodTrackingExpander {
    /// Sampled and timed: `hitTimed*` yields the entry timestamp (or zero
    /// when not sampled), which also serves as the sample-hit flag.
    pub(super) fn timing_sampler_entry(
        &mut self,
        mid: i32,
        hit: RuntimeFn,
        sink: &mut dyn CodeSink,
    ) -> Result<()> {
        define_zero(&mut self.state.duration, ValueType::Long, sink)?;

        if self.state.sample_hit.is_some() || self.state.entry_ts.is_some() {
            return Ok(());
        }
        let skip = self.level_checks(sink, None, GateInit::EntryTsAndSampleHit)?;
        let mut asm = Assembler::new(sink);
        asm.ldc(mid_const(mid))
            .invoke(hit.extern_fn())
            .dup(ValueType::Long)
            .store_or_new(ValueType::Long, &mut self.state.entry_ts)?
            .l2i()
            .store_or_new(ValueType::Int, &mut self.state.sample_hit)?;
        if let Some(skip) = skip {
            asm.merge_point(skip);
        }
        Ok(())
    }

    /// Sampled only: store the `hit*` decision.
    pub(super) fn sampler_entry(
        &mut self,
        mid: i32,
        hit: RuntimeFn,
        sink: &mut dyn CodeSink,
    ) -> Result<()> {
        if self.state.sample_hit.is_some() {
            return Ok(());
        }
        let skip = self.level_checks(sink, None, GateInit::SampleHit)?;
        let mut asm = Assembler::new(sink);
        asm.ldc(mid_const(mid))
            .invoke(hit.extern_fn())
            .store_or_new(ValueType::Int, &mut self.state.sample_hit)?;
        if let Some(skip) = skip {
            asm.merge_point(skip);
        }
        Ok(())
    }

    /// Timed only: capture the clock.
    pub(super) fn timing_entry(&mut self, sink: &mut dyn CodeSink) -> Result<()> {
        if self.state.entry_ts.is_some() {
            return Ok(());
        }
        define_zero(&mut self.state.duration, ValueType::Long, sink)?;

        let skip = self.level_checks(sink, None, GateInit::EntryTs)?;
        let mut asm = Assembler::new(sink);
        asm.invoke(RuntimeFn::NanoTime.extern_fn())
            .store_or_new(ValueType::Long, &mut self.state.entry_ts)?;
        if let Some(skip) = skip {
            asm.merge_point(skip);
        }
        Ok(())
    }
}
