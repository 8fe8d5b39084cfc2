//! Level gate emission.

use mtrack_ir::{Assembler, CodeSink, Const, JumpCond, Label, ValueType};

use super::{GateInit, MethodTrackingExpander, define_zero};
use crate::Result;
use crate::interval::{CheckStep, LevelGate};

impl MethodTrackingExpander {
    /// Emit the branch cascade skipping to `skip` when the current level is
    /// outside every declared interval.
    ///
    /// Returns the skip target, or `None` when the gate always passes and no
    /// code was emitted. A fresh target is created when `skip` is `None`; the
    /// caller places it after the gated code.
    pub(super) fn level_checks(
        &mut self,
        sink: &mut dyn CodeSink,
        skip: Option<Label>,
        init: GateInit,
    ) -> Result<Option<Label>> {
        let LevelGate::Checks(ranges) = LevelGate::plan(self.tracking.level_intervals()) else {
            return Ok(None);
        };

        // Slots read after the gate must hold a value on the skipped path too.
        self.init_gated_slots(init, sink)?;

        let skip = skip.unwrap_or_else(|| sink.new_label());
        for range in ranges {
            let next = sink.new_label();
            for step in range.steps() {
                match step {
                    CheckStep::NextIfBelow(lower) => {
                        self.load_level(sink)?;
                        compare(sink, lower, JumpCond::IfNegative, JumpCond::IfLess, next);
                    }
                    CheckStep::SkipIfAtMost(upper) => {
                        self.load_level(sink)?;
                        compare(
                            sink,
                            upper,
                            JumpCond::IfNonPositive,
                            JumpCond::IfLessOrEqual,
                            skip,
                        );
                    }
                    CheckStep::Skip => sink.jump(JumpCond::Always, skip),
                }
            }
            Assembler::new(sink).merge_point(next);
        }
        Ok(Some(skip))
    }

    fn init_gated_slots(&mut self, init: GateInit, sink: &mut dyn CodeSink) -> Result<()> {
        let state = &mut self.state;
        match init {
            GateInit::Nothing => {}
            GateInit::EntryTs => define_zero(&mut state.entry_ts, ValueType::Long, sink)?,
            GateInit::SampleHit => define_zero(&mut state.sample_hit, ValueType::Int, sink)?,
            GateInit::EntryTsAndSampleHit => {
                define_zero(&mut state.entry_ts, ValueType::Long, sink)?;
                define_zero(&mut state.sample_hit, ValueType::Int, sink)?;
            }
        }
        Ok(())
    }

    /// Push the level value, reading the global field once per cycle.
    fn load_level(&mut self, sink: &mut dyn CodeSink) -> Result<()> {
        match self.state.level {
            Some(slot) => sink.load(ValueType::Int, slot),
            None => {
                sink.read_level(&self.config.level_field);
                sink.dup(ValueType::Int);
                self.state.level = Some(sink.store_new(ValueType::Int)?);
            }
        }
        Ok(())
    }
}

/// Jump to `target` when the level on the stack satisfies `cond` against
/// `bound`, using the single-operand form for zero.
fn compare(
    sink: &mut dyn CodeSink,
    bound: i32,
    zero_cond: JumpCond,
    cmp_cond: JumpCond,
    target: Label,
) {
    if bound == 0 {
        sink.jump(zero_cond, target);
    } else {
        sink.push_const(Const::Int(bound));
        sink.jump(cmp_cond, target);
    }
}
