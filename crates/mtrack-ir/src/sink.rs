//! Emission interface.
//!
//! A [`CodeSink`] receives the primitive operations the expander composes.
//! Each primitive maps to one or more target instructions; the sink owns slot
//! numbering, label identity and frame bookkeeping.

use crate::insn::{ExternFn, JumpCond};
use crate::types::{Const, Label, Slot, ValueType};
use crate::Result;

/// Receiver of emitted instructions.
pub trait CodeSink {
    /// Push a constant.
    fn push_const(&mut self, value: Const);

    /// Push the value held in `slot`.
    fn load(&mut self, ty: ValueType, slot: Slot);

    /// Pop the stack top into `slot`.
    fn store(&mut self, ty: ValueType, slot: Slot);

    /// Allocate a fresh slot and pop the stack top into it.
    ///
    /// Fails without emitting anything when the slot space is exhausted.
    fn store_new(&mut self, ty: ValueType) -> Result<Slot>;

    /// Duplicate the stack top.
    fn dup(&mut self, ty: ValueType);

    /// Narrow the long on top of the stack to an int.
    fn long_to_int(&mut self);

    /// Subtract the stack top from the value below it.
    fn sub(&mut self, ty: ValueType);

    /// Push the current value of the global level field.
    fn read_level(&mut self, field: &str);

    /// Call a static external function.
    fn invoke(&mut self, func: ExternFn);

    /// Create a new, unplaced label.
    fn new_label(&mut self) -> Label;

    /// Place `label` at the current position.
    fn place_label(&mut self, label: Label);

    /// Jump to `target` when `cond` holds.
    fn jump(&mut self, cond: JumpCond, target: Label);

    /// Synchronize frame state at a placed merge point.
    fn sync_frame(&mut self, label: Label);
}
