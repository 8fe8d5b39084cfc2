//! Assembler fluent API.

use crate::insn::{ExternFn, JumpCond};
use crate::sink::CodeSink;
use crate::types::{Const, Label, Slot, ValueType};
use crate::Result;

/// Chainable wrapper over a [`CodeSink`].
pub struct Assembler<'a, S: CodeSink + ?Sized> {
    sink: &'a mut S,
}

impl<'a, S: CodeSink + ?Sized> Assembler<'a, S> {
    /// Create an assembler writing into `sink`.
    pub const fn new(sink: &'a mut S) -> Self {
        Self { sink }
    }

    /// Access the underlying sink.
    pub fn sink(&mut self) -> &mut S {
        &mut *self.sink
    }

    /// Push a constant.
    pub fn ldc(&mut self, value: impl Into<Const>) -> &mut Self {
        self.sink.push_const(value.into());
        self
    }

    /// Load a slot.
    pub fn load(&mut self, ty: ValueType, slot: Slot) -> &mut Self {
        self.sink.load(ty, slot);
        self
    }

    /// Store into a slot.
    pub fn store(&mut self, ty: ValueType, slot: Slot) -> &mut Self {
        self.sink.store(ty, slot);
        self
    }

    /// Store into `slot` if allocated, otherwise allocate it.
    pub fn store_or_new(&mut self, ty: ValueType, slot: &mut Option<Slot>) -> Result<&mut Self> {
        match *slot {
            Some(existing) => self.sink.store(ty, existing),
            None => *slot = Some(self.sink.store_new(ty)?),
        }
        Ok(self)
    }

    /// Duplicate the stack top.
    pub fn dup(&mut self, ty: ValueType) -> &mut Self {
        self.sink.dup(ty);
        self
    }

    /// Narrow long to int.
    pub fn l2i(&mut self) -> &mut Self {
        self.sink.long_to_int();
        self
    }

    /// Subtract.
    pub fn sub(&mut self, ty: ValueType) -> &mut Self {
        self.sink.sub(ty);
        self
    }

    /// Call a static function.
    pub fn invoke(&mut self, func: ExternFn) -> &mut Self {
        self.sink.invoke(func);
        self
    }

    /// Jump to a label.
    pub fn jump(&mut self, cond: JumpCond, target: Label) -> &mut Self {
        self.sink.jump(cond, target);
        self
    }

    /// Place a label.
    pub fn label(&mut self, label: Label) -> &mut Self {
        self.sink.place_label(label);
        self
    }

    /// Place a label and synchronize frame state there.
    pub fn merge_point(&mut self, label: Label) -> &mut Self {
        self.sink.place_label(label);
        self.sink.sync_frame(label);
        self
    }
}
