//! Recording code sink.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::insn::{ExternFn, Insn, JumpCond};
use crate::sink::CodeSink;
use crate::types::{Const, Label, Slot, ValueType};
use crate::{EmitError, Result};

/// Size of the local slot space; a slot index must fit in `u16`.
const SLOT_SPACE: u32 = 1 << 16;

/// Buffer configuration.
#[derive(Clone, Debug, Default)]
pub struct BufferConfig {
    /// First free local slot (slots below are owned by the original method).
    pub first_slot: u16,
}

impl BufferConfig {
    /// Set the first free slot.
    #[must_use]
    pub const fn with_first_slot(mut self, first_slot: u16) -> Self {
        self.first_slot = first_slot;
        self
    }
}

/// Code sink that records emitted instructions.
#[derive(Clone, Debug, Default)]
pub struct InsnBuffer {
    insns: Vec<Insn>,
    next_slot: u32,
    slots: Vec<(Slot, ValueType)>,
    next_label: u32,
    /// Label to instruction index map.
    labels: FxHashMap<Label, usize>,
}

impl InsnBuffer {
    /// Create an empty buffer.
    pub fn new(config: &BufferConfig) -> Self {
        Self {
            next_slot: u32::from(config.first_slot),
            ..Self::default()
        }
    }

    /// Recorded instructions.
    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    /// Consume the buffer, returning its instructions.
    pub fn into_insns(self) -> Vec<Insn> {
        self.insns
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// Number of calls to the named function.
    pub fn count_calls(&self, name: &str) -> usize {
        self.insns.iter().filter(|i| i.calls(name)).count()
    }

    /// Number of slots handed out by `store_new`.
    pub fn slots_allocated(&self) -> usize {
        self.slots.len()
    }

    /// Slots handed out by `store_new`, in allocation order.
    pub fn allocated_slots(&self) -> &[(Slot, ValueType)] {
        &self.slots
    }

    /// Type a slot was allocated with.
    pub fn slot_type(&self, slot: Slot) -> Option<ValueType> {
        self.slots
            .iter()
            .find_map(|&(s, ty)| (s == slot).then_some(ty))
    }

    /// Instruction index a label was placed at.
    pub fn label_position(&self, label: Label) -> Option<usize> {
        self.labels.get(&label).copied()
    }

    /// Labels that are jumped to but never placed.
    pub fn dangling_labels(&self) -> Vec<Label> {
        let mut dangling: Vec<Label> = self
            .insns
            .iter()
            .filter_map(Insn::jump_target)
            .filter(|l| !self.labels.contains_key(l))
            .collect();
        dangling.sort_unstable();
        dangling.dedup();
        dangling
    }

    fn push(&mut self, insn: Insn) {
        self.insns.push(insn);
    }
}

impl CodeSink for InsnBuffer {
    fn push_const(&mut self, value: Const) {
        self.push(Insn::Push(value));
    }

    fn load(&mut self, ty: ValueType, slot: Slot) {
        self.push(Insn::Load { ty, slot });
    }

    fn store(&mut self, ty: ValueType, slot: Slot) {
        self.push(Insn::Store { ty, slot });
    }

    fn store_new(&mut self, ty: ValueType) -> Result<Slot> {
        let end = self.next_slot + u32::from(ty.slot_width());
        let index = u16::try_from(self.next_slot)
            .ok()
            .filter(|_| end <= SLOT_SPACE)
            .ok_or(EmitError::SlotsExhausted {
                index: self.next_slot,
                ty,
            })?;
        let slot = Slot(index);
        self.next_slot = end;
        self.slots.push((slot, ty));
        self.push(Insn::Store { ty, slot });
        Ok(slot)
    }

    fn dup(&mut self, ty: ValueType) {
        self.push(Insn::Dup(ty));
    }

    fn long_to_int(&mut self) {
        self.push(Insn::LongToInt);
    }

    fn sub(&mut self, ty: ValueType) {
        self.push(Insn::Sub(ty));
    }

    fn read_level(&mut self, field: &str) {
        self.push(Insn::ReadLevel {
            field: field.to_string(),
        });
    }

    fn invoke(&mut self, func: ExternFn) {
        self.push(Insn::Invoke(func));
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn place_label(&mut self, label: Label) {
        self.labels.insert(label, self.insns.len());
        self.push(Insn::Label(label));
    }

    fn jump(&mut self, cond: JumpCond, target: Label) {
        self.push(Insn::Jump { cond, target });
    }

    fn sync_frame(&mut self, label: Label) {
        self.push(Insn::Frame(label));
    }
}

impl fmt::Display for InsnBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for insn in &self.insns {
            writeln!(f, "{insn}")?;
        }
        Ok(())
    }
}
