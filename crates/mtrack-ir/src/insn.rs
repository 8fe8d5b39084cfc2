//! Instruction IR.

use std::fmt;

use crate::types::{Const, Label, Slot, ValueType};

/// Jump condition.
///
/// Single-operand conditions pop one int and compare it against zero.
/// `IfLess` and `IfLessOrEqual` pop two ints `a, b` and compare `a` to `b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JumpCond {
    /// Unconditional.
    Always,
    /// `v == 0`
    IfZero,
    /// `v < 0`
    IfNegative,
    /// `v <= 0`
    IfNonPositive,
    /// `a < b`
    IfLess,
    /// `a <= b`
    IfLessOrEqual,
}

impl JumpCond {
    /// Number of stack operands consumed by the jump.
    pub const fn operands(self) -> usize {
        match self {
            Self::Always => 0,
            Self::IfZero | Self::IfNegative | Self::IfNonPositive => 1,
            Self::IfLess | Self::IfLessOrEqual => 2,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Always => "goto",
            Self::IfZero => "ifeq",
            Self::IfNegative => "iflt",
            Self::IfNonPositive => "ifle",
            Self::IfLess => "if_icmplt",
            Self::IfLessOrEqual => "if_icmple",
        }
    }
}

/// Static external function, called by symbolic name and signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExternFn {
    /// Owning type, slash separated.
    pub owner: &'static str,
    /// Function name.
    pub name: &'static str,
    /// Parameter types.
    pub params: &'static [ValueType],
    /// Return type (`None` for void).
    pub ret: Option<ValueType>,
}

impl ExternFn {
    /// Create a new function descriptor.
    pub const fn new(
        owner: &'static str,
        name: &'static str,
        params: &'static [ValueType],
        ret: Option<ValueType>,
    ) -> Self {
        Self {
            owner,
            name,
            params,
            ret,
        }
    }

    /// Render the signature descriptor, e.g. `(I)J`.
    pub fn descriptor(&self) -> String {
        let mut out = String::with_capacity(self.params.len() + 3);
        out.push('(');
        out.extend(self.params.iter().map(|p| p.descriptor()));
        out.push(')');
        out.push(self.ret.map_or('V', ValueType::descriptor));
        out
    }
}

impl fmt::Display for ExternFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor())
    }
}

/// A single emitted instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Insn {
    /// Push a constant.
    Push(Const),
    /// Push the value of a slot.
    Load { ty: ValueType, slot: Slot },
    /// Pop into a slot.
    Store { ty: ValueType, slot: Slot },
    /// Duplicate the stack top (two words for wide types).
    Dup(ValueType),
    /// Narrow a long to an int.
    LongToInt,
    /// Pop two values, push their difference.
    Sub(ValueType),
    /// Push the current global level value.
    ReadLevel { field: String },
    /// Call a static external function.
    Invoke(ExternFn),
    /// Jump to a label.
    Jump { cond: JumpCond, target: Label },
    /// Place a label at this point.
    Label(Label),
    /// Frame synchronization at a merge point.
    Frame(Label),
}

impl Insn {
    /// Check if this instruction calls the named function.
    pub fn calls(&self, name: &str) -> bool {
        matches!(self, Self::Invoke(f) if f.name == name)
    }

    /// Get the jump target, if this is a jump.
    pub const fn jump_target(&self) -> Option<Label> {
        match self {
            Self::Jump { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Check if this is a conditional jump.
    pub const fn is_conditional_jump(&self) -> bool {
        matches!(self, Self::Jump { cond, .. } if !matches!(cond, JumpCond::Always))
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(c) => write!(f, "    push {c}"),
            Self::Load { ty, slot } => write!(f, "    load.{ty} {slot}"),
            Self::Store { ty, slot } => write!(f, "    store.{ty} {slot}"),
            Self::Dup(ty) => {
                if ty.is_wide() {
                    f.write_str("    dup2")
                } else {
                    f.write_str("    dup")
                }
            }
            Self::LongToInt => f.write_str("    l2i"),
            Self::Sub(ty) => write!(f, "    sub.{ty}"),
            Self::ReadLevel { field } => write!(f, "    level {field}"),
            Self::Invoke(func) => write!(f, "    invoke {func}"),
            Self::Jump { cond, target } => write!(f, "    {} {target}", cond.mnemonic()),
            Self::Label(label) => write!(f, "{label}:"),
            Self::Frame(label) => write!(f, "    ; frame {label}"),
        }
    }
}
