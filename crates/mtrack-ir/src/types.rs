//! Value types and handles.

use std::fmt;

/// Type of a value on the operand stack or in a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// Boolean, carried as an int.
    Bool,
}

impl ValueType {
    /// Descriptor character (`I`, `J`, `Z`).
    pub const fn descriptor(self) -> char {
        match self {
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Bool => 'Z',
        }
    }

    /// Number of consecutive slots a value of this type occupies.
    pub const fn slot_width(self) -> u16 {
        match self {
            Self::Long => 2,
            Self::Int | Self::Bool => 1,
        }
    }

    /// Check if this is a two-slot type.
    pub const fn is_wide(self) -> bool {
        self.slot_width() == 2
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Local storage slot handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(pub u16);

impl Slot {
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Branch target handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Constant pushed onto the operand stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Const {
    Int(i32),
    Long(i64),
}

impl Const {
    /// Type of the pushed value.
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Long(_) => ValueType::Long,
        }
    }

    /// Check if this constant is a zero of either width.
    pub const fn is_zero(self) -> bool {
        matches!(self, Self::Int(0) | Self::Long(0))
    }
}

impl From<i32> for Const {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Const {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
        }
    }
}
