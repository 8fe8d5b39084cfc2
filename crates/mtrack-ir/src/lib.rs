//! Instruction IR for injected method-tracking code.
//!
//! This crate knows nothing about sampling or timing. It defines the stack
//! machine instructions the expander composes, the [`CodeSink`] emission
//! interface, and [`InsnBuffer`], a sink that records what was emitted.

mod assembler;
mod buffer;
mod insn;
mod sink;
mod types;

pub use assembler::*;
pub use buffer::*;
pub use insn::*;
pub use sink::*;
pub use types::*;

use thiserror::Error;

/// Emission errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("local slots exhausted: no room for a {ty} slot at index {index}")]
    SlotsExhausted { index: u32, ty: ValueType },
}

pub type Result<T> = std::result::Result<T, EmitError>;
