//! Template expansion engine for method tracking.
//!
//! Turns abstract injection markers (entry, test, else, duration, exit,
//! reset) into instruction sequences that time a method, sample it through
//! the counter runtime and gate both behind the global level value.
//!
//! A method is processed in two passes: every ENTRY marker is first folded
//! into a [`TrackingConfig`] with [`MethodTrackingExpander::record`], then
//! each marker is expanded in body order with
//! [`MethodTrackingExpander::expand`].

mod config;
mod counters;
mod expander;
mod interval;
mod marker;
mod runtime;
mod state;
mod tracking;

pub use config::*;
pub use counters::*;
pub use expander::*;
pub use interval::*;
pub use marker::*;
pub use runtime::*;
pub use state::*;
pub use tracking::*;

use thiserror::Error;

/// Malformed marker configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid integer for tag `{tag}`: {value:?}")]
    InvalidInteger { tag: String, value: String },
    #[error("sampling mean must be positive, got {0}")]
    InvalidMean(i64),
    #[error("unknown sampler: {0:?}")]
    UnknownSampler(String),
    #[error("invalid level expression: {0:?}")]
    InvalidLevel(String),
    #[error(transparent)]
    Emit(#[from] mtrack_ir::EmitError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
