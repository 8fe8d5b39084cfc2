//! mtrack - method-tracking instrumentor
//!
//! Expands the tracking markers of method bodies into the instruction
//! sequences that time them, sample them and gate both on the global level.
//!
//! # Example
//!
//! ```ignore
//! use mtrack::{Instrumentor, InstrumentConfig, parse_script};
//!
//! let methods = parse_script("method run 1\n  entry timed\n  test timed\n  duration\n")?;
//! let instrumentor = Instrumentor::new(InstrumentConfig::default());
//! for method in instrumentor.instrument_all(&methods)? {
//!     println!("{method}");
//! }
//! ```

// Re-export from sub-crates
pub use mtrack_expand::{
    CheckStep, ConfigError, CounterRegistry, ExpandConfig, Interval, LevelGate, Marker,
    MarkerKind, MethodCounters, MethodTrackingExpander, SamplerKind, SamplerMean, SkipRange,
    TrackingConfig, tags, DEFAULT_MEAN, parse_method_id,
};
pub use mtrack_ir::{BufferConfig, CodeSink, EmitError, Insn, InsnBuffer, Label, Slot, ValueType};

mod error;
mod instrument;
mod script;

pub use error::{Error, Result};
pub use instrument::*;
pub use script::*;
