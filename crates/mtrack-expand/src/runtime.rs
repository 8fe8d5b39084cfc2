//! Counter runtime and clock entry points called by injected code.

use std::fmt;

use mtrack_ir::{ExternFn, ValueType};

/// Owner of the counter runtime entry points.
pub const TRACKER_OWNER: &str = "mtrack/rt/MethodTracker";
/// Owner of the monotonic clock.
pub const CLOCK_OWNER: &str = "java/lang/System";

const METHOD_ID: &[ValueType] = &[ValueType::Int];

/// Runtime function called from injected code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    /// `hit(id) -> bool`: constant-rate sample decision.
    Hit,
    /// `hitAdaptive(id) -> bool`: adaptive sample decision.
    HitAdaptive,
    /// `hitTimed(id) -> long`: constant-rate decision, entry timestamp or 0.
    HitTimed,
    /// `hitTimedAdaptive(id) -> long`: adaptive decision, entry timestamp or 0.
    HitTimedAdaptive,
    /// `getEndTs(id) -> long`: exit timestamp of a sampled invocation.
    GetEndTs,
    /// `updateEndTs(id)`: adaptive sampler exit bookkeeping.
    UpdateEndTs,
    /// `nanoTime() -> long`: monotonic clock.
    NanoTime,
}

impl RuntimeFn {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::HitAdaptive => "hitAdaptive",
            Self::HitTimed => "hitTimed",
            Self::HitTimedAdaptive => "hitTimedAdaptive",
            Self::GetEndTs => "getEndTs",
            Self::UpdateEndTs => "updateEndTs",
            Self::NanoTime => "nanoTime",
        }
    }

    /// Callable descriptor for the emission interface.
    pub const fn extern_fn(self) -> ExternFn {
        match self {
            Self::Hit | Self::HitAdaptive => {
                ExternFn::new(TRACKER_OWNER, self.name(), METHOD_ID, Some(ValueType::Bool))
            }
            Self::HitTimed | Self::HitTimedAdaptive | Self::GetEndTs => {
                ExternFn::new(TRACKER_OWNER, self.name(), METHOD_ID, Some(ValueType::Long))
            }
            Self::UpdateEndTs => ExternFn::new(TRACKER_OWNER, self.name(), METHOD_ID, None),
            Self::NanoTime => ExternFn::new(CLOCK_OWNER, self.name(), &[], Some(ValueType::Long)),
        }
    }
}

impl fmt::Display for RuntimeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extern_fn())
    }
}
