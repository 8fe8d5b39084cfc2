//! Per-method tracking configuration accumulated from ENTRY markers.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::interval::Interval;
use crate::marker::{Marker, MarkerKind, parse_int, tags};
use crate::runtime::RuntimeFn;
use crate::{ConfigError, Result};

/// Sampler policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// No sampling.
    #[default]
    None,
    /// Fixed-rate sampling.
    Const,
    /// Runtime-adjusted sampling.
    Adaptive,
}

impl SamplerKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Const => "Const",
            Self::Adaptive => "Adaptive",
        }
    }

    /// Runtime entry point deciding the sample at method entry.
    ///
    /// The timed variants return the entry timestamp when sampled and zero
    /// otherwise.
    pub const fn hit_fn(self, timed: bool) -> Option<RuntimeFn> {
        match (self, timed) {
            (Self::None, _) => None,
            (Self::Const, false) => Some(RuntimeFn::Hit),
            (Self::Const, true) => Some(RuntimeFn::HitTimed),
            (Self::Adaptive, false) => Some(RuntimeFn::HitAdaptive),
            (Self::Adaptive, true) => Some(RuntimeFn::HitTimedAdaptive),
        }
    }
}

impl FromStr for SamplerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "None" => Ok(Self::None),
            "Const" => Ok(Self::Const),
            "Adaptive" => Ok(Self::Adaptive),
            other => Err(ConfigError::UnknownSampler(other.to_string())),
        }
    }
}

impl fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Effective sampling mean.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SamplerMean {
    /// No sampled declaration recorded yet.
    #[default]
    Unset,
    /// Pinned off by an un-sampled declaration.
    Disabled,
    /// Smallest mean requested so far.
    Mean(u32),
}

impl SamplerMean {
    /// Numeric encoding: `-1` unset, `0` disabled, otherwise the mean.
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Unset => -1,
            Self::Disabled => 0,
            Self::Mean(mean) => i64::from(mean),
        }
    }

    /// The mean, if sampling is enabled.
    pub const fn get(self) -> Option<u32> {
        match self {
            Self::Mean(mean) => Some(mean),
            Self::Unset | Self::Disabled => None,
        }
    }

    /// Fold a requested mean: the first request sets it, later ones take the
    /// minimum. A disabled mean stays disabled.
    #[must_use]
    pub fn fold(self, requested: u32) -> Self {
        match self {
            Self::Unset => Self::Mean(requested),
            Self::Mean(current) => Self::Mean(current.min(requested)),
            Self::Disabled => Self::Disabled,
        }
    }
}

/// Configuration accumulated from every ENTRY declaration of one method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackingConfig {
    timed: bool,
    sampler_kind: SamplerKind,
    sampler_mean: SamplerMean,
    level_intervals: Vec<Interval>,
}

impl TrackingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one marker into the configuration.
    ///
    /// Non-ENTRY markers are ignored. Tag values are validated before any
    /// state changes, so a failed record leaves the configuration untouched.
    pub fn record(&mut self, marker: &Marker, default_mean: u32) -> Result<()> {
        if marker.kind() != MarkerKind::Entry {
            return Ok(());
        }

        let level = marker
            .tag(tags::LEVEL)
            .filter(|expr| !expr.is_empty())
            .map(str::parse::<Interval>)
            .transpose()?;
        let sampler = marker
            .tag(tags::SAMPLER)
            .map(str::parse::<SamplerKind>)
            .transpose()?
            .filter(|kind| *kind != SamplerKind::None);
        let mean = marker
            .tag(tags::MEAN)
            .map(parse_mean)
            .transpose()?;

        self.timed = marker.has_tag(tags::TIMED);
        if let Some(level) = level {
            self.level_intervals.push(level);
        }

        match sampler {
            Some(kind) => {
                if self.sampler_mean != SamplerMean::Disabled {
                    // Const has the highest precedence once selected.
                    if self.sampler_kind != SamplerKind::Const {
                        self.sampler_kind = kind;
                    }
                    self.sampler_mean = self.sampler_mean.fold(mean.unwrap_or(default_mean));
                }
            }
            // An un-sampled declaration turns sampling off for every other
            // declaration on the method.
            None => self.sampler_mean = SamplerMean::Disabled,
        }

        debug!(
            timed = self.timed,
            sampler = %self.sampler_kind,
            mean = self.sampler_mean.as_raw(),
            levels = self.level_intervals.len(),
            "recorded entry declaration"
        );
        Ok(())
    }

    pub const fn is_timed(&self) -> bool {
        self.timed
    }

    pub const fn is_sampled(&self) -> bool {
        matches!(self.sampler_mean, SamplerMean::Mean(_))
    }

    pub const fn sampler_kind(&self) -> SamplerKind {
        self.sampler_kind
    }

    pub const fn sampler_mean(&self) -> SamplerMean {
        self.sampler_mean
    }

    /// Level intervals in declaration order.
    pub fn level_intervals(&self) -> &[Interval] {
        &self.level_intervals
    }
}

fn parse_mean(raw: &str) -> Result<u32> {
    let mean: i64 = parse_int(tags::MEAN, raw)?;
    u32::try_from(mean)
        .ok()
        .filter(|m| *m > 0)
        .ok_or(ConfigError::InvalidMean(mean))
}
