//! Injection markers and their configuration tags.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::tracking::SamplerKind;
use crate::{ConfigError, Result};

/// Recognized tag names.
pub mod tags {
    /// Presence flag enabling timing.
    pub const TIMED: &str = "timed";
    /// Sampler kind (`Const` or `Adaptive`).
    pub const SAMPLER: &str = "sampler";
    /// Mean number of hits between samples.
    pub const MEAN: &str = "mean";
    /// Explicit method id override.
    pub const METHOD_ID: &str = "methodid";
    /// Level match expression.
    pub const LEVEL: &str = "level";
}

/// Injection point kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// Method entry: capture timestamp and/or decide the sample.
    Entry,
    /// Branch on the sample decision and/or compute the duration.
    Test,
    /// Jump target for the not-sampled path of a preceding test.
    Else,
    /// Push the measured duration.
    Duration,
    /// Method exit bookkeeping for adaptive sampling.
    Exit,
    /// Start a fresh entry/measurement cycle.
    Reset,
}

impl MarkerKind {
    pub const ALL: [Self; 6] = [
        Self::Entry,
        Self::Test,
        Self::Else,
        Self::Duration,
        Self::Exit,
        Self::Reset,
    ];

    /// Short name used in marker scripts.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Test => "test",
            Self::Else => "else",
            Self::Duration => "duration",
            Self::Exit => "exit",
            Self::Reset => "reset",
        }
    }

    /// Template name the marker is spliced in as.
    pub const fn template_name(self) -> &'static str {
        match self {
            Self::Entry => "mc$entry",
            Self::Test => "mc$test",
            Self::Else => "mc$else",
            Self::Duration => "mc$dur",
            Self::Exit => "mc$exit",
            Self::Reset => "mc$reset",
        }
    }

    /// Effective signature of the spliced code.
    pub const fn descriptor(self) -> &'static str {
        match self {
            Self::Duration => "()J",
            _ => "()V",
        }
    }
}

impl FromStr for MarkerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s || k.template_name() == s)
            .ok_or_else(|| format!("unknown marker: {s}"))
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An injection point with its configuration tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    kind: MarkerKind,
    tags: FxHashMap<String, String>,
}

impl Marker {
    /// Create a marker without tags.
    pub fn new(kind: MarkerKind) -> Self {
        Self {
            kind,
            tags: FxHashMap::default(),
        }
    }

    pub fn entry() -> Self {
        Self::new(MarkerKind::Entry)
    }

    pub fn test() -> Self {
        Self::new(MarkerKind::Test)
    }

    pub fn else_branch() -> Self {
        Self::new(MarkerKind::Else)
    }

    pub fn duration() -> Self {
        Self::new(MarkerKind::Duration)
    }

    pub fn exit() -> Self {
        Self::new(MarkerKind::Exit)
    }

    pub fn reset() -> Self {
        Self::new(MarkerKind::Reset)
    }

    /// Add a `key=value` tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a presence tag.
    #[must_use]
    pub fn with_flag(self, key: impl Into<String>) -> Self {
        self.with_tag(key, "")
    }

    /// Add the `timed` flag.
    #[must_use]
    pub fn timed(self) -> Self {
        self.with_flag(tags::TIMED)
    }

    /// Select a sampler and optionally its mean.
    #[must_use]
    pub fn sampled(self, sampler: SamplerKind, mean: Option<u32>) -> Self {
        let marker = self.with_tag(tags::SAMPLER, sampler.name());
        match mean {
            Some(mean) => marker.with_tag(tags::MEAN, mean.to_string()),
            None => marker,
        }
    }

    /// Add a level expression.
    #[must_use]
    pub fn level(self, expr: impl Into<String>) -> Self {
        self.with_tag(tags::LEVEL, expr)
    }

    /// Override the method id.
    #[must_use]
    pub fn method_id_override(self, id: u32) -> Self {
        self.with_tag(tags::METHOD_ID, id.to_string())
    }

    pub const fn kind(&self) -> MarkerKind {
        self.kind
    }

    /// Value of a tag, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub const fn tags(&self) -> &FxHashMap<String, String> {
        &self.tags
    }

    /// Method id override from the `methodid` tag.
    pub fn method_id(&self) -> Result<Option<u32>> {
        self.tag(tags::METHOD_ID).map(parse_method_id).transpose()
    }
}

/// Parse a method id. Injected code passes ids as int constants, so the id
/// must be a non-negative `i32`.
pub fn parse_method_id(raw: &str) -> Result<u32> {
    let id: i32 = parse_int(tags::METHOD_ID, raw)?;
    u32::try_from(id).map_err(|_| ConfigError::InvalidInteger {
        tag: tags::METHOD_ID.to_string(),
        value: raw.to_string(),
    })
}

/// Parse an integer tag value.
pub(crate) fn parse_int<T: FromStr>(tag: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidInteger {
            tag: tag.to_string(),
            value: raw.to_string(),
        })
}
