//! Level interval algebra.
//!
//! Level gates are declared as the set of levels at which tracking code runs. Code
//! generation wants the opposite shape: the ranges at which execution should
//! branch to the skip target. [`Interval::invert`] computes that complement and
//! [`LevelGate::plan`] turns it into a compare-and-branch cascade.

use std::fmt;
use std::str::FromStr;

use crate::{ConfigError, Result};

/// Closed range `[a, b]` of level values.
///
/// `a == i32::MIN` or `b == i32::MAX` mean unbounded on that side. An
/// interval with `a > b` matches nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    a: i32,
    b: i32,
}

impl Interval {
    pub const MIN: i32 = i32::MIN;
    pub const MAX: i32 = i32::MAX;

    pub const fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Every level.
    pub const fn all() -> Self {
        Self::new(Self::MIN, Self::MAX)
    }

    /// No level.
    pub const fn none() -> Self {
        Self::new(Self::MAX, Self::MIN)
    }

    /// Exactly `v`.
    pub const fn exact(v: i32) -> Self {
        Self::new(v, v)
    }

    /// `v` and above.
    pub const fn ge(v: i32) -> Self {
        Self::new(v, Self::MAX)
    }

    /// Above `v`.
    pub const fn gt(v: i32) -> Self {
        match v.checked_add(1) {
            Some(a) => Self::ge(a),
            None => Self::none(),
        }
    }

    /// `v` and below.
    pub const fn le(v: i32) -> Self {
        Self::new(Self::MIN, v)
    }

    /// Below `v`.
    pub const fn lt(v: i32) -> Self {
        match v.checked_sub(1) {
            Some(b) => Self::le(b),
            None => Self::none(),
        }
    }

    /// Lower bound.
    pub const fn a(&self) -> i32 {
        self.a
    }

    /// Upper bound.
    pub const fn b(&self) -> i32 {
        self.b
    }

    pub const fn is_none(&self) -> bool {
        self.a > self.b
    }

    pub const fn is_all(&self) -> bool {
        self.a == Self::MIN && self.b == Self::MAX
    }

    pub const fn contains(&self, v: i32) -> bool {
        self.a <= v && v <= self.b
    }

    /// Complement of the union of `intervals` over the whole `i32` domain.
    ///
    /// The result is sorted, non-overlapping and non-adjacent. It is empty
    /// when the union covers every value.
    pub fn invert<'a>(intervals: impl IntoIterator<Item = &'a Self>) -> Vec<Self> {
        let mut sorted: Vec<Self> = intervals
            .into_iter()
            .filter(|i| !i.is_none())
            .copied()
            .collect();
        sorted.sort_unstable_by_key(|i| i.a);

        let mut inverted = Vec::new();
        // First value not yet covered by the union, `None` once it reaches MAX.
        let mut cursor = Some(Self::MIN);
        for itv in sorted {
            let Some(start) = cursor else {
                break;
            };
            if itv.a > start {
                inverted.push(Self::new(start, itv.a - 1));
            }
            if itv.b >= start {
                cursor = itv.b.checked_add(1);
            }
        }
        if let Some(start) = cursor {
            inverted.push(Self::new(start, Self::MAX));
        }
        inverted
    }
}

fn parse_bound(raw: &str, unbounded: i32, expr: &str) -> Result<i32> {
    if raw.is_empty() {
        return Ok(unbounded);
    }
    raw.parse()
        .map_err(|_| ConfigError::InvalidLevel(expr.to_string()))
}

impl FromStr for Interval {
    type Err = ConfigError;

    /// Parse `[a,b]`, `=n`, `>n`, `>=n`, `<n`, `<=n` or a bare `n` (`>=n`).
    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let invalid = || ConfigError::InvalidLevel(s.to_string());

        if let Some(body) = compact
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let (a, b) = body.split_once(',').ok_or_else(invalid)?;
            let a = parse_bound(a, Self::MIN, s)?;
            let b = parse_bound(b, Self::MAX, s)?;
            if a > b {
                return Err(invalid());
            }
            return Ok(Self::new(a, b));
        }

        let (op, num) = [">=", "<=", ">", "<", "="]
            .iter()
            .find_map(|op| compact.strip_prefix(*op).map(|n| (*op, n)))
            .unwrap_or(("", compact.as_str()));
        let value: i32 = num.parse().map_err(|_| invalid())?;
        Ok(match op {
            "<=" => Self::le(value),
            ">" => Self::gt(value),
            "<" => Self::lt(value),
            "=" => Self::exact(value),
            _ => Self::ge(value),
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }
        f.write_str("[")?;
        if self.a == Self::MIN {
            f.write_str("-inf")?;
        } else {
            write!(f, "{}", self.a)?;
        }
        f.write_str(", ")?;
        if self.b == Self::MAX {
            f.write_str("+inf")?;
        } else {
            write!(f, "{}", self.b)?;
        }
        f.write_str("]")
    }
}

/// A range of levels at which the gated code is skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkipRange {
    /// Lower bound, `None` when unbounded below.
    pub lower: Option<i32>,
    /// Upper bound, `None` when unbounded above.
    pub upper: Option<i32>,
}

impl SkipRange {
    /// Comparison steps testing this range, in emission order.
    pub fn steps(&self) -> Vec<CheckStep> {
        let mut steps = Vec::with_capacity(2);
        if let Some(lower) = self.lower {
            steps.push(CheckStep::NextIfBelow(lower));
        }
        match self.upper {
            Some(upper) => steps.push(CheckStep::SkipIfAtMost(upper)),
            // Nothing above the lower bound can escape the range.
            None => steps.push(CheckStep::Skip),
        }
        steps
    }
}

impl From<Interval> for SkipRange {
    fn from(itv: Interval) -> Self {
        Self {
            lower: (itv.a() > Interval::MIN).then_some(itv.a()),
            upper: (itv.b() < Interval::MAX).then_some(itv.b()),
        }
    }
}

/// One comparison in a level gate cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckStep {
    /// Level below the bound: not in this range, try the next one.
    NextIfBelow(i32),
    /// Level at most the bound: skip the gated code.
    SkipIfAtMost(i32),
    /// Skip unconditionally.
    Skip,
}

impl fmt::Display for CheckStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NextIfBelow(v) => write!(f, "level < {v} -> next"),
            Self::SkipIfAtMost(v) => write!(f, "level <= {v} -> skip"),
            Self::Skip => f.write_str("-> skip"),
        }
    }
}

/// Compiled level gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelGate {
    /// The gate always passes; no branch is generated.
    Open,
    /// Skip ranges to test, in order.
    Checks(Vec<SkipRange>),
}

impl LevelGate {
    /// Plan the gate for the accumulated level intervals.
    ///
    /// Levels are never negative, so a complement of exactly `[MIN, -1]`
    /// passes for every reachable level.
    pub fn plan(intervals: &[Interval]) -> Self {
        if intervals.is_empty() {
            return Self::Open;
        }
        let inverted = Interval::invert(intervals);
        match inverted.as_slice() {
            [] => Self::Open,
            [only] if only.is_none() || *only == Interval::le(-1) => Self::Open,
            _ => Self::Checks(inverted.into_iter().map(SkipRange::from).collect()),
        }
    }

    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// All comparison steps, one group per skip range.
    pub fn steps(&self) -> Vec<Vec<CheckStep>> {
        match self {
            Self::Open => Vec::new(),
            Self::Checks(ranges) => ranges.iter().map(SkipRange::steps).collect(),
        }
    }
}
