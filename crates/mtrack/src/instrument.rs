//! Two-pass instrumentation of method bodies.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use mtrack_expand::{
    ExpandConfig, Marker, MarkerKind, MethodCounters, MethodTrackingExpander, TrackingConfig,
};
use mtrack_ir::{BufferConfig, Insn, InsnBuffer};
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

/// Instrumentation configuration.
#[derive(Clone, Debug)]
pub struct InstrumentConfig {
    /// Marker expansion settings.
    pub expand: ExpandConfig,
    /// Slot allocation settings.
    pub buffer: BufferConfig,
    /// Instrument methods of a batch in parallel.
    pub parallel: bool,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            expand: ExpandConfig::default(),
            buffer: BufferConfig::default(),
            parallel: true,
        }
    }
}

impl InstrumentConfig {
    #[must_use]
    pub fn with_expand(mut self, expand: ExpandConfig) -> Self {
        self.expand = expand;
        self
    }

    #[must_use]
    pub fn with_buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// A method body reduced to its tracking markers, in body order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodBody {
    pub name: String,
    pub method_id: u32,
    pub markers: Vec<Marker>,
}

impl MethodBody {
    pub fn new(name: impl Into<String>, method_id: u32) -> Self {
        Self {
            name: name.into(),
            method_id,
            markers: Vec::new(),
        }
    }

    /// Append a marker.
    #[must_use]
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }
}

/// Instructions emitted for one marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerSpan {
    pub kind: MarkerKind,
    /// Index range into [`InstrumentedMethod::insns`].
    pub range: Range<usize>,
}

/// Result of instrumenting one method.
#[derive(Clone, Debug)]
pub struct InstrumentedMethod {
    pub name: String,
    pub method_id: u32,
    pub tracking: TrackingConfig,
    pub insns: Vec<Insn>,
    pub spans: Vec<MarkerSpan>,
    /// Local slots allocated by the expansion.
    pub slots: usize,
}

impl InstrumentedMethod {
    /// Instructions emitted for the marker at `index`.
    pub fn marker_insns(&self, index: usize) -> Option<&[Insn]> {
        self.spans
            .get(index)
            .map(|span| &self.insns[span.range.clone()])
    }

    /// Number of calls to the runtime function `name`.
    pub fn count_calls(&self, name: &str) -> usize {
        self.insns.iter().filter(|insn| insn.calls(name)).count()
    }
}

impl fmt::Display for InstrumentedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method {} (id {})", self.name, self.method_id)?;
        if self.tracking.is_timed() {
            f.write_str(" timed")?;
        }
        if self.tracking.is_sampled() {
            write!(
                f,
                " sampler={} mean={}",
                self.tracking.sampler_kind(),
                self.tracking.sampler_mean().as_raw()
            )?;
        }
        for level in self.tracking.level_intervals() {
            write!(f, " level={level}")?;
        }
        writeln!(f)?;
        for span in &self.spans {
            writeln!(f, "  ; {} {}", span.kind.template_name(), span.kind.descriptor())?;
            for insn in &self.insns[span.range.clone()] {
                writeln!(f, "{insn}")?;
            }
        }
        Ok(())
    }
}

/// Drives one expander per method over a batch of bodies.
///
/// All methods of an instrumentor register their sampling counters in the
/// same [`MethodCounters`] table.
pub struct Instrumentor {
    config: InstrumentConfig,
    counters: Arc<MethodCounters>,
}

impl Instrumentor {
    pub fn new(config: InstrumentConfig) -> Self {
        Self::with_counters(config, Arc::new(MethodCounters::new()))
    }

    /// Create an instrumentor sharing an existing counter table.
    pub const fn with_counters(config: InstrumentConfig, counters: Arc<MethodCounters>) -> Self {
        Self { config, counters }
    }

    pub const fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    pub fn counters(&self) -> &MethodCounters {
        &self.counters
    }

    /// Instrument a single method.
    ///
    /// Every ENTRY marker is recorded before the first marker is expanded.
    pub fn instrument(&self, body: &MethodBody) -> Result<InstrumentedMethod> {
        let mut expander = MethodTrackingExpander::new(
            body.method_id,
            self.config.expand.clone(),
            self.counters.clone(),
        );
        for marker in &body.markers {
            expander
                .record(marker)
                .map_err(|e| Error::method(&body.name, e))?;
        }

        let mut buf = InsnBuffer::new(&self.config.buffer);
        let mut spans = Vec::with_capacity(body.markers.len());
        for marker in &body.markers {
            let start = buf.len();
            expander
                .expand(marker, &mut buf)
                .map_err(|e| Error::method(&body.name, e))?;
            trace!(
                method = %body.name,
                marker = %marker.kind(),
                insns = buf.len() - start,
                "expanded marker"
            );
            spans.push(MarkerSpan {
                kind: marker.kind(),
                range: start..buf.len(),
            });
        }

        debug!(
            method = %body.name,
            method_id = body.method_id,
            markers = spans.len(),
            insns = buf.len(),
            slots = buf.slots_allocated(),
            "instrumented method"
        );
        Ok(InstrumentedMethod {
            name: body.name.clone(),
            method_id: body.method_id,
            tracking: expander.tracking().clone(),
            slots: buf.slots_allocated(),
            insns: buf.into_insns(),
            spans,
        })
    }

    /// Instrument a batch of methods, in parallel when configured.
    ///
    /// Results keep the input order. The first failing method fails the batch.
    pub fn instrument_all(&self, bodies: &[MethodBody]) -> Result<Vec<InstrumentedMethod>> {
        let methods = if self.config.parallel {
            bodies
                .par_iter()
                .map(|body| self.instrument(body))
                .collect::<Result<Vec<_>>>()?
        } else {
            bodies
                .iter()
                .map(|body| self.instrument(body))
                .collect::<Result<Vec<_>>>()?
        };
        info!(
            methods = methods.len(),
            counters = self.counters.len(),
            parallel = self.config.parallel,
            "instrumented batch"
        );
        Ok(methods)
    }
}
