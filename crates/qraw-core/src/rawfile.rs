//! Parsed raw file: immutable header metadata, traces, and steps
//!
//! All decoded samples live in one row-major arena owned by the `RawFile`;
//! traces and steps are index-addressed views into it. Memory stays
//! proportional to the file size no matter how many trace/step combinations
//! a caller looks at, and nothing is copied until a wave is materialized.

use crate::parser;
use crate::steps::ParseOptions;
use crate::types::{
    AnalysisType, Payload, RawError, RawFlags, Result, Step, Variable, Wave,
};
use num_complex::Complex64;
use std::ops::Range;

/// The parsed result of one raw output file. Read-only after construction.
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Scalar header lines in file order, `(key, value)`
    pub(crate) properties: Vec<(String, String)>,
    pub(crate) title: String,
    pub(crate) date: String,
    pub(crate) plot_name: String,
    pub(crate) flags: RawFlags,
    pub(crate) variables: Vec<Variable>,
    pub(crate) num_points: usize,
    pub(crate) payload: Payload,
    pub(crate) steps: Vec<Step>,
}

impl RawFile {
    /// Parse a complete raw file from memory
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        parser::parse_impl(bytes, &ParseOptions::default())
    }

    /// Parse with an explicit step-boundary rule and/or step table
    pub fn parse_with(bytes: &[u8], options: &ParseOptions) -> Result<Self> {
        parser::parse_impl(bytes, options)
    }

    // ========================================================================
    // Header metadata
    // ========================================================================

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn plot_name(&self) -> &str {
        &self.plot_name
    }

    pub fn flags(&self) -> &RawFlags {
        &self.flags
    }

    /// Analysis type inferred from the plot name
    pub fn analysis(&self) -> AnalysisType {
        AnalysisType::from_plotname(&self.plot_name)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Total number of points across all steps
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Name of the shared sweep axis (the first declared variable)
    pub fn scale_name(&self) -> &str {
        &self.variables[0].name
    }

    /// All scalar header properties in file order
    pub fn raw_properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// One header property by exact key, e.g. `"Title"` or `"Command"`
    pub fn get_raw_property(&self, key: &str) -> Result<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| RawError::NotFound(key.to_string()))
    }

    /// Backannotation lines in file order
    pub fn backannotations(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|(k, _)| k == "Backannotation")
            .map(|(_, v)| v.as_str())
            .collect()
    }

    // ========================================================================
    // Traces
    // ========================================================================

    /// Variable names in file order
    pub fn get_trace_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Look up a trace by name. Matching is case-insensitive, with an
    /// exact-case match taking precedence on ambiguity.
    pub fn get_trace(&self, name: &str) -> Result<&Variable> {
        if let Some(var) = self.variables.iter().find(|v| v.name == name) {
            return Ok(var);
        }
        self.variables
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| RawError::NotFound(name.to_string()))
    }

    // ========================================================================
    // Waves
    // ========================================================================

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// One entry per step in file order; unstepped files still hold one step
    pub fn get_steps(&self) -> &[Step] {
        &self.steps
    }

    /// Lazy view of one trace in one step
    pub fn wave_view(&self, var_index: usize, step: usize) -> Result<WaveView<'_>> {
        if var_index >= self.variables.len() {
            return Err(RawError::NotFound(format!("variable #{}", var_index)));
        }
        let rows = self.step_rows(step)?;
        Ok(WaveView {
            payload: &self.payload,
            stride: self.variables.len(),
            var: var_index,
            rows,
        })
    }

    /// Materialized sample sequence for one trace in one step.
    ///
    /// Complex analyses yield `Wave::Complex` pairs; magnitude or phase must
    /// be requested explicitly on the returned wave.
    pub fn get_wave(&self, name: &str, step: usize) -> Result<Wave> {
        let var = self.get_trace(name)?;
        Ok(self.wave_view(var.index, step)?.materialize())
    }

    /// Sweep-axis samples for one step (real part for complex analyses)
    pub fn get_axis(&self, step: usize) -> Result<Vec<f64>> {
        match self.wave_view(0, step)?.materialize() {
            Wave::Real(v) => Ok(v),
            Wave::Complex(v) => Ok(v.iter().map(|c| c.re).collect()),
        }
    }

    fn step_rows(&self, step: usize) -> Result<Range<usize>> {
        self.steps
            .get(step)
            .map(|s| s.rows.clone())
            .ok_or(RawError::StepOutOfRange {
                step,
                count: self.steps.len(),
            })
    }
}

/// Lazy, index-addressed view of one trace in one step.
///
/// Borrows the file's payload arena; nothing is copied until
/// [`WaveView::materialize`] runs.
#[derive(Debug, Clone)]
pub struct WaveView<'a> {
    payload: &'a Payload,
    stride: usize,
    var: usize,
    rows: Range<usize>,
}

impl<'a> WaveView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.payload, Payload::Complex(_))
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        (self.rows.start + i) * self.stride + self.var
    }

    /// Real part of sample `i`. Explicit projection for complex data.
    pub fn real_at(&self, i: usize) -> Option<f64> {
        if i >= self.len() {
            return None;
        }
        match self.payload {
            Payload::Real(v) => v.get(self.slot(i)).copied(),
            Payload::Complex(v) => v.get(self.slot(i)).map(|c| c.re),
        }
    }

    /// Sample `i` as a complex value (real data gets a zero imaginary part)
    pub fn complex_at(&self, i: usize) -> Option<Complex64> {
        if i >= self.len() {
            return None;
        }
        match self.payload {
            Payload::Real(v) => v.get(self.slot(i)).map(|&x| Complex64::new(x, 0.0)),
            Payload::Complex(v) => v.get(self.slot(i)).copied(),
        }
    }

    /// Copy this view out of the arena
    pub fn materialize(&self) -> Wave {
        match self.payload {
            Payload::Real(v) => Wave::Real(
                self.rows
                    .clone()
                    .map(|r| v[r * self.stride + self.var])
                    .collect(),
            ),
            Payload::Complex(v) => Wave::Complex(
                self.rows
                    .clone()
                    .map(|r| v[r * self.stride + self.var])
                    .collect(),
            ),
        }
    }
}
