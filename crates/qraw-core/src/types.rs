//! Common types, errors, and constants for QSPICE raw file operations

use num_complex::Complex64;
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Sentinel line that starts the binary data section
pub const BINARY_SENTINEL: &str = "Binary:";
/// Sentinel line that starts the ASCII data section
pub const ASCII_SENTINEL: &str = "Values:";
/// Sentinel line that starts the variable declaration block
pub const VARIABLES_SENTINEL: &str = "Variables:";

// ============================================================================
// Error Types
// ============================================================================

/// Error type for raw file reading and writing operations
#[derive(Debug, Error)]
pub enum RawError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(String),
    #[error("truncated payload: expected {expected} {unit}, found {found}")]
    Truncated {
        expected: usize,
        found: usize,
        /// `"bytes"` for binary payloads, `"values"` for ASCII payloads
        unit: &'static str,
    },
    #[error("no trace or property named '{0}'")]
    NotFound(String),
    #[error("step {step} out of range: file has {count} step(s)")]
    StepOutOfRange { step: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, RawError>;

// ============================================================================
// Enums
// ============================================================================

/// Physical kind of a variable, from the third column of the variable block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Time,
    Frequency,
    Voltage,
    Current,
    Parameter,
    Other,
}

impl VarKind {
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "time" => VarKind::Time,
            "frequency" => VarKind::Frequency,
            "voltage" => VarKind::Voltage,
            "current" | "device_current" | "subckt_current" => VarKind::Current,
            "parameter" | "param" => VarKind::Parameter,
            _ => VarKind::Other,
        }
    }
}

/// Simulation analysis type, inferred from the plot name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    Transient,
    AC,
    DC,
    Operating,
    Noise,
    Unknown,
}

impl AnalysisType {
    pub fn from_plotname(plotname: &str) -> Self {
        // Longest tokens first: "transfer" contains "tran" and
        // "characteristic" contains "ac", so short substrings misfire.
        let lower = plotname.to_lowercase();
        if lower.contains("transient") {
            AnalysisType::Transient
        } else if lower.contains("noise") {
            AnalysisType::Noise
        } else if lower.contains("ac analysis") {
            AnalysisType::AC
        } else if lower.contains("dc") || lower.contains("transfer") {
            AnalysisType::DC
        } else if lower.contains("operating") {
            AnalysisType::Operating
        } else {
            AnalysisType::Unknown
        }
    }
}

// ============================================================================
// Header Flags
// ============================================================================

/// Flag tokens from the `Flags:` header line.
///
/// The token list is kept verbatim so a parsed file can be re-encoded without
/// loss; the accessors interpret the tokens the reader cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFlags {
    tokens: Vec<String>,
}

impl RawFlags {
    pub fn parse(value: &str) -> Self {
        Self {
            tokens: value.split_whitespace().map(|s| s.to_string()).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn has(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// AC/noise analyses store every sample as a (re, im) pair
    pub fn is_complex(&self) -> bool {
        self.has("complex")
    }

    /// File holds several sweep points concatenated into one payload
    pub fn is_stepped(&self) -> bool {
        self.has("stepped")
    }

    /// All samples are f64. QSPICE always writes this; without it the
    /// LTspice-compatible layout applies (f64 axis, f32 data).
    pub fn is_double(&self) -> bool {
        self.has("double")
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// One named signal declared in the file header
#[derive(Debug, Clone)]
pub struct Variable {
    /// Ordinal position in the file (0 is the sweep axis)
    pub index: usize,
    pub name: String,
    pub kind: VarKind,
    /// Kind token exactly as written in the header, kept for re-encoding
    pub kind_token: String,
    /// True when the file stores this variable as (re, im) pairs
    pub is_complex: bool,
}

/// One sweep point of a (possibly stepped) simulation.
///
/// Unstepped files carry exactly one step spanning every point, with an
/// empty parameter map.
#[derive(Debug, Clone)]
pub struct Step {
    /// 0-based step index
    pub index: usize,
    /// Row range of this step within the flat payload
    pub rows: Range<usize>,
    /// Swept-parameter values for this step, when known. The raw file itself
    /// does not store these; they come from the companion simulator log via
    /// `ParseOptions::step_table`.
    pub step_values: HashMap<String, f64>,
}

impl Step {
    /// Number of points recorded in this step
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decoded payload arena, row-major: `values[point * n_vars + var]`.
///
/// All traces and steps are views into this single buffer; nothing is copied
/// until a caller materializes a wave.
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Payload {
    pub(crate) fn len(&self) -> usize {
        match self {
            Payload::Real(v) => v.len(),
            Payload::Complex(v) => v.len(),
        }
    }
}

/// Materialized sample sequence for one trace in one step
#[derive(Debug, Clone, PartialEq)]
pub enum Wave {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Wave {
    pub fn len(&self) -> usize {
        match self {
            Wave::Real(v) => v.len(),
            Wave::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Wave::Complex(_))
    }

    /// |x| per sample. Explicit projection; `get_wave` never applies it.
    pub fn magnitude(&self) -> Vec<f64> {
        match self {
            Wave::Real(v) => v.iter().map(|x| x.abs()).collect(),
            Wave::Complex(v) => v.iter().map(|c| c.norm()).collect(),
        }
    }

    /// Phase in radians per sample (0.0 for real data)
    pub fn phase(&self) -> Vec<f64> {
        match self {
            Wave::Real(v) => vec![0.0; v.len()],
            Wave::Complex(v) => v.iter().map(|c| c.arg()).collect(),
        }
    }

    pub fn real_part(&self) -> Vec<f64> {
        match self {
            Wave::Real(v) => v.clone(),
            Wave::Complex(v) => v.iter().map(|c| c.re).collect(),
        }
    }

    pub fn imag_part(&self) -> Vec<f64> {
        match self {
            Wave::Real(v) => vec![0.0; v.len()],
            Wave::Complex(v) => v.iter().map(|c| c.im).collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
