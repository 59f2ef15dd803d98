//! # QSPICE Raw Waveform Reader - Core Library
//!
//! A library for reading the raw output files produced by QSPICE (and the
//! compatible LTspice/SPICE3 layouts).
//!
//! ## Supported Formats
//!
//! - QSPICE `.qraw` (binary, all-double payload)
//! - LTspice-compatible binary raw (f64 axis, f32 data)
//! - ASCII raw (`Values:` section)
//! - Complex AC/noise payloads, stepped (`.STEP`/Monte Carlo) runs
//!
//! ## Features
//!
//! - Memory-mapped file I/O for efficient large file handling
//! - One owned payload arena with lazy per-trace, per-step views
//! - Configurable step-boundary detection, including variable-length steps
//!   from adaptive-timestep transient runs
//! - Byte-faithful re-encoding of parsed files
//! - Structured logging via `tracing` for diagnostics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qraw_core::{read, Wave};
//!
//! let raw = read("simulation.qraw").unwrap();
//! println!("Title: {}", raw.title());
//! println!("Analysis: {:?}", raw.analysis());
//!
//! for name in raw.get_trace_names() {
//!     println!("trace: {}", name);
//! }
//!
//! match raw.get_wave("V(out)", 0).unwrap() {
//!     Wave::Real(samples) => println!("{} points", samples.len()),
//!     Wave::Complex(samples) => println!("{} complex points", samples.len()),
//! }
//! ```
//!
//! ## Stepped Simulations
//!
//! ```rust,no_run
//! use qraw_core::read;
//!
//! let raw = read("stepped.qraw").unwrap();
//! for step in raw.get_steps() {
//!     let wave = raw.get_wave("V(out)", step.index).unwrap();
//!     println!("step {}: {} points", step.index, wave.len());
//! }
//! ```
//!
//! ## Enabling Logging
//!
//! This library uses `tracing` for structured logging. To see log output,
//! initialize a tracing subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//!
//! let raw = qraw_core::read("simulation.qraw").unwrap();
//! ```

mod parser;
mod rawfile;
mod reader;
mod steps;
mod types;
mod writer;

// Re-export public types
pub use rawfile::{RawFile, WaveView};
pub use steps::{ParseOptions, StepBoundaryRule};
pub use types::{
    AnalysisType,
    RawError,
    RawFlags,
    Result,
    Step,
    VarKind,
    Variable,
    Wave,
    // Constants
    ASCII_SENTINEL,
    BINARY_SENTINEL,
    VARIABLES_SENTINEL,
};

// Re-export writer
pub use writer::{encode, write_raw};

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{info, instrument};

// ============================================================================
// Public API Functions
// ============================================================================

/// Read a raw waveform file with default options.
///
/// # Example
/// ```rust,no_run
/// let raw = qraw_core::read("simulation.qraw").unwrap();
/// println!("Title: {}", raw.title());
/// println!("Scale: {}", raw.scale_name());
/// ```
pub fn read<P: AsRef<Path>>(path: P) -> Result<RawFile> {
    read_with(path, &ParseOptions::default())
}

/// Read a raw waveform file with an explicit step-boundary rule and/or a
/// step table recovered from the simulator log.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<RawFile> {
    let file = File::open(path.as_ref())?;
    // The mapping lives only for the duration of this call; RawFile owns its
    // decoded buffers.
    let mmap = unsafe { Mmap::map(&file)? };
    info!(bytes = mmap.len(), "mapped raw file");
    RawFile::parse_with(&mmap, options)
}
