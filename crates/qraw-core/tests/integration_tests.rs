//! Integration tests for qraw-core
//!
//! All fixtures are synthesized in memory so the suite runs without
//! simulator output on disk:
//! - reading: header metadata, traces, waves, steps
//! - formats: double, single-precision, complex, ASCII
//! - errors: truncation, unknown names, out-of-range steps
//! - round trip: encode(parse(bytes)) == bytes

use num_complex::Complex64;
use qraw_core::{
    encode, read, read_with, write_raw, AnalysisType, ParseOptions, RawError, RawFile,
    StepBoundaryRule, VarKind, Wave,
};
use std::collections::HashMap;

// =============================================================================
// Fixture builders
// =============================================================================

fn init_logs() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn header(plotname: &str, flags: &str, vars: &[(&str, &str)], num_points: usize) -> String {
    let mut h = format!(
        "Title: * test circuit\nDate: Wed Aug 27 10:00:00 2025\nPlotname: {}\nFlags: {}\nNo. Variables: {}\nNo. Points: {}\nVariables:\n",
        plotname,
        flags,
        vars.len(),
        num_points
    );
    for (i, (name, kind)) in vars.iter().enumerate() {
        h.push_str(&format!("\t{}\t{}\t{}\n", i, name, kind));
    }
    h
}

/// Binary file with the all-double layout (QSPICE default)
fn double_file(plotname: &str, flags: &str, vars: &[(&str, &str)], columns: &[&[f64]]) -> Vec<u8> {
    let num_points = columns[0].len();
    let mut bytes = header(plotname, flags, vars, num_points).into_bytes();
    bytes.extend_from_slice(b"Binary:\n");
    for point in 0..num_points {
        for col in columns {
            bytes.extend_from_slice(&col[point].to_le_bytes());
        }
    }
    bytes
}

/// Binary file with the LTspice-compatible layout: f64 axis, f32 data
fn single_file(vars: &[(&str, &str)], axis: &[f64], columns: &[&[f32]]) -> Vec<u8> {
    let num_points = axis.len();
    let mut bytes = header("Transient Analysis", "real", vars, num_points).into_bytes();
    bytes.extend_from_slice(b"Binary:\n");
    for point in 0..num_points {
        bytes.extend_from_slice(&axis[point].to_le_bytes());
        for col in columns {
            bytes.extend_from_slice(&col[point].to_le_bytes());
        }
    }
    bytes
}

/// Complex binary file: every value is a (re, im) pair of f64
fn complex_file(vars: &[(&str, &str)], columns: &[&[Complex64]]) -> Vec<u8> {
    let num_points = columns[0].len();
    let mut bytes = header("AC Analysis", "complex", vars, num_points).into_bytes();
    bytes.extend_from_slice(b"Binary:\n");
    for point in 0..num_points {
        for col in columns {
            bytes.extend_from_slice(&col[point].re.to_le_bytes());
            bytes.extend_from_slice(&col[point].im.to_le_bytes());
        }
    }
    bytes
}

fn transient_fixture() -> Vec<u8> {
    double_file(
        "Transient Analysis",
        "real double",
        &[("time", "time"), ("V(out)", "voltage")],
        &[&[0.0, 1e-6, 2e-6], &[0.0, 0.7, 1.4]],
    )
}

// =============================================================================
// Test: Basic Reading
// =============================================================================

#[test]
fn test_parse_returns_result() {
    init_logs();
    assert!(RawFile::parse(&transient_fixture()).is_ok());
}

#[test]
fn test_header_metadata() {
    let raw = RawFile::parse(&transient_fixture()).unwrap();

    assert_eq!(raw.title(), "* test circuit");
    assert_eq!(raw.date(), "Wed Aug 27 10:00:00 2025");
    assert_eq!(raw.plot_name(), "Transient Analysis");
    assert_eq!(raw.analysis(), AnalysisType::Transient);
    assert_eq!(raw.num_points(), 3);
    assert!(!raw.flags().is_complex());
    assert!(raw.flags().is_double());
}

#[test]
fn test_trace_names_match_header() {
    let raw = RawFile::parse(&transient_fixture()).unwrap();
    assert_eq!(raw.get_trace_names(), vec!["time", "V(out)"]);
    assert_eq!(raw.get_trace_names().len(), raw.variables().len());
    assert_eq!(raw.scale_name(), "time");
}

#[test]
fn test_variable_kinds() {
    let raw = RawFile::parse(&transient_fixture()).unwrap();
    let time = raw.get_trace("time").unwrap();
    assert_eq!(time.kind, VarKind::Time);
    assert!(!time.is_complex);
    let vout = raw.get_trace("V(out)").unwrap();
    assert_eq!(vout.kind, VarKind::Voltage);
}

#[test]
fn test_single_step_scenario() {
    // Unstepped transient: one step with an empty parameter map
    let raw = RawFile::parse(&transient_fixture()).unwrap();

    let steps = raw.get_steps();
    assert_eq!(steps.len(), 1);
    assert_eq!(raw.step_count(), 1);
    assert!(steps[0].step_values.is_empty());
    assert_eq!(steps[0].len(), 3);

    assert_eq!(
        raw.get_wave("V(out)", 0).unwrap(),
        Wave::Real(vec![0.0, 0.7, 1.4])
    );
    assert_eq!(raw.get_axis(0).unwrap(), vec![0.0, 1e-6, 2e-6]);
}

#[test]
fn test_trace_lookup_case_insensitive() {
    let raw = RawFile::parse(&transient_fixture()).unwrap();
    assert_eq!(raw.get_trace("v(out)").unwrap().index, 1);
    assert_eq!(raw.get_trace("V(OUT)").unwrap().index, 1);
}

#[test]
fn test_raw_properties() {
    let raw = RawFile::parse(&transient_fixture()).unwrap();

    assert_eq!(raw.get_raw_property("Title").unwrap(), "* test circuit");
    assert_eq!(raw.get_raw_property("No. Points").unwrap(), "3");
    assert!(matches!(
        raw.get_raw_property("Offset"),
        Err(RawError::NotFound(_))
    ));

    let keys: Vec<&str> = raw.raw_properties().iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["Title", "Date", "Plotname", "Flags", "No. Variables", "No. Points"]
    );
}

#[test]
fn test_backannotations() {
    let mut bytes = String::from(
        "Title: t\nDate: d\nPlotname: Transient Analysis\nFlags: real double\n\
         Backannotation: u1 in out\nBackannotation: r1 out 0\n\
         No. Variables: 1\nNo. Points: 1\nVariables:\n\t0\ttime\ttime\nBinary:\n",
    )
    .into_bytes();
    bytes.extend_from_slice(&0.0f64.to_le_bytes());

    let raw = RawFile::parse(&bytes).unwrap();
    assert_eq!(raw.backannotations(), vec!["u1 in out", "r1 out 0"]);
}

// =============================================================================
// Test: Error Handling
// =============================================================================

#[test]
fn test_unknown_trace_name() {
    let raw = RawFile::parse(&transient_fixture()).unwrap();
    match raw.get_wave("V(in)", 0) {
        Err(RawError::NotFound(name)) => assert_eq!(name, "V(in)"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_step_out_of_range() {
    let raw = RawFile::parse(&transient_fixture()).unwrap();
    assert!(matches!(
        raw.get_wave("V(out)", 1),
        Err(RawError::StepOutOfRange { step: 1, count: 1 })
    ));
}

#[test]
fn test_truncated_payload() {
    let mut bytes = transient_fixture();
    // Drop one full sample
    bytes.truncate(bytes.len() - 8);

    match RawFile::parse(&bytes) {
        Err(RawError::Truncated {
            expected,
            found,
            unit,
        }) => {
            assert_eq!(expected, 3 * 16);
            assert_eq!(found, 3 * 16 - 8);
            assert_eq!(unit, "bytes");
        }
        other => panic!("expected Truncated, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_ascii_truncated_values() {
    // Declares 3 points but only records 2
    let mut src = header(
        "Transient Analysis",
        "real",
        &[("time", "time"), ("V(out)", "voltage")],
        3,
    );
    src.push_str("Values:\n0\t0.0\n\t0.0\n1\t1e-6\n\t0.7\n");

    match RawFile::parse(src.as_bytes()) {
        Err(RawError::Truncated {
            expected,
            found,
            unit,
        }) => {
            assert_eq!(expected, 6);
            assert_eq!(found, 4);
            assert_eq!(unit, "values");
        }
        other => panic!("expected Truncated, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_oversized_point_count_is_an_error() {
    // A hostile point count must come back as a format error, not overflow
    let src = "Title: t\nDate: d\nPlotname: Transient Analysis\nFlags: real double\n\
               No. Variables: 2\nNo. Points: 18446744073709551615\nVariables:\n\
               \t0\ttime\ttime\n\t1\tV(out)\tvoltage\nBinary:\n";
    assert!(matches!(
        RawFile::parse(src.as_bytes()),
        Err(RawError::Format(_))
    ));

    let ascii = src.replace("Binary:", "Values:");
    assert!(matches!(
        RawFile::parse(ascii.as_bytes()),
        Err(RawError::Format(_))
    ));
}

#[test]
fn test_unrecognized_header() {
    assert!(matches!(
        RawFile::parse(b"not a raw file\n"),
        Err(RawError::Format(_))
    ));
    assert!(matches!(RawFile::parse(b""), Err(RawError::Format(_))));
}

#[test]
fn test_nonexistent_file() {
    assert!(matches!(
        read("/nonexistent/path/file.qraw"),
        Err(RawError::Io(_))
    ));
}

// =============================================================================
// Test: Format Variants
// =============================================================================

#[test]
fn test_single_precision_layout() {
    let bytes = single_file(
        &[("time", "time"), ("V(out)", "voltage"), ("I(R1)", "current")],
        &[0.0, 1e-6],
        &[&[0.5f32, 0.7f32], &[1e-3f32, 2e-3f32]],
    );
    let raw = RawFile::parse(&bytes).unwrap();

    assert_eq!(raw.get_axis(0).unwrap(), vec![0.0, 1e-6]);
    // f32 samples promote losslessly
    assert_eq!(
        raw.get_wave("V(out)", 0).unwrap(),
        Wave::Real(vec![0.5f32 as f64, 0.7f32 as f64])
    );
    assert_eq!(
        raw.get_wave("I(R1)", 0).unwrap(),
        Wave::Real(vec![1e-3f32 as f64, 2e-3f32 as f64])
    );
}

#[test]
fn test_complex_file_returns_pairs() {
    let freq = [
        Complex64::new(1e3, 0.0),
        Complex64::new(1e4, 0.0),
        Complex64::new(1e5, 0.0),
    ];
    let vout = [
        Complex64::new(1.0, 0.0),
        Complex64::new(0.5, -0.5),
        Complex64::new(0.0, -1.0),
    ];
    let bytes = complex_file(
        &[("frequency", "frequency"), ("V(out)", "voltage")],
        &[&freq, &vout],
    );
    let raw = RawFile::parse(&bytes).unwrap();

    assert_eq!(raw.analysis(), AnalysisType::AC);
    assert!(raw.get_trace("V(out)").unwrap().is_complex);

    // Raw pairs come back untouched; projections are explicit
    let wave = raw.get_wave("V(out)", 0).unwrap();
    assert_eq!(wave, Wave::Complex(vout.to_vec()));
    let mag = wave.magnitude();
    assert!((mag[1] - 0.5f64.hypot(0.5)).abs() < 1e-12);
    assert_eq!(wave.imag_part()[2], -1.0);

    // Axis projection is explicit too
    assert_eq!(raw.get_axis(0).unwrap(), vec![1e3, 1e4, 1e5]);
}

#[test]
fn test_ascii_values_section() {
    let mut src = header(
        "Transient Analysis",
        "real",
        &[("time", "time"), ("V(out)", "voltage")],
        3,
    );
    src.push_str("Values:\n");
    src.push_str("0\t0.0\n\t0.0\n");
    src.push_str("1\t1e-6\n\t0.7\n");
    src.push_str("2\t2e-6\n\t1.4\n");

    let raw = RawFile::parse(src.as_bytes()).unwrap();
    assert_eq!(
        raw.get_wave("V(out)", 0).unwrap(),
        Wave::Real(vec![0.0, 0.7, 1.4])
    );
    assert_eq!(raw.get_axis(0).unwrap(), vec![0.0, 1e-6, 2e-6]);
}

#[test]
fn test_ascii_complex_values() {
    let mut src = header("AC Analysis", "complex", &[("frequency", "frequency"), ("V(out)", "voltage")], 2);
    src.push_str("Values:\n");
    src.push_str("0\t1e3,0.0\n\t1.0,0.0\n");
    src.push_str("1\t1e4,0.0\n\t0.5,-0.5\n");

    let raw = RawFile::parse(src.as_bytes()).unwrap();
    assert_eq!(
        raw.get_wave("V(out)", 0).unwrap(),
        Wave::Complex(vec![Complex64::new(1.0, 0.0), Complex64::new(0.5, -0.5)])
    );
}

// =============================================================================
// Test: Stepped Files
// =============================================================================

#[test]
fn test_stepped_uniform_lengths() {
    // Two .STEP runs of 3 points each; the time axis restarts at zero
    let bytes = double_file(
        "Transient Analysis",
        "real double stepped",
        &[("time", "time"), ("V(out)", "voltage")],
        &[
            &[0.0, 1e-6, 2e-6, 0.0, 1e-6, 2e-6],
            &[0.0, 0.7, 1.4, 0.0, 1.4, 2.8],
        ],
    );
    let raw = RawFile::parse(&bytes).unwrap();

    assert_eq!(raw.step_count(), 2);
    assert_eq!(
        raw.get_wave("V(out)", 0).unwrap(),
        Wave::Real(vec![0.0, 0.7, 1.4])
    );
    assert_eq!(
        raw.get_wave("V(out)", 1).unwrap(),
        Wave::Real(vec![0.0, 1.4, 2.8])
    );
    assert!(matches!(
        raw.get_wave("V(out)", 2),
        Err(RawError::StepOutOfRange { .. })
    ));
}

#[test]
fn test_stepped_variable_lengths() {
    // Adaptive timestep: 3 points in the first run, 5 in the second
    let bytes = double_file(
        "Transient Analysis",
        "real double stepped",
        &[("time", "time"), ("V(out)", "voltage")],
        &[
            &[0.0, 1e-6, 2e-6, 0.0, 5e-7, 1e-6, 1.5e-6, 2e-6],
            &[0.0, 0.7, 1.4, 0.0, 0.4, 0.7, 1.1, 1.4],
        ],
    );
    let raw = RawFile::parse(&bytes).unwrap();

    assert_eq!(raw.step_count(), 2);
    let steps = raw.get_steps();
    assert_eq!(steps[0].len(), 3);
    assert_eq!(steps[1].len(), 5);
    assert_eq!(raw.get_wave("V(out)", 0).unwrap().len(), 3);
    assert_eq!(raw.get_wave("V(out)", 1).unwrap().len(), 5);
    assert_eq!(raw.get_axis(1).unwrap().len(), 5);
}

#[test]
fn test_stepped_uniform_rule() {
    let bytes = double_file(
        "DC transfer characteristic",
        "real double stepped",
        &[("v-sweep", "voltage"), ("I(R1)", "current")],
        &[&[0.0, 1.0, 0.0, 1.0], &[0.0, 1e-3, 0.0, 2e-3]],
    );

    let options = ParseOptions {
        boundary_rule: StepBoundaryRule::Uniform { points_per_step: 2 },
        ..Default::default()
    };
    let raw = RawFile::parse_with(&bytes, &options).unwrap();
    assert_eq!(raw.step_count(), 2);
    assert_eq!(raw.analysis(), AnalysisType::DC);

    let bad = ParseOptions {
        boundary_rule: StepBoundaryRule::Uniform { points_per_step: 3 },
        ..Default::default()
    };
    assert!(matches!(
        RawFile::parse_with(&bytes, &bad),
        Err(RawError::Format(_))
    ));
}

#[test]
fn test_step_table_from_log() {
    let bytes = double_file(
        "Transient Analysis",
        "real double stepped",
        &[("time", "time"), ("V(out)", "voltage")],
        &[&[0.0, 1e-6, 0.0, 1e-6], &[0.0, 0.7, 0.0, 1.4]],
    );

    let mut run0 = HashMap::new();
    run0.insert("run".to_string(), -1.0);
    let mut run1 = HashMap::new();
    run1.insert("run".to_string(), 1.0);

    let options = ParseOptions {
        step_table: Some(vec![run0, run1]),
        ..Default::default()
    };
    let raw = RawFile::parse_with(&bytes, &options).unwrap();
    assert_eq!(raw.get_steps()[0].step_values["run"], -1.0);
    assert_eq!(raw.get_steps()[1].step_values["run"], 1.0);

    // Table length must match the detected step count
    let bad = ParseOptions {
        step_table: Some(vec![HashMap::new()]),
        ..Default::default()
    };
    assert!(matches!(
        RawFile::parse_with(&bytes, &bad),
        Err(RawError::Format(_))
    ));
}

// =============================================================================
// Test: Round Trip
// =============================================================================

#[test]
fn test_round_trip_double() {
    let bytes = transient_fixture();
    let raw = RawFile::parse(&bytes).unwrap();
    assert_eq!(encode(&raw), bytes);
}

#[test]
fn test_round_trip_single_precision() {
    let bytes = single_file(
        &[("time", "time"), ("V(out)", "voltage")],
        &[0.0, 1e-6, 2e-6],
        &[&[0.0f32, 0.7f32, 1.4f32]],
    );
    let raw = RawFile::parse(&bytes).unwrap();
    assert_eq!(encode(&raw), bytes);
}

#[test]
fn test_write_and_read_back() {
    init_logs();
    let bytes = transient_fixture();
    let raw = RawFile::parse(&bytes).unwrap();

    let path = std::env::temp_dir().join("qraw_test_roundtrip.qraw");
    write_raw(&raw, path.to_str().unwrap()).unwrap();

    let reread = read(&path).unwrap();
    assert_eq!(reread.title(), raw.title());
    assert_eq!(
        reread.get_wave("V(out)", 0).unwrap(),
        raw.get_wave("V(out)", 0).unwrap()
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_read_with_options_from_disk() {
    let bytes = double_file(
        "Transient Analysis",
        "real double stepped",
        &[("time", "time"), ("V(out)", "voltage")],
        &[&[0.0, 1e-6, 0.0, 1e-6], &[0.0, 0.7, 0.0, 1.4]],
    );

    let path = std::env::temp_dir().join("qraw_test_stepped.qraw");
    std::fs::write(&path, &bytes).unwrap();

    let raw = read_with(&path, &ParseOptions::default()).unwrap();
    assert_eq!(raw.step_count(), 2);

    let _ = std::fs::remove_file(&path);
}
