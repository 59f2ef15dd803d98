//! QSPICE raw file parser
//!
//! A raw file is a line-oriented UTF-8 header followed by a data section,
//! announced by a `Binary:` or `Values:` sentinel line. The header carries
//! `Key: Value` properties and a variable declaration block; the payload is
//! point-major, little-endian, with sample width selected by the header
//! flags (complex pairs, all-double, or the LTspice-compatible mixed
//! f64-axis/f32-data layout).

use crate::rawfile::RawFile;
use crate::reader::ByteCursor;
use crate::steps::{partition_steps, ParseOptions};
use crate::types::{
    Payload, RawError, RawFlags, Result, Step, VarKind, Variable, ASCII_SENTINEL, BINARY_SENTINEL,
    VARIABLES_SENTINEL,
};
use byteorder::{LittleEndian, ReadBytesExt};
use num_complex::Complex64;
use tracing::{debug, trace};

/// Data section format announced by the header sentinel
#[derive(Debug, Clone, Copy, PartialEq)]
enum DataSection {
    Binary,
    Ascii,
}

#[derive(Debug, Default)]
struct Header {
    properties: Vec<(String, String)>,
    title: Option<String>,
    date: Option<String>,
    plotname: Option<String>,
    flags: RawFlags,
    num_variables: Option<usize>,
    num_points: Option<usize>,
    variables: Vec<Variable>,
}

// ============================================================================
// Header parsing
// ============================================================================

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| RawError::Format(format!("invalid '{}' value '{}'", key, value)))
}

fn parse_variable_block(
    cursor: &mut ByteCursor<'_>,
    count: usize,
    variables: &mut Vec<Variable>,
) -> Result<()> {
    for i in 0..count {
        let line = cursor.read_line()?.ok_or_else(|| {
            RawError::Format("unexpected end of header in variable block".into())
        })?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(RawError::Format(format!(
                "malformed variable line '{}'",
                line.trim()
            )));
        }
        let ordinal: usize = parts[0]
            .parse()
            .map_err(|_| RawError::Format(format!("invalid variable ordinal '{}'", parts[0])))?;
        if ordinal != i {
            return Err(RawError::Format(format!(
                "variable ordinal {} out of order, expected {}",
                ordinal, i
            )));
        }
        variables.push(Variable {
            index: i,
            name: parts[1].to_string(),
            kind: VarKind::from_token(parts[2]),
            kind_token: parts[2].to_string(),
            is_complex: false,
        });
    }
    Ok(())
}

fn parse_header(cursor: &mut ByteCursor<'_>) -> Result<(Header, DataSection)> {
    let mut header = Header::default();

    loop {
        let line = cursor
            .read_line()?
            .ok_or_else(|| RawError::Format("no data section found in raw file".into()))?;
        let trimmed = line.trim();

        if trimmed == BINARY_SENTINEL {
            return Ok((header, DataSection::Binary));
        }
        if trimmed == ASCII_SENTINEL {
            return Ok((header, DataSection::Ascii));
        }
        if trimmed == VARIABLES_SENTINEL {
            let count = header.num_variables.ok_or_else(|| {
                RawError::Format("'No. Variables' must precede the variable block".into())
            })?;
            parse_variable_block(cursor, count, &mut header.variables)?;
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }

        let (key, value) = trimmed.split_once(':').ok_or_else(|| {
            RawError::Format(format!("unrecognized header line '{}'", trimmed))
        })?;
        let key = key.trim();
        let value = value.trim();

        match key {
            "Title" => header.title = Some(value.to_string()),
            "Date" => header.date = Some(value.to_string()),
            "Plotname" => header.plotname = Some(value.to_string()),
            "Flags" => header.flags = RawFlags::parse(value),
            "No. Variables" => header.num_variables = Some(parse_count(key, value)?),
            "No. Points" => header.num_points = Some(parse_count(key, value)?),
            // Command, Offset, Backannotation and friends are kept only in
            // the ordered property map
            _ => {}
        }
        header.properties.push((key.to_string(), value.to_string()));
    }
}

fn require<T>(field: Option<T>, key: &str) -> Result<T> {
    field.ok_or_else(|| RawError::Format(format!("missing required header key '{}'", key)))
}

// ============================================================================
// Payload decoding
// ============================================================================

fn bytes_per_point(flags: &RawFlags, n_vars: usize) -> usize {
    if flags.is_complex() {
        16 * n_vars
    } else if flags.is_double() {
        8 * n_vars
    } else {
        // LTspice-compatible single precision: f64 axis, f32 data
        8 + 4 * (n_vars - 1)
    }
}

/// Declared counts whose product does not fit in usize are hostile or
/// corrupt headers, not I/O shortfalls
fn oversized(num_points: usize, n_vars: usize) -> RawError {
    RawError::Format(format!(
        "declared sizes overflow: {} points x {} variables",
        num_points, n_vars
    ))
}

fn decode_binary(
    data: &[u8],
    flags: &RawFlags,
    n_vars: usize,
    num_points: usize,
) -> Result<Payload> {
    let total = num_points
        .checked_mul(n_vars)
        .ok_or_else(|| oversized(num_points, n_vars))?;
    let expected = bytes_per_point(flags, n_vars)
        .checked_mul(num_points)
        .ok_or_else(|| oversized(num_points, n_vars))?;
    if data.len() < expected {
        return Err(RawError::Truncated {
            expected,
            found: data.len(),
            unit: "bytes",
        });
    }
    if data.len() > expected {
        debug!(
            extra = data.len() - expected,
            "ignoring trailing bytes after declared payload"
        );
    }

    let mut src = &data[..expected];

    if flags.is_complex() {
        let mut values = Vec::with_capacity(total);
        for _ in 0..total {
            let re = src.read_f64::<LittleEndian>()?;
            let im = src.read_f64::<LittleEndian>()?;
            values.push(Complex64::new(re, im));
        }
        Ok(Payload::Complex(values))
    } else if flags.is_double() {
        let mut values = Vec::with_capacity(total);
        for _ in 0..total {
            values.push(src.read_f64::<LittleEndian>()?);
        }
        Ok(Payload::Real(values))
    } else {
        let mut values = Vec::with_capacity(total);
        for _ in 0..num_points {
            values.push(src.read_f64::<LittleEndian>()?);
            for _ in 1..n_vars {
                values.push(src.read_f32::<LittleEndian>()? as f64);
            }
        }
        Ok(Payload::Real(values))
    }
}

fn parse_f64(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| RawError::Format(format!("invalid numeric value '{}'", s)))
}

/// Accepts "1.0,2.0", "(1.0,2.0)" and a bare real "3.14"
fn parse_complex_value(s: &str) -> Result<(f64, f64)> {
    let s = s.trim_matches(|c| c == '(' || c == ')');
    match s.split_once(',') {
        Some((re, im)) => Ok((parse_f64(re)?, parse_f64(im)?)),
        None => Ok((parse_f64(s)?, 0.0)),
    }
}

fn decode_ascii(
    data: &[u8],
    flags: &RawFlags,
    n_vars: usize,
    num_points: usize,
) -> Result<Payload> {
    let total = num_points
        .checked_mul(n_vars)
        .ok_or_else(|| oversized(num_points, n_vars))?;
    let text = std::str::from_utf8(data)
        .map_err(|_| RawError::Format("ASCII data section is not valid UTF-8".into()))?;
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    // Each value occupies at least one text line, so the section length
    // bounds a sane capacity even for absurd declared counts
    let mut tokens: Vec<&str> = Vec::with_capacity(total.min(text.len()));
    for point in 0..num_points {
        for var in 0..n_vars {
            let line = lines.next().ok_or(RawError::Truncated {
                expected: total,
                found: point * n_vars + var,
                unit: "values",
            })?;
            if var == 0 {
                // Point record starts with its 0-based index
                let mut parts = line.split_whitespace();
                let idx: usize = parts
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| {
                        RawError::Format(format!("malformed point record '{}'", line))
                    })?;
                if idx != point {
                    return Err(RawError::Format(format!(
                        "point index {} out of order, expected {}",
                        idx, point
                    )));
                }
                let value = parts.next().ok_or_else(|| {
                    RawError::Format(format!("point record '{}' has no axis value", line))
                })?;
                tokens.push(value);
            } else {
                tokens.push(line.split_whitespace().next().unwrap_or(line));
            }
        }
    }

    if flags.is_complex() {
        let mut values = Vec::with_capacity(tokens.len());
        for token in tokens {
            let (re, im) = parse_complex_value(token)?;
            values.push(Complex64::new(re, im));
        }
        Ok(Payload::Complex(values))
    } else {
        let mut values = Vec::with_capacity(tokens.len());
        for token in tokens {
            values.push(parse_f64(token)?);
        }
        Ok(Payload::Real(values))
    }
}

// ============================================================================
// Main entry point
// ============================================================================

pub(crate) fn parse_impl(bytes: &[u8], options: &ParseOptions) -> Result<RawFile> {
    let mut cursor = ByteCursor::new(bytes);
    let (header, section) = parse_header(&mut cursor)?;

    let title = require(header.title, "Title")?;
    let date = require(header.date, "Date")?;
    let plot_name = require(header.plotname, "Plotname")?;
    let num_variables = require(header.num_variables, "No. Variables")?;
    let num_points = require(header.num_points, "No. Points")?;

    if num_variables == 0 {
        return Err(RawError::Format("file declares no variables".into()));
    }
    if header.variables.len() != num_variables {
        return Err(RawError::Format(format!(
            "header declares {} variables but the variable block lists {}",
            num_variables,
            header.variables.len()
        )));
    }

    debug!(
        title = %title,
        plotname = %plot_name,
        variables = num_variables,
        points = num_points,
        complex = header.flags.is_complex(),
        stepped = header.flags.is_stepped(),
        section = ?section,
        header_bytes = cursor.position(),
        payload_bytes = cursor.remaining(),
        "header parsed"
    );

    let flags = header.flags;
    let payload = match section {
        DataSection::Binary => decode_binary(cursor.rest(), &flags, num_variables, num_points)?,
        DataSection::Ascii => decode_ascii(cursor.rest(), &flags, num_variables, num_points)?,
    };
    trace!(values = payload.len(), "payload decoded");

    // Sweep axis (real part), used for step partitioning
    let axis: Vec<f64> = match &payload {
        Payload::Real(v) => v.iter().step_by(num_variables).copied().collect(),
        Payload::Complex(v) => v.iter().step_by(num_variables).map(|c| c.re).collect(),
    };

    let ranges = if flags.is_stepped() {
        partition_steps(&axis, options.boundary_rule)?
    } else {
        vec![0..num_points]
    };

    if let Some(table) = &options.step_table {
        if table.len() != ranges.len() {
            return Err(RawError::Format(format!(
                "step table has {} entries but the file has {} step(s)",
                table.len(),
                ranges.len()
            )));
        }
    }

    let steps: Vec<Step> = ranges
        .into_iter()
        .enumerate()
        .map(|(index, rows)| Step {
            index,
            rows,
            step_values: options
                .step_table
                .as_ref()
                .map(|t| t[index].clone())
                .unwrap_or_default(),
        })
        .collect();

    debug!(steps = steps.len(), "raw file parsed");

    let is_complex = flags.is_complex();
    let mut variables = header.variables;
    for var in &mut variables {
        var.is_complex = is_complex;
    }

    Ok(RawFile {
        properties: header.properties,
        title,
        date,
        plot_name,
        flags,
        variables,
        num_points,
        payload,
        steps,
    })
}

// ============================================================================
// Tests
// ============================================================================
