//! Raw file writer / re-encoder
//!
//! Emits the header properties in their original order, the variable block,
//! and a binary payload using the same precision rules the parser honors.
//! For a canonically formatted, non-stepped, fixed-stride real file the
//! encoder reproduces the parsed bytes exactly.

use crate::rawfile::RawFile;
use crate::types::{Payload, Result, BINARY_SENTINEL, VARIABLES_SENTINEL};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info, instrument};

fn encode_header(out: &mut Vec<u8>, raw: &RawFile) {
    for (key, value) in raw.raw_properties() {
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.push(b'\n');
    }

    out.extend_from_slice(VARIABLES_SENTINEL.as_bytes());
    out.push(b'\n');
    for var in raw.variables() {
        out.extend_from_slice(
            format!("\t{}\t{}\t{}\n", var.index, var.name, var.kind_token).as_bytes(),
        );
    }

    out.extend_from_slice(BINARY_SENTINEL.as_bytes());
    out.push(b'\n');
}

fn encode_payload(out: &mut Vec<u8>, raw: &RawFile) {
    let n_vars = raw.variables().len();
    match &raw.payload {
        Payload::Complex(values) => {
            for c in values {
                out.extend_from_slice(&c.re.to_le_bytes());
                out.extend_from_slice(&c.im.to_le_bytes());
            }
        }
        Payload::Real(values) if raw.flags().is_double() => {
            for v in values {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        Payload::Real(values) => {
            // Mixed layout: f64 axis column, f32 everywhere else. The f32
            // columns were promoted losslessly at parse time, so the
            // narrowing cast restores the original bits.
            for (i, v) in values.iter().enumerate() {
                if i % n_vars == 0 {
                    out.extend_from_slice(&v.to_le_bytes());
                } else {
                    out.extend_from_slice(&(*v as f32).to_le_bytes());
                }
            }
        }
    }
}

/// Encode a parsed raw file back into bytes (binary data section)
pub fn encode(raw: &RawFile) -> Vec<u8> {
    let mut out = Vec::new();
    encode_header(&mut out, raw);
    encode_payload(&mut out, raw);
    out
}

/// Write a raw file to disk in binary form
#[instrument(skip(raw), fields(output = %path))]
pub fn write_raw(raw: &RawFile, path: &str) -> Result<()> {
    debug!(
        variables = raw.variables().len(),
        points = raw.num_points(),
        "encoding raw file"
    );

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&encode(raw))?;
    writer.flush()?;

    let bytes_written = std::fs::metadata(path)?.len();
    info!(bytes = bytes_written, "write complete");

    Ok(())
}
