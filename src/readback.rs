//! Reading the output buffer back to the host.

use std::io::Write;

use crate::bindings::BufferRole;
use crate::error::{PlatformError, ReproError};
use crate::resources::BufferTriple;

/// Copy the `out` buffer's values in index order.
///
/// Only valid after `dispatch_once` has returned; the mapping is released
/// before this returns.
pub fn read_output(buffers: &BufferTriple) -> Result<Vec<f32>, PlatformError> {
    let out = buffers.get(BufferRole::Out);
    let mapped = out.map()?;
    Ok(mapped.read_f32(BufferRole::Out.element_count()))
}

/// One stdout line: values with six decimals, separated by single spaces.
pub fn format_output(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format!("{:.6}", v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write one formatted line and flush it.
pub fn write_report<W: Write>(out: &mut W, values: &[f32]) -> Result<(), ReproError> {
    writeln!(out, "{}", format_output(values))
        .and_then(|()| out.flush())
        .map_err(ReproError::Output)
}
