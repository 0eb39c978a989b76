//! Interactive device selection.
//!
//! With a single controller attached there is nothing to choose and no prompt
//! is shown. With several, the operator is asked for an index, which is
//! clamped into range rather than rejected.

use std::io::{BufRead, Write};
use std::num::IntErrorKind;

use crate::error::{AppResult, EccError};

/// Prompt written before reading the operator's choice.
pub const PROMPT: &str = "Select device: ";

/// Clamp `requested` into `[0, count - 1]`.
pub fn clamp_index(requested: i64, count: i32) -> i32 {
    let last = i64::from(count.max(1) - 1);
    // Result is within i32 because `last` is.
    requested.clamp(0, last) as i32
}

/// Pick a device slot out of `count` enumerated devices.
///
/// Reads one line from `input` when `count > 1`, after writing [`PROMPT`] to
/// `output`.
pub fn select_device<R: BufRead, W: Write>(count: i32, mut input: R, mut output: W) -> AppResult<i32> {
    if count <= 0 {
        return Err(EccError::NoDevices);
    }
    if count == 1 {
        return Ok(0);
    }

    output.write_all(PROMPT.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let trimmed = line.trim();
    let requested = match trimmed.parse::<i64>() {
        Ok(requested) => requested,
        // Out-of-range integers still clamp to an end of the range.
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => i64::MAX,
        Err(e) if *e.kind() == IntErrorKind::NegOverflow => i64::MIN,
        Err(_) => return Err(EccError::InvalidSelection(trimmed.to_string())),
    };

    Ok(clamp_index(requested, count))
}
