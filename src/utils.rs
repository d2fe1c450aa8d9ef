use std::ops::Range;

use crate::constants::{ARROW_MAGIC_NUMBER, MAGIC_LEN};
use crate::error::{IpcError, IpcResult};

/// Read a little-endian `u32` at `pos`, or `None` when fewer than four bytes remain.
#[inline]
pub fn read_u32_le(buf: &[u8], pos: usize) -> Option<u32> {
    let end = pos.checked_add(4)?;
    let bytes = buf.get(pos..end)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a little-endian `i32` at `pos`, or `None` when fewer than four bytes remain.
#[inline]
pub fn read_i32_le(buf: &[u8], pos: usize) -> Option<i32> {
    read_u32_le(buf, pos).map(|v| v as i32)
}

/// True when the six magic bytes start at `index`.
#[inline]
pub fn has_magic(buf: &[u8], index: usize) -> bool {
    match index.checked_add(MAGIC_LEN) {
        Some(end) => buf.get(index..end) == Some(ARROW_MAGIC_NUMBER),
        None => false,
    }
}

/// Convert a signed `(offset, length)` pair into a byte range that must lie
/// within `[0, limit)`.
#[inline]
pub fn checked_range(offset: i64, length: i64, limit: usize, what: &str) -> IpcResult<Range<usize>> {
    if offset < 0 || length < 0 {
        return Err(IpcError::out_of_bounds(format!(
            "{what}: negative offset {offset} or length {length}"
        )));
    }
    let start = offset as usize;
    let end = start
        .checked_add(length as usize)
        .ok_or_else(|| IpcError::out_of_bounds(format!("{what}: range overflows")))?;
    if end > limit {
        return Err(IpcError::out_of_bounds(format!(
            "{what}: {start}..{end} exceeds {limit} bytes"
        )));
    }
    Ok(start..end)
}
