//! # Shared byte views
//!
//! Every vector reads its values straight out of the reader's input buffer.
//! A [`ByteView`] is a zero-copy `minarrow::SharedBuffer` slice of that
//! buffer, so rebinding a vector to the next batch only swaps the slice.

use std::fmt;

use minarrow::SharedBuffer;

use crate::error::{IpcError, IpcResult};

/// Read-only window `[offset, offset + len)` over a shared buffer.
#[derive(Clone, Default)]
pub struct ByteView {
    bytes: SharedBuffer,
    offset: usize,
}

impl ByteView {
    /// Slices `len` bytes at `offset` out of `buf` without copying.
    pub(crate) fn new(buf: &SharedBuffer, offset: usize, len: usize) -> IpcResult<Self> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| {
                IpcError::out_of_bounds(format!(
                    "view of {len} bytes at {offset} exceeds {} byte buffer",
                    buf.len()
                ))
            })?;
        Ok(Self {
            bytes: buf.slice(offset..end),
            offset,
        })
    }

    /// Zero-length view, used before a vector is first bound.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Absolute position of the window inside the shared buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The underlying shared slice.
    #[inline]
    pub fn shared(&self) -> &SharedBuffer {
        &self.bytes
    }

    /// Number of whole `width`-byte elements in the view.
    #[inline]
    pub fn element_count(&self, width: usize) -> usize {
        self.len() / width
    }

    #[inline]
    fn element<const N: usize>(&self, i: usize) -> Option<[u8; N]> {
        let start = i.checked_mul(N)?;
        let bytes = self.as_slice().get(start..start.checked_add(N)?)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }

    pub fn u8_at(&self, i: usize) -> Option<u8> {
        self.as_slice().get(i).copied()
    }

    pub fn i8_at(&self, i: usize) -> Option<i8> {
        self.u8_at(i).map(|b| b as i8)
    }

    pub fn i16_at(&self, i: usize) -> Option<i16> {
        self.element::<2>(i).map(i16::from_le_bytes)
    }

    pub fn u16_at(&self, i: usize) -> Option<u16> {
        self.element::<2>(i).map(u16::from_le_bytes)
    }

    pub fn i32_at(&self, i: usize) -> Option<i32> {
        self.element::<4>(i).map(i32::from_le_bytes)
    }

    pub fn u32_at(&self, i: usize) -> Option<u32> {
        self.element::<4>(i).map(u32::from_le_bytes)
    }

    pub fn f32_at(&self, i: usize) -> Option<f32> {
        self.element::<4>(i).map(f32::from_le_bytes)
    }

    pub fn f64_at(&self, i: usize) -> Option<f64> {
        self.element::<8>(i).map(f64::from_le_bytes)
    }

    /// Element `i` as a `(low, high)` pair of 32-bit words.
    pub fn words_at(&self, i: usize) -> Option<WordPair> {
        let low = self.u32_at(i.checked_mul(2)?)?;
        let high = self.u32_at(i.checked_mul(2)?.checked_add(1)?)?;
        Some(WordPair { low, high })
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("offset", &self.offset)
            .field("len", &self.len())
            .finish()
    }
}

/// A 64-bit value as stored on the wire: two little-endian 32-bit words.
///
/// Combining the words is exact; nothing here goes through `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordPair {
    pub low: u32,
    pub high: u32,
}

impl WordPair {
    #[inline]
    pub fn as_u64(self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }

    #[inline]
    pub fn as_i64(self) -> i64 {
        self.as_u64() as i64
    }
}

/// Int32 offsets buffer of a variable-length or list vector.
///
/// Always carries one trailing sentinel, so `rows + 1` entries back `rows` slots.
#[derive(Debug, Clone)]
pub struct OffsetView {
    view: ByteView,
}

impl OffsetView {
    pub(crate) fn new(view: ByteView) -> Self {
        Self { view }
    }

    pub fn empty() -> Self {
        Self {
            view: ByteView::empty(),
        }
    }

    /// Raw offset entry `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<i32> {
        self.view.i32_at(i)
    }

    /// Number of raw entries, sentinel included.
    #[inline]
    pub fn len(&self) -> usize {
        self.view.element_count(4)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Half-open child range `[offset[i], offset[i + 1])`.
    pub fn range(&self, i: usize) -> Option<(usize, usize)> {
        let start = self.get(i)?;
        let end = self.get(i.checked_add(1)?)?;
        if start < 0 || end < start {
            return None;
        }
        Some((start as usize, end as usize))
    }

    pub fn to_vec(&self) -> Vec<i32> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    pub fn byte_view(&self) -> &ByteView {
        &self.view
    }
}
