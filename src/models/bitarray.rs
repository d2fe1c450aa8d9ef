//! # BitArray
//!
//! Fixed-size, LSB-first bit array used for validity bitmaps, stored in a
//! `minarrow::Bitmask`.
//!
//! A bitmap bound from a batch is copied out of the input buffer, so writes
//! never reach the input bytes.
//!
//! A `BitArray` of length 0 stands for "no validity buffer": every index
//! reads as set and writes are ignored.

use minarrow::Bitmask;

use crate::models::buffer::ByteView;

/// Bit-level view over a byte range.
#[derive(Debug, Clone, Default)]
pub struct BitArray {
    mask: Bitmask,
}

impl BitArray {
    /// Array of `len` bits, all unset.
    pub fn new(len: usize) -> Self {
        Self {
            mask: Bitmask::new_set_all(len, false),
        }
    }

    /// The degenerate "all valid" array.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bitmap of a validity buffer; its length in bits is `8 * bytes`.
    pub fn from_view(view: &ByteView) -> Self {
        Self::from_bytes(view.as_slice())
    }

    /// Array over a copy of `bytes`, `8 * bytes.len()` bits long.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            mask: Bitmask::from_bytes(bytes, bytes.len() * 8),
        }
    }

    /// Length in bits. 0 means "no bitmap".
    #[inline]
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Underlying bitmap bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.mask.as_bytes()
    }

    /// The backing bitmask.
    pub fn bitmask(&self) -> &Bitmask {
        &self.mask
    }

    /// Bit `i`; always `true` when the array is empty. Indices past the
    /// end of a non-empty array read as unset.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        if self.is_empty() {
            return true;
        }
        i < self.len() && self.mask.get(i)
    }

    pub fn set(&mut self, i: usize) {
        if i < self.len() {
            self.mask.set(i, true);
        }
    }

    pub fn unset(&mut self, i: usize) {
        if i < self.len() {
            self.mask.set(i, false);
        }
    }

    /// Number of unset bits among the first `n`.
    pub fn count_unset(&self, n: usize) -> usize {
        (0..n).filter(|&i| !self.get(i)).count()
    }
}
