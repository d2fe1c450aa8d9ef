//! # Vectors
//!
//! Typed, randomly accessible column views.
//!
//! A [`Vector`] is built once per field by the [`factory`] and keeps its shape
//! for the life of the reader. Each batch load rebinds its byte views to a new
//! window of the shared input buffer; the bytes themselves are never copied or
//! mutated.
//!
//! Vector kinds form a closed set ([`VectorKind`]). Decoding is a structural
//! recursion over that tree.

pub mod dictionary;
pub mod factory;
pub mod layout;
pub mod value;

use std::sync::{Arc, PoisonError, RwLock};

use crate::constants::MILLIS_PER_DAY;
use crate::enums::BufferKind;
use crate::models::bitarray::BitArray;
use crate::models::buffer::{ByteView, OffsetView, WordPair};
use crate::models::types::field::{DateUnit, FieldDesc};

pub use layout::PrimitiveType;
pub use value::Value;

/// Dictionary vector shared by every index vector using the same id.
pub type SharedVector = Arc<RwLock<Vector>>;

/// Kind-specific state of a [`Vector`].
#[derive(Debug, Clone)]
pub enum VectorKind {
    /// Fixed-width numbers.
    Primitive {
        ptype: PrimitiveType,
        validity: BitArray,
        data: ByteView,
    },

    /// Dates, stored as days (`i32`) or milliseconds (two 32-bit words).
    Date {
        unit: DateUnit,
        validity: BitArray,
        data: ByteView,
    },

    /// UTF-8 strings: Int32 offsets into a byte buffer, decoded per access.
    Utf8 {
        validity: BitArray,
        offsets: OffsetView,
        data: ByteView,
    },

    /// Variable-length lists over a single child vector.
    List {
        validity: BitArray,
        offsets: OffsetView,
        child: Box<Vector>,
    },

    /// Lists of exactly `size` child items each. No own data buffer.
    FixedSizeList {
        size: usize,
        validity: BitArray,
        child: Box<Vector>,
    },

    /// One child vector per struct field, plus a validity bitmap.
    Struct {
        validity: BitArray,
        children: Vec<Vector>,
    },

    /// Integer indices into a shared dictionary vector.
    Dictionary {
        indices: Box<Vector>,
        dictionary: SharedVector,
    },
}

/// A column of values bound to the currently loaded batch.
#[derive(Debug, Clone)]
pub struct Vector {
    pub(crate) field: Arc<FieldDesc>,
    pub(crate) len: usize,
    pub(crate) null_count: usize,
    pub(crate) layout: Vec<BufferKind>,
    pub(crate) kind: VectorKind,
}

impl Vector {
    pub(crate) fn new(field: Arc<FieldDesc>, layout: Vec<BufferKind>, kind: VectorKind) -> Self {
        Self {
            field,
            len: 0,
            null_count: 0,
            layout,
            kind,
        }
    }

    #[inline]
    pub fn field(&self) -> &Arc<FieldDesc> {
        &self.field
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.field.name
    }

    /// Row count of the most recent batch; 0 before the first load.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Null count as declared by the batch's field node.
    #[inline]
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Buffer kinds this vector consumes on each load, in order.
    #[inline]
    pub fn layout(&self) -> &[BufferKind] {
        &self.layout
    }

    #[inline]
    pub fn kind(&self) -> &VectorKind {
        &self.kind
    }

    /// Validity bitmap, for kinds that carry one. Dictionary vectors report
    /// their indices' bitmap.
    pub fn validity(&self) -> Option<&BitArray> {
        match &self.kind {
            VectorKind::Primitive { validity, .. }
            | VectorKind::Date { validity, .. }
            | VectorKind::Utf8 { validity, .. }
            | VectorKind::List { validity, .. }
            | VectorKind::FixedSizeList { validity, .. }
            | VectorKind::Struct { validity, .. } => Some(validity),
            VectorKind::Dictionary { indices, .. } => indices.validity(),
        }
    }

    /// Offsets buffer of `Utf8` and `List` vectors.
    pub fn offsets(&self) -> Option<&OffsetView> {
        match &self.kind {
            VectorKind::Utf8 { offsets, .. } | VectorKind::List { offsets, .. } => Some(offsets),
            _ => None,
        }
    }

    /// Item count of a fixed-size list.
    pub fn list_size(&self) -> Option<usize> {
        match self.kind {
            VectorKind::FixedSizeList { size, .. } => Some(size),
            _ => None,
        }
    }

    /// Child vectors in load order: list item vector, struct fields, or the
    /// index vector of a dictionary column.
    pub fn child_vectors(&self) -> Vec<&Vector> {
        match &self.kind {
            VectorKind::List { child, .. } | VectorKind::FixedSizeList { child, .. } => {
                vec![child.as_ref()]
            }
            VectorKind::Struct { children, .. } => children.iter().collect(),
            VectorKind::Dictionary { indices, .. } => vec![indices.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Whether the validity bitmap is consulted for this vector.
    ///
    /// Struct bitmaps always are. The validity slot of a non-nullable 64-bit
    /// integer vector is not.
    fn honours_validity(&self) -> bool {
        self.field.nullable || matches!(self.kind, VectorKind::Struct { .. })
    }

    /// False for nulls and for indices past the end.
    pub fn is_valid(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        if let VectorKind::Dictionary { indices, .. } = &self.kind {
            return indices.is_valid(i);
        }
        if !self.honours_validity() {
            return true;
        }
        self.validity().is_none_or(|bits| bits.get(i))
    }

    /// Decoded value at `i`, or `None` when it is null or out of range.
    pub fn get(&self, i: usize) -> Option<Value> {
        if !self.is_valid(i) {
            return None;
        }
        match &self.kind {
            VectorKind::Primitive { ptype, data, .. } => read_primitive(*ptype, data, i),
            VectorKind::Date { unit, data, .. } => match unit {
                DateUnit::Day => data.i32_at(i).map(|d| Value::Date(d as i64 * MILLIS_PER_DAY)),
                DateUnit::Millisecond => data.words_at(i).map(|w| Value::Date(w.as_i64())),
            },
            VectorKind::Utf8 { offsets, data, .. } => {
                let (start, end) = offsets.range(i)?;
                let bytes = data.as_slice().get(start..end)?;
                std::str::from_utf8(bytes).ok().map(|s| Value::Utf8(s.to_owned()))
            }
            VectorKind::List { offsets, child, .. } => {
                let (start, end) = offsets.range(i)?;
                Some(Value::List(child.slice(start, end)))
            }
            VectorKind::FixedSizeList { size, child, .. } => {
                let start = i.checked_mul(*size)?;
                Some(Value::List(child.slice(start, start.checked_add(*size)?)))
            }
            VectorKind::Struct { children, .. } => {
                Some(Value::Struct(children.iter().map(|c| c.get(i)).collect()))
            }
            VectorKind::Dictionary { dictionary, .. } => {
                let key = usize::try_from(self.get_encoded(i)?).ok()?;
                dictionary
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(key)
            }
        }
    }

    /// Decoded values for `[start, end)`, clamped to the vector length.
    pub fn slice(&self, start: usize, end: usize) -> Vec<Option<Value>> {
        let end = end.min(self.len);
        (start.min(end)..end).map(|i| self.get(i)).collect()
    }

    /// Raw dictionary index at `i` for dictionary vectors.
    pub fn get_encoded(&self, i: usize) -> Option<i64> {
        match &self.kind {
            VectorKind::Dictionary { indices, .. } => indices.get(i)?.as_i64(),
            _ => None,
        }
    }

    pub fn index_vector(&self) -> Option<&Vector> {
        match &self.kind {
            VectorKind::Dictionary { indices, .. } => Some(indices),
            _ => None,
        }
    }

    /// Shared dictionary backing a dictionary vector.
    pub fn dictionary_vector(&self) -> Option<SharedVector> {
        match &self.kind {
            VectorKind::Dictionary { dictionary, .. } => Some(Arc::clone(dictionary)),
            _ => None,
        }
    }

    /// Element `i` of a 64-bit integer or millisecond date vector as its raw
    /// `(low, high)` words, regardless of validity.
    pub fn words_at(&self, i: usize) -> Option<WordPair> {
        if i >= self.len {
            return None;
        }
        match &self.kind {
            VectorKind::Primitive { ptype, data, .. } if ptype.is_wide_int() => data.words_at(i),
            VectorKind::Date {
                unit: DateUnit::Millisecond,
                data,
                ..
            } => data.words_at(i),
            _ => None,
        }
    }
}

fn read_primitive(ptype: PrimitiveType, data: &ByteView, i: usize) -> Option<Value> {
    let value = match ptype {
        PrimitiveType::Int8 => Value::Int8(data.i8_at(i)?),
        PrimitiveType::Int16 => Value::Int16(data.i16_at(i)?),
        PrimitiveType::Int32 => Value::Int32(data.i32_at(i)?),
        PrimitiveType::Int64 => Value::Int64(data.words_at(i)?.as_i64()),
        PrimitiveType::UInt8 => Value::UInt8(data.u8_at(i)?),
        PrimitiveType::UInt16 => Value::UInt16(data.u16_at(i)?),
        PrimitiveType::UInt32 => Value::UInt32(data.u32_at(i)?),
        PrimitiveType::UInt64 => Value::UInt64(data.words_at(i)?.as_u64()),
        PrimitiveType::Float32 => Value::Float32(data.f32_at(i)?),
        PrimitiveType::Float64 => Value::Float64(data.f64_at(i)?),
    };
    Some(value)
}
