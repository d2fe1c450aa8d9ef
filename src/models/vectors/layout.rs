//! Per-field buffer layout.
//!
//! The layout is the ordered list of buffer kinds a vector consumes for its own
//! slot during a load. It is the single source of truth for both the loader
//! and the schema summary, so both always agree on buffer counts.

use crate::enums::BufferKind;
use crate::error::{IpcError, IpcResult};
use crate::models::types::field::{DataType, FieldDesc, IntType, Precision};

/// Fixed-width element types a primitive vector can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl PrimitiveType {
    pub fn from_int(int: IntType, field_name: &str) -> IpcResult<Self> {
        let ptype = match (int.bit_width, int.signed) {
            (8, true) => PrimitiveType::Int8,
            (16, true) => PrimitiveType::Int16,
            (32, true) => PrimitiveType::Int32,
            (64, true) => PrimitiveType::Int64,
            (8, false) => PrimitiveType::UInt8,
            (16, false) => PrimitiveType::UInt16,
            (32, false) => PrimitiveType::UInt32,
            (64, false) => PrimitiveType::UInt64,
            (w, _) => {
                return Err(IpcError::unsupported_type(format!(
                    "Int bit width {w} on field '{field_name}'"
                )));
            }
        };
        Ok(ptype)
    }

    pub fn from_precision(precision: Precision, field_name: &str) -> IpcResult<Self> {
        match precision {
            Precision::Single => Ok(PrimitiveType::Float32),
            Precision::Double => Ok(PrimitiveType::Float64),
            Precision::Half => Err(IpcError::unsupported_type(format!(
                "FloatingPoint precision HALF on field '{field_name}'"
            ))),
        }
    }

    /// Element width in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64 => 8,
        }
    }

    /// 64-bit integers are stored as `(low, high)` 32-bit word pairs.
    pub fn is_wide_int(self) -> bool {
        matches!(self, PrimitiveType::Int64 | PrimitiveType::UInt64)
    }
}

/// Buffer kinds consumed by the vector built for `field`.
///
/// 64-bit integer vectors always take a validity slot, whatever the field's
/// declared nullability. Writers of this format emit one for them, and the
/// slot is skipped over (its bits are not consulted) when the field is not
/// nullable.
pub fn buffer_layout(field: &FieldDesc) -> IpcResult<Vec<BufferKind>> {
    use BufferKind::*;

    if let Some(dict) = field.dictionary {
        let ptype = PrimitiveType::from_int(dict.index_type, &field.name)?;
        return Ok(primitive_layout(ptype, field.nullable));
    }

    let nullable = field.nullable;
    let layout = match &field.data_type {
        DataType::Int(int) => primitive_layout(PrimitiveType::from_int(*int, &field.name)?, nullable),
        DataType::FloatingPoint(p) => {
            primitive_layout(PrimitiveType::from_precision(*p, &field.name)?, nullable)
        }
        DataType::Date(_) => with_validity(nullable, &[Data]),
        DataType::Utf8 => with_validity(nullable, &[Offset, Data]),
        DataType::List => with_validity(nullable, &[Offset]),
        DataType::FixedSizeList { .. } => with_validity(nullable, &[]),
        DataType::Struct => vec![Validity],
        other => {
            return Err(IpcError::unsupported_type(format!(
                "type {} on field '{}'",
                other, field.name
            )));
        }
    };
    Ok(layout)
}

fn primitive_layout(ptype: PrimitiveType, nullable: bool) -> Vec<BufferKind> {
    with_validity(nullable || ptype.is_wide_int(), &[BufferKind::Data])
}

fn with_validity(nullable: bool, rest: &[BufferKind]) -> Vec<BufferKind> {
    let mut layout = Vec::with_capacity(rest.len() + 1);
    if nullable {
        layout.push(BufferKind::Validity);
    }
    layout.extend_from_slice(rest);
    layout
}
