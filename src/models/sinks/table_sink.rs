//! # Table export
//!
//! Copies the currently bound vectors into a `minarrow::Table`.
//!
//! Supports flat numeric columns (32 and 64-bit integers, floats), `Utf8` and
//! dictionary-encoded `Utf8`, which becomes a 32-bit categorical column.
//! Null slots copy as the type's default value with the null mask cleared.

use std::sync::Arc;

use minarrow::ffi::arrow_dtype::{ArrowType, CategoricalIndexType};
use minarrow::{
    Array, Bitmask, Buffer, CategoricalArray, Field, FieldArray, FloatArray, IntegerArray,
    NumericArray, StringArray, Table, TextArray, Vec64,
};

use crate::error::{IpcError, IpcResult};
use crate::models::types::field::DataType;
use crate::models::vectors::{PrimitiveType, Value, Vector, VectorKind};

/// Builds a table named `name` from top-level vectors holding `n_rows` rows.
pub fn vectors_to_table(vectors: &[Vector], n_rows: usize, name: &str) -> IpcResult<Table> {
    let cols = vectors
        .iter()
        .map(vector_to_column)
        .collect::<IpcResult<Vec<_>>>()?;
    Ok(Table {
        cols,
        n_rows,
        name: name.to_owned(),
    })
}

fn vector_to_column(v: &Vector) -> IpcResult<FieldArray> {
    let null_mask = null_mask(v);
    let (dtype, array) = match v.kind() {
        VectorKind::Primitive { ptype, .. } => match ptype {
            PrimitiveType::Int32 => (
                ArrowType::Int32,
                Array::NumericArray(NumericArray::Int32(Arc::new(IntegerArray::new(
                    buffer_of(v, |x| match x {
                        Value::Int32(n) => Some(n),
                        _ => None,
                    }),
                    null_mask,
                )))),
            ),
            PrimitiveType::Int64 => (
                ArrowType::Int64,
                Array::NumericArray(NumericArray::Int64(Arc::new(IntegerArray::new(
                    buffer_of(v, |x| match x {
                        Value::Int64(n) => Some(n),
                        _ => None,
                    }),
                    null_mask,
                )))),
            ),
            PrimitiveType::UInt32 => (
                ArrowType::UInt32,
                Array::NumericArray(NumericArray::UInt32(Arc::new(IntegerArray::new(
                    buffer_of(v, |x| match x {
                        Value::UInt32(n) => Some(n),
                        _ => None,
                    }),
                    null_mask,
                )))),
            ),
            PrimitiveType::UInt64 => (
                ArrowType::UInt64,
                Array::NumericArray(NumericArray::UInt64(Arc::new(IntegerArray::new(
                    buffer_of(v, |x| match x {
                        Value::UInt64(n) => Some(n),
                        _ => None,
                    }),
                    null_mask,
                )))),
            ),
            PrimitiveType::Float32 => (
                ArrowType::Float32,
                Array::NumericArray(NumericArray::Float32(Arc::new(FloatArray {
                    data: buffer_of(v, |x| match x {
                        Value::Float32(n) => Some(n),
                        _ => None,
                    }),
                    null_mask,
                }))),
            ),
            PrimitiveType::Float64 => (
                ArrowType::Float64,
                Array::NumericArray(NumericArray::Float64(Arc::new(FloatArray {
                    data: buffer_of(v, |x| match x {
                        Value::Float64(n) => Some(n),
                        _ => None,
                    }),
                    null_mask,
                }))),
            ),
            other => return Err(unsupported(v, &format!("{other:?}"))),
        },
        VectorKind::Utf8 { .. } => {
            let (offsets, data) = string_buffers(v);
            (
                ArrowType::String,
                Array::TextArray(TextArray::String32(Arc::new(StringArray::new(
                    data, null_mask, offsets,
                )))),
            )
        }
        VectorKind::Dictionary { dictionary, .. } => {
            let dict = dictionary
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if dict.field().data_type != DataType::Utf8 {
                return Err(unsupported(v, &format!("dictionary of {}", dict.field().data_type)));
            }
            let unique_values: Vec<String> = (0..dict.len())
                .map(|i| match dict.get(i) {
                    Some(Value::Utf8(s)) => s,
                    _ => String::new(),
                })
                .collect();
            let codes: Vec<u32> = (0..v.len())
                .map(|i| {
                    v.get_encoded(i)
                        .and_then(|k| u32::try_from(k).ok())
                        .unwrap_or(0)
                })
                .collect();
            (
                ArrowType::Dictionary(CategoricalIndexType::UInt32),
                Array::TextArray(TextArray::Categorical32(Arc::new(CategoricalArray {
                    data: Buffer::from(Vec64::from_slice(&codes)),
                    unique_values: Vec64::from(unique_values),
                    null_mask,
                }))),
            )
        }
        _ => return Err(unsupported(v, &v.field().data_type.to_string())),
    };

    let field = Field {
        name: v.name().to_string(),
        dtype,
        nullable: v.field().nullable,
        metadata: Default::default(),
    };
    Ok(FieldArray::new(field, array))
}

fn unsupported(v: &Vector, what: &str) -> IpcError {
    IpcError::unsupported_type(format!("table export of column '{}' ({what})", v.name()))
}

/// Validity of every row, or `None` for non-nullable columns.
fn null_mask(v: &Vector) -> Option<Bitmask> {
    if !v.field().nullable {
        return None;
    }
    let bits: Vec<bool> = (0..v.len()).map(|i| v.is_valid(i)).collect();
    Some(Bitmask::from_bools(&bits))
}

fn buffer_of<T, F>(v: &Vector, pick: F) -> Buffer<T>
where
    T: Copy + Default,
    F: Fn(Value) -> Option<T>,
{
    let values: Vec<T> = (0..v.len())
        .map(|i| v.get(i).and_then(&pick).unwrap_or_default())
        .collect();
    Buffer::from(Vec64::from_slice(&values))
}

/// Offsets rebased to 0 and the byte range they cover.
fn string_buffers(v: &Vector) -> (Buffer<u32>, Buffer<u8>) {
    let rows = v.len();
    let raw: Vec<i32> = match v.offsets() {
        Some(o) if rows > 0 => (0..=rows).map(|i| o.get(i).unwrap_or(0)).collect(),
        _ => vec![0],
    };
    let base = raw[0];
    let offsets: Vec<u32> = raw.iter().map(|&o| (o - base) as u32).collect();
    let bytes = match v.kind() {
        VectorKind::Utf8 { data, .. } => {
            let end = raw[raw.len() - 1] as usize;
            data.as_slice().get(base as usize..end).unwrap_or_default().to_vec()
        }
        _ => Vec::new(),
    };
    (
        Buffer::from(Vec64::from_slice(&offsets)),
        Buffer::from(Vec64::from_slice(&bytes)),
    )
}
