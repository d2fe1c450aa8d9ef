//! # Vector factory
//!
//! Maps each field description to the one vector kind that decodes it, and
//! fixes that vector's buffer layout. Runs once per reader, before any batch
//! is loaded, so unsupported types and schema violations surface at open.

use std::sync::Arc;

use crate::error::{IpcError, IpcResult};
use crate::models::bitarray::BitArray;
use crate::models::buffer::{ByteView, OffsetView};
use crate::models::types::field::{DataType, FieldDesc};
use crate::models::vectors::dictionary::DictionaryRegistry;
use crate::models::vectors::layout::{PrimitiveType, buffer_layout};
use crate::models::vectors::{Vector, VectorKind};

/// Registers every dictionary the fields reference, then builds one vector
/// per field in column order.
pub fn build_vectors(
    fields: &[Arc<FieldDesc>],
    registry: &mut DictionaryRegistry,
) -> IpcResult<Vec<Vector>> {
    for field in fields {
        registry.register(field)?;
    }
    fields.iter().map(|f| build_vector(f, registry)).collect()
}

/// Builds the vector tree for `field`. Dictionary ids must already be
/// registered.
pub fn build_vector(field: &Arc<FieldDesc>, registry: &DictionaryRegistry) -> IpcResult<Vector> {
    if let Some(dict) = field.dictionary {
        if !field.children.is_empty() {
            return Err(IpcError::schema(format!(
                "dictionary-encoded field '{}' declares {} children",
                field.name,
                field.children.len()
            )));
        }
        let dictionary = registry.get(dict.id).ok_or_else(|| {
            IpcError::schema(format!(
                "field '{}' references unregistered dictionary id {}",
                field.name, dict.id
            ))
        })?;
        let index_field = Arc::new(FieldDesc::new(
            field.name.clone(),
            DataType::Int(dict.index_type),
            field.nullable,
        ));
        let indices = build_vector(&index_field, registry)?;
        let layout = indices.layout.clone();
        return Ok(Vector::new(
            Arc::clone(field),
            layout,
            VectorKind::Dictionary {
                indices: Box::new(indices),
                dictionary,
            },
        ));
    }

    let layout = buffer_layout(field)?;
    let kind = match &field.data_type {
        DataType::Int(int) => VectorKind::Primitive {
            ptype: PrimitiveType::from_int(*int, &field.name)?,
            validity: BitArray::empty(),
            data: ByteView::empty(),
        },
        DataType::FloatingPoint(p) => VectorKind::Primitive {
            ptype: PrimitiveType::from_precision(*p, &field.name)?,
            validity: BitArray::empty(),
            data: ByteView::empty(),
        },
        DataType::Date(unit) => VectorKind::Date {
            unit: *unit,
            validity: BitArray::empty(),
            data: ByteView::empty(),
        },
        DataType::Utf8 => VectorKind::Utf8 {
            validity: BitArray::empty(),
            offsets: OffsetView::empty(),
            data: ByteView::empty(),
        },
        DataType::List => VectorKind::List {
            validity: BitArray::empty(),
            offsets: OffsetView::empty(),
            child: Box::new(build_vector(single_child(field)?, registry)?),
        },
        DataType::FixedSizeList { list_size } => {
            if *list_size <= 0 {
                return Err(IpcError::schema(format!(
                    "field '{}' declares list size {}",
                    field.name, list_size
                )));
            }
            VectorKind::FixedSizeList {
                size: *list_size as usize,
                validity: BitArray::empty(),
                child: Box::new(build_vector(single_child(field)?, registry)?),
            }
        }
        DataType::Struct => VectorKind::Struct {
            validity: BitArray::empty(),
            children: field
                .children
                .iter()
                .map(|c| build_vector(c, registry))
                .collect::<IpcResult<Vec<_>>>()?,
        },
        other => {
            return Err(IpcError::unsupported_type(format!(
                "type {} on field '{}'",
                other, field.name
            )));
        }
    };
    Ok(Vector::new(Arc::clone(field), layout, kind))
}

fn single_child(field: &FieldDesc) -> IpcResult<&Arc<FieldDesc>> {
    match field.children.as_slice() {
        [child] => Ok(child),
        other => Err(IpcError::schema(format!(
            "{} field '{}' needs exactly one child, found {}",
            field.data_type,
            field.name,
            other.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::BufferKind;
    use crate::models::types::field::{DictionaryRef, IntType, Precision};

    fn int32(name: &str, nullable: bool) -> FieldDesc {
        FieldDesc::new(
            name,
            DataType::Int(IntType {
                bit_width: 32,
                signed: true,
            }),
            nullable,
        )
    }

    fn dict_ref(id: i64) -> DictionaryRef {
        DictionaryRef {
            id,
            index_type: IntType {
                bit_width: 32,
                signed: true,
            },
        }
    }

    #[test]
    fn test_builds_nested_tree() {
        let field = Arc::new(
            FieldDesc::new("s", DataType::Struct, false).with_children(vec![
                FieldDesc::new("l", DataType::List, true).with_children(vec![int32("item", false)]),
                FieldDesc::new("f", DataType::FloatingPoint(Precision::Single), false),
            ]),
        );
        let mut registry = DictionaryRegistry::new();
        let vectors = build_vectors(&[field], &mut registry).unwrap();
        let s = &vectors[0];
        assert_eq!(s.layout(), &[BufferKind::Validity]);
        let children = s.child_vectors();
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0].kind(), VectorKind::List { .. }));
        assert_eq!(children[0].child_vectors()[0].name(), "item");
        assert!(matches!(
            children[1].kind(),
            VectorKind::Primitive {
                ptype: PrimitiveType::Float32,
                ..
            }
        ));
    }

    #[test]
    fn test_dictionary_field_with_children_fails_fast() {
        let field = Arc::new(
            FieldDesc::new("d", DataType::Utf8, false)
                .with_dictionary(dict_ref(1))
                .with_children(vec![int32("c", false)]),
        );
        let err = build_vectors(&[field], &mut DictionaryRegistry::new()).unwrap_err();
        assert!(matches!(err, IpcError::Schema(_)));
    }

    #[test]
    fn test_unregistered_dictionary_id() {
        let field = Arc::new(FieldDesc::new("d", DataType::Utf8, false).with_dictionary(dict_ref(9)));
        let err = build_vector(&field, &DictionaryRegistry::new()).unwrap_err();
        assert!(matches!(err, IpcError::Schema(_)));
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_fields_sharing_an_id_share_the_dictionary() {
        let a = Arc::new(FieldDesc::new("a", DataType::Utf8, false).with_dictionary(dict_ref(4)));
        let b = Arc::new(FieldDesc::new("b", DataType::Utf8, true).with_dictionary(dict_ref(4)));
        let mut registry = DictionaryRegistry::new();
        let vectors = build_vectors(&[a, b], &mut registry).unwrap();
        let da = vectors[0].dictionary_vector().unwrap();
        let db = vectors[1].dictionary_vector().unwrap();
        assert!(Arc::ptr_eq(&da, &db));
        assert_eq!(vectors[1].layout(), &[BufferKind::Validity, BufferKind::Data]);
    }

    #[test]
    fn test_list_needs_one_child() {
        let field = Arc::new(FieldDesc::new("l", DataType::List, false));
        let err = build_vector(&field, &DictionaryRegistry::new()).unwrap_err();
        assert!(matches!(err, IpcError::Schema(_)));
    }

    #[test]
    fn test_unsupported_type_fails_at_build() {
        let field = Arc::new(FieldDesc::new("t", DataType::Timestamp, false));
        let err = build_vector(&field, &DictionaryRegistry::new()).unwrap_err();
        assert!(matches!(err, IpcError::UnsupportedType(_)));
    }
}
