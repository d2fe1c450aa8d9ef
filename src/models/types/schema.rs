//! Schema summary returned by `parse_schema` and `Reader::schema`.

use crate::enums::BufferKind;
use crate::models::types::field::{DataType, FieldDesc};
use crate::models::vectors::layout::buffer_layout;

/// Summary of one field and its children.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub nullable: bool,
    /// Type tag name, e.g. `Int`, `Utf8`, `Struct`.
    pub type_name: String,
    pub data_type: DataType,
    pub dictionary_id: Option<i64>,
    pub children: Vec<SchemaField>,
    /// Buffers the loader consumes for this field, in order. Empty for types
    /// that cannot be decoded.
    pub layout: Vec<BufferKind>,
}

impl From<&FieldDesc> for SchemaField {
    fn from(field: &FieldDesc) -> Self {
        Self {
            name: field.name.clone(),
            nullable: field.nullable,
            type_name: field.data_type.tag_name().to_string(),
            data_type: field.data_type.clone(),
            dictionary_id: field.dictionary.map(|d| d.id),
            children: field.children.iter().map(|c| SchemaField::from(c.as_ref())).collect(),
            layout: buffer_layout(field).unwrap_or_default(),
        }
    }
}
