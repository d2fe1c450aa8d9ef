//! # Field tree
//!
//! Internal, owned description of one schema field, built recursively from
//! the flatbuffer `Field` tables. Once built it is immutable and shared by
//! every vector created for it.

use std::fmt;
use std::sync::Arc;

use arrow_ipc as fb;

use crate::constants::DEFAULT_DICTIONARY_INDEX_BIT_WIDTH;
use crate::error::{IpcError, IpcResult};

/// Floating point precision as declared by the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Half,
    Single,
    Double,
}

/// Unit of a `Date` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    /// 32-bit days since the epoch.
    Day,
    /// 64-bit milliseconds since the epoch.
    Millisecond,
}

/// Integer type: bit width and signedness, as in the metadata `Int` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntType {
    pub bit_width: i32,
    pub signed: bool,
}

/// Logical type tag of a field.
///
/// The tag set matches the IPC `Type` union. Tags added by later format
/// revisions are kept by name in `Other` so metadata-only callers can still
/// see them.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Null,
    Int(IntType),
    FloatingPoint(Precision),
    Binary,
    Utf8,
    Bool,
    Decimal,
    Date(DateUnit),
    Time,
    Timestamp,
    Interval,
    List,
    FixedSizeList { list_size: i32 },
    Struct,
    Union,
    Other(String),
}

impl DataType {
    /// Name of the type tag, as reported by the schema summary.
    pub fn tag_name(&self) -> &str {
        match self {
            DataType::Null => "Null",
            DataType::Int(_) => "Int",
            DataType::FloatingPoint(_) => "FloatingPoint",
            DataType::Binary => "Binary",
            DataType::Utf8 => "Utf8",
            DataType::Bool => "Bool",
            DataType::Decimal => "Decimal",
            DataType::Date(_) => "Date",
            DataType::Time => "Time",
            DataType::Timestamp => "Timestamp",
            DataType::Interval => "Interval",
            DataType::List => "List",
            DataType::FixedSizeList { .. } => "FixedSizeList",
            DataType::Struct => "Struct",
            DataType::Union => "Union",
            DataType::Other(name) => name,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int(IntType { bit_width, signed }) => {
                write!(f, "{}Int{}", if *signed { "" } else { "U" }, bit_width)
            }
            DataType::FloatingPoint(p) => write!(f, "FloatingPoint({:?})", p),
            DataType::Date(unit) => write!(f, "Date({:?})", unit),
            DataType::FixedSizeList { list_size } => write!(f, "FixedSizeList({})", list_size),
            other => f.write_str(other.tag_name()),
        }
    }
}

/// Dictionary encoding declared on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryRef {
    pub id: i64,
    /// Index type; signed 32-bit when the metadata omits it.
    pub index_type: IntType,
}

/// Owned description of one field and its children.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    pub name: String,
    pub nullable: bool,
    pub data_type: DataType,
    pub children: Vec<Arc<FieldDesc>>,
    pub dictionary: Option<DictionaryRef>,
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
            data_type,
            children: Vec::new(),
            dictionary: None,
        }
    }

    pub fn with_children(mut self, children: Vec<FieldDesc>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    pub fn with_dictionary(mut self, dictionary: DictionaryRef) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    #[inline]
    pub fn is_dictionary_encoded(&self) -> bool {
        self.dictionary.is_some()
    }

    /// Field for the values of the dictionary `id` that `self` references.
    ///
    /// It keeps the value type and nullability and drops the encoding.
    /// Only flat value types can back a dictionary, and a dictionary-encoded
    /// field may not declare children.
    pub fn dictionary_value_field(&self, id: i64) -> IpcResult<FieldDesc> {
        if !self.children.is_empty() {
            return Err(IpcError::schema(format!(
                "dictionary-encoded field '{}' declares {} children",
                self.name,
                self.children.len()
            )));
        }
        match self.data_type {
            DataType::Int(_) | DataType::FloatingPoint(_) | DataType::Utf8 | DataType::Date(_) => {
                Ok(FieldDesc::new(
                    format!("dict-{id}"),
                    self.data_type.clone(),
                    self.nullable,
                ))
            }
            ref other => Err(IpcError::unsupported_type(format!(
                "dictionary value type {} on field '{}'",
                other, self.name
            ))),
        }
    }
}

/// Builds the field tree for one metadata `Field`, recursing into children.
pub fn field_from_fb(fb_field: &fb::Field) -> IpcResult<FieldDesc> {
    let name = fb_field.name().unwrap_or_default().to_string();
    let nullable = fb_field.nullable();
    let data_type = data_type_from_fb(fb_field, &name)?;

    let dictionary = match fb_field.dictionary() {
        Some(enc) => {
            let index_type = match enc.indexType() {
                Some(int) => IntType {
                    bit_width: int.bitWidth(),
                    signed: int.is_signed(),
                },
                None => IntType {
                    bit_width: DEFAULT_DICTIONARY_INDEX_BIT_WIDTH,
                    signed: true,
                },
            };
            Some(DictionaryRef {
                id: enc.id(),
                index_type,
            })
        }
        None => None,
    };

    let mut children = Vec::new();
    if let Some(fb_children) = fb_field.children() {
        children.reserve(fb_children.len());
        for i in 0..fb_children.len() {
            children.push(Arc::new(field_from_fb(&fb_children.get(i))?));
        }
    }

    Ok(FieldDesc {
        name,
        nullable,
        data_type,
        children,
        dictionary,
    })
}

/// Builds the field trees for every field of a metadata `Schema`, in column order.
pub fn fields_from_fb_schema(schema: &fb::Schema) -> IpcResult<Vec<Arc<FieldDesc>>> {
    if schema.endianness() != fb::Endianness::Little {
        return Err(IpcError::UnsupportedFeature(format!(
            "endianness {:?} - only little endian is supported",
            schema.endianness()
        )));
    }
    let Some(fb_fields) = schema.fields() else {
        return Ok(Vec::new());
    };
    let mut fields = Vec::with_capacity(fb_fields.len());
    for i in 0..fb_fields.len() {
        fields.push(Arc::new(field_from_fb(&fb_fields.get(i))?));
    }
    Ok(fields)
}

fn data_type_from_fb(fb_field: &fb::Field, name: &str) -> IpcResult<DataType> {
    let missing = |what: &str| IpcError::format(format!("field '{name}' is missing its {what} table"));
    let data_type = match fb_field.type_type() {
        fb::Type::Null => DataType::Null,
        fb::Type::Int => {
            let int = fb_field.type_as_int().ok_or_else(|| missing("Int"))?;
            DataType::Int(IntType {
                bit_width: int.bitWidth(),
                signed: int.is_signed(),
            })
        }
        fb::Type::FloatingPoint => {
            let fp = fb_field
                .type_as_floating_point()
                .ok_or_else(|| missing("FloatingPoint"))?;
            let precision = match fp.precision() {
                fb::Precision::HALF => Precision::Half,
                fb::Precision::SINGLE => Precision::Single,
                fb::Precision::DOUBLE => Precision::Double,
                other => {
                    return Err(IpcError::unsupported_type(format!(
                        "FloatingPoint precision {:?} on field '{name}'",
                        other
                    )));
                }
            };
            DataType::FloatingPoint(precision)
        }
        fb::Type::Binary => DataType::Binary,
        fb::Type::Utf8 => DataType::Utf8,
        fb::Type::Bool => DataType::Bool,
        fb::Type::Decimal => DataType::Decimal,
        fb::Type::Date => {
            let date = fb_field.type_as_date().ok_or_else(|| missing("Date"))?;
            let unit = match date.unit() {
                fb::DateUnit::DAY => DateUnit::Day,
                fb::DateUnit::MILLISECOND => DateUnit::Millisecond,
                other => {
                    return Err(IpcError::unsupported_type(format!(
                        "Date unit {:?} on field '{name}'",
                        other
                    )));
                }
            };
            DataType::Date(unit)
        }
        fb::Type::Time => DataType::Time,
        fb::Type::Timestamp => DataType::Timestamp,
        fb::Type::Interval => DataType::Interval,
        fb::Type::List => DataType::List,
        fb::Type::FixedSizeList => {
            let fsl = fb_field
                .type_as_fixed_size_list()
                .ok_or_else(|| missing("FixedSizeList"))?;
            DataType::FixedSizeList {
                list_size: fsl.listSize(),
            }
        }
        fb::Type::Struct_ => DataType::Struct,
        fb::Type::Union => DataType::Union,
        other => DataType::Other(format!("{:?}", other)),
    };
    Ok(data_type)
}
