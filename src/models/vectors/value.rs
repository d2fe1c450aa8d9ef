/// One decoded cell.
///
/// Nulls are represented by the surrounding `Option`, so a `Value` is always
/// a concrete value. 64-bit integers are combined exactly from their two wire
/// words. Dates are milliseconds since the epoch whatever their stored unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    Date(i64),
    List(Vec<Option<Value>>),
    Struct(Vec<Option<Value>>),
}

impl Value {
    /// Integer and date values widened to `i64`. `UInt64` values above
    /// `i64::MAX` return `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v as i64),
            Value::Int16(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) | Value::Date(v) => Some(v),
            Value::UInt8(v) => Some(v as i64),
            Value::UInt16(v) => Some(v as i64),
            Value::UInt32(v) => Some(v as i64),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v as f64),
            Value::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a `List` or fields of a `Struct`.
    pub fn as_items(&self) -> Option<&[Option<Value>]> {
        match self {
            Value::List(items) | Value::Struct(items) => Some(items),
            _ => None,
        }
    }
}
