#![forbid(unsafe_code)]

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Logical column types understood by the columnar store.
///
/// `Binary` can be produced by loaders that find raw bytes in their input; the
/// decomposition pipeline refuses such columns before planning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    #[default]
    String,
    /// Milliseconds since the Unix epoch (UTC).
    Timestamp,
    Binary,
}

impl ColumnType {
    /// Storage width of one value, or `None` for variable-width types.
    pub fn fixed_width(self) -> Option<u64> {
        match self {
            ColumnType::Integer | ColumnType::Float | ColumnType::Timestamp => Some(8),
            ColumnType::String | ColumnType::Binary => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Binary => "binary",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value.
///
/// Equality and hashing follow GROUP BY semantics: `Null` equals `Null`, and floats
/// compare by bit pattern (all NaNs are treated as one value). Grouping on these
/// values is therefore exact, which is what lets a deduplicated table reproduce the
/// original cells bit for bit.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    String(Arc<str>),
    Timestamp(i64),
    Binary(Arc<[u8]>),
}

const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

pub(crate) fn float_key_bits(v: f64) -> u64 {
    if v.is_nan() {
        CANONICAL_NAN_BITS
    } else {
        v.to_bits()
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The [`ColumnType`] a non-null value naturally belongs to.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::String(_) => Some(ColumnType::String),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
            Value::Binary(_) => Some(ColumnType::Binary),
        }
    }

    /// Bytes this value occupies in storage statistics. Nulls are free.
    pub fn size_bytes(&self) -> u64 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) | Value::Timestamp(_) => 8,
            Value::String(s) => s.len() as u64,
            Value::Binary(b) => b.len() as u64,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) | Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_key_bits(*a) == float_key_bits(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Integer(v) | Value::Timestamp(v) => v.hash(state),
            Value::Float(v) => float_key_bits(*v).hash(state),
            Value::String(s) => s.hash(state),
            Value::Binary(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::String(s) => f.write_str(s),
            Value::Timestamp(v) => write!(f, "{v}ms"),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::<str>::from(v))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Value::String(v)
    }
}
