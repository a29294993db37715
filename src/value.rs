//! The literal value domain shared by parameters, AST literals and row cells.

use bson::Bson;
use chrono::{DateTime, Utc};

/// A sum type over every literal kind the dialect accepts, either as a bound
/// parameter, a parsed SQL literal, or a value read back out of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// Decimal literals are kept as their canonical decimal string; the
    /// store round-trips them as `Decimal128` where supported.
    Decimal(String),
    Bool(bool),
    Text(String),
    Blob(Vec<u8>),
    DateTime(DateTime<Utc>),
    ObjectId(String),
    Uuid(String),
    Null,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::DateTime(_) => "datetime",
            Value::ObjectId(_) => "objectid",
            Value::Uuid(_) => "uuid",
            Value::Null => "null",
        }
    }
}

impl From<Value> for Bson {
    fn from(value: Value) -> Bson {
        match value {
            Value::Int(i) => Bson::Int64(i),
            Value::Float(f) => Bson::Double(f),
            Value::Decimal(d) => match d.parse::<bson::Decimal128>() {
                Ok(dec) => Bson::Decimal128(dec),
                Err(_) => Bson::String(d),
            },
            Value::Bool(b) => Bson::Boolean(b),
            Value::Text(s) => Bson::String(s),
            Value::Blob(b) => Bson::Binary(bson::Binary {
                subtype: bson::spec::BinarySubtype::Generic,
                bytes: b,
            }),
            Value::DateTime(dt) => Bson::DateTime(bson::DateTime::from_chrono(dt)),
            Value::ObjectId(s) => match bson::oid::ObjectId::parse_str(&s) {
                Ok(oid) => Bson::ObjectId(oid),
                Err(_) => Bson::String(s),
            },
            Value::Uuid(s) => Bson::String(s),
            Value::Null => Bson::Null,
        }
    }
}

/// Shapes a document field back into a [`Value`] for row construction.
///
/// Missing fields (absent join matches) are represented by the caller as
/// [`Bson::Null`] before reaching this function, per the documented
/// `IS NULL` semantics (missing == null).
pub fn bson_to_value(bson: &Bson) -> Value {
    match bson {
        Bson::Double(f) => Value::Float(*f),
        Bson::String(s) => Value::Text(s.clone()),
        Bson::Array(_) | Bson::Document(_) => Value::Text(bson.to_string()),
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Null => Value::Null,
        Bson::Int32(i) => Value::Int(*i as i64),
        Bson::Int64(i) => Value::Int(*i),
        Bson::ObjectId(oid) => Value::ObjectId(oid.to_hex()),
        Bson::DateTime(dt) => Value::DateTime(dt.to_chrono()),
        Bson::Decimal128(d) => Value::Decimal(d.to_string()),
        Bson::Binary(bin) => Value::Blob(bin.bytes.clone()),
        other => Value::Text(other.to_string()),
    }
}
