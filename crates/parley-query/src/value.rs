use std::fmt;

use bson::Bson;

/// A typed literal produced by coercing user text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    pub fn to_bson(&self) -> Bson {
        match self {
            Scalar::Int(v) => Bson::Int64(*v),
            Scalar::Float(v) => Bson::Double(*v),
            Scalar::Bool(v) => Bson::Boolean(*v),
            Scalar::Text(v) => Bson::String(v.clone()),
        }
    }
}

impl From<Scalar> for Bson {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(v) => Bson::String(v),
            other => other.to_bson(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}
