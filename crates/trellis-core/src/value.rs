use serde::{Deserialize, Serialize};
use ulid::Ulid;

///
/// Value
///
/// Runtime value read from an entity instance through generic field access.
/// Absence is expressed by the caller as `Option<Value>`; `Null` is an
/// explicitly stored null.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Float(f64),
    Int(i64),
    /// Ordered list of values.
    /// Used for many-cardinality properties.
    List(Vec<Self>),
    Null,
    Text(String),
    /// Reference to another entity by its identifier.
    Ref(String),
    Uint(u64),
    Ulid(Ulid),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(bytes)
    }
}

impl From<Ulid> for Value {
    fn from(id: Ulid) -> Self {
        Self::Ulid(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_only_their_variant() {
        let text = Value::from("March");
        let blob = Value::from(vec![1_u8, 2]);

        assert_eq!(text.as_text(), Some("March"));
        assert_eq!(text.as_blob(), None);
        assert_eq!(blob.as_blob(), Some([1_u8, 2].as_slice()));
        assert!(Value::Null.is_null());
        assert!(!blob.is_null());
    }

    #[test]
    fn ulid_values_round_trip_through_json() {
        let id = Ulid::from_parts(1_700_000_000_000, 42);
        let value = Value::from(id);

        let json = serde_json::to_string(&value).expect("value should serialize");
        let back: Value = serde_json::from_str(&json).expect("value should deserialize");
        assert_eq!(back, Value::Ulid(id));
    }
}
