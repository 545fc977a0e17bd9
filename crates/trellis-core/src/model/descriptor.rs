use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, FromStr, PartialEq, Serialize)]
pub enum Cardinality {
    #[default]
    One,
    Opt,
    Many,
}

///
/// ValueType
///
/// Declared value type of a persisted property, as named by the
/// persistence mapping layer. `Unknown` carries the raw type name of a
/// shape the mapping layer could not place.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum ValueType {
    Blob,
    Bool,
    Date,
    Decimal,
    Embedded,
    Enum,
    Float,
    Int,
    Text,
    Timestamp,
    Uint,
    Ulid,
    #[display("Unknown({_0})")]
    Unknown(String),
}

impl ValueType {
    /// Value types able to carry attachment content or a reference to it.
    #[must_use]
    pub const fn can_carry_attachment(&self) -> bool {
        matches!(self, Self::Blob | Self::Text)
    }
}

///
/// Constraint
///
/// Declared constraints and markers on a property.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum Constraint {
    NotNull,
    NotBlank,
    NotEmpty,
    Generated,
}

impl Constraint {
    #[must_use]
    pub const fn implies_required(self) -> bool {
        matches!(self, Self::NotNull | Self::NotBlank | Self::NotEmpty)
    }
}

///
/// AccessPaths
///
/// Generic access strategies available for one property.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AccessPaths {
    pub accessor: bool,
    pub member: bool,
}

impl AccessPaths {
    pub const BOTH: Self = Self {
        accessor: true,
        member: true,
    };
    pub const MEMBER_ONLY: Self = Self {
        accessor: false,
        member: true,
    };
    pub const NONE: Self = Self {
        accessor: false,
        member: false,
    };
}

///
/// PropertyDescriptor
///
/// Structural metadata for one property of one entity type, supplied by
/// the persistence mapping layer and immutable once produced.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    pub key: String,
    pub value_type: ValueType,

    #[serde(default)]
    pub cardinality: Cardinality,

    /// Target entity type when the property is a relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    /// Explicit file-reference marker.
    #[serde(default)]
    pub attachment: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,

    #[serde(default = "default_access")]
    pub access: AccessPaths,
}

const fn default_access() -> AccessPaths {
    AccessPaths::BOTH
}

impl PropertyDescriptor {
    /// Plain single-valued property reachable through both access paths.
    pub fn new(key: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            key: key.into(),
            value_type,
            cardinality: Cardinality::One,
            relation: None,
            attachment: false,
            constraints: Vec::new(),
            access: AccessPaths::BOTH,
        }
    }

    /// Relationship to `target`, keyed by the target's identifier type.
    pub fn relation(key: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            relation: Some(target.into()),
            ..Self::new(key, ValueType::Ulid)
        }
    }

    /// Text property carrying a reference to externally stored content.
    pub fn file_reference(key: impl Into<String>) -> Self {
        Self {
            attachment: true,
            ..Self::new(key, ValueType::Text)
        }
    }

    #[must_use]
    pub const fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    #[must_use]
    pub const fn with_access(mut self, access: AccessPaths) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn has_constraint(&self, constraint: Constraint) -> bool {
        self.constraints.contains(&constraint)
    }

    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.cardinality, Cardinality::Many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults_apply_when_deserializing() {
        let descriptor: PropertyDescriptor =
            serde_json::from_str(r#"{ "key": "total", "value_type": "Decimal" }"#)
                .expect("minimal descriptor should deserialize");

        assert_eq!(descriptor.cardinality, Cardinality::One);
        assert_eq!(descriptor.access, AccessPaths::BOTH);
        assert!(descriptor.relation.is_none());
        assert!(!descriptor.attachment);
    }

    #[test]
    fn with_constraint_does_not_duplicate() {
        let descriptor = PropertyDescriptor::new("name", ValueType::Text)
            .with_constraint(Constraint::NotBlank)
            .with_constraint(Constraint::NotBlank);

        assert_eq!(descriptor.constraints, vec![Constraint::NotBlank]);
    }

    #[test]
    fn cardinality_parses_from_its_display_form() {
        let parsed: Cardinality = "Many".parse().expect("cardinality should parse");

        assert_eq!(parsed, Cardinality::Many);
        assert_eq!(Cardinality::Opt.to_string(), "Opt");
    }
}
