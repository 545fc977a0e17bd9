use crate::{
    access::{ValueAccessor, read_value},
    model::{
        classify::{Classification, ClassificationError, classify},
        descriptor::{Constraint, PropertyDescriptor},
    },
    value::Value,
};
use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

///
/// FieldSpec
///
/// Configuration-time field declaration: display name, property key and
/// primary-key flag. Bound to its descriptor when the registry is built.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub key: String,

    #[serde(default)]
    pub primary_key: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            primary_key: false,
        }
    }

    /// Field that forms (part of) the entity's key.
    pub fn key_field(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            primary_key: true,
            ..Self::new(name, key)
        }
    }

    /// Field whose display name is derived from its property key.
    pub fn from_key(key: impl Into<String>) -> Self {
        let key = key.into();

        Self::new(display_name(&key), key)
    }

    pub const fn set_primary_key(&mut self, primary_key: bool) {
        self.primary_key = primary_key;
    }
}

/// Derive a display name from a property key (`invoiceDate` -> `Invoice Date`).
#[must_use]
pub fn display_name(key: &str) -> String {
    key.to_case(Case::Title)
}

///
/// FieldDescriptor
///
/// A field bound to its persisted property. The classification is computed
/// once, at bind time, and every predicate reads from the cached data.
///

#[derive(Clone, Debug, Serialize)]
pub struct FieldDescriptor {
    name: String,
    property_key: String,
    primary_key: bool,
    classification: Classification,

    #[serde(skip)]
    property: PropertyDescriptor,
}

impl FieldDescriptor {
    /// Bind a spec to its descriptor, classifying the property.
    pub fn bind(spec: FieldSpec, property: PropertyDescriptor) -> Result<Self, ClassificationError> {
        let classification = classify(&property)?;

        Ok(Self {
            name: spec.name,
            property_key: spec.key,
            primary_key: spec.primary_key,
            classification,
            property,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn property_key(&self) -> &str {
        &self.property_key
    }

    /// Stable external identifier of the field within its entity type.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.property_key
    }

    #[must_use]
    pub const fn classification(&self) -> Classification {
        self.classification
    }

    #[must_use]
    pub const fn property(&self) -> &PropertyDescriptor {
        &self.property
    }

    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.property
            .constraints
            .iter()
            .any(|constraint| constraint.implies_required())
    }

    #[must_use]
    pub fn is_generated_read_only(&self) -> bool {
        self.property.has_constraint(Constraint::Generated)
    }

    #[must_use]
    pub const fn is_sortable(&self) -> bool {
        self.classification.is_sortable()
    }

    #[must_use]
    pub const fn is_attachment(&self) -> bool {
        self.classification.is_attachment()
    }

    /// Read this field from an entity instance of the owning type.
    #[must_use]
    pub fn value(&self, entity: &dyn ValueAccessor) -> Option<Value> {
        read_value(entity, self.property.access, &self.property_key)
    }
}

///
/// TESTS
///
