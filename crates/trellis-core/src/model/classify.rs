//! Property classification.
//!
//! Maps a persisted property descriptor onto the closed set of semantic
//! kinds used by rendering, validation and the attachment sub-resource.
//! Pure and total over legal descriptors; an illegal descriptor is a
//! configuration error surfaced while the registry is built.

use crate::model::descriptor::{Cardinality, PropertyDescriptor, ValueType};
use derive_more::Display;
use serde::Serialize;
use thiserror::Error as ThisError;

///
/// Classification
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Classification {
    Simple,
    SingleAssociation,
    MultiAssociation,
    BinaryAttachment,
}

impl Classification {
    #[must_use]
    pub const fn is_association(self) -> bool {
        matches!(self, Self::SingleAssociation | Self::MultiAssociation)
    }

    #[must_use]
    pub const fn is_attachment(self) -> bool {
        matches!(self, Self::BinaryAttachment)
    }

    /// Only plain values can be ordered on.
    #[must_use]
    pub const fn is_sortable(self) -> bool {
        matches!(self, Self::Simple)
    }
}

///
/// ClassificationError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ClassificationError {
    #[error("property '{key}' has unmapped value type '{type_name}'")]
    UnmappedType { key: String, type_name: String },

    #[error("property '{key}' is marked as an attachment but its value type '{value_type}' cannot carry one")]
    InvalidAttachmentCarrier { key: String, value_type: String },
}

/// Classify one property descriptor.
///
/// Attachment takes precedence over multiplicity and relationships; a
/// collection of binary content is still an attachment.
pub fn classify(descriptor: &PropertyDescriptor) -> Result<Classification, ClassificationError> {
    if descriptor.attachment {
        if !descriptor.value_type.can_carry_attachment() {
            return Err(ClassificationError::InvalidAttachmentCarrier {
                key: descriptor.key.clone(),
                value_type: descriptor.value_type.to_string(),
            });
        }

        return Ok(Classification::BinaryAttachment);
    }

    if descriptor.value_type == ValueType::Blob {
        return Ok(Classification::BinaryAttachment);
    }

    if descriptor.relation.is_some() {
        return Ok(match descriptor.cardinality {
            Cardinality::Many => Classification::MultiAssociation,
            Cardinality::One | Cardinality::Opt => Classification::SingleAssociation,
        });
    }

    if let ValueType::Unknown(type_name) = &descriptor.value_type {
        return Err(ClassificationError::UnmappedType {
            key: descriptor.key.clone(),
            type_name: type_name.clone(),
        });
    }

    Ok(Classification::Simple)
}

///
/// TESTS
///
