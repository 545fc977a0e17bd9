//! Core of trellis: property classification, the read-only model registry,
//! and the binary attachment sub-resource protocol. Transport-agnostic and
//! synchronous; `trellis-http` adapts it to HTTP.

// public exports are one module level down
pub mod access;
pub mod attachment;
pub mod config;
pub mod error;
pub mod model;
pub mod obs;
pub mod storage;
pub mod value;

///
/// CONSTANTS
///

/// Trailing path segment of the attachment sub-resource.
pub const FILE_SEGMENT: &str = "file";

///
/// Prelude
///
/// Domain vocabulary only. Stores, loaders and errors stay in their modules.
///

pub mod prelude {
    pub use crate::{
        access::{AccessStrategy, ValueAccessor},
        attachment::{AttachmentRequest, AttachmentResource, UploadedFile, Verb},
        model::{
            classify::{Classification, classify},
            descriptor::{Cardinality, Constraint, PropertyDescriptor, ValueType},
            field::{FieldDescriptor, FieldSpec},
            registry::{EntityModel, ModelRegistry},
        },
        value::Value,
    };
}
