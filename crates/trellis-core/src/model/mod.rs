//! Runtime entity model.
//!
//! - `descriptor` is what the persistence layer tells us about a property
//! - `classify` decides what kind of property it is
//! - `field` binds the two into a `FieldDescriptor`
//! - `registry` holds every bound field, keyed by entity type
pub mod classify;
pub mod descriptor;
pub mod field;
pub mod registry;
