//! The binary attachment sub-resource: request shapes, the resource that
//! resolves and dispatches them, and the store operations it performs.

pub mod operation;
pub mod request;
pub mod resource;
pub mod response;

// re-exports
pub use operation::{DeleteOperation, OperationBuilder, SaveOperation};
pub use request::{AttachmentRequest, UploadedPart, Verb};
pub use resource::{AttachmentResource, StartupError};
pub use response::{AttachmentOutcome, UploadedFile};
