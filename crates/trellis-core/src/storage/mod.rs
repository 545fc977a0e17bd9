//! Storage and persistence collaborators.
//!
//! The attachment protocol never owns entities or bytes; it reaches them
//! through the traits defined here. `memory` and `fs` are the reference
//! backends.

pub mod fs;
pub mod loader;
pub mod memory;

use crate::{
    access::ValueAccessor, config::AdminConfig, error::InternalError,
    model::descriptor::PropertyDescriptor,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

// re-exports
pub use loader::{BufferedResponse, FetchOutcome, FileResourceLoader, ResponseChannel};

///
/// AttachmentKey
/// Addresses the content of one attachment field on one instance.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct AttachmentKey {
    pub namespace: String,
    pub id: String,
    pub property: String,
}

impl AttachmentKey {
    pub fn new(
        namespace: impl Into<String>,
        id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
            property: property.into(),
        }
    }
}

impl fmt::Display for AttachmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.id, self.property)
    }
}

/// Name given to stored content whose client file name is unusable.
pub const DEFAULT_FILE_NAME: &str = "attachment";

// Client names may carry paths from either platform.
fn storable_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");

    match base.as_str() {
        "" | "." | ".." => DEFAULT_FILE_NAME.to_string(),
        _ => base,
    }
}

///
/// StoredFile
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StoredFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl StoredFile {
    /// Stored file named after the last path component of a client-supplied
    /// `file_name`. Names with no usable component fall back to
    /// [`DEFAULT_FILE_NAME`].
    pub fn from_client(file_name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(storable_file_name(file_name), bytes)
    }

    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

///
/// AttachmentStore
///
/// Storage backend for attachment content. Implementations guard their
/// own concurrency; callers perform at most one operation per request.
///

pub trait AttachmentStore: Send + Sync {
    fn read(&self, key: &AttachmentKey) -> Result<Option<StoredFile>, InternalError>;

    /// Store `file`, replacing any previous content.
    fn write(&self, key: &AttachmentKey, file: StoredFile) -> Result<(), InternalError>;

    /// Remove stored content. Clearing absent content is not an error.
    fn clear(&self, key: &AttachmentKey) -> Result<(), InternalError>;
}

///
/// EntityInstance
///

pub trait EntityInstance: ValueAccessor + Send + Sync {
    /// Identifier used to address the instance's attachments.
    fn id(&self) -> &str;
}

///
/// EntityRepository
/// Identifier-based lookup supplied by the persistence layer.
///

pub trait EntityRepository: Send + Sync {
    fn find_by_id(
        &self,
        entity: &str,
        id: &str,
    ) -> Result<Option<Arc<dyn EntityInstance>>, InternalError>;
}

///
/// PropertyDescriptorProvider
/// Property metadata supplied by the persistence mapping layer.
///

pub trait PropertyDescriptorProvider {
    /// Every property of `entity`, or `None` for an unknown entity type.
    fn properties(&self, entity: &str) -> Option<Vec<PropertyDescriptor>>;

    fn property_descriptor(&self, entity: &str, property: &str) -> Option<PropertyDescriptor> {
        self.properties(entity)?
            .into_iter()
            .find(|p| p.key == property)
    }
}

/// Open the attachment store selected by `config`: a directory store when a
/// storage directory is configured, process memory otherwise.
pub fn open(config: &AdminConfig) -> Result<Arc<dyn AttachmentStore>, InternalError> {
    match &config.file_storage_directory {
        Some(dir) => {
            tracing::info!(root = %dir.display(), "using directory attachment store");
            Ok(Arc::new(fs::FsStore::open(dir)?))
        }
        None => {
            tracing::info!("using in-memory attachment store");
            Ok(Arc::new(memory::MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_file_names_are_reduced_to_their_last_component() {
        let cases = [
            ("scan.pdf", "scan.pdf"),
            ("sub/a.pdf", "a.pdf"),
            ("C:\\Users\\me\\b.png", "b.png"),
            ("", DEFAULT_FILE_NAME),
            ("..", DEFAULT_FILE_NAME),
            ("dir/", DEFAULT_FILE_NAME),
        ];

        for (client, stored) in cases {
            assert_eq!(StoredFile::from_client(client, vec![1]).file_name, stored, "{client}");
        }
    }
}
