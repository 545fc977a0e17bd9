use derive_more::Display;

///
/// Verb
/// Sub-resource operations carried by an attachment request.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Verb {
    Fetch,
    Delete,
    Replace,
}

///
/// UploadedPart
///
/// One decoded multipart part. Only parts carrying a file name count as
/// uploaded content; plain form fields are ignored.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedPart {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            ..Self::default()
        }
    }

    /// File part with the given client-side file name.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(name, bytes).with_file_name(file_name)
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub const fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

///
/// AttachmentRequest
/// Addresses one sub-resource: `{entity, id, property}` plus the verb.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachmentRequest {
    pub entity: String,
    pub id: String,
    pub property: String,
    pub verb: Verb,
    pub parts: Vec<UploadedPart>,
}

impl AttachmentRequest {
    pub fn new(
        verb: Verb,
        entity: impl Into<String>,
        id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            id: id.into(),
            property: property.into(),
            verb,
            parts: Vec::new(),
        }
    }

    pub fn fetch(
        entity: impl Into<String>,
        id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self::new(Verb::Fetch, entity, id, property)
    }

    pub fn delete(
        entity: impl Into<String>,
        id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self::new(Verb::Delete, entity, id, property)
    }

    pub fn replace(
        entity: impl Into<String>,
        id: impl Into<String>,
        property: impl Into<String>,
        parts: Vec<UploadedPart>,
    ) -> Self {
        Self {
            parts,
            ..Self::new(Verb::Replace, entity, id, property)
        }
    }
}
