use crate::storage::{FetchOutcome, StoredFile};
use serde::{Deserialize, Serialize};

///
/// UploadedFile
///
/// Upload representation echoed by REPLACE and accepted by commit.
/// JSON shape: `{"fileName": "...", "fileContent": "<base64>"}`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
    #[serde(with = "base64_content")]
    pub file_content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, file_content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            file_content: file_content.into(),
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.file_content.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.file_content.is_empty()
    }
}

impl From<UploadedFile> for StoredFile {
    fn from(file: UploadedFile) -> Self {
        Self::from_client(&file.file_name, file.file_content)
    }
}

mod base64_content {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;

        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}

///
/// AttachmentOutcome
/// Successful terminal state of one sub-resource call.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttachmentOutcome {
    Fetched(FetchOutcome),
    Deleted,
    Uploaded(UploadedFile),
}
