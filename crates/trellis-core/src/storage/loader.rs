use crate::{
    config::{AdminConfig, EntityConfig},
    error::InternalError,
    model::field::FieldDescriptor,
    storage::{AttachmentKey, AttachmentStore, EntityInstance},
};
use sha2::{Digest, Sha256};
use std::{fmt::Write as _, io, sync::Arc};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";
pub const ETAG: &str = "ETag";

const OCTET_STREAM: &str = "application/octet-stream";

///
/// ResponseChannel
/// Destination for streamed attachment content.
///

pub trait ResponseChannel {
    fn set_header(&mut self, name: &str, value: String);

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
}

///
/// BufferedResponse
/// Response channel that keeps headers and body in memory.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BufferedResponse {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub writes: usize,
}

impl BufferedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl ResponseChannel for BufferedResponse {
    fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(chunk);
        self.writes += 1;

        Ok(())
    }
}

///
/// FetchOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchOutcome {
    /// Stored content was written to the channel.
    Streamed { bytes: u64 },
    /// Attachment field with no stored content.
    Empty,
    /// Field is not an attachment; nothing to stream.
    NotAttachment,
}

///
/// FileResourceLoader
///
/// Streams stored attachment content to a response channel, setting the
/// content headers. Bytes pass through untouched.
///

#[derive(Clone)]
pub struct FileResourceLoader {
    store: Arc<dyn AttachmentStore>,
    streaming: bool,
    chunk_size: usize,
}

impl FileResourceLoader {
    #[must_use]
    pub fn new(config: &AdminConfig, store: Arc<dyn AttachmentStore>) -> Self {
        Self {
            store,
            streaming: config.file_streaming_enabled,
            chunk_size: config.stream_chunk_bytes.max(1),
        }
    }

    pub fn download(
        &self,
        entity: &EntityConfig,
        instance: &dyn EntityInstance,
        field: &FieldDescriptor,
        channel: &mut dyn ResponseChannel,
    ) -> Result<FetchOutcome, InternalError> {
        if !field.is_attachment() {
            return Ok(FetchOutcome::NotAttachment);
        }

        let key = AttachmentKey::new(entity.namespace(), instance.id(), field.property_key());
        let Some(file) = self.store.read(&key)? else {
            return Ok(FetchOutcome::Empty);
        };
        if file.is_empty() {
            return Ok(FetchOutcome::Empty);
        }

        let content_type = mime_guess::from_path(&file.file_name)
            .first_raw()
            .unwrap_or(OCTET_STREAM);
        channel.set_header(CONTENT_TYPE, content_type.to_string());
        channel.set_header(CONTENT_LENGTH, file.len().to_string());
        channel.set_header(CONTENT_DISPOSITION, content_disposition(&file.file_name));
        channel.set_header(ETAG, etag(&file.bytes));

        let write_err = |e: io::Error| {
            InternalError::storage(format!("failed to stream attachment {key}: {e}"))
        };
        if self.streaming {
            for chunk in file.bytes.chunks(self.chunk_size) {
                channel.write_body(chunk).map_err(write_err)?;
            }
        } else {
            channel.write_body(&file.bytes).map_err(write_err)?;
        }

        Ok(FetchOutcome::Streamed {
            bytes: file.len() as u64,
        })
    }
}

fn content_disposition(file_name: &str) -> String {
    let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");

    format!("attachment; filename=\"{escaped}\"")
}

// Strong validator: hex SHA-256 of the content.
fn etag(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut tag = String::with_capacity(digest.len() * 2 + 2);
    tag.push('"');
    for byte in digest {
        let _ = write!(tag, "{byte:02x}");
    }
    tag.push('"');

    tag
}
