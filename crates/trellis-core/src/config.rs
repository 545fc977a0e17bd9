//! Admin-wide and per-entity configuration.
//!
//! Loaded once at startup, validated, then shared read-only.

use crate::model::field::FieldSpec;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

/// Maximum length for entity type names.
pub const MAX_ENTITY_NAME_LEN: usize = 64;

/// Default upload limit (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Default chunk size used when streaming attachment bodies.
pub const DEFAULT_STREAM_CHUNK_BYTES: usize = 64 * 1024;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// AdminConfig
///
/// Admin-wide settings: where attachment content lives and how it is
/// streamed back to clients.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Root directory for stored attachments. When unset, attachments are
    /// kept in process memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_storage_directory: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub file_streaming_enabled: bool,

    #[serde(default = "default_stream_chunk_bytes")]
    pub stream_chunk_bytes: usize,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

const fn default_true() -> bool {
    true
}

const fn default_stream_chunk_bytes() -> usize {
    DEFAULT_STREAM_CHUNK_BYTES
}

const fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            file_storage_directory: None,
            file_streaming_enabled: true,
            stream_chunk_bytes: DEFAULT_STREAM_CHUNK_BYTES,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            entities: Vec::new(),
        }
    }
}

impl AdminConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityConfig) -> Self {
        self.entities.push(entity);
        self
    }

    #[must_use]
    pub fn with_storage_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file_storage_directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Check settings that do not depend on the persistence layer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_chunk_bytes == 0 {
            return Err(ConfigError::Invalid(
                "stream_chunk_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for entity in &self.entities {
            validate_entity_name(&entity.name).map_err(ConfigError::Invalid)?;
            if !seen.insert(entity.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "entity '{}' is configured more than once",
                    entity.name
                )));
            }
        }

        Ok(())
    }
}

///
/// EntityConfig
///
/// Per-entity-group settings. An empty `fields` list exposes every
/// property the persistence layer reports.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityConfig {
    pub name: String,

    /// Storage grouping for attachment keys; defaults to the entity name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
}

impl EntityConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage_namespace: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_storage_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.storage_namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.storage_namespace.as_deref().unwrap_or(&self.name)
    }

    /// Flag the field with `key` as (part of) the primary key.
    /// Returns false when no such field is declared.
    pub fn promote_key(&mut self, key: &str) -> bool {
        match self.fields.iter_mut().find(|f| f.key == key) {
            Some(field) => {
                field.set_primary_key(true);
                true
            }
            None => false,
        }
    }
}

/// Ensure entity names are non-empty, ASCII, and within the maximum length.
pub(crate) fn validate_entity_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("entity name is empty".to_string());
    }
    if name.len() > MAX_ENTITY_NAME_LEN {
        return Err(format!(
            "entity name '{name}' exceeds max length {MAX_ENTITY_NAME_LEN}"
        ));
    }
    if !name.is_ascii() {
        return Err(format!("entity name '{name}' must be ASCII"));
    }

    Ok(())
}
