use crate::{
    attachment::{
        operation::OperationBuilder,
        request::{AttachmentRequest, UploadedPart, Verb},
        response::{AttachmentOutcome, UploadedFile},
    },
    config::{AdminConfig, ConfigError},
    error::InternalError,
    model::{
        field::FieldDescriptor,
        registry::{EntityModel, ModelRegistry, RegistryError},
    },
    obs::sink::{self, MetricsEvent},
    storage::{
        self, AttachmentStore, EntityInstance, EntityRepository, FetchOutcome, FileResourceLoader,
        PropertyDescriptorProvider, ResponseChannel,
    },
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// StartupError
///

#[derive(Debug, ThisError)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to open attachment store: {0}")]
    Storage(#[from] InternalError),
}

///
/// AttachmentResource
///
/// The `{entity}/{id}/{property}/file` sub-resource. Every call resolves
/// the entity type and instance first, then the field, then checks the
/// field kind before touching storage.
///

pub struct AttachmentResource {
    config: Arc<AdminConfig>,
    registry: Arc<ModelRegistry>,
    repository: Arc<dyn EntityRepository>,
    store: Arc<dyn AttachmentStore>,
    loader: FileResourceLoader,
}

impl AttachmentResource {
    #[must_use]
    pub fn new(
        config: Arc<AdminConfig>,
        registry: Arc<ModelRegistry>,
        repository: Arc<dyn EntityRepository>,
        store: Arc<dyn AttachmentStore>,
    ) -> Self {
        let loader = FileResourceLoader::new(&config, Arc::clone(&store));

        Self {
            config,
            registry,
            repository,
            store,
            loader,
        }
    }

    /// Validate `config`, build the registry from `repository`'s property
    /// metadata and open the configured store.
    pub fn bootstrap<R>(config: AdminConfig, repository: Arc<R>) -> Result<Self, StartupError>
    where
        R: EntityRepository + PropertyDescriptorProvider + 'static,
    {
        config.validate()?;
        let registry = ModelRegistry::from_config(&config, repository.as_ref())?;
        let store = storage::open(&config)?;

        tracing::info!(entities = registry.len(), "attachment resource ready");

        Ok(Self::new(Arc::new(config), Arc::new(registry), repository, store))
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Dispatch `request` on its verb.
    pub fn handle(
        &self,
        request: AttachmentRequest,
        channel: &mut dyn ResponseChannel,
    ) -> Result<AttachmentOutcome, InternalError> {
        let AttachmentRequest {
            entity,
            id,
            property,
            verb,
            parts,
        } = request;

        match verb {
            Verb::Fetch => self
                .fetch(&entity, &id, &property, channel)
                .map(AttachmentOutcome::Fetched),
            Verb::Delete => self
                .delete(&entity, &id, &property)
                .map(|()| AttachmentOutcome::Deleted),
            Verb::Replace => self
                .replace(&entity, parts)
                .map(AttachmentOutcome::Uploaded),
        }
    }

    /// Stream the content of an attachment field. Non-attachment fields and
    /// attachments without content write nothing and still succeed.
    pub fn fetch(
        &self,
        entity: &str,
        id: &str,
        property: &str,
        channel: &mut dyn ResponseChannel,
    ) -> Result<FetchOutcome, InternalError> {
        let (model, instance, field) = self
            .resolve(entity, id, property)
            .map_err(|err| rejected(entity, err))?;

        let outcome = self
            .loader
            .download(model.config(), instance.as_ref(), field, channel)?;
        match outcome {
            FetchOutcome::Streamed { bytes } => {
                tracing::debug!(entity, id, property, bytes, "attachment streamed");
                sink::record(MetricsEvent::Fetch { entity, bytes });
            }
            FetchOutcome::Empty => {
                tracing::debug!(entity, id, property, "attachment has no content");
                sink::record(MetricsEvent::FetchEmpty { entity });
            }
            FetchOutcome::NotAttachment => {
                tracing::debug!(entity, id, property, "fetch on non-attachment field skipped");
                sink::record(MetricsEvent::FetchSkipped { entity });
            }
        }

        Ok(outcome)
    }

    /// Clear the content of an attachment field. Repeating the call yields
    /// the same success.
    pub fn delete(&self, entity: &str, id: &str, property: &str) -> Result<(), InternalError> {
        let (model, instance, field) = self
            .resolve(entity, id, property)
            .and_then(|resolved| require_attachment(resolved, "DELETE"))
            .map_err(|err| rejected(entity, err))?;

        self.operations(model)
            .for_deletion(instance.as_ref())
            .perform(field)?;

        tracing::info!(entity, id, property, "attachment deleted");
        sink::record(MetricsEvent::Delete { entity });

        Ok(())
    }

    /// Echo the first uploaded file part. Nothing is resolved or persisted;
    /// `commit` is the persistence step. `entity` only attributes a
    /// rejection.
    pub fn replace(
        &self,
        entity: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<UploadedFile, InternalError> {
        let Some(part) = parts.into_iter().find(UploadedPart::is_file) else {
            return Err(rejected(
                entity,
                InternalError::method_not_allowed("upload carries no file content"),
            ));
        };

        let file = UploadedFile::new(part.file_name.unwrap_or_default(), part.bytes);
        sink::record(MetricsEvent::Upload {
            bytes: file.len() as u64,
        });

        Ok(file)
    }

    /// Persist `file` as the content of an attachment field.
    pub fn commit(
        &self,
        entity: &str,
        id: &str,
        property: &str,
        file: UploadedFile,
    ) -> Result<(), InternalError> {
        let (model, instance, field) = self
            .resolve(entity, id, property)
            .and_then(|resolved| require_attachment(resolved, "commit"))
            .map_err(|err| rejected(entity, err))?;

        let bytes = file.len() as u64;
        self.operations(model)
            .for_save(instance.as_ref())
            .perform(field, file)
            .map_err(|err| rejected(entity, err))?;

        tracing::info!(entity, id, property, bytes, "attachment committed");
        sink::record(MetricsEvent::Commit { entity, bytes });

        Ok(())
    }

    fn operations<'a>(&'a self, model: &'a EntityModel) -> OperationBuilder<'a> {
        OperationBuilder::new(&self.config, model.config(), self.store.as_ref())
    }

    // Entity type, then instance, then field.
    fn resolve(
        &self,
        entity: &str,
        id: &str,
        property: &str,
    ) -> Result<Resolved<'_>, InternalError> {
        let model = self
            .registry
            .entity(entity)
            .ok_or_else(|| InternalError::unknown_entity(entity))?;
        let instance = self
            .repository
            .find_by_id(entity, id)?
            .ok_or_else(|| InternalError::entity_not_found(entity, id))?;
        let field = model
            .field(property)
            .ok_or_else(|| InternalError::property_not_found(entity, property))?;

        tracing::debug!(entity, id, property, classification = %field.classification(), "resolved");

        Ok((model, instance, field))
    }
}

type Resolved<'a> = (&'a EntityModel, Arc<dyn EntityInstance>, &'a FieldDescriptor);

fn require_attachment<'a>(resolved: Resolved<'a>, verb: &str) -> Result<Resolved<'a>, InternalError> {
    let field = resolved.2;
    if field.is_attachment() {
        Ok(resolved)
    } else {
        Err(InternalError::method_not_allowed(format!(
            "{verb} is not allowed on non-attachment field '{}'",
            field.property_key()
        )))
    }
}

// Client rejections are logged and counted; other errors pass through.
fn rejected(entity: &str, err: InternalError) -> InternalError {
    if err.class.status_code() < 500 {
        tracing::warn!(entity, error = %err.display_with_class(), "attachment request rejected");
        sink::record(MetricsEvent::Rejected {
            entity,
            class: err.class,
        });
    }

    err
}
