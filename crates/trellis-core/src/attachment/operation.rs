use crate::{
    attachment::response::UploadedFile,
    config::{AdminConfig, EntityConfig},
    error::InternalError,
    model::field::FieldDescriptor,
    storage::{AttachmentKey, AttachmentStore, EntityInstance},
};

///
/// OperationBuilder
///
/// Produces delete and save operations against the attachment store for
/// one entity group. Holds borrowed context only; building is free of
/// side effects.
///

#[derive(Clone, Copy)]
pub struct OperationBuilder<'a> {
    config: &'a AdminConfig,
    entity: &'a EntityConfig,
    store: &'a dyn AttachmentStore,
}

impl<'a> OperationBuilder<'a> {
    #[must_use]
    pub const fn new(
        config: &'a AdminConfig,
        entity: &'a EntityConfig,
        store: &'a dyn AttachmentStore,
    ) -> Self {
        Self {
            config,
            entity,
            store,
        }
    }

    #[must_use]
    pub const fn for_deletion(self, instance: &'a dyn EntityInstance) -> DeleteOperation<'a> {
        DeleteOperation {
            builder: self,
            instance,
        }
    }

    #[must_use]
    pub const fn for_save(self, instance: &'a dyn EntityInstance) -> SaveOperation<'a> {
        SaveOperation {
            builder: self,
            instance,
        }
    }

    fn key(&self, instance: &dyn EntityInstance, field: &FieldDescriptor) -> AttachmentKey {
        AttachmentKey::new(self.entity.namespace(), instance.id(), field.property_key())
    }
}

fn require_attachment(field: &FieldDescriptor, action: &str) -> Result<(), InternalError> {
    if field.is_attachment() {
        Ok(())
    } else {
        Err(InternalError::operation_invariant(format!(
            "cannot {action} non-attachment field '{}'",
            field.property_key()
        )))
    }
}

///
/// DeleteOperation
///

pub struct DeleteOperation<'a> {
    builder: OperationBuilder<'a>,
    instance: &'a dyn EntityInstance,
}

impl DeleteOperation<'_> {
    /// Clear the stored content of `field`. Clearing absent content succeeds.
    pub fn perform(&self, field: &FieldDescriptor) -> Result<(), InternalError> {
        require_attachment(field, "delete content of")?;

        let key = self.builder.key(self.instance, field);
        self.builder.store.clear(&key)?;
        tracing::debug!(%key, "attachment content cleared");

        Ok(())
    }
}

///
/// SaveOperation
///

pub struct SaveOperation<'a> {
    builder: OperationBuilder<'a>,
    instance: &'a dyn EntityInstance,
}

impl SaveOperation<'_> {
    /// Store `file` as the content of `field`, replacing prior content.
    pub fn perform(&self, field: &FieldDescriptor, file: UploadedFile) -> Result<(), InternalError> {
        require_attachment(field, "save content to")?;

        let limit = self.builder.config.max_upload_bytes;
        if file.len() > limit {
            return Err(InternalError::payload_too_large(file.len(), limit));
        }

        let key = self.builder.key(self.instance, field);
        let bytes = file.len();
        self.builder.store.write(&key, file.into())?;
        tracing::debug!(%key, bytes, "attachment content saved");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorClass, ErrorOrigin},
        model::{
            descriptor::{PropertyDescriptor, ValueType},
            field::FieldSpec,
        },
        storage::{
            StoredFile,
            memory::{MemoryStore, Record},
        },
    };

    fn field(key: &str, value_type: ValueType) -> FieldDescriptor {
        FieldDescriptor::bind(FieldSpec::from_key(key), PropertyDescriptor::new(key, value_type))
            .expect("descriptor should classify")
    }

    #[test]
    fn save_then_delete_round_trips_through_store() {
        let config = AdminConfig::default();
        let entity = EntityConfig::new("Invoice");
        let store = MemoryStore::new();
        let record = Record::new("42");
        let scan = field("scan", ValueType::Blob);
        let builder = OperationBuilder::new(&config, &entity, &store);

        builder
            .for_save(&record)
            .perform(&scan, UploadedFile::new("a.pdf", vec![1, 2, 3]))
            .expect("save should succeed");
        let key = AttachmentKey::new("Invoice", "42", "scan");
        assert_eq!(
            store.read(&key).expect("read should succeed"),
            Some(StoredFile::new("a.pdf", vec![1, 2, 3]))
        );

        let delete = builder.for_deletion(&record);
        delete.perform(&scan).expect("delete should succeed");
        delete.perform(&scan).expect("repeat delete should succeed");
        assert!(store.is_empty());
    }

    #[test]
    fn non_attachment_fields_are_refused() {
        let config = AdminConfig::default();
        let entity = EntityConfig::new("Invoice");
        let store = MemoryStore::new();
        let record = Record::new("42");
        let name = field("name", ValueType::Text);
        let builder = OperationBuilder::new(&config, &entity, &store);

        let err = builder
            .for_deletion(&record)
            .perform(&name)
            .expect_err("delete on a plain field should fail");
        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert_eq!(err.origin, ErrorOrigin::Operation);

        builder
            .for_save(&record)
            .perform(&name, UploadedFile::new("a.txt", vec![1]))
            .expect_err("save on a plain field should fail");
        assert!(store.is_empty());
    }

    #[test]
    fn oversized_save_never_reaches_store() {
        let config = AdminConfig {
            max_upload_bytes: 2,
            ..AdminConfig::default()
        };
        let entity = EntityConfig::new("Invoice");
        let store = MemoryStore::new();
        let record = Record::new("42");

        let err = OperationBuilder::new(&config, &entity, &store)
            .for_save(&record)
            .perform(&field("scan", ValueType::Blob), UploadedFile::new("a", vec![0; 3]))
            .expect_err("oversized content should be rejected");

        assert_eq!(err.class, ErrorClass::PayloadTooLarge);
        assert!(store.is_empty());
    }
}
