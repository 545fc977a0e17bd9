use crate::{
    access::{AccessStrategy, ValueAccessor},
    error::InternalError,
    model::descriptor::PropertyDescriptor,
    storage::{
        AttachmentKey, AttachmentStore, EntityInstance, EntityRepository,
        PropertyDescriptorProvider, StoredFile,
    },
    value::Value,
};
use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

///
/// MemoryStore
/// Attachment content held in process memory.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RwLock<BTreeMap<AttachmentKey, StoredFile>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: PoisonError<T>) -> InternalError {
    InternalError::storage("memory store lock poisoned")
}

impl AttachmentStore for MemoryStore {
    fn read(&self, key: &AttachmentKey) -> Result<Option<StoredFile>, InternalError> {
        let files = self.files.read().map_err(poisoned)?;

        Ok(files.get(key).cloned())
    }

    fn write(&self, key: &AttachmentKey, file: StoredFile) -> Result<(), InternalError> {
        self.files.write().map_err(poisoned)?.insert(key.clone(), file);

        Ok(())
    }

    fn clear(&self, key: &AttachmentKey) -> Result<(), InternalError> {
        self.files.write().map_err(poisoned)?.remove(key);

        Ok(())
    }
}

///
/// Record
///
/// Entity instance held by `MemoryRepository`. Accessor and member values
/// are kept apart so both access strategies can be exercised.
///

#[derive(Clone, Debug, Default)]
pub struct Record {
    id: String,
    accessors: BTreeMap<String, Value>,
    members: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set a value visible to both strategies.
    #[must_use]
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        let property = property.into();
        let value = value.into();
        self.accessors.insert(property.clone(), value.clone());
        self.members.insert(property, value);
        self
    }

    /// Set a value visible only through direct member access.
    #[must_use]
    pub fn with_member(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(property.into(), value.into());
        self
    }
}

impl ValueAccessor for Record {
    fn read(&self, strategy: AccessStrategy, property: &str) -> Option<Value> {
        let values = match strategy {
            AccessStrategy::Accessor => &self.accessors,
            AccessStrategy::Member => &self.members,
        };

        values.get(property).cloned()
    }
}

impl EntityInstance for Record {
    fn id(&self) -> &str {
        &self.id
    }
}

///
/// MemoryRepository
///
/// In-memory persistence layer: entity definitions plus records keyed by
/// identifier. Serves both identifier lookup and property metadata.
///

#[derive(Debug, Default)]
pub struct MemoryRepository {
    definitions: BTreeMap<String, Vec<PropertyDescriptor>>,
    records: RwLock<BTreeMap<(String, String), Arc<Record>>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define an entity type and its properties.
    pub fn define(&mut self, entity: impl Into<String>, properties: Vec<PropertyDescriptor>) {
        self.definitions.insert(entity.into(), properties);
    }

    pub fn insert(&self, entity: impl Into<String>, record: Record) -> Result<(), InternalError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| InternalError::repository("memory repository lock poisoned"))?;
        records.insert((entity.into(), record.id.clone()), Arc::new(record));

        Ok(())
    }
}

impl EntityRepository for MemoryRepository {
    fn find_by_id(
        &self,
        entity: &str,
        id: &str,
    ) -> Result<Option<Arc<dyn EntityInstance>>, InternalError> {
        let records = self
            .records
            .read()
            .map_err(|_| InternalError::repository("memory repository lock poisoned"))?;

        Ok(records
            .get(&(entity.to_string(), id.to_string()))
            .map(|record| Arc::clone(record) as Arc<dyn EntityInstance>))
    }
}

impl PropertyDescriptorProvider for MemoryRepository {
    fn properties(&self, entity: &str) -> Option<Vec<PropertyDescriptor>> {
        self.definitions.get(entity).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::descriptor::ValueType;

    #[test]
    fn clear_is_idempotent() {
        let store = MemoryStore::new();
        let key = AttachmentKey::new("Invoice", "42", "scan");
        store
            .write(&key, StoredFile::new("scan.pdf", b"%PDF".to_vec()))
            .expect("write should succeed");

        store.clear(&key).expect("first clear should succeed");
        store.clear(&key).expect("second clear should succeed");

        assert!(store.read(&key).expect("read should succeed").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn write_replaces_previous_content() {
        let store = MemoryStore::new();
        let key = AttachmentKey::new("Invoice", "42", "scan");
        store
            .write(&key, StoredFile::new("a.pdf", vec![1]))
            .expect("write should succeed");
        store
            .write(&key, StoredFile::new("b.pdf", vec![2, 3]))
            .expect("rewrite should succeed");

        let file = store
            .read(&key)
            .expect("read should succeed")
            .expect("content should exist");
        assert_eq!(file, StoredFile::new("b.pdf", vec![2, 3]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn repository_finds_inserted_records_only() {
        let repo = MemoryRepository::new();
        repo.insert("Invoice", Record::new("42").with("name", "March"))
            .expect("insert should succeed");

        let found = repo
            .find_by_id("Invoice", "42")
            .expect("lookup should succeed")
            .expect("record should exist");
        assert_eq!(found.id(), "42");
        assert_eq!(
            found.read(AccessStrategy::Accessor, "name"),
            Some(Value::from("March"))
        );
        assert!(
            repo.find_by_id("Invoice", "999")
                .expect("lookup should succeed")
                .is_none()
        );
        assert!(
            repo.find_by_id("Customer", "42")
                .expect("lookup should succeed")
                .is_none(),
            "identifiers are scoped per entity type"
        );
    }

    #[test]
    fn member_only_values_are_hidden_from_accessor() {
        let record = Record::new("1").with_member("secret", "x");

        assert_eq!(record.read(AccessStrategy::Accessor, "secret"), None);
        assert_eq!(
            record.read(AccessStrategy::Member, "secret"),
            Some(Value::from("x"))
        );
    }

    #[test]
    fn provider_reports_unknown_entities_as_none() {
        let mut repo = MemoryRepository::new();
        repo.define("Invoice", vec![PropertyDescriptor::new("name", ValueType::Text)]);

        assert!(repo.property_descriptor("Invoice", "name").is_some());
        assert!(repo.property_descriptor("Invoice", "nope").is_none());
        assert!(repo.properties("Customer").is_none());
    }
}
