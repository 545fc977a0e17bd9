use crate::{
    config::{AdminConfig, EntityConfig, validate_entity_name},
    model::field::{FieldDescriptor, FieldSpec},
    storage::PropertyDescriptorProvider,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};
use thiserror::Error as ThisError;

///
/// ErrorTree
/// Build-time errors keyed by the entity (or entity.field) they concern.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    errors: Vec<(String, String)>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, route: impl Into<String>, message: impl Into<String>) {
        self.errors.push((route.into(), message.into()));
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(r, m)| (r.as_str(), m.as_str()))
    }

    /// Whether any error under `route` mentions `needle`.
    #[must_use]
    pub fn contains(&self, route: &str, needle: &str) -> bool {
        self.iter().any(|(r, m)| r == route && m.contains(needle))
    }

    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (route, message)) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{route}: {message}")?;
        }

        Ok(())
    }
}

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("registry validation failed:\n{0}")]
    Validation(ErrorTree),
}

impl RegistryError {
    #[must_use]
    pub const fn errors(&self) -> &ErrorTree {
        match self {
            Self::Validation(tree) => tree,
        }
    }
}

///
/// EntityModel
/// Bound fields of one entity type, in declaration order.
///

#[derive(Clone, Debug)]
pub struct EntityModel {
    config: EntityConfig,
    fields: Vec<FieldDescriptor>,
    by_key: BTreeMap<String, usize>,
}

impl EntityModel {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub const fn config(&self) -> &EntityConfig {
        &self.config
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by property key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_primary_key())
    }

    pub fn attachment_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_attachment())
    }
}

///
/// ModelRegistry
///
/// Read-only entity type -> field registry. Built once at startup and
/// shared by reference; nothing mutates it afterwards.
///

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    entities: BTreeMap<String, EntityModel>,
}

impl ModelRegistry {
    /// Build a registry for every entity in `config`.
    pub fn from_config(
        config: &AdminConfig,
        provider: &dyn PropertyDescriptorProvider,
    ) -> Result<Self, RegistryError> {
        config
            .entities
            .iter()
            .cloned()
            .fold(RegistryBuilder::new(provider), RegistryBuilder::entity)
            .build()
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityModel> {
        self.entities.get(name)
    }

    #[must_use]
    pub fn field(&self, entity: &str, key: &str) -> Option<&FieldDescriptor> {
        self.entity(entity)?.field(key)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

///
/// RegistryBuilder
///
/// Collects entity configurations, allows primary-key promotion, then
/// binds and classifies every field in one pass.
///

pub struct RegistryBuilder<'a> {
    provider: &'a dyn PropertyDescriptorProvider,
    entities: Vec<EntityConfig>,
    pending: ErrorTree,
}

impl<'a> RegistryBuilder<'a> {
    #[must_use]
    pub fn new(provider: &'a dyn PropertyDescriptorProvider) -> Self {
        Self {
            provider,
            entities: Vec::new(),
            pending: ErrorTree::new(),
        }
    }

    #[must_use]
    pub fn entity(mut self, config: EntityConfig) -> Self {
        self.entities.push(config);
        self
    }

    /// Promote a declared field to key role. Unknown targets are reported
    /// by `build`.
    #[must_use]
    pub fn promote_key(mut self, entity: &str, key: &str) -> Self {
        let promoted = self
            .entities
            .iter_mut()
            .find(|e| e.name == entity)
            .is_some_and(|e| e.promote_key(key));

        if !promoted {
            self.pending
                .add(entity, format!("cannot promote undeclared field '{key}'"));
        }
        self
    }

    pub fn build(self) -> Result<ModelRegistry, RegistryError> {
        let mut errs = self.pending;
        let mut entities = BTreeMap::new();

        for config in self.entities {
            if let Err(message) = validate_entity_name(&config.name) {
                errs.add(config.name.as_str(), message);
                continue;
            }
            if entities.contains_key(&config.name) {
                errs.add(config.name.as_str(), "entity is registered more than once");
                continue;
            }

            if let Some(model) = bind_entity(self.provider, config.clone(), &mut errs) {
                tracing::debug!(
                    entity = %config.name,
                    fields = model.fields.len(),
                    "registered entity model"
                );
                entities.insert(config.name, model);
            }
        }

        errs.result().map_err(RegistryError::Validation)?;

        Ok(ModelRegistry { entities })
    }
}

// Bind one entity's field specs to the provider's descriptors.
fn bind_entity(
    provider: &dyn PropertyDescriptorProvider,
    config: EntityConfig,
    errs: &mut ErrorTree,
) -> Option<EntityModel> {
    let Some(properties) = provider.properties(&config.name) else {
        errs.add(
            config.name.as_str(),
            "entity type is unknown to the persistence layer",
        );
        return None;
    };

    let specs: Vec<FieldSpec> = if config.fields.is_empty() {
        properties
            .iter()
            .map(|p| FieldSpec::from_key(p.key.as_str()))
            .collect()
    } else {
        config.fields.clone()
    };

    let error_count = errs.len();
    let mut keys = BTreeSet::new();
    let mut names = BTreeSet::new();
    let mut fields = Vec::with_capacity(specs.len());

    for spec in specs {
        let route = format!("{}.{}", config.name, spec.key);

        if !keys.insert(spec.key.clone()) {
            errs.add(route, "duplicate property key");
            continue;
        }
        if !names.insert(spec.name.clone()) {
            errs.add(route, format!("duplicate field name '{}'", spec.name));
            continue;
        }

        let Some(property) = properties.iter().find(|p| p.key == spec.key).cloned() else {
            errs.add(route, "property is unknown to the persistence layer");
            continue;
        };

        match FieldDescriptor::bind(spec, property) {
            Ok(field) => fields.push(field),
            Err(e) => errs.add(route, e.to_string()),
        }
    }

    if errs.len() > error_count {
        return None;
    }

    let by_key = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.property_key().to_string(), i))
        .collect();

    Some(EntityModel {
        config,
        fields,
        by_key,
    })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{
            classify::Classification,
            descriptor::{Cardinality, PropertyDescriptor, ValueType},
        },
        storage::memory::MemoryRepository,
    };

    fn provider() -> MemoryRepository {
        let mut repo = MemoryRepository::new();
        repo.define(
            "Invoice",
            vec![
                PropertyDescriptor::new("id", ValueType::Ulid),
                PropertyDescriptor::new("name", ValueType::Text),
                PropertyDescriptor::new("scan", ValueType::Blob),
                PropertyDescriptor::relation("customer", "Customer"),
                PropertyDescriptor::relation("lines", "InvoiceLine")
                    .with_cardinality(Cardinality::Many),
                PropertyDescriptor::new("geo", ValueType::Unknown("Point".into())),
            ],
        );
        repo
    }

    #[test]
    fn declared_fields_are_bound_and_classified_once() {
        let provider = provider();
        let registry = RegistryBuilder::new(&provider)
            .entity(
                EntityConfig::new("Invoice")
                    .with_field(FieldSpec::key_field("Id", "id"))
                    .with_field(FieldSpec::from_key("scan"))
                    .with_field(FieldSpec::from_key("lines")),
            )
            .build()
            .expect("registry should build");

        let invoice = registry.entity("Invoice").expect("Invoice should be registered");
        assert_eq!(invoice.fields().len(), 3);
        assert_eq!(
            registry.field("Invoice", "scan").map(FieldDescriptor::classification),
            Some(Classification::BinaryAttachment)
        );
        assert_eq!(
            registry.field("Invoice", "lines").map(FieldDescriptor::classification),
            Some(Classification::MultiAssociation)
        );
        assert_eq!(invoice.primary_keys().count(), 1);
        assert_eq!(invoice.attachment_fields().count(), 1);
        assert!(registry.field("Invoice", "name").is_none(), "undeclared field stays hidden");
    }

    #[test]
    fn all_problems_are_reported_together() {
        let provider = provider();
        let err = RegistryBuilder::new(&provider)
            .entity(
                EntityConfig::new("Invoice")
                    .with_field(FieldSpec::from_key("name"))
                    .with_field(FieldSpec::new("Other Name", "name"))
                    .with_field(FieldSpec::from_key("geo"))
                    .with_field(FieldSpec::from_key("missing")),
            )
            .entity(EntityConfig::new("Ghost"))
            .build()
            .expect_err("invalid configuration should fail");
        let errors = err.errors();

        assert_eq!(errors.len(), 4, "errors: {errors}");
        assert!(errors.contains("Invoice.name", "duplicate property key"));
        assert!(errors.contains("Invoice.geo", "unmapped value type"));
        assert!(errors.contains("Invoice.missing", "unknown to the persistence layer"));
        assert!(errors.contains("Ghost", "entity type is unknown"));
    }

    #[test]
    fn duplicate_display_names_are_rejected() {
        let provider = provider();
        let err = RegistryBuilder::new(&provider)
            .entity(
                EntityConfig::new("Invoice")
                    .with_field(FieldSpec::new("Label", "name"))
                    .with_field(FieldSpec::new("Label", "scan")),
            )
            .build()
            .expect_err("duplicate names should fail");

        assert!(err.errors().contains("Invoice.scan", "duplicate field name 'Label'"));
    }

    #[test]
    fn promote_key_marks_field_before_build() {
        let provider = provider();
        let registry = RegistryBuilder::new(&provider)
            .entity(
                EntityConfig::new("Invoice")
                    .with_field(FieldSpec::from_key("id"))
                    .with_field(FieldSpec::from_key("name")),
            )
            .promote_key("Invoice", "name")
            .build()
            .expect("registry should build");

        let keys: Vec<_> = registry
            .entity("Invoice")
            .expect("Invoice should be registered")
            .primary_keys()
            .map(FieldDescriptor::property_key)
            .collect();
        assert_eq!(keys, vec!["name"]);
    }

    #[test]
    fn promoting_an_undeclared_field_is_reported() {
        let provider = provider();
        let err = RegistryBuilder::new(&provider)
            .entity(EntityConfig::new("Invoice").with_field(FieldSpec::from_key("id")))
            .promote_key("Invoice", "nope")
            .build()
            .expect_err("unknown promotion should fail");

        assert!(err.errors().contains("Invoice", "cannot promote undeclared field 'nope'"));
    }

    #[test]
    fn from_config_exposes_every_property_when_no_fields_declared() {
        let mut provider = MemoryRepository::new();
        provider.define(
            "Customer",
            vec![
                PropertyDescriptor::new("id", ValueType::Ulid),
                PropertyDescriptor::new("fullName", ValueType::Text),
            ],
        );
        let config = AdminConfig::default().with_entity(EntityConfig::new("Customer"));

        let registry =
            ModelRegistry::from_config(&config, &provider).expect("registry should build");

        let names: Vec<_> = registry
            .entity("Customer")
            .expect("Customer should be registered")
            .fields()
            .iter()
            .map(FieldDescriptor::name)
            .collect();
        assert_eq!(names, vec!["Id", "Full Name"]);
    }
}
