//! Table of root types by fully-qualified tag
//!
//! Built once during bootstrap, immutable afterwards. `@create` blueprints
//! and document parsing resolve types against it exclusively.

use crate::errors::{FolioError, Result};
use crate::schema::Schema;
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: IndexMap<String, Arc<Schema>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `Declaration` if `schema` is not a root type or its tag is taken
    pub fn register(mut self, schema: &Arc<Schema>) -> Result<Self> {
        let tag = schema.root_tag().ok_or_else(|| FolioError::Declaration {
            type_name: schema.name().to_string(),
            message: "only root types can be registered".to_string(),
        })?;
        let clark = tag.clark();
        if self.types.contains_key(&clark) {
            return Err(FolioError::Declaration {
                type_name: schema.name().to_string(),
                message: format!("{} is already registered", clark),
            });
        }
        self.types.insert(clark, schema.clone());
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry { types: self.types }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    types: IndexMap<String, Arc<Schema>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up by Clark-notation tag, e.g. `{urn:example}picture`
    pub fn get(&self, clark: &str) -> Option<&Arc<Schema>> {
        self.types.get(clark)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered tags in registration order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn root(name: &str) -> Arc<Schema> {
        SchemaBuilder::new(name)
            .namespace("urn:test:registry")
            .root()
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let note = root("Note");
        let registry = Registry::builder().register(&note).unwrap().build();
        assert_eq!(registry.len(), 1);
        let found = registry.get("{urn:test:registry}note").unwrap();
        assert_eq!(found.id(), note.id());
        assert!(registry.get("{urn:test:registry}other").is_none());
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let err = Registry::builder()
            .register(&root("Note"))
            .unwrap()
            .register(&root("Note"))
            .unwrap_err();
        assert!(matches!(err, FolioError::Declaration { .. }));
    }

    #[test]
    fn test_non_root_rejected() {
        let plain = SchemaBuilder::new("Plain").build().unwrap();
        assert!(Registry::builder().register(&plain).is_err());
    }
}
