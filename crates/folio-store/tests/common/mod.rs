#![allow(dead_code)]

use folio_core::schema::Schema;
use folio_core::{Attribute, Registry, SaveContext, SchemaBuilder, Settings};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

pub const TEST_NS: &str = "urn:folio:store-test";

pub struct Types {
    pub memo: Arc<Schema>,
    pub registry: Arc<Registry>,
}

/// A licensed `Memo` with a required `subject` and a text `body`
pub fn types() -> &'static Types {
    static TYPES: OnceLock<Types> = OnceLock::new();
    TYPES.get_or_init(|| {
        let memo = SchemaBuilder::new("Memo")
            .namespace(TEST_NS)
            .attribute("subject", Attribute::required())
            .subelement("body", &SchemaBuilder::text("MemoBody").build().unwrap())
            .licensed()
            .build()
            .unwrap();
        let registry = Registry::builder().register(&memo).unwrap().build();
        Types {
            memo,
            registry: Arc::new(registry),
        }
    })
}

pub fn settings() -> Arc<Settings> {
    Arc::new(Settings::default())
}

pub fn ctx() -> SaveContext {
    SaveContext::for_request(&Settings::default(), Some(("bob", "/user/bob")), "192.0.2.1", "store test")
}

pub fn setup_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp store directory")
}
