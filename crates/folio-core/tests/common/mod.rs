#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use folio_core::schema::Schema;
use folio_core::{
    Attribute, FixedClock, MemoryStore, Registry, ResourceDatabase, SaveContext, SchemaBuilder,
    Settings,
};
use std::sync::{Arc, OnceLock};

pub const TEST_NS: &str = "urn:folio:test";

/// Types shared by the integration tests
pub struct Types {
    pub tag_element: Arc<Schema>,
    pub picture: Arc<Schema>,
    pub lesson: Arc<Schema>,
    pub note: Arc<Schema>,
    pub registry: Arc<Registry>,
}

/// Built once per test binary so schema ids stay stable across tests
pub fn types() -> &'static Types {
    static TYPES: OnceLock<Types> = OnceLock::new();
    TYPES.get_or_init(|| {
        let tag_element = SchemaBuilder::new("TagElement")
            .namespace(TEST_NS)
            .attribute("value", Attribute::required())
            .licensed()
            .build()
            .unwrap();

        let picture = SchemaBuilder::new("Picture")
            .namespace(TEST_NS)
            .subelement(
                "image",
                &SchemaBuilder::typed_blob("ImageBlob", Some(&["image/png", "image/jpeg"][..]))
                    .build()
                    .unwrap(),
            )
            .subelement("caption", &SchemaBuilder::text("Caption").build().unwrap())
            .licensed()
            .build()
            .unwrap();

        let picture_ref = SchemaBuilder::resource_link("PictureRef", &[&picture])
            .build()
            .unwrap();
        let lesson = SchemaBuilder::new("Lesson")
            .namespace(TEST_NS)
            .attribute("level", Attribute::optional())
            .subelement(
                "pictures",
                &SchemaBuilder::array("Pictures", &picture_ref)
                    .bounds(1, Some(3))
                    .build()
                    .unwrap(),
            )
            .subelement("notes", &SchemaBuilder::text_blob("NotesBlob").build().unwrap())
            .licensed()
            .build()
            .unwrap();

        let note = SchemaBuilder::new("Note")
            .namespace(TEST_NS)
            .attribute("title", Attribute::required())
            .attribute("lang", Attribute::optional())
            .subelement("body", &SchemaBuilder::text("Body").build().unwrap())
            .subelement(
                "keywords",
                &SchemaBuilder::array("Keywords", &SchemaBuilder::text("Keyword").build().unwrap())
                    .build()
                    .unwrap(),
            )
            .root()
            .build()
            .unwrap();

        let registry = Registry::builder()
            .register(&tag_element)
            .unwrap()
            .register(&picture)
            .unwrap()
            .register(&lesson)
            .unwrap()
            .register(&note)
            .unwrap()
            .build();

        Types {
            tag_element,
            picture,
            lesson,
            note,
            registry: Arc::new(registry),
        }
    })
}

pub fn settings() -> Settings {
    Settings {
        site_domain: Some("folio.example.org".to_string()),
        ..Settings::default()
    }
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2010, 3, 14, 15, 9, 26).unwrap()))
}

/// Database over a fresh memory store, with a fixed clock
pub fn new_db() -> (ResourceDatabase, Arc<MemoryStore>) {
    new_db_with(settings())
}

pub fn new_db_with(settings: Settings) -> (ResourceDatabase, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let db = ResourceDatabase::new(store.clone(), types().registry.clone(), Arc::new(settings))
        .with_clock(fixed_clock());
    (db, store)
}

pub fn ctx() -> SaveContext {
    SaveContext::for_request(&settings(), Some(("alice", "/user/alice")), "10.0.0.7", "test save")
}

/// Clark-notation name of a registered test type
pub fn fqn(local: &str) -> String {
    format!("{{{}}}{}", TEST_NS, local)
}
