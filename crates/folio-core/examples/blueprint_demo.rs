//! Blueprint walkthrough
//!
//! Declares a licensed `Recipe` type, creates one from a JSON blueprint,
//! derives a new version with `@patch` and prints both documents.
//!
//! Run with: cargo run -p folio-core --example blueprint_demo

use folio_core::logging_facility::{init, Profile};
use folio_core::{
    save_blueprint, Attribute, MemoryStore, Registry, ResourceDatabase, SaveContext,
    SchemaBuilder, Settings,
};
use serde_json::json;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(Profile::Development);

    let recipe = SchemaBuilder::new("Recipe")
        .namespace("urn:example:kitchen")
        .attribute("title", Attribute::required())
        .subelement("method", &SchemaBuilder::text("Method").build()?)
        .licensed()
        .build()?;
    let registry = Registry::builder().register(&recipe)?.build();

    let settings = Arc::new(Settings {
        site_domain: Some("kitchen.example.org".to_string()),
        ..Settings::default()
    });
    let store = Arc::new(MemoryStore::new());
    let db = ResourceDatabase::new(store.clone(), Arc::new(registry), settings.clone());
    let ctx = SaveContext::for_request(&settings, Some(("cook", "/user/cook")), "127.0.0.1", "first draft");

    let first = save_blueprint(
        &db,
        &json!({"resource": {
            "@create": "{urn:example:kitchen}recipe",
            "title": "Flatbread",
            "method": {"text": "Mix, rest, roll, bake."},
            "tags": {"array": [{"value": "bread"}]}
        }}),
        &ctx,
        None,
    )?;
    println!("saved {}", first);
    println!("{}", String::from_utf8_lossy(&db.get_xml(&first)?));

    let second = save_blueprint(
        &db,
        &json!({"resource": {"@patch": first.as_str(), "title": "Garlic flatbread"}}),
        &ctx,
        None,
    )?;
    println!("derived {}", second);
    println!("{}", serde_json::to_string_pretty(&db.get_resource_object(&second)?.to_json(&db)?)?);
    println!("objects stored: {}", store.len());

    Ok(())
}
