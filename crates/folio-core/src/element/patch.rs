//! Blueprint patching

use super::{Body, Element};
use crate::blueprint::{cast_to_string, expect_list, expect_object, expect_string, save_blueprint};
use crate::errors::Result;
use crate::save_context::SaveContext;
use crate::schema::Kind;
use crate::storage::ResourceDatabase;
use serde_json::{json, Value};

impl Element {
    /// Apply a blueprint to this element
    ///
    /// Keys naming attributes set them, keys naming subelements patch them
    /// recursively. Text elements and text blobs take `text`, arrays take
    /// `array` (replacing every item) and references take `resource`, which
    /// runs the nested create/patch/save pipeline. Unrelated keys are ignored.
    ///
    /// # Errors
    ///
    /// `BlueprintShape` carrying the offending fragment when the JSON has the
    /// wrong type, and anything the nested pipeline raises
    pub fn patch(&mut self, db: &ResourceDatabase, blueprint: &Value, ctx: &SaveContext) -> Result<()> {
        let fields = expect_object(blueprint)?;
        let schema = self.schema.clone();

        if matches!(schema.kind(), Kind::Common) {
            // provenance comes from the save context; only licenses are taken
            if let (Some(bp), Some(licenses)) = (fields.get("licenses"), self.children.get_mut("licenses")) {
                licenses.patch(db, bp, ctx)?;
            }
            return Ok(());
        }

        for name in schema.attributes().keys() {
            if let Some(value) = fields.get(name) {
                self.set(name, cast_to_string(value)?)?;
            }
        }

        for name in schema.subelements().keys() {
            if let (Some(bp), Some(child)) = (fields.get(name), self.children.get_mut(name)) {
                child.patch(db, bp, ctx)?;
            }
        }

        match schema.kind() {
            Kind::Text => {
                if let Some(text) = fields.get("text") {
                    let text = expect_string(text)?;
                    self.set_text(text)?;
                }
            }
            Kind::Array(spec) => {
                if let Some(array) = fields.get("array") {
                    let entries = expect_list(array)?;
                    let mut items = Vec::with_capacity(entries.len());
                    for entry in entries {
                        let mut item = Element::new(&spec.item);
                        item.patch(db, entry, ctx)?;
                        items.push(item);
                    }
                    self.body = Body::Items(items);
                }
            }
            Kind::Resource(_) => match fields.get("resource") {
                Some(Value::Null) => self.set_href("")?,
                Some(resource) => {
                    let urn = save_blueprint(db, &json!({ "resource": resource }), ctx, None)?;
                    self.set_href(urn.as_str())?;
                }
                None => {}
            },
            Kind::Blob(spec) if spec.text => {
                if let Some(text) = fields.get("text") {
                    let text = expect_string(text)?;
                    self.store_blob(db, text.as_bytes())?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Overwrite author and log message of a provenance block from `ctx`
    pub(crate) fn apply_save_context(&mut self, ctx: &SaveContext) -> Result<()> {
        if let Some(author) = self.children.get_mut("author") {
            author.set_text(ctx.author_name())?;
            author.set_href(ctx.author_full_absolute_url.as_str())?;
        }
        if let Some(log) = self.children.get_mut("log_message") {
            log.set_text(ctx.log_message.as_str())?;
        }
        Ok(())
    }
}
