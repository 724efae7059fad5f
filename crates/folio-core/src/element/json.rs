//! JSON projection for clients

use super::{Body, Element};
use crate::errors::{FolioError, Result};
use crate::schema::Kind;
use crate::storage::ResourceDatabase;
use serde_json::{Map, Value};

impl Element {
    /// Attributes (minus blank optional and internal ones), non-null
    /// subelements, and the body under `text`, `array` or `resource`
    ///
    /// References are resolved through `db`; the `parents` of a provenance
    /// block are left out.
    ///
    /// # Errors
    ///
    /// Storage errors while resolving references or reading text blobs
    pub fn to_json(&self, db: &ResourceDatabase) -> Result<Value> {
        let mut out = Map::new();
        let is_common = matches!(self.schema.kind(), Kind::Common);

        for (name, child) in &self.children {
            if child.is_null() || (is_common && name == "parents") {
                continue;
            }
            out.insert(name.clone(), child.to_json(db)?);
        }

        for (name, attr) in self.schema.attributes() {
            let value = self.attributes.get(name).and_then(|v| v.as_deref());
            if attr.is_internal() || (attr.is_optional() && attr.blank_is_null() && value.unwrap_or_default().is_empty()) {
                continue;
            }
            let json = value.map_or(Value::Null, |v| Value::String(v.to_string()));
            out.insert(name.clone(), json);
        }

        match (&self.body, self.schema.kind()) {
            (Body::Text(text), _) => {
                out.insert("text".to_string(), Value::String(text.clone()));
            }
            (Body::Items(items), _) => {
                let array = items
                    .iter()
                    .map(|item| item.to_json(db))
                    .collect::<Result<Vec<_>>>()?;
                out.insert("array".to_string(), Value::Array(array));
            }
            (Body::Reference(_), _) => {
                let resource = match self.resource(db)? {
                    Some(resource) => resource.to_json(db)?,
                    None => Value::Null,
                };
                out.insert("resource".to_string(), resource);
            }
            (Body::Empty, Kind::Blob(spec)) if spec.text => {
                let bytes = self.blob(db)?;
                let text = String::from_utf8(bytes).map_err(FolioError::serialization)?;
                out.insert("text".to_string(), Value::String(text));
            }
            _ => {}
        }

        Ok(Value::Object(out))
    }
}
