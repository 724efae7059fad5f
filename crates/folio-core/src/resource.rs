//! Root resources: addressable, content-hashed, immutable once saved

use crate::clock::Clock;
use crate::element::{license_hrefs, Element, ValidationMode};
use crate::errors::{FolioError, Result};
use crate::registry::Registry;
use crate::save_context::SaveContext;
use crate::schema::Schema;
use crate::storage::ResourceDatabase;
use crate::urn::Urn;
use crate::xml::XmlNode;
use crate::{log_op_end, log_op_error, log_op_start};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Instance of a root type, plus its URN once saved
#[derive(Debug, Clone)]
pub struct Resource {
    element: Element,
    urn: Option<Urn>,
}

impl Resource {
    /// # Errors
    ///
    /// `Declaration` if `schema` is not a root type
    pub fn new(schema: &Arc<Schema>) -> Result<Self> {
        if !schema.is_root() {
            return Err(FolioError::Declaration {
                type_name: schema.name().to_string(),
                message: "not a root type".to_string(),
            });
        }
        Ok(Self {
            element: Element::new(schema),
            urn: None,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.element.schema()
    }

    /// Set once saved or loaded
    pub fn urn(&self) -> Option<&Urn> {
        self.urn.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.urn.is_none()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    /// # Errors
    ///
    /// `Immutable` once the resource has a URN; fork it instead
    pub fn element_mut(&mut self) -> Result<&mut Element> {
        match &self.urn {
            Some(urn) => Err(FolioError::Immutable {
                urn: urn.to_string(),
            }),
            None => Ok(&mut self.element),
        }
    }

    /// `common` block of a licensed resource
    pub fn common(&self) -> Option<&Element> {
        self.element.child("common")
    }

    /// License hrefs; empty for unlicensed types
    pub fn licenses(&self) -> Vec<String> {
        self.common().map(license_hrefs).unwrap_or_default()
    }

    /// Mutable copy without a URN and with provenance reset
    ///
    /// Forking a saved licensed resource records the original as the only parent.
    pub fn fork(&self) -> Resource {
        let mut element = self.element.fork();
        if let (Some(urn), true) = (&self.urn, self.schema().is_licensed()) {
            if let Some(parents) = element.child_mut("common").and_then(|c| c.child_mut("parents")) {
                parents.set_link_items(&[urn.as_str()]);
            }
        }
        Resource { element, urn: None }
    }

    /// # Errors
    ///
    /// The first violation found; see [`Element::validate`]. Licensed types
    /// additionally require parents of the same type (strict only) and at
    /// least one license the server allows.
    pub fn validate(&self, db: &ResourceDatabase, mode: ValidationMode) -> Result<()> {
        self.element.validate(db, mode)?;
        if !self.schema().is_licensed() {
            return Ok(());
        }

        if mode == ValidationMode::Strict {
            let parents = self
                .common()
                .and_then(|c| c.child("parents"))
                .map(Element::items)
                .unwrap_or_default();
            for parent_ref in parents {
                if let Some(parent) = parent_ref.resource(db)? {
                    if parent.schema().id() != self.schema().id() {
                        return Err(FolioError::validation(format!(
                            "parents must be of the same type: {} is a {}",
                            parent_ref.href(),
                            parent.schema().name()
                        )));
                    }
                }
            }
        }

        let settings = db.settings();
        if !self.licenses().iter().any(|l| settings.is_allowed_license(l)) {
            return Err(FolioError::LicenseViolation {
                message: "the content is not provided under a license acceptable for this server"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Serialize, stamping empty timestamps from `clock`
    ///
    /// # Errors
    ///
    /// `Internal` if the schema lost its root tag
    pub fn to_xml_tree(&mut self, clock: &dyn Clock) -> Result<XmlNode> {
        let tag = self
            .schema()
            .root_tag()
            .cloned()
            .ok_or_else(|| FolioError::Internal {
                message: format!("{} has no root tag", self.schema().name()),
            })?;
        if self.urn.is_none() {
            self.element.stamp_timestamps(clock);
        }
        let ns = tag.ns.clone();
        Ok(self.element.to_xml(tag, ns.as_deref()))
    }

    /// Rebuild a resource from a parsed document; the URN stays unset
    ///
    /// # Errors
    ///
    /// `Structure` for an unregistered root tag or a document that does not
    /// match its schema
    pub fn from_xml_tree(registry: &Registry, node: &XmlNode) -> Result<Resource> {
        let clark = node.name.clark();
        let schema = registry
            .get(&clark)
            .ok_or_else(|| FolioError::structure(format!("unregistered root tag {}", clark)))?;
        let element = Element::from_xml(schema, node, schema.ns())?;
        Ok(Resource { element, urn: None })
    }

    /// Persist and return the URN
    ///
    /// A resource that already has a URN is returned unchanged without
    /// touching storage. Otherwise staged references are saved first, a
    /// licensed resource without licenses gets the default one, and the
    /// tree is strictly validated before it is written.
    ///
    /// # Errors
    ///
    /// Validation errors (nothing of this resource is written), or storage
    /// errors from the write
    pub fn save(&mut self, db: &ResourceDatabase) -> Result<Urn> {
        if let Some(urn) = &self.urn {
            return Ok(urn.clone());
        }
        let start = Instant::now();
        let type_name = self.schema().name().to_string();
        log_op_start!("resource_save", tag = %type_name);

        match self.save_impl(db) {
            Ok(urn) => {
                log_op_end!(
                    "resource_save",
                    duration_ms = start.elapsed().as_millis() as u64,
                    urn = urn.as_str()
                );
                Ok(urn)
            }
            Err(e) => {
                log_op_error!("resource_save", e.clone(), duration_ms = start.elapsed().as_millis() as u64);
                Err(e)
            }
        }
    }

    fn save_impl(&mut self, db: &ResourceDatabase) -> Result<Urn> {
        if self.schema().is_licensed() && self.licenses().is_empty() {
            self.inject_default_license(db);
        }
        self.element.commit_pending(db)?;
        self.validate(db, ValidationMode::Strict)?;
        let tree = self.to_xml_tree(db.clock())?;
        let urn = db.store_xml_tree(&tree)?;
        tracing::debug!(urn = urn.as_str(), "resource stored");
        self.urn = Some(urn.clone());
        Ok(urn)
    }

    fn inject_default_license(&mut self, db: &ResourceDatabase) {
        if let Some(licenses) = self
            .element
            .child_mut("common")
            .and_then(|c| c.child_mut("licenses"))
        {
            licenses.set_link_items(&[db.settings().default_license.as_str()]);
        }
    }

    /// Load `urn`, insisting on the exact type `expected`
    ///
    /// # Errors
    ///
    /// `TypeMismatch` when the stored resource has another type, or the
    /// storage errors of [`ResourceDatabase::get_resource_object`]
    pub fn load(db: &ResourceDatabase, urn: &Urn, expected: &Arc<Schema>) -> Result<Resource> {
        let resource = db.get_resource_object(urn)?;
        if resource.schema().id() != expected.id() {
            return Err(FolioError::TypeMismatch {
                expected: expected.name().to_string(),
                actual: resource.schema().name().to_string(),
            });
        }
        Ok(resource)
    }

    /// Apply a blueprint, then take provenance from `ctx`
    ///
    /// # Errors
    ///
    /// `Immutable` on a saved resource; otherwise see [`Element::patch`]
    pub fn patch(&mut self, db: &ResourceDatabase, blueprint: &Value, ctx: &SaveContext) -> Result<()> {
        let element = self.element_mut()?;
        element.patch(db, blueprint, ctx)?;
        if let Some(common) = element.child_mut("common") {
            common.apply_save_context(ctx)?;
        }
        Ok(())
    }

    /// JSON projection with the root's `fqn`
    ///
    /// # Errors
    ///
    /// See [`Element::to_json`]
    pub fn to_json(&self, db: &ResourceDatabase) -> Result<Value> {
        let mut json = self.element.to_json(db)?;
        if let (Value::Object(map), Some(tag)) = (&mut json, self.schema().root_tag()) {
            map.insert("fqn".to_string(), Value::String(tag.clark()));
        }
        Ok(json)
    }

    pub(crate) fn with_urn(mut self, urn: Urn) -> Self {
        self.urn = Some(urn);
        self
    }
}

/// Same URN, or structurally equal
impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        matches!((&self.urn, &other.urn), (Some(a), Some(b)) if a == b) || self.element == other.element
    }
}
