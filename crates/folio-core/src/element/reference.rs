//! Resource references and blobs

use super::{wrong_kind, Body, Element};
use crate::errors::{FolioError, Result};
use crate::resource::Resource;
use crate::schema::Kind;
use crate::storage::ResourceDatabase;
use crate::urn::Urn;
use std::rc::Rc;

impl Element {
    /// The referenced resource
    ///
    /// An empty href yields the staged resource, if any. Otherwise the
    /// resource is loaded once per href and cached in this element.
    ///
    /// # Errors
    ///
    /// `Validation` on non-reference elements, `InvalidUrn`/`NotFound` for a
    /// bad href, `TypeMismatch` when the stored type is not allowed here
    pub fn resource(&self, db: &ResourceDatabase) -> Result<Option<Rc<Resource>>> {
        let Body::Reference(state) = &self.body else {
            return Err(wrong_kind(&self.schema, "a resource reference"));
        };
        let href = self.href();
        if href.is_empty() {
            return Ok(state.staged.clone());
        }
        if let Some((cached_href, resource)) = state.cache.borrow().as_ref() {
            if cached_href == href {
                return Ok(Some(resource.clone()));
            }
        }
        let urn = Urn::parse(href)?;
        let resource = db.get_resource_object(&urn)?;
        self.check_resource_type(&resource)?;
        let resource = Rc::new(resource);
        *state.cache.borrow_mut() = Some((href.to_string(), resource.clone()));
        Ok(Some(resource))
    }

    /// Save `resource` (if new) and point this reference at it
    ///
    /// # Errors
    ///
    /// `TypeMismatch` when the type is not allowed here, or the save's errors
    pub fn store_resource(&mut self, db: &ResourceDatabase, resource: &mut Resource) -> Result<Urn> {
        self.check_resource_type(resource)?;
        let urn = resource.save(db)?;
        self.set_href(urn.as_str())?;
        Ok(urn)
    }

    /// Hold an unsaved resource; it is saved when the owning root saves
    ///
    /// # Errors
    ///
    /// `TypeMismatch` when the type is not allowed here
    pub fn stage_resource(&mut self, resource: Resource) -> Result<()> {
        self.check_resource_type(&resource)?;
        self.set_href("")?;
        match &mut self.body {
            Body::Reference(state) => {
                state.staged = Some(Rc::new(resource));
                Ok(())
            }
            _ => Err(wrong_kind(&self.schema, "a resource reference")),
        }
    }

    /// # Errors
    ///
    /// `Validation` on non-blob elements, storage errors from the write
    pub fn store_blob(&mut self, db: &ResourceDatabase, content: &[u8]) -> Result<Urn> {
        if !matches!(self.schema.kind(), Kind::Blob(_)) {
            return Err(wrong_kind(&self.schema, "a blob"));
        }
        let urn = db.store_blob(content)?;
        self.set_href(urn.as_str())?;
        Ok(urn)
    }

    /// Blob content; empty when no blob is linked
    ///
    /// # Errors
    ///
    /// `Validation` on non-blob elements, storage errors from the read
    pub fn blob(&self, db: &ResourceDatabase) -> Result<Vec<u8>> {
        if !matches!(self.schema.kind(), Kind::Blob(_)) {
            return Err(wrong_kind(&self.schema, "a blob"));
        }
        if self.href().is_empty() {
            return Ok(Vec::new());
        }
        db.get_blob(&Urn::parse(self.href())?)
    }

    pub(crate) fn check_resource_type(&self, resource: &Resource) -> Result<()> {
        let Kind::Resource(spec) = self.schema.kind() else {
            return Err(wrong_kind(&self.schema, "a resource reference"));
        };
        if spec.allowed_types.is_empty()
            || spec
                .allowed_types
                .iter()
                .any(|allowed| resource.schema().is_subtype_of(allowed))
        {
            return Ok(());
        }
        let expected: Vec<&str> = spec.allowed_types.iter().map(|s| s.name()).collect();
        Err(FolioError::TypeMismatch {
            expected: expected.join(" | "),
            actual: resource.schema().name().to_string(),
        })
    }

    /// Save staged resources in this tree, innermost first
    ///
    /// A staged resource stays staged until its save succeeds and the href
    /// points at it, so a failed save can be retried.
    pub(crate) fn commit_pending(&mut self, db: &ResourceDatabase) -> Result<()> {
        for child in self.children.values_mut() {
            child.commit_pending(db)?;
        }
        let staged = match &mut self.body {
            Body::Items(items) => {
                for item in items {
                    item.commit_pending(db)?;
                }
                None
            }
            Body::Reference(state) => state.staged.as_deref().cloned(),
            _ => None,
        };
        if let Some(mut resource) = staged {
            let urn = resource.save(db)?;
            // clears the staged slot
            self.set_href(urn.as_str())?;
        }
        Ok(())
    }
}
