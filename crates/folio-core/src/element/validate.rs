//! Depth-first, fail-fast validation

use super::{Body, Element};
use crate::errors::{FolioError, Result};
use crate::license::is_license_compatibility_satisfied;
use crate::schema::Kind;
use crate::storage::ResourceDatabase;

/// How much of the cross-resource graph validation may consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Resolve references: check referenced types and license compatibility
    /// with parents. Run before a new resource is saved.
    Strict,
    /// In-memory checks only; used for resources loaded from storage
    Lenient,
}

impl Element {
    /// Stops at the first violation
    ///
    /// Order: own attributes, then subelements (lineage, then recursively),
    /// then array bounds and items, then kind-specific checks that only run
    /// under [`ValidationMode::Strict`].
    ///
    /// # Errors
    ///
    /// `Validation`, `LineageMismatch`, `LicenseViolation` or `TypeMismatch`
    /// for the first rule broken; storage errors when strict resolution fails
    pub fn validate(&self, db: &ResourceDatabase, mode: ValidationMode) -> Result<()> {
        for (name, attr) in self.schema.attributes() {
            if let Some(Some(value)) = self.attributes.get(name) {
                attr.validate(name, value)?;
            }
        }

        for (name, sub) in self.schema.subelements() {
            let child = self.children.get(name).ok_or_else(|| {
                FolioError::validation(format!("{} is missing '{}'", self.schema.name(), name))
            })?;
            if child.schema.id() != sub.schema.id() {
                return Err(FolioError::LineageMismatch { role: name.clone() });
            }
            child.validate(db, mode)?;
        }

        match self.schema.kind() {
            Kind::Array(spec) => {
                let items = self.items();
                if items.iter().any(|item| item.schema.id() != spec.item.id()) {
                    return Err(FolioError::LineageMismatch {
                        role: format!("{} item", self.schema.name()),
                    });
                }
                if items.len() < spec.min_size {
                    return Err(FolioError::validation(format!(
                        "{}: too few elements ({} < {})",
                        self.schema.name(),
                        items.len(),
                        spec.min_size
                    )));
                }
                if let Some(max) = spec.max_size {
                    if items.len() > max {
                        return Err(FolioError::validation(format!(
                            "{}: too many elements ({} > {})",
                            self.schema.name(),
                            items.len(),
                            max
                        )));
                    }
                }
                for item in items {
                    item.validate(db, mode)?;
                }
            }
            Kind::Resource(_) if mode == ValidationMode::Strict => {
                // resolution checks the referenced type
                self.resource(db)?;
            }
            Kind::Common if mode == ValidationMode::Strict => self.validate_provenance(db)?,
            _ => {}
        }
        Ok(())
    }

    fn validate_provenance(&self, db: &ResourceDatabase) -> Result<()> {
        let author = self.child("author").map(Element::text).unwrap_or_default();
        if author.is_empty() {
            return Err(FolioError::validation("author must be given for the resource"));
        }

        let licenses = license_hrefs(self);
        let licenses: Vec<&str> = licenses.iter().map(String::as_str).collect();
        for parent_ref in self.child("parents").map(Element::items).unwrap_or_default() {
            let Some(parent) = parent_ref.resource(db)? else {
                continue;
            };
            let parent_licenses = parent.licenses();
            let parent_licenses: Vec<&str> = parent_licenses.iter().map(String::as_str).collect();
            if !is_license_compatibility_satisfied(db.settings(), &parent_licenses, &licenses) {
                return Err(FolioError::LicenseViolation {
                    message: format!(
                        "license compatibility not satisfied with parent {}",
                        parent_ref.href()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// License hrefs of a `common` block
pub(crate) fn license_hrefs(common: &Element) -> Vec<String> {
    match common.child("licenses").map(|l| &l.body) {
        Some(Body::Items(items)) => items.iter().map(|i| i.href().to_string()).collect(),
        _ => Vec::new(),
    }
}
