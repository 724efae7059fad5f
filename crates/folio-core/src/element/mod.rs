//! Element instances
//!
//! An [`Element`] is an instance of a [`Schema`]: validated attribute
//! values, one child per declared subelement, and a kind-specific body
//! (text, array items or reference state). Trees are built per operation
//! and are not shared between threads.

mod codec;
mod json;
mod patch;
mod reference;
mod validate;

pub use validate::ValidationMode;
pub(crate) use validate::license_hrefs;

use crate::errors::{FolioError, Result};
use crate::resource::Resource;
use crate::schema::{Kind, Schema};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Element {
    schema: Arc<Schema>,
    attributes: IndexMap<String, Option<String>>,
    children: IndexMap<String, Element>,
    body: Body,
}

#[derive(Debug, Clone)]
enum Body {
    Empty,
    Text(String),
    Items(Vec<Element>),
    Reference(ReferenceState),
}

#[derive(Debug, Clone, Default)]
struct ReferenceState {
    /// Resource to be saved when the owning root saves; href is empty meanwhile
    staged: Option<Rc<Resource>>,
    /// Single-slot resolution cache keyed by href
    cache: RefCell<Option<(String, Rc<Resource>)>>,
}

impl Element {
    /// Fresh instance with every attribute and subelement at its initial value
    pub fn new(schema: &Arc<Schema>) -> Element {
        let attributes = schema
            .attributes()
            .iter()
            .map(|(name, attr)| (name.clone(), attr.initial_value()))
            .collect();
        let children = schema
            .subelements()
            .iter()
            .map(|(name, sub)| (name.clone(), Element::new(&sub.schema)))
            .collect();
        let body = match schema.kind() {
            Kind::Text => Body::Text(String::new()),
            Kind::Array(_) => Body::Items(Vec::new()),
            Kind::Resource(_) => Body::Reference(ReferenceState::default()),
            Kind::Plain | Kind::Blob(_) | Kind::Common => Body::Empty,
        };
        Element {
            schema: schema.clone(),
            attributes,
            children,
            body,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Attribute value; `None` when null or undeclared
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_deref())
    }

    /// Validate and store an attribute value
    ///
    /// An empty value for an optional attribute that collapses blanks is
    /// stored as null.
    ///
    /// # Errors
    ///
    /// `Validation` if the attribute is undeclared or the value is rejected
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let attr = self.schema.attributes().get(name).ok_or_else(|| {
            FolioError::validation(format!(
                "{} has no attribute '{}'",
                self.schema.name(),
                name
            ))
        })?;
        attr.validate(name, &value)?;
        let stored = if value.is_empty() && attr.is_optional() && attr.blank_is_null() {
            None
        } else {
            Some(value)
        };
        if name == "href" {
            if let Body::Reference(state) = &mut self.body {
                state.staged = None;
            }
        }
        self.attributes.insert(name.to_string(), stored);
        Ok(())
    }

    /// # Errors
    ///
    /// `Validation` if the attribute is undeclared or required
    pub fn unset(&mut self, name: &str) -> Result<()> {
        match self.schema.attributes().get(name) {
            Some(attr) if attr.is_optional() => {
                self.attributes.insert(name.to_string(), None);
                Ok(())
            }
            Some(_) => Err(FolioError::validation(format!(
                "attribute '{}' of {} is required",
                name,
                self.schema.name()
            ))),
            None => Err(FolioError::validation(format!(
                "{} has no attribute '{}'",
                self.schema.name(),
                name
            ))),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.get(name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.get_mut(name)
    }

    /// Put `element` in the role `name`
    ///
    /// Lineage is not checked here; validation rejects an element that was
    /// not instantiated from the role's declared schema.
    ///
    /// # Errors
    ///
    /// `Validation` if no such subelement is declared
    pub fn replace_child(&mut self, name: &str, element: Element) -> Result<()> {
        match self.children.get_mut(name) {
            Some(slot) => {
                *slot = element;
                Ok(())
            }
            None => Err(FolioError::validation(format!(
                "{} has no subelement '{}'",
                self.schema.name(),
                name
            ))),
        }
    }

    /// Text content; empty for non-text elements
    pub fn text(&self) -> &str {
        match &self.body {
            Body::Text(t) => t,
            _ => "",
        }
    }

    /// # Errors
    ///
    /// `Validation` if this is not a text element
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        match &mut self.body {
            Body::Text(t) => {
                *t = text.into();
                Ok(())
            }
            _ => Err(wrong_kind(&self.schema, "a text element")),
        }
    }

    /// Array items; empty for non-array elements
    pub fn items(&self) -> &[Element] {
        match &self.body {
            Body::Items(items) => items,
            _ => &[],
        }
    }

    /// # Errors
    ///
    /// `Validation` if this is not an array
    pub fn items_mut(&mut self) -> Result<&mut Vec<Element>> {
        match &mut self.body {
            Body::Items(items) => Ok(items),
            _ => Err(wrong_kind(&self.schema, "an array")),
        }
    }

    /// Fresh instance of this array's item prototype
    ///
    /// # Errors
    ///
    /// `Validation` if this is not an array
    pub fn new_item(&self) -> Result<Element> {
        match self.schema.kind() {
            Kind::Array(spec) => Ok(Element::new(&spec.item)),
            _ => Err(wrong_kind(&self.schema, "an array")),
        }
    }

    /// # Errors
    ///
    /// `Validation` if this is not an array
    pub fn push_item(&mut self, item: Element) -> Result<()> {
        self.items_mut()?.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// `xlink:href` of a link element; empty otherwise
    pub fn href(&self) -> &str {
        self.get("href").unwrap_or_default()
    }

    /// # Errors
    ///
    /// `Validation` if this element has no href
    pub fn set_href(&mut self, href: impl Into<String>) -> Result<()> {
        self.set("href", href)
    }

    /// Left out of serialized forms
    pub fn is_null(&self) -> bool {
        match self.schema.kind() {
            Kind::Array(spec) => spec.null_on_empty && self.is_empty(),
            Kind::Resource(spec) => spec.optional && self.href().is_empty(),
            _ => false,
        }
    }

    /// Replace the items of an array of links with one item per href
    pub(crate) fn set_link_items(&mut self, hrefs: &[&str]) {
        let Kind::Array(spec) = self.schema.kind() else {
            return;
        };
        let items = hrefs
            .iter()
            .map(|href| {
                let mut item = Element::new(&spec.item);
                item.attributes
                    .insert("href".to_string(), Some(href.to_string()));
                item
            })
            .collect();
        self.body = Body::Items(items);
    }

    /// Deep copy with provenance reset
    pub fn fork(&self) -> Element {
        let mut copy = self.clone();
        copy.reset_provenance();
        copy
    }

    fn reset_provenance(&mut self) {
        if matches!(self.schema.kind(), Kind::Common) {
            if let Some(Body::Items(parents)) = self.children.get_mut("parents").map(|p| &mut p.body) {
                parents.clear();
            }
            if let Some(author) = self.children.get_mut("author") {
                author.body = Body::Text(String::new());
                author.attributes.insert("href".to_string(), Some(String::new()));
            }
            if let Some(log) = self.children.get_mut("log_message") {
                log.body = Body::Text(String::new());
            }
            self.attributes
                .insert("timestamp".to_string(), Some(String::new()));
        }
        for child in self.children.values_mut() {
            child.reset_provenance();
        }
    }
}

fn wrong_kind(schema: &Schema, expected: &str) -> FolioError {
    FolioError::validation(format!("{} is not {}", schema.name(), expected))
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.schema.id() == other.schema.id()
            && self.attributes == other.attributes
            && self.children == other.children
            && match (&self.body, &other.body) {
                (Body::Empty, Body::Empty) => true,
                (Body::Text(a), Body::Text(b)) => a == b,
                (Body::Items(a), Body::Items(b)) => a == b,
                (Body::Reference(a), Body::Reference(b)) => a.staged == b.staged,
                _ => false,
            }
    }
}
