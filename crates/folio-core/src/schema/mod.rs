//! Static schema descriptors
//!
//! A [`Schema`] is built once at bootstrap through [`SchemaBuilder`] and
//! shared as `Arc<Schema>`. Each carries a process-unique [`SchemaId`]; an
//! element's lineage check is a comparison of these ids.

mod attribute;

pub use attribute::{Attribute, Predicate, Validator};

use crate::builtin;
use crate::errors::{FolioError, Result};
use crate::xml::QName;
use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// Origin id stamped on every schema at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u64);

impl SchemaId {
    fn next() -> Self {
        SchemaId(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ArraySpec {
    pub item: Arc<Schema>,
    /// Overrides `{ns}item`
    pub item_tag: Option<QName>,
    pub min_size: usize,
    pub max_size: Option<usize>,
    /// Omitted from serialized forms (and optional on parse) when empty
    pub null_on_empty: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceSpec {
    /// Empty means any root type
    pub allowed_types: Vec<Arc<Schema>>,
    /// Omitted from serialized forms (and optional on parse) when the href is empty
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct BlobSpec {
    /// Decoded as UTF-8 text in the JSON projection and patched from `text`
    pub text: bool,
}

/// Closed set of element kinds
#[derive(Debug, Clone)]
pub enum Kind {
    Plain,
    Text,
    Array(ArraySpec),
    Resource(ResourceSpec),
    Blob(BlobSpec),
    /// Provenance block carried by licensed roots
    Common,
}

impl Kind {
    fn allows_subelements(&self) -> bool {
        matches!(self, Kind::Plain | Kind::Common | Kind::Resource(_))
    }
}

#[derive(Debug, Clone)]
pub struct Subelement {
    pub schema: Arc<Schema>,
    /// Overrides `{ns}name`
    pub tag: Option<QName>,
}

#[derive(Debug, Clone)]
pub struct RootInfo {
    pub tag: QName,
    pub licensed: bool,
}

#[derive(Debug)]
pub struct Schema {
    id: SchemaId,
    name: String,
    ns: Option<String>,
    nsmap: Vec<(String, String)>,
    attributes: IndexMap<String, Attribute>,
    subelements: IndexMap<String, Subelement>,
    kind: Kind,
    root: Option<RootInfo>,
    ancestors: Vec<SchemaId>,
}

impl Schema {
    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// Declared type name, e.g. `TagElement`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own namespace; children of an element without one inherit the parent's
    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// Namespace prefix hints for serialization
    pub fn nsmap(&self) -> &[(String, String)] {
        &self.nsmap
    }

    pub fn attributes(&self) -> &IndexMap<String, Attribute> {
        &self.attributes
    }

    pub fn subelements(&self) -> &IndexMap<String, Subelement> {
        &self.subelements
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn root(&self) -> Option<&RootInfo> {
        self.root.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.root.is_some()
    }

    pub fn is_licensed(&self) -> bool {
        self.root.as_ref().map(|r| r.licensed).unwrap_or(false)
    }

    /// Fully qualified root tag
    pub fn root_tag(&self) -> Option<&QName> {
        self.root.as_ref().map(|r| &r.tag)
    }

    /// Equal to `other` or declared (transitively) as extending it
    pub fn is_subtype_of(&self, other: &Schema) -> bool {
        self.id == other.id || self.ancestors.contains(&other.id)
    }

    /// Whether an element of this schema may be missing from its parent
    pub fn is_optional(&self) -> bool {
        match &self.kind {
            Kind::Array(spec) => spec.null_on_empty,
            Kind::Resource(spec) => spec.optional,
            _ => false,
        }
    }

    pub(crate) fn required_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, a)| !a.is_optional())
            .map(|(n, _)| n.as_str())
    }

    /// Declared attribute name for a serialized attribute name
    pub(crate) fn attribute_for(&self, qname: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, attr)| attr.xml_name(name) == *qname)
            .map(|(name, _)| name.as_str())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root_tag() {
            Some(tag) => write!(f, "{} ({})", self.name, tag),
            None => f.write_str(&self.name),
        }
    }
}

/// `TagElement` -> `tag_element`, `HTTPServer` -> `http_server`
pub fn camelcase_to_underscores(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let after_lower = i > 0 && chars[i - 1].is_lowercase();
            let before_lower = matches!(chars.get(i + 1), Some(n) if !n.is_uppercase());
            if after_lower || before_lower {
                out.push(' ');
            }
        }
        out.extend(c.to_lowercase());
    }
    out.trim().replace(' ', "_")
}

/// Declarative construction of a [`Schema`]
///
/// ```
/// use folio_core::schema::{Attribute, SchemaBuilder};
///
/// let note = SchemaBuilder::new("Note")
///     .namespace("urn:example:notes")
///     .attribute("title", Attribute::required())
///     .subelement("body", &SchemaBuilder::text("NoteBody").build().unwrap())
///     .root()
///     .build()
///     .unwrap();
/// assert_eq!(note.root_tag().unwrap().clark(), "{urn:example:notes}note");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    ns: Option<String>,
    nsmap: Vec<(String, String)>,
    attributes: IndexMap<String, Attribute>,
    subelements: IndexMap<String, Subelement>,
    kind: Kind,
    root: bool,
    root_name: Option<String>,
    licensed: bool,
    ancestors: Vec<SchemaId>,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self::of_kind(name, Kind::Plain)
    }

    pub fn of_kind(name: &str, kind: Kind) -> Self {
        Self {
            name: name.to_string(),
            ns: None,
            nsmap: Vec::new(),
            attributes: IndexMap::new(),
            subelements: IndexMap::new(),
            kind,
            root: false,
            root_name: None,
            licensed: false,
            ancestors: Vec::new(),
        }
    }

    pub fn text(name: &str) -> Self {
        Self::of_kind(name, Kind::Text)
    }

    pub fn array(name: &str, item: &Arc<Schema>) -> Self {
        Self::of_kind(
            name,
            Kind::Array(ArraySpec {
                item: item.clone(),
                item_tag: None,
                min_size: 0,
                max_size: None,
                null_on_empty: false,
            }),
        )
    }

    /// Array left out of serialized forms while empty
    pub fn optional_array(name: &str, item: &Arc<Schema>) -> Self {
        Self::array(name, item).null_on_empty()
    }

    /// Element carrying `xlink:href`
    pub fn link(name: &str) -> Self {
        builtin::with_link_attributes(Self::new(name))
    }

    /// Reference to another stored resource
    pub fn resource_link(name: &str, allowed_types: &[&Arc<Schema>]) -> Self {
        Self::reference(name, allowed_types, false)
    }

    pub fn optional_resource_link(name: &str, allowed_types: &[&Arc<Schema>]) -> Self {
        Self::reference(name, allowed_types, true)
    }

    fn reference(name: &str, allowed_types: &[&Arc<Schema>], optional: bool) -> Self {
        let spec = ResourceSpec {
            allowed_types: allowed_types.iter().map(|s| Arc::clone(s)).collect(),
            optional,
        };
        builtin::with_link_attributes(Self::of_kind(name, Kind::Resource(spec)))
    }

    pub fn blob(name: &str) -> Self {
        builtin::with_link_attributes(Self::of_kind(name, Kind::Blob(BlobSpec { text: false })))
    }

    /// Blob with a required `mime_type`, restricted to `allowed` when given
    pub fn typed_blob(name: &str, allowed: Option<&[&str]>) -> Self {
        let mime_type = match allowed {
            Some(values) => Attribute::required().one_of(values),
            None => Attribute::required(),
        };
        Self::blob(name).attribute("mime_type", mime_type)
    }

    pub fn text_blob(name: &str) -> Self {
        builtin::with_link_attributes(Self::of_kind(name, Kind::Blob(BlobSpec { text: true })))
    }

    pub fn namespace(mut self, ns: &str) -> Self {
        self.ns = Some(ns.to_string());
        self
    }

    /// Preferred prefix for `uri` when serializing
    pub fn prefix(mut self, prefix: &str, uri: &str) -> Self {
        let hint = (prefix.to_string(), uri.to_string());
        if !self.nsmap.contains(&hint) {
            self.nsmap.push(hint);
        }
        self
    }

    /// Declare (or override) an attribute
    pub fn attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    /// Declare (or override) a subelement, keeping an overridden one's position
    pub fn subelement(mut self, name: &str, schema: &Arc<Schema>) -> Self {
        self.subelements.insert(
            name.to_string(),
            Subelement {
                schema: schema.clone(),
                tag: None,
            },
        );
        self
    }

    pub fn subelement_tagged(mut self, name: &str, schema: &Arc<Schema>, tag: QName) -> Self {
        self.subelements.insert(
            name.to_string(),
            Subelement {
                schema: schema.clone(),
                tag: Some(tag),
            },
        );
        self
    }

    pub fn bounds(mut self, min_size: usize, max_size: Option<usize>) -> Self {
        if let Kind::Array(spec) = &mut self.kind {
            spec.min_size = min_size;
            spec.max_size = max_size;
        }
        self
    }

    pub fn null_on_empty(mut self) -> Self {
        if let Kind::Array(spec) = &mut self.kind {
            spec.null_on_empty = true;
        }
        self
    }

    pub fn item_tag(mut self, tag: QName) -> Self {
        if let Kind::Array(spec) = &mut self.kind {
            spec.item_tag = Some(tag);
        }
        self
    }

    /// Inherit `parent`'s declarations
    ///
    /// Inherited attributes and subelements come first; anything this
    /// builder already declared overrides them by name.
    pub fn extends(mut self, parent: &Arc<Schema>) -> Self {
        let mut attributes = parent.attributes.clone();
        for (name, attr) in std::mem::take(&mut self.attributes) {
            attributes.insert(name, attr);
        }
        self.attributes = attributes;

        let mut subelements = parent.subelements.clone();
        for (name, sub) in std::mem::take(&mut self.subelements) {
            subelements.insert(name, sub);
        }
        self.subelements = subelements;

        let mut nsmap = parent.nsmap.clone();
        for hint in std::mem::take(&mut self.nsmap) {
            if !nsmap.contains(&hint) {
                nsmap.push(hint);
            }
        }
        self.nsmap = nsmap;

        if self.ns.is_none() {
            self.ns = parent.ns.clone();
        }
        if matches!(self.kind, Kind::Plain) {
            self.kind = parent.kind.clone();
        }
        if let Some(root) = &parent.root {
            self.root = true;
            self.licensed |= root.licensed;
        }
        self.ancestors.extend(parent.ancestors.iter().copied());
        self.ancestors.push(parent.id);
        self
    }

    /// Addressable root type, tagged `{ns}<underscored type name>`
    pub fn root(mut self) -> Self {
        if !self.root {
            self.root = true;
            self = self.extends(&builtin::resource_base());
        }
        self
    }

    pub fn root_named(mut self, local: &str) -> Self {
        self.root_name = Some(local.to_string());
        self.root()
    }

    /// Root type carrying the `common` provenance block and `tags`
    pub fn licensed(mut self) -> Self {
        if !self.licensed {
            self.licensed = true;
            self = self.extends(&builtin::licensed_base());
            self.root = true;
        }
        self
    }

    /// # Errors
    ///
    /// `Declaration` when a root type has no namespace, a leaf kind declares
    /// subelements, or array bounds are inverted
    pub fn build(self) -> Result<Arc<Schema>> {
        let declaration = |message: &str| FolioError::Declaration {
            type_name: self.name.clone(),
            message: message.to_string(),
        };
        if self.root && self.ns.is_none() {
            return Err(declaration("a root type must declare an XML namespace"));
        }
        if !self.kind.allows_subelements() && !self.subelements.is_empty() {
            return Err(declaration("this kind of element does not allow subelements"));
        }
        if let Kind::Array(spec) = &self.kind {
            if spec.max_size.is_some_and(|max| max < spec.min_size) {
                return Err(declaration("min_size exceeds max_size"));
            }
        }
        Ok(self.finish())
    }

    /// Build without declaration checks; for built-in schemas known to be valid
    pub(crate) fn finish(self) -> Arc<Schema> {
        let root = if self.root {
            let local = self
                .root_name
                .clone()
                .unwrap_or_else(|| camelcase_to_underscores(&self.name));
            Some(RootInfo {
                tag: QName::new(self.ns.as_deref(), &local),
                licensed: self.licensed,
            })
        } else {
            None
        };
        Arc::new(Schema {
            id: SchemaId::next(),
            name: self.name,
            ns: self.ns,
            nsmap: self.nsmap,
            attributes: self.attributes,
            subelements: self.subelements,
            kind: self.kind,
            root,
            ancestors: self.ancestors,
        })
    }
}
