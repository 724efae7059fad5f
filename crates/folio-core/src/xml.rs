//! Namespace-aware XML tree and its canonical byte form
//!
//! Names are held resolved (`{uri}local`). Serialization declares every
//! namespace on the root element, choosing prefixes deterministically, so
//! the bytes depend only on the tree.

use crate::errors::{FolioError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt;

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace-qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub ns: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(ns: Option<&str>, local: &str) -> Self {
        Self {
            ns: ns.map(str::to_string),
            local: local.to_string(),
        }
    }

    pub fn qualified(ns: &str, local: &str) -> Self {
        Self::new(Some(ns), local)
    }

    pub fn local(local: &str) -> Self {
        Self::new(None, local)
    }

    /// Clark notation: `{uri}local`, or just `local` when unqualified
    pub fn clark(&self) -> String {
        match &self.ns {
            Some(ns) => format!("{{{}}}{}", ns, self.local),
            None => self.local.clone(),
        }
    }

    pub fn from_clark(s: &str) -> Self {
        if let Some(rest) = s.strip_prefix('{') {
            if let Some((ns, local)) = rest.split_once('}') {
                return Self::qualified(ns, local);
            }
        }
        Self::local(s)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clark())
    }
}

/// One element of an XML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: QName,
    /// Prefix hints (`""` is the default namespace); on parsed nodes, the
    /// declarations that appeared on this element
    pub nsmap: Vec<(String, String)>,
    pub attributes: Vec<(QName, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            nsmap: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Canonical serialized form
    ///
    /// # Errors
    ///
    /// `Serialization` if the writer fails
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let prefixes = Prefixes::for_tree(self);
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_node(&mut writer, self, &prefixes, true)?;
        Ok(writer.into_inner())
    }

    /// # Errors
    ///
    /// `Serialization` for malformed XML, `Structure` for documents without
    /// exactly one root or with undeclared prefixes
    pub fn parse(bytes: &[u8]) -> Result<XmlNode> {
        let text = std::str::from_utf8(bytes)?;
        let mut reader = Reader::from_str(text);
        let mut scopes: Vec<Vec<(String, String)>> = Vec::new();
        let mut open: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let node = open_element(&e, &mut scopes)?;
                    open.push(node);
                }
                Event::Empty(e) => {
                    let node = open_element(&e, &mut scopes)?;
                    scopes.pop();
                    attach(node, &mut open, &mut root)?;
                }
                Event::End(_) => {
                    scopes.pop();
                    let node = open
                        .pop()
                        .ok_or_else(|| FolioError::structure("unbalanced end tag"))?;
                    attach(node, &mut open, &mut root)?;
                }
                Event::Text(t) => {
                    let s = t.unescape()?;
                    push_text(&mut open, &s)?;
                }
                Event::CData(c) => {
                    let s = std::str::from_utf8(&c)?;
                    push_text(&mut open, s)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !open.is_empty() {
            return Err(FolioError::structure("unclosed element at end of document"));
        }
        root.ok_or_else(|| FolioError::structure("document has no root element"))
    }
}

fn attach(node: XmlNode, open: &mut [XmlNode], root: &mut Option<XmlNode>) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => {
            return Err(FolioError::structure("document has more than one root element"))
        }
        None => *root = Some(node),
    }
    Ok(())
}

fn push_text(open: &mut [XmlNode], s: &str) -> Result<()> {
    match open.last_mut() {
        Some(node) => node.text.push_str(s),
        None if s.trim().is_empty() => {}
        None => return Err(FolioError::structure("text outside the root element")),
    }
    Ok(())
}

fn open_element(e: &BytesStart<'_>, scopes: &mut Vec<Vec<(String, String)>>) -> Result<XmlNode> {
    let mut decls = Vec::new();
    let mut raw_attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(FolioError::serialization)?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            decls.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            decls.push((prefix.to_string(), value));
        } else {
            raw_attributes.push((key, value));
        }
    }
    scopes.push(decls.clone());

    let raw_name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut node = XmlNode::new(resolve(&raw_name, scopes, true)?);
    node.nsmap = decls;
    for (key, value) in raw_attributes {
        let name = resolve(&key, scopes, false)?;
        if node.attribute(&name).is_some() {
            return Err(FolioError::structure(format!("duplicate attribute: {}", name)));
        }
        node.attributes.push((name, value));
    }
    Ok(node)
}

fn resolve(raw: &str, scopes: &[Vec<(String, String)>], is_element: bool) -> Result<QName> {
    let (prefix, local) = raw.split_once(':').unwrap_or(("", raw));
    // unprefixed attributes are never in a namespace
    if prefix.is_empty() && !is_element {
        return Ok(QName::local(local));
    }
    if prefix == "xml" {
        return Ok(QName::qualified(XML_NS, local));
    }
    let uri = scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter().rev())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str());
    match uri {
        Some("") => Ok(QName::local(local)),
        Some(uri) => Ok(QName::qualified(uri, local)),
        None if prefix.is_empty() => Ok(QName::local(local)),
        None => Err(FolioError::structure(format!(
            "undeclared namespace prefix: {}",
            prefix
        ))),
    }
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: &XmlNode,
    prefixes: &Prefixes,
    is_root: bool,
) -> Result<()> {
    let name = prefixes.element_name(&node.name);
    let mut start = BytesStart::new(name.as_str());
    if is_root {
        for (prefix, uri) in &prefixes.decls {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
    }
    for (qname, value) in &node.attributes {
        let key = prefixes.attribute_name(qname);
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() && node.text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    if !node.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&node.text)))?;
    }
    for child in &node.children {
        write_node(writer, child, prefixes, false)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}

/// Prefix assignment for one document
struct Prefixes {
    decls: Vec<(String, String)>,
}

#[derive(Default)]
struct Usage {
    element_ns: Vec<String>,
    attribute_ns: Vec<String>,
    hints: Vec<(String, String)>,
    unqualified_element: bool,
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

impl Usage {
    fn collect(&mut self, node: &XmlNode) {
        match &node.name.ns {
            Some(ns) => push_unique(&mut self.element_ns, ns),
            None => self.unqualified_element = true,
        }
        for (name, _) in &node.attributes {
            if let Some(ns) = &name.ns {
                push_unique(&mut self.attribute_ns, ns);
            }
        }
        for hint in &node.nsmap {
            if !self.hints.contains(hint) {
                self.hints.push(hint.clone());
            }
        }
        for child in &node.children {
            self.collect(child);
        }
    }
}

impl Prefixes {
    fn for_tree(root: &XmlNode) -> Self {
        let mut usage = Usage::default();
        usage.collect(root);

        let mut decls: Vec<(String, String)> = Vec::new();
        // The default namespace is only usable when every element is qualified
        if !usage.unqualified_element {
            if let Some(ns) = &root.name.ns {
                decls.push((String::new(), ns.clone()));
            }
        }

        for (prefix, uri) in &usage.hints {
            if prefix.is_empty() || prefix.starts_with("xml") || uri == XML_NS {
                continue;
            }
            let used = usage.element_ns.contains(uri) || usage.attribute_ns.contains(uri);
            let taken = decls
                .iter()
                .any(|(p, u)| p == prefix || (!p.is_empty() && u == uri));
            if used && !taken {
                decls.push((prefix.clone(), uri.clone()));
            }
        }

        let mut counter = 0;
        for uri in &usage.element_ns {
            if uri != XML_NS && !decls.iter().any(|(_, u)| u == uri) {
                let prefix = Self::fresh_prefix(&decls, &mut counter);
                decls.push((prefix, uri.clone()));
            }
        }
        for uri in &usage.attribute_ns {
            if uri != XML_NS && !decls.iter().any(|(p, u)| !p.is_empty() && u == uri) {
                let prefix = Self::fresh_prefix(&decls, &mut counter);
                decls.push((prefix, uri.clone()));
            }
        }

        Self { decls }
    }

    fn fresh_prefix(decls: &[(String, String)], counter: &mut usize) -> String {
        loop {
            let candidate = format!("ns{}", counter);
            *counter += 1;
            if !decls.iter().any(|(p, _)| *p == candidate) {
                return candidate;
            }
        }
    }

    fn element_name(&self, name: &QName) -> String {
        let Some(uri) = &name.ns else {
            return name.local.clone();
        };
        if uri == XML_NS {
            return format!("xml:{}", name.local);
        }
        let prefix = self
            .decls
            .iter()
            .find(|(p, u)| p.is_empty() && u == uri)
            .or_else(|| self.decls.iter().find(|(_, u)| u == uri))
            .map(|(p, _)| p.as_str())
            .unwrap_or_default();
        if prefix.is_empty() {
            name.local.clone()
        } else {
            format!("{}:{}", prefix, name.local)
        }
    }

    fn attribute_name(&self, name: &QName) -> String {
        let Some(uri) = &name.ns else {
            return name.local.clone();
        };
        if uri == XML_NS {
            return format!("xml:{}", name.local);
        }
        match self.decls.iter().find(|(p, u)| !p.is_empty() && u == uri) {
            Some((prefix, _)) => format!("{}:{}", prefix, name.local),
            None => name.local.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test:doc";
    const XLINK: &str = "http://www.w3.org/1999/xlink";

    fn sample() -> XmlNode {
        let mut root = XmlNode::new(QName::qualified(NS, "doc"));
        root.nsmap.push(("xlink".to_string(), XLINK.to_string()));
        root.set_attribute(QName::local("version"), "1");
        let mut link = XmlNode::new(QName::qualified(NS, "link"));
        link.set_attribute(QName::qualified(XLINK, "href"), "urn:x & <y>");
        root.children.push(link);
        let mut title = XmlNode::new(QName::qualified(NS, "title"));
        title.text = "a < b & \"c\"".to_string();
        root.children.push(title);
        root
    }

    #[test]
    fn test_bytes_are_canonical() {
        let bytes = sample().to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<doc xmlns=\"urn:test:doc\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" version=\"1\">"));
        assert!(text.contains("<link xlink:href=\"urn:x &amp; &lt;y&gt;\"/>"));
    }

    #[test]
    fn test_parse_resolves_names_and_text() {
        let bytes = sample().to_bytes().unwrap();
        let parsed = XmlNode::parse(&bytes).unwrap();
        assert_eq!(parsed.name, QName::qualified(NS, "doc"));
        assert_eq!(parsed.attribute(&QName::local("version")), Some("1"));
        assert_eq!(
            parsed.children[0].attribute(&QName::qualified(XLINK, "href")),
            Some("urn:x & <y>")
        );
        assert_eq!(parsed.children[1].text, "a < b & \"c\"");
    }

    #[test]
    fn test_reserialization_is_stable() {
        let first = sample().to_bytes().unwrap();
        let second = XmlNode::parse(&first).unwrap().to_bytes().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_generated_prefix_for_unhinted_attribute_namespace() {
        let mut root = XmlNode::new(QName::qualified(NS, "doc"));
        root.set_attribute(QName::qualified(NS, "flag"), "yes");
        let text = String::from_utf8(root.to_bytes().unwrap()).unwrap();
        assert!(text.contains("xmlns:ns0=\"urn:test:doc\""));
        assert!(text.contains("ns0:flag=\"yes\""));
        let parsed = XmlNode::parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.attribute(&QName::qualified(NS, "flag")), Some("yes"));
    }

    #[test]
    fn test_unqualified_children_disable_default_namespace() {
        let mut root = XmlNode::new(QName::qualified(NS, "doc"));
        root.children.push(XmlNode::new(QName::local("plain")));
        let parsed = XmlNode::parse(&root.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.name, QName::qualified(NS, "doc"));
        assert_eq!(parsed.children[0].name, QName::local("plain"));
    }

    #[test]
    fn test_parse_rejects_undeclared_prefix() {
        let err = XmlNode::parse(b"<a:doc/>").unwrap_err();
        assert!(matches!(err, FolioError::Structure { .. }));
    }

    #[test]
    fn test_parse_rejects_missing_root() {
        let err = XmlNode::parse(b"<?xml version=\"1.0\"?>").unwrap_err();
        assert!(matches!(err, FolioError::Structure { .. }));
    }

    #[test]
    fn test_parse_rejects_mismatched_end() {
        assert!(XmlNode::parse(b"<a><b></a>").is_err());
    }

    #[test]
    fn test_clark_round_trip() {
        let q = QName::qualified(NS, "tag_element");
        assert_eq!(q.clark(), "{urn:test:doc}tag_element");
        assert_eq!(QName::from_clark(&q.clark()), q);
        assert_eq!(QName::from_clark("bare"), QName::local("bare"));
    }
}
