//! Element <-> XML tree

use super::{Body, Element};
use crate::clock::Clock;
use crate::errors::{FolioError, Result};
use crate::schema::{ArraySpec, Kind, Schema};
use crate::xml::{QName, XmlNode};
use std::collections::HashSet;
use std::sync::Arc;

fn item_tag(spec: &ArraySpec, ns: Option<&str>) -> (QName, Option<String>) {
    let item_ns = spec.item.ns().or(ns);
    let tag = spec
        .item_tag
        .clone()
        .unwrap_or_else(|| QName::new(item_ns, "item"));
    (tag, item_ns.map(str::to_string))
}

impl Element {
    /// Emit this element as `tag`; `ns` is the namespace unqualified children inherit
    pub fn to_xml(&self, tag: QName, ns: Option<&str>) -> XmlNode {
        let mut node = XmlNode::new(tag);
        self.populate_xml(&mut node, ns);
        node
    }

    fn populate_xml(&self, node: &mut XmlNode, ns: Option<&str>) {
        for hint in self.schema.nsmap() {
            if !node.nsmap.contains(hint) {
                node.nsmap.push(hint.clone());
            }
        }

        for (name, sub) in self.schema.subelements() {
            let Some(child) = self.children.get(name) else {
                continue;
            };
            if child.is_null() {
                continue;
            }
            let local_ns = child.schema.ns().or(ns);
            let tag = sub.tag.clone().unwrap_or_else(|| QName::new(local_ns, name));
            node.children.push(child.to_xml(tag, local_ns));
        }

        for (name, attr) in self.schema.attributes() {
            let value = self.attributes.get(name).and_then(|v| v.as_deref());
            if attr.is_omitted(value) {
                continue;
            }
            if let Some(value) = value {
                node.attributes.push((attr.xml_name(name), value.to_string()));
            }
        }

        match (&self.body, self.schema.kind()) {
            (Body::Text(text), _) => node.text = text.clone(),
            (Body::Items(items), Kind::Array(spec)) => {
                let (tag, item_ns) = item_tag(spec, ns);
                for item in items {
                    node.children.push(item.to_xml(tag.clone(), item_ns.as_deref()));
                }
            }
            _ => {}
        }
    }

    /// Parse `node` as an instance of `schema`
    ///
    /// # Errors
    ///
    /// `Structure` for unrecognized, duplicate or missing tags and attributes;
    /// `Validation` when an attribute value is rejected
    pub fn from_xml(schema: &Arc<Schema>, node: &XmlNode, ns: Option<&str>) -> Result<Element> {
        let mut element = Element::new(schema);
        element.populate_from_xml(node, ns)?;
        Ok(element)
    }

    fn populate_from_xml(&mut self, node: &XmlNode, ns: Option<&str>) -> Result<()> {
        let schema = self.schema.clone();
        match schema.kind() {
            Kind::Array(spec) => {
                self.populate_attributes_from_xml(node)?;
                let (tag, item_ns) = item_tag(spec, ns);
                let mut items = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    if child.name != tag {
                        return Err(FolioError::structure(format!(
                            "unrecognized tag {} in {} (expected {})",
                            child.name,
                            schema.name(),
                            tag
                        )));
                    }
                    items.push(Element::from_xml(&spec.item, child, item_ns.as_deref())?);
                }
                self.body = Body::Items(items);
            }
            _ => {
                self.populate_subelements_from_xml(node, ns)?;
                self.populate_attributes_from_xml(node)?;
                if let Body::Text(text) = &mut self.body {
                    *text = node.text.clone();
                }
            }
        }
        Ok(())
    }

    fn populate_subelements_from_xml(&mut self, node: &XmlNode, ns: Option<&str>) -> Result<()> {
        let schema = self.schema.clone();
        let mut used = HashSet::new();
        for child_node in &node.children {
            let local = child_node.name.local.as_str();
            let sub = schema
                .subelements()
                .get(local)
                .filter(|sub| {
                    let local_ns = sub.schema.ns().or(ns);
                    let expected = sub.tag.clone().unwrap_or_else(|| QName::new(local_ns, local));
                    expected == child_node.name
                })
                .ok_or_else(|| {
                    FolioError::structure(format!(
                        "unrecognized tag {} in {}",
                        child_node.name,
                        schema.name()
                    ))
                })?;
            if !used.insert(local.to_string()) {
                return Err(FolioError::structure(format!(
                    "duplicate tag {} in {}",
                    child_node.name,
                    schema.name()
                )));
            }
            let local_ns = sub.schema.ns().or(ns);
            let child = Element::from_xml(&sub.schema, child_node, local_ns)?;
            self.children.insert(local.to_string(), child);
        }

        let missing: Vec<&str> = schema
            .subelements()
            .iter()
            .filter(|(name, sub)| !sub.schema.is_optional() && !used.contains(name.as_str()))
            .map(|(name, _)| name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(FolioError::structure(format!(
                "missing tag(s) in {}: {}",
                schema.name(),
                missing.join(", ")
            )));
        }
        Ok(())
    }

    fn populate_attributes_from_xml(&mut self, node: &XmlNode) -> Result<()> {
        let schema = self.schema.clone();
        // absent optional attributes are null, whatever their initial value
        for (name, attr) in schema.attributes() {
            if attr.is_optional() {
                self.attributes.insert(name.clone(), None);
            }
        }
        let mut used = HashSet::new();
        for (qname, value) in &node.attributes {
            let name = schema.attribute_for(qname).ok_or_else(|| {
                FolioError::structure(format!(
                    "unrecognized attribute {} in {}",
                    qname,
                    schema.name()
                ))
            })?;
            used.insert(name);
            self.set(name, value.as_str())?;
        }
        let missing: Vec<&str> = schema
            .required_attributes()
            .filter(|name| !used.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(FolioError::structure(format!(
                "missing attribute(s) in {}: {}",
                schema.name(),
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Fill every empty `common` timestamp in this tree from `clock`
    pub(crate) fn stamp_timestamps(&mut self, clock: &dyn Clock) {
        if matches!(self.schema.kind(), Kind::Common) && self.get("timestamp").unwrap_or_default().is_empty() {
            self.attributes
                .insert("timestamp".to_string(), Some(clock.timestamp()));
        }
        for child in self.children.values_mut() {
            child.stamp_timestamps(clock);
        }
    }
}
