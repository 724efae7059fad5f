//! Scalar field descriptors

use crate::errors::{FolioError, Result};
use crate::xml::QName;

/// Domain check over an attribute's string value
pub type Predicate = fn(&str) -> std::result::Result<(), String>;

#[derive(Debug, Clone)]
pub enum Validator {
    /// Value must be one of a closed set
    OneOf(Vec<String>),
    Predicate(Predicate),
}

impl Validator {
    pub fn check(&self, value: &str) -> std::result::Result<(), String> {
        match self {
            Validator::OneOf(allowed) => {
                if allowed.iter().any(|a| a == value) {
                    Ok(())
                } else {
                    Err(format!("{:?} is not one of {:?}", value, allowed))
                }
            }
            Validator::Predicate(f) => f(value),
        }
    }
}

/// Declared attribute of an element type
#[derive(Debug, Clone)]
pub struct Attribute {
    optional: bool,
    validator: Option<Validator>,
    qname: Option<QName>,
    blank_is_null: bool,
    internal: bool,
    initial: Option<String>,
}

impl Attribute {
    /// Must be present; starts out as the empty string
    pub fn required() -> Self {
        Self {
            optional: false,
            validator: None,
            qname: None,
            blank_is_null: true,
            internal: false,
            initial: None,
        }
    }

    /// May be null; starts out null
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Self::required()
        }
    }

    pub fn validator(mut self, predicate: Predicate) -> Self {
        self.validator = Some(Validator::Predicate(predicate));
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.validator = Some(Validator::OneOf(
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    /// Serialize under `qname` instead of the unqualified attribute name
    pub fn qualified(mut self, qname: QName) -> Self {
        self.qname = Some(qname);
        self
    }

    /// Keep an empty optional value as `""` rather than collapsing it to null
    pub fn keep_blank(mut self) -> Self {
        self.blank_is_null = false;
        self
    }

    /// Hidden from the JSON projection
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn initial(mut self, value: &str) -> Self {
        self.initial = Some(value.to_string());
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn blank_is_null(&self) -> bool {
        self.blank_is_null
    }

    /// XML name for an attribute declared as `name`
    pub fn xml_name(&self, name: &str) -> QName {
        self.qname.clone().unwrap_or_else(|| QName::local(name))
    }

    pub(crate) fn initial_value(&self) -> Option<String> {
        match (&self.initial, self.optional) {
            (Some(v), _) => Some(v.clone()),
            (None, true) => None,
            (None, false) => Some(String::new()),
        }
    }

    /// Whether a stored value is left out of serialized forms
    pub(crate) fn is_omitted(&self, value: Option<&str>) -> bool {
        match value {
            None => true,
            Some(v) => self.optional && self.blank_is_null && v.is_empty(),
        }
    }

    /// # Errors
    ///
    /// `Validation` naming the attribute when the validator rejects `value`
    pub fn validate(&self, name: &str, value: &str) -> Result<()> {
        match &self.validator {
            Some(v) => v
                .check(value)
                .map_err(|msg| FolioError::validation(format!("{}: {}", name, msg))),
            None => Ok(()),
        }
    }
}
