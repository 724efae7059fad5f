//! Built-in element types shared by every schema
//!
//! Links, licenses, the `common` provenance block and tags. Each is built
//! once per process.

use crate::schema::{Attribute, Kind, Schema, SchemaBuilder};
use crate::xml::QName;
use std::sync::{Arc, OnceLock};

pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const COMMON_NS: &str = "urn:folio:ns:common";

const MAX_TAG_CHARS: usize = 200;

pub(crate) fn with_link_attributes(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .prefix("xlink", XLINK_NS)
        .attribute(
            "href",
            Attribute::required().qualified(QName::qualified(XLINK_NS, "href")),
        )
        .attribute(
            "xlink_type",
            Attribute::required()
                .one_of(&["simple"])
                .qualified(QName::qualified(XLINK_NS, "type"))
                .internal()
                .initial("simple"),
        )
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '¡' | '¿' | '«' | '»' | '‘' | '’' | '“' | '”' | '…' | '–' | '—' | '·' | '、' | '。'
        )
}

/// Rules for the `value` of a tag
pub fn tag_value(v: &str) -> std::result::Result<(), String> {
    let first = v.chars().next().ok_or("a tag cannot be blank")?;
    let last = v.chars().last().unwrap_or(first);
    if first.is_whitespace() || last.is_whitespace() {
        return Err("a tag cannot begin or end with whitespace".to_string());
    }
    if is_punctuation(first) {
        return Err("a tag cannot begin with punctuation".to_string());
    }
    if v.chars().count() > MAX_TAG_CHARS {
        return Err(format!("tags are limited to {} characters", MAX_TAG_CHARS));
    }
    if v.contains(',') {
        return Err("tags cannot contain commas".to_string());
    }
    Ok(())
}

macro_rules! builtin_schema {
    ($(#[$meta:meta])* $name:ident, $build:expr) => {
        $(#[$meta])*
        pub fn $name() -> Arc<Schema> {
            static CELL: OnceLock<Arc<Schema>> = OnceLock::new();
            CELL.get_or_init(|| $build).clone()
        }
    };
}

builtin_schema!(
    /// License link; its href names the license
    license,
    SchemaBuilder::link("LicenseElement").finish()
);

builtin_schema!(
    /// Author name as text, author page as href
    author,
    with_link_attributes(SchemaBuilder::text("AuthorElement")).finish()
);

builtin_schema!(
    /// Reference to a parent version; any root type
    parent_reference,
    SchemaBuilder::resource_link("ParentReference", &[]).finish()
);

builtin_schema!(
    log_message,
    SchemaBuilder::text("LogMessage").finish()
);

builtin_schema!(
    /// Provenance attached to every licensed root
    common,
    SchemaBuilder::of_kind("CommonElement", Kind::Common)
        .namespace(COMMON_NS)
        .prefix("folio", COMMON_NS)
        .subelement("author", &author())
        .subelement(
            "parents",
            &SchemaBuilder::array("Parents", &parent_reference()).finish(),
        )
        .subelement(
            "licenses",
            &SchemaBuilder::array("Licenses", &license())
                .null_on_empty()
                .finish(),
        )
        .attribute("timestamp", Attribute::required())
        .subelement("log_message", &log_message())
        .finish()
);

builtin_schema!(
    tag,
    SchemaBuilder::new("TagElement")
        .attribute("value", Attribute::required().validator(tag_value))
        .finish()
);

builtin_schema!(
    tags,
    SchemaBuilder::optional_array("Tags", &tag()).finish()
);

builtin_schema!(
    /// Ancestor of every root type
    resource_base,
    SchemaBuilder::new("BaseResource").finish()
);

builtin_schema!(
    /// Ancestor of every licensed root type
    licensed_base,
    SchemaBuilder::new("LicensedResource")
        .extends(&resource_base())
        .subelement("common", &common())
        .subelement("tags", &tags())
        .finish()
);
