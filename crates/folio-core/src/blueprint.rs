//! Create/patch/save orchestration for JSON blueprints
//!
//! A top-level blueprint is either `{"href": urn}`, naming content that
//! already exists, or `{"resource": {...}}` carrying exactly one of
//! `@create` (a registered Clark-notation tag) or `@patch` (a URN to fork).
//! Nested references run this pipeline recursively, so children are always
//! saved before the parent computes its own hash.

use crate::errors::{FolioError, Result};
use crate::resource::Resource;
use crate::save_context::SaveContext;
use crate::schema::Schema;
use crate::storage::ResourceDatabase;
use crate::urn::Urn;
use crate::{log_op_end, log_op_error, log_op_start};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

pub const CREATE_KEY: &str = "@create";
pub const PATCH_KEY: &str = "@patch";

/// # Errors
///
/// `BlueprintShape` unless `value` is a JSON object
pub fn expect_object(value: &Value) -> Result<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| FolioError::shape("expected an object", value))
}

/// # Errors
///
/// `BlueprintShape` unless `value` is a JSON array
pub fn expect_list(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| FolioError::shape("expected a list", value))
}

/// # Errors
///
/// `BlueprintShape` unless `value` is a JSON string
pub fn expect_string(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| FolioError::shape("expected a string", value))
}

/// Attribute value from a blueprint: strings as-is, integers in canonical form
///
/// # Errors
///
/// `BlueprintShape` for floats, booleans, null, lists and objects
pub fn cast_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(FolioError::shape("expected a string or an integer", value)),
    }
}

/// Resolve a blueprint to a URN, creating and saving whatever it describes
///
/// `expected`, when given, restricts `@create` and `@patch` to that type
/// or its subtypes.
///
/// # Errors
///
/// - `BlueprintShape` for malformed JSON at any level
/// - `Blueprint` for unknown `@create` types, disallowed types, or a
///   resource blueprint without exactly one of `@create` / `@patch`
/// - `NotFound` when `href` or `@patch` names nothing stored
/// - validation and storage errors from saving
pub fn save_blueprint(
    db: &ResourceDatabase,
    blueprint: &Value,
    ctx: &SaveContext,
    expected: Option<&Arc<Schema>>,
) -> Result<Urn> {
    let start = Instant::now();
    let request_id = ctx.request.request_id.as_str();
    log_op_start!("save_blueprint", request_id = request_id);

    match save_blueprint_impl(db, blueprint, ctx, expected) {
        Ok(urn) => {
            log_op_end!(
                "save_blueprint",
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = request_id,
                urn = urn.as_str()
            );
            Ok(urn)
        }
        Err(e) => {
            log_op_error!(
                "save_blueprint",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = request_id
            );
            Err(e)
        }
    }
}

fn save_blueprint_impl(
    db: &ResourceDatabase,
    blueprint: &Value,
    ctx: &SaveContext,
    expected: Option<&Arc<Schema>>,
) -> Result<Urn> {
    let fields = expect_object(blueprint)?;

    if let Some(href) = fields.get("href") {
        let urn = Urn::parse(expect_string(href)?)?;
        // must exist and must not be a raw blob
        db.get_xml(&urn)?;
        tracing::debug!(urn = urn.as_str(), "blueprint references existing resource");
        return Ok(urn);
    }

    let resource_bp = fields
        .get("resource")
        .ok_or_else(|| FolioError::blueprint("blueprint needs either `href` or `resource`", blueprint))?;
    let resource_fields = expect_object(resource_bp)?;

    let mut resource = match (resource_fields.get(PATCH_KEY), resource_fields.get(CREATE_KEY)) {
        (Some(_), Some(_)) => {
            return Err(FolioError::blueprint(
                "resource blueprint must not contain both `@patch` and `@create`",
                resource_bp,
            ))
        }
        (Some(original), None) => {
            let urn = Urn::parse(expect_string(original)?)?;
            let original = db.get_resource_object(&urn)?;
            check_acceptable(original.schema(), expected, resource_bp)?;
            tracing::debug!(urn = urn.as_str(), "forking resource for patch");
            original.fork()
        }
        (None, Some(fqn)) => {
            let fqn = expect_string(fqn)?;
            let schema = db
                .registry()
                .get(fqn)
                .ok_or_else(|| FolioError::blueprint("invalid argument to `@create`", resource_bp))?
                .clone();
            check_acceptable(&schema, expected, resource_bp)?;
            Resource::new(&schema)?
        }
        (None, None) => {
            return Err(FolioError::blueprint(
                "resource blueprint must contain `@patch` or `@create`",
                resource_bp,
            ))
        }
    };

    let mut remaining = resource_fields.clone();
    remaining.remove(PATCH_KEY);
    remaining.remove(CREATE_KEY);
    resource.patch(db, &Value::Object(remaining), ctx)?;
    resource.save(db)
}

fn check_acceptable(schema: &Schema, expected: Option<&Arc<Schema>>, fragment: &Value) -> Result<()> {
    match expected {
        Some(expected) if !schema.is_subtype_of(expected) => Err(FolioError::blueprint(
            format!("{} is not an acceptable type; expected {}", schema.name(), expected.name()),
            fragment,
        )),
        _ => Ok(()),
    }
}
