//! Strict and lenient validation: bounds, lineage, provenance and licenses
#![allow(clippy::unwrap_used)]

mod common;

use common::{ctx, fqn, new_db, new_db_with, settings, types};
use folio_core::settings::{CC_BY_3_0, CC_BY_SA_3_0, CC_PUBLIC_DOMAIN};
use folio_core::{
    save_blueprint, Element, FolioError, Resource, ResourceDatabase, Settings, Urn,
    ValidationMode,
};
use serde_json::json;
use std::sync::Arc;

fn saved_picture(db: &ResourceDatabase, licenses: &[&str]) -> Urn {
    let licenses: Vec<_> = licenses.iter().map(|l| json!({"href": l})).collect();
    let bp = json!({"resource": {
        "@create": fqn("picture"),
        "image": {"mime_type": "image/png"},
        "common": {"licenses": {"array": licenses}}
    }});
    save_blueprint(db, &bp, &ctx(), None).unwrap()
}

fn lesson_with(db: &ResourceDatabase, pictures: &[Urn]) -> Resource {
    let items: Vec<_> = pictures.iter().map(|u| json!({"href": u.as_str()})).collect();
    let mut lesson = Resource::new(&types().lesson).unwrap();
    lesson
        .patch(db, &json!({"pictures": {"array": items}}), &ctx())
        .unwrap();
    lesson
}

#[test]
fn test_array_lower_bound() {
    // GIVEN a lesson without pictures
    let (db, store) = new_db();
    let mut lesson = lesson_with(&db, &[]);

    // WHEN saving it
    let err = lesson.save(&db).unwrap_err();

    // THEN validation fails before anything is written
    match err {
        FolioError::Validation { message } => assert!(message.contains("too few elements")),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(store.write_count(), 0);
}

#[test]
fn test_array_upper_bound() {
    let (db, _store) = new_db();
    let picture = saved_picture(&db, &[]);
    let mut lesson = lesson_with(&db, &[picture.clone(), picture.clone(), picture.clone(), picture]);

    let err = lesson.save(&db).unwrap_err();

    match err {
        FolioError::Validation { message } => assert!(message.contains("too many elements")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_array_boundary_sizes_are_accepted() {
    let (db, _store) = new_db();
    let picture = saved_picture(&db, &[]);

    for count in [1, 3] {
        let pictures = vec![picture.clone(); count];
        let mut lesson = lesson_with(&db, &pictures);
        lesson.save(&db).unwrap();
        assert_eq!(lesson.element().child("pictures").unwrap().len(), count);
    }
}

#[test]
fn test_subelement_lineage() {
    // GIVEN a picture whose caption slot holds an element of another schema
    let (db, _store) = new_db();
    let mut picture = Resource::new(&types().picture).unwrap();
    let element = picture.element_mut().unwrap();
    element
        .child_mut("image")
        .unwrap()
        .set("mime_type", "image/png")
        .unwrap();
    let body = Element::new(&types().note.subelements()["body"].schema);
    element.replace_child("caption", body).unwrap();

    // WHEN validating
    let err = picture.validate(&db, ValidationMode::Lenient).unwrap_err();

    // THEN the role is reported
    assert_eq!(
        err,
        FolioError::LineageMismatch {
            role: "caption".to_string()
        }
    );
}

#[test]
fn test_array_item_lineage() {
    let (db, _store) = new_db();
    let mut lesson = Resource::new(&types().lesson).unwrap();
    let stranger = Element::new(&types().note.subelements()["body"].schema);
    lesson
        .element_mut()
        .unwrap()
        .child_mut("pictures")
        .unwrap()
        .push_item(stranger)
        .unwrap();

    let err = lesson.validate(&db, ValidationMode::Lenient).unwrap_err();

    assert!(matches!(err, FolioError::LineageMismatch { .. }));
}

#[test]
fn test_attribute_validators_run_on_set() {
    let mut picture = Resource::new(&types().picture).unwrap();
    let image = picture.element_mut().unwrap().child_mut("image").unwrap();

    assert!(image.set("mime_type", "image/png").is_ok());
    let err = image.set("mime_type", "image/gif").unwrap_err();
    assert!(matches!(err, FolioError::Validation { .. }));
    assert!(image.set("no_such_attribute", "x").is_err());
}

#[test]
fn test_builtin_tag_values_are_checked() {
    let (db, _store) = new_db();
    let bp = json!({"resource": {
        "@create": fqn("tag_element"),
        "value": "ok",
        "tags": {"array": [{"value": "a,b"}]}
    }});

    let err = save_blueprint(&db, &bp, &ctx(), None).unwrap_err();

    match err {
        FolioError::Validation { message } => assert!(message.contains("commas")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_author_is_required_for_new_resources() {
    let (db, _store) = new_db();
    let mut tag = Resource::new(&types().tag_element).unwrap();
    tag.element_mut().unwrap().set("value", "anonymous").unwrap();

    let err = tag.save(&db).unwrap_err();

    assert!(matches!(err, FolioError::Validation { .. }));
    // lenient validation only checks what is in memory
    tag.validate(&db, ValidationMode::Lenient).unwrap();
}

#[test]
fn test_default_license_injected() {
    let (db, _store) = new_db();

    let urn = saved_picture(&db, &[]);

    let picture = db.get_resource_object(&urn).unwrap();
    assert_eq!(picture.licenses(), vec![CC_BY_SA_3_0.to_string()]);
}

#[test]
fn test_license_gate_rejects_disallowed_license() {
    // GIVEN a server that only allows CC-BY
    let restrictive = Settings {
        allowed_licenses: vec![CC_BY_3_0.to_string()],
        default_license: CC_BY_3_0.to_string(),
        ..settings()
    };
    let (db, _store) = new_db_with(restrictive);

    // WHEN saving a picture under BY-SA only
    let bp = json!({"resource": {
        "@create": fqn("picture"),
        "image": {"mime_type": "image/png"},
        "common": {"licenses": {"array": [{"href": CC_BY_SA_3_0}]}}
    }});
    let err = save_blueprint(&db, &bp, &ctx(), None).unwrap_err();

    // THEN the license check fails
    assert!(matches!(err, FolioError::LicenseViolation { .. }));
}

#[test]
fn test_license_gate_applies_to_loads() {
    // GIVEN a picture stored under BY-SA
    let (db, store) = new_db();
    let urn = saved_picture(&db, &[CC_BY_SA_3_0]);

    // WHEN a server that no longer allows BY-SA loads it
    let restrictive = Settings {
        allowed_licenses: vec![CC_BY_3_0.to_string()],
        default_license: CC_BY_3_0.to_string(),
        ..settings()
    };
    let other = ResourceDatabase::new(store, types().registry.clone(), Arc::new(restrictive));

    // THEN even lenient loading refuses it
    let err = other.get_resource_object(&urn).unwrap_err();
    assert!(matches!(err, FolioError::LicenseViolation { .. }));
}

#[test]
fn test_derivative_license_must_be_compatible() {
    // GIVEN a BY-SA picture
    let (db, _store) = new_db();
    let parent = saved_picture(&db, &[CC_BY_SA_3_0]);

    // WHEN patching it into a public-domain derivative
    let bp = json!({"resource": {
        "@patch": parent.as_str(),
        "common": {"licenses": {"array": [{"href": CC_PUBLIC_DOMAIN}]}}
    }});
    let err = save_blueprint(&db, &bp, &ctx(), None).unwrap_err();

    // THEN share-alike forbids it
    assert!(matches!(err, FolioError::LicenseViolation { .. }));
}

#[test]
fn test_public_domain_parent_allows_any_license() {
    let (db, _store) = new_db();
    let parent = saved_picture(&db, &[CC_PUBLIC_DOMAIN]);

    let bp = json!({"resource": {
        "@patch": parent.as_str(),
        "caption": {"text": "now attributed"},
        "common": {"licenses": {"array": [{"href": CC_BY_3_0}]}}
    }});
    let urn = save_blueprint(&db, &bp, &ctx(), None).unwrap();

    let child = db.get_resource_object(&urn).unwrap();
    assert_eq!(child.licenses(), vec![CC_BY_3_0.to_string()]);
}

#[test]
fn test_parents_must_share_the_type() {
    // GIVEN a tag element claiming a picture as its parent
    let (db, _store) = new_db();
    let picture = saved_picture(&db, &[]);
    let mut tag = Resource::new(&types().tag_element).unwrap();
    tag.patch(
        &db,
        &json!({
            "value": "orphan",
            "common": {"licenses": {"array": [{"href": CC_BY_SA_3_0}]}}
        }),
        &ctx(),
    )
    .unwrap();
    let parents = tag
        .element_mut()
        .unwrap()
        .child_mut("common")
        .unwrap()
        .child_mut("parents")
        .unwrap();
    let mut parent = parents.new_item().unwrap();
    parent.set_href(picture.as_str()).unwrap();
    parents.push_item(parent).unwrap();

    // WHEN validating strictly
    let err = tag.validate(&db, ValidationMode::Strict).unwrap_err();

    // THEN the mismatch is reported
    match err {
        FolioError::Validation { message } => assert!(message.contains("same type")),
        other => panic!("unexpected error {:?}", other),
    }

    // AND lenient validation does not look at parents
    tag.validate(&db, ValidationMode::Lenient).unwrap();
}
