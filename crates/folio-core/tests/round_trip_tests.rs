//! parse(emit(x)) == x for generated and hand-built resources
#![allow(clippy::unwrap_used)]

mod common;

use common::{ctx, fixed_clock, fqn, new_db, types};
use folio_core::settings::{CC_BY_3_0, CC_BY_SA_3_0, CC_PUBLIC_DOMAIN};
use folio_core::xml::XmlNode;
use folio_core::{save_blueprint, Resource, ResourceDatabase};
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
struct NoteFields {
    title: String,
    lang: Option<String>,
    body: String,
    keywords: Vec<String>,
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 <>&'\"é]{0,24}"
}

fn arb_note() -> impl Strategy<Value = NoteFields> {
    (
        arb_text(),
        proptest::option::of("[a-z]{2}(-[A-Z]{2})?"),
        arb_text(),
        proptest::collection::vec(arb_text(), 0..4),
    )
        .prop_map(|(title, lang, body, keywords)| NoteFields {
            title,
            lang,
            body,
            keywords,
        })
}

fn build_note(fields: &NoteFields) -> Resource {
    let mut note = Resource::new(&types().note).unwrap();
    let element = note.element_mut().unwrap();
    element.set("title", fields.title.as_str()).unwrap();
    if let Some(lang) = &fields.lang {
        element.set("lang", lang.as_str()).unwrap();
    }
    element
        .child_mut("body")
        .unwrap()
        .set_text(fields.body.as_str())
        .unwrap();
    let keywords = element.child_mut("keywords").unwrap();
    for word in &fields.keywords {
        let mut item = keywords.new_item().unwrap();
        item.set_text(word.as_str()).unwrap();
        keywords.push_item(item).unwrap();
    }
    note
}

fn reparse(resource: &mut Resource) -> (Resource, Vec<u8>) {
    let bytes = resource.to_xml_tree(&*fixed_clock()).unwrap().to_bytes().unwrap();
    let node = XmlNode::parse(&bytes).unwrap();
    (Resource::from_xml_tree(&types().registry, &node).unwrap(), bytes)
}

fn arb_license() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(CC_PUBLIC_DOMAIN), Just(CC_BY_3_0), Just(CC_BY_SA_3_0)]
}

fn arb_tag_value() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

#[derive(Debug, Clone)]
struct TagFields {
    value: String,
    tags: Vec<String>,
    license: &'static str,
    forked: bool,
}

fn arb_tag() -> impl Strategy<Value = TagFields> {
    (
        arb_tag_value(),
        proptest::collection::vec(arb_tag_value(), 0..4),
        arb_license(),
        any::<bool>(),
    )
        .prop_map(|(value, tags, license, forked)| TagFields {
            value,
            tags,
            license,
            forked,
        })
}

/// A tag element filled from a blueprint, optionally forked from a saved one
fn build_tag(db: &ResourceDatabase, fields: &TagFields) -> Resource {
    let mut tag = if fields.forked {
        let bp = json!({"resource": {"@create": fqn("tag_element"), "value": "origin"}});
        let parent = save_blueprint(db, &bp, &ctx(), None).unwrap();
        db.get_resource_object(&parent).unwrap().fork()
    } else {
        Resource::new(&types().tag_element).unwrap()
    };
    let tags: Vec<_> = fields.tags.iter().map(|t| json!({"value": t})).collect();
    tag.patch(
        db,
        &json!({
            "value": fields.value,
            "tags": {"array": tags},
            "common": {"licenses": {"array": [{"href": fields.license}]}}
        }),
        &ctx(),
    )
    .unwrap();
    tag
}

#[derive(Debug, Clone)]
struct PictureFields {
    mime_type: &'static str,
    caption: String,
    license: &'static str,
}

fn arb_picture() -> impl Strategy<Value = PictureFields> {
    (
        prop_oneof![Just("image/png"), Just("image/jpeg")],
        arb_text(),
        arb_license(),
    )
        .prop_map(|(mime_type, caption, license)| PictureFields {
            mime_type,
            caption,
            license,
        })
}

fn picture_blueprint(fields: &PictureFields) -> serde_json::Value {
    json!({
        "image": {"mime_type": fields.mime_type},
        "caption": {"text": fields.caption},
        "common": {"licenses": {"array": [{"href": fields.license}]}}
    })
}

fn build_picture(db: &ResourceDatabase, fields: &PictureFields) -> Resource {
    let mut picture = Resource::new(&types().picture).unwrap();
    picture.patch(db, &picture_blueprint(fields), &ctx()).unwrap();
    picture
}

#[derive(Debug, Clone)]
struct LessonFields {
    level: Option<String>,
    pictures: Vec<PictureFields>,
    notes: Option<String>,
}

fn arb_lesson() -> impl Strategy<Value = LessonFields> {
    (
        proptest::option::of("[a-z]{1,8}"),
        proptest::collection::vec(arb_picture(), 1..=3),
        proptest::option::of(arb_text()),
    )
        .prop_map(|(level, pictures, notes)| LessonFields {
            level,
            pictures,
            notes,
        })
}

/// Pictures are created through nested `resource` blueprints, notes go to a
/// text blob
fn build_lesson(db: &ResourceDatabase, fields: &LessonFields) -> Resource {
    let pictures: Vec<_> = fields
        .pictures
        .iter()
        .map(|p| {
            let mut bp = picture_blueprint(p);
            bp["@create"] = json!(fqn("picture"));
            json!({"resource": bp})
        })
        .collect();
    let mut bp = json!({"pictures": {"array": pictures}});
    if let Some(level) = &fields.level {
        bp["level"] = json!(level);
    }
    if let Some(notes) = &fields.notes {
        bp["notes"] = json!({"text": notes});
    }
    let mut lesson = Resource::new(&types().lesson).unwrap();
    lesson.patch(db, &bp, &ctx()).unwrap();
    lesson
}

/// Parse back, check equality, and check the parsed copy emits the same bytes
fn assert_round_trip(resource: &mut Resource) -> std::result::Result<(), TestCaseError> {
    let (mut parsed, bytes) = reparse(resource);
    prop_assert_eq!(&parsed, &*resource);
    let again = parsed
        .to_xml_tree(&*fixed_clock())
        .unwrap()
        .to_bytes()
        .unwrap();
    prop_assert_eq!(again, bytes);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tag_element_round_trips(fields in arb_tag()) {
        let (db, _store) = new_db();
        let mut tag = build_tag(&db, &fields);
        prop_assert_eq!(tag.element().child("tags").unwrap().len(), fields.tags.len());
        assert_round_trip(&mut tag)?;
    }

    #[test]
    fn picture_round_trips(fields in arb_picture()) {
        let (db, _store) = new_db();
        assert_round_trip(&mut build_picture(&db, &fields))?;
    }

    #[test]
    fn lesson_round_trips(fields in arb_lesson()) {
        let (db, _store) = new_db();
        let mut lesson = build_lesson(&db, &fields);
        prop_assert_eq!(
            lesson.element().child("pictures").unwrap().len(),
            fields.pictures.len()
        );
        assert_round_trip(&mut lesson)?;
    }

    #[test]
    fn lesson_bytes_are_stable(fields in arb_lesson()) {
        let (first_db, _first) = new_db();
        let (second_db, _second) = new_db();
        let (_, first) = reparse(&mut build_lesson(&first_db, &fields));
        let (_, second) = reparse(&mut build_lesson(&second_db, &fields));
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #[test]
    fn note_round_trips(fields in arb_note()) {
        let mut note = build_note(&fields);
        let (parsed, _) = reparse(&mut note);
        prop_assert_eq!(parsed.element(), note.element());
    }

    #[test]
    fn emit_is_deterministic(fields in arb_note()) {
        let (_, first) = reparse(&mut build_note(&fields));
        let (_, second) = reparse(&mut build_note(&fields));
        prop_assert_eq!(first, second);
    }
}

#[test]
fn test_licensed_resource_round_trips() {
    // GIVEN a tag element with provenance and tags filled from a blueprint
    let (db, _store) = new_db();
    let mut tag = Resource::new(&types().tag_element).unwrap();
    tag.patch(
        &db,
        &json!({
            "value": "rust & xml",
            "tags": {"array": [{"value": "parsing"}, {"value": "storage"}]},
            "common": {"licenses": {"array": [{"href": folio_core::settings::CC_BY_3_0}]}}
        }),
        &ctx(),
    )
    .unwrap();

    // WHEN emitting and parsing it back
    let (parsed, bytes) = reparse(&mut tag);

    // THEN it is structurally equal
    assert_eq!(parsed, tag);
    assert_eq!(parsed.element().child("tags").unwrap().len(), 2);

    // AND the document uses the test namespace as default and xlink for links
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(text.contains("xmlns=\"urn:folio:test\""));
    assert!(text.contains("xmlns:xlink=\"http://www.w3.org/1999/xlink\""));
    assert!(text.contains("xlink:type=\"simple\""));
}

#[test]
fn test_empty_optional_array_is_omitted() {
    let mut tag = Resource::new(&types().tag_element).unwrap();
    tag.element_mut().unwrap().set("value", "v").unwrap();

    let node = tag.to_xml_tree(&*fixed_clock()).unwrap();

    let names: Vec<String> = node.children.iter().map(|c| c.name.local.clone()).collect();
    assert!(!names.contains(&"tags".to_string()));
    assert_eq!(node.name.clark(), fqn("tag_element"));
}

#[test]
fn test_identical_content_shares_urn() {
    let (db, store) = new_db();
    let fields = NoteFields {
        title: "same".to_string(),
        lang: None,
        body: "text".to_string(),
        keywords: vec!["a".to_string()],
    };

    let first = build_note(&fields).save(&db).unwrap();
    let second = build_note(&fields).save(&db).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.write_count(), 1);
}
