//! End-to-end export scenarios: controller -> store -> PDF / JSON
//!
//! Run with: cargo test -p annotate-core --test export_scenarios

#[path = "common/fixtures.rs"]
mod fixtures;

use annotate_core::{
    composite, from_json, get_page_count, to_json, AnnotationStore, DocumentSource, ImageData,
    InteractionController, StampContent, ToolRequest, STAMP_PRESETS,
};
use lopdf::Document;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::Value;

#[test]
fn text_annotation_date_exports_to_json() {
    let mut store = AnnotationStore::new();
    let mut controller = InteractionController::default();
    controller.reset_for_document(1);

    controller
        .invoke(&mut store, ToolRequest::Text("Date".to_string()))
        .unwrap();

    let json = to_json("form.pdf", &DocumentSource::Uploaded, &store.snapshot(), 1).unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["annotations"]["textAnnotations"][0]["content"], "Date");
    assert_eq!(value["annotations"]["textAnnotations"][0]["page"], 1);
}

#[test]
fn approved_stamp_keeps_single_page() {
    let pdf = fixtures::create_test_pdf(1);
    let mut store = AnnotationStore::new();
    let approved = STAMP_PRESETS
        .iter()
        .find(|p| p.text == "APPROVED")
        .unwrap();
    assert_eq!(approved.color, "#00aa00");
    store.add_stamp(approved.content(), 1).unwrap();

    let output = composite(&pdf, &store.snapshot()).unwrap();

    assert!(!output.is_empty());
    assert_eq!(get_page_count(&output).unwrap(), 1);
}

#[test]
fn out_of_range_annotation_leaves_document_alone() {
    let pdf = fixtures::create_test_pdf(2);
    let mut store = AnnotationStore::new();
    store.add_text_annotation("page one", 1).unwrap();
    store.add_text_annotation("page nine", 9).unwrap();

    let output = composite(&pdf, &store.snapshot()).unwrap();

    assert_eq!(get_page_count(&output).unwrap(), 2);
    assert_eq!(
        fixtures::page_content(&output, 2),
        fixtures::page_content(&pdf, 2)
    );
    assert_ne!(
        fixtures::page_content(&output, 1),
        fixtures::page_content(&pdf, 1)
    );
}

#[test]
fn shared_resources_are_not_modified() {
    let pdf = fixtures::create_test_pdf(2);
    let mut store = AnnotationStore::new();
    store.add_text_annotation("only page one", 1).unwrap();

    let output = composite(&pdf, &store.snapshot()).unwrap();
    let doc = Document::load_mem(&output).unwrap();
    let pages = doc.get_pages();

    let page_two = doc.get_dictionary(pages[&2]).unwrap();
    let shared_id = page_two.get(b"Resources").unwrap().as_reference().unwrap();
    let shared = doc.get_dictionary(shared_id).unwrap();
    let fonts = shared.get(b"Font").unwrap().as_dict().unwrap();
    assert!(fonts.has(b"F1"));
    assert!(!fonts.has(b"AnnotF1"));
}

#[test]
fn composite_twice_is_byte_identical() {
    let pdf = fixtures::create_test_pdf(3);
    let mut store = AnnotationStore::new();
    let signature = ImageData::from_png(fixtures::signature_png(40, 20)).unwrap();
    store.add_signature(signature, 3).unwrap();
    for (page, preset) in STAMP_PRESETS.iter().enumerate() {
        store.add_stamp(preset.content(), page as u32 % 3 + 1).unwrap();
    }
    store.add_text_annotation("Initials", 2).unwrap();
    let snapshot = store.snapshot();

    assert_eq!(
        composite(&pdf, &snapshot).unwrap(),
        composite(&pdf, &snapshot).unwrap()
    );
}

#[test]
fn export_does_not_touch_store() {
    let pdf = fixtures::create_test_pdf(1);
    let mut store = AnnotationStore::new();
    store
        .add_stamp(StampContent::text("DRAFT", "#888888"), 1)
        .unwrap();
    let before = store.snapshot();

    composite(&pdf, &before).unwrap();
    to_json("a.pdf", &DocumentSource::Uploaded, &before, 1).unwrap();

    assert_eq!(store.snapshot(), before);
}

#[test]
fn gestures_survive_json_round_trip() {
    let mut store = AnnotationStore::new();
    let mut controller = InteractionController::default();
    controller.reset_for_document(2);
    controller.next_page();

    let stamp = controller
        .invoke(&mut store, ToolRequest::Stamp(StampContent::text("URGENT", "#ff9900")))
        .unwrap();
    controller.begin_drag(&store, stamp.id, 0.0, 0.0);
    controller.drag_to(&mut store, 25.0, -40.0);
    controller.end_drag(&mut store);
    controller.rotate(&mut store, stamp.id);

    let source = DocumentSource::Url("https://example.com/lease.pdf".to_string());
    let json = to_json("lease.pdf", &source, &store.snapshot(), 2).unwrap();
    let restored = AnnotationStore::from_document(&from_json(&json).unwrap()).unwrap();

    assert_eq!(restored.annotations(), store.annotations());
    let moved = restored.get(stamp.id).unwrap();
    assert_eq!(moved.page, 2);
    assert_eq!((moved.position.x, moved.position.y), (105.0, 60.0));
    assert_eq!(moved.rotation, 15.0);
}

proptest! {
    /// Property: per-kind array lengths always sum to the documentStats totals
    #[test]
    fn json_group_lengths_match_stats(
        signatures in 0usize..4,
        stamps in 0usize..6,
        texts in 0usize..6,
    ) {
        let mut store = AnnotationStore::new();
        let png = fixtures::signature_png(2, 2);
        for _ in 0..signatures {
            store.add_signature(ImageData::from_png(png.clone()).unwrap(), 1).unwrap();
        }
        for i in 0..stamps {
            store.add_stamp(STAMP_PRESETS[i % STAMP_PRESETS.len()].content(), 1).unwrap();
        }
        for i in 0..texts {
            store.add_text_annotation(format!("note {}", i), 1).unwrap();
        }

        let json = to_json("p.pdf", &DocumentSource::Uploaded, &store.snapshot(), 1).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        let groups = &value["annotations"];
        let stats = &value["documentStats"];

        let listed = groups["signatures"].as_array().unwrap().len()
            + groups["stamps"].as_array().unwrap().len()
            + groups["textAnnotations"].as_array().unwrap().len();
        let counted = stats["totalSignatures"].as_u64().unwrap()
            + stats["totalStamps"].as_u64().unwrap()
            + stats["totalTextAnnotations"].as_u64().unwrap();

        prop_assert_eq!(listed as u64, counted);
        prop_assert_eq!(listed, signatures + stamps + texts);
    }
}
