//! End-to-end editing: annotate, export, import, save remotely

#[path = "common/fixtures.rs"]
mod fixtures;
#[path = "common/server.rs"]
mod server;

use annotate_core::{AnnotationKind, StampContent, ToolRequest};
use annotate_session::{
    handle_action, EditorConfig, EditorSession, NotificationLevel, RemoteConfig, SessionError,
    TaskState,
};
use fixtures::create_test_pdf;
use lopdf::Document;
use pretty_assertions::assert_eq;
use server::TestServer;

fn session_with_endpoint(endpoint: Option<String>) -> EditorSession {
    let config = EditorConfig {
        remote: RemoteConfig {
            save_endpoint: endpoint,
            ..RemoteConfig::default()
        },
        ..EditorConfig::default()
    };
    EditorSession::new(config).unwrap()
}

/// Upload `contract.pdf` and put an APPROVED stamp on page 2 and a note on page 1
fn annotated_session(endpoint: Option<String>) -> EditorSession {
    let mut session = session_with_endpoint(endpoint);
    session
        .load_bytes("contract.pdf", create_test_pdf(2))
        .unwrap();

    let (controller, store) = session.editor();
    controller
        .invoke(store, ToolRequest::Text("Check clause 4".to_string()))
        .unwrap();
    controller.next_page();
    let stamp = controller
        .invoke(
            store,
            ToolRequest::Stamp(StampContent::text("APPROVED", "#00aa00")),
        )
        .unwrap();

    assert!(controller.begin_drag(store, stamp.id, 0.0, 0.0));
    controller.drag_to(store, 20.0, 10.0);
    controller.end_drag(store);
    session
}

#[tokio::test]
async fn export_produces_signed_pdf() {
    let mut session = annotated_session(None);

    let task = session.begin_export().unwrap();
    assert!(session.export_state().is_pending());
    let exported = session.complete_export(task.run().await).unwrap().unwrap();

    assert_eq!(exported.file_name, "contract_signed.pdf");
    assert_eq!(exported.mime_type, "application/pdf");
    let doc = Document::load_mem(&exported.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    assert_eq!(session.export_state(), &TaskState::Succeeded);
}

#[tokio::test]
async fn export_uses_snapshot_taken_at_begin() {
    let mut session = annotated_session(None);
    let task = session.begin_export().unwrap();

    // Edits after the export started do not leak into it
    assert!(session.clear_all(true));

    let exported = session.complete_export(task.run().await).unwrap().unwrap();
    let doc = Document::load_mem(&exported.bytes).unwrap();
    let page_two = doc.get_pages()[&2];
    let content = String::from_utf8_lossy(&doc.get_page_content(page_two).unwrap()).into_owned();
    assert!(content.contains("APPROVED"));
}

#[tokio::test]
async fn cancelled_export_is_dropped() {
    let mut session = annotated_session(None);
    let task = session.begin_export().unwrap();
    assert!(session.cancel_export());

    let outcome = task.run().await;
    assert!(matches!(outcome.result, Err(SessionError::Cancelled)));
    assert!(session.complete_export(outcome).is_none());
    assert_eq!(session.export_state(), &TaskState::Cancelled);
}

#[test]
fn json_export_and_import_round_trip() {
    let session = annotated_session(None);
    let exported = session.export_json().unwrap();
    assert_eq!(exported.file_name, "contract_annotations.json");
    assert_eq!(exported.mime_type, "application/json");

    let json = String::from_utf8(exported.bytes).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["documentInfo"]["source"], "uploaded_file");
    assert_eq!(value["documentInfo"]["totalPages"], 2);
    assert_eq!(value["annotations"]["stamps"][0]["text"], "APPROVED");
    assert_eq!(value["annotations"]["stamps"][0]["position"]["x"], 100.0);
    assert_eq!(value["documentStats"]["totalStamps"], 1);

    let mut other = session_with_endpoint(None);
    other.load_bytes("contract.pdf", create_test_pdf(2)).unwrap();
    assert_eq!(other.import_json(&json).unwrap(), 2);
    assert_eq!(
        other.store().annotations(),
        session.store().annotations()
    );
}

#[test]
fn operations_without_document_fail() {
    let mut session = session_with_endpoint(Some("http://127.0.0.1:9/api/save".to_string()));
    assert!(matches!(session.begin_export(), Err(SessionError::NoDocument)));
    assert!(matches!(session.export_json(), Err(SessionError::NoDocument)));
    assert!(matches!(session.begin_save(), Err(SessionError::NoDocument)));
    assert!(matches!(
        session.import_json("{}"),
        Err(SessionError::NoDocument)
    ));
}

#[test]
fn clear_all_requires_confirmation() {
    let mut session = annotated_session(None);
    assert!(!session.clear_all(false));
    assert_eq!(session.store().len(), 2);

    assert!(session.clear_all(true));
    assert!(session.store().is_empty());
    assert!(!session.clear_all(true));
}

#[tokio::test]
async fn remote_save_posts_payload() {
    let server = TestServer::start(create_test_pdf(1)).await;
    let mut session = annotated_session(Some(server.url("/api/save")));

    let task = session.begin_save().unwrap();
    assert_eq!(task.payload().pdf_name, "contract.pdf");
    session.complete_save(task.run().await).unwrap().unwrap();
    assert_eq!(session.save_state(), &TaskState::Succeeded);

    let saved = server.saved();
    assert_eq!(saved.len(), 1);
    let body = &saved[0];
    assert_eq!(body["pdfName"], "contract.pdf");
    assert_eq!(body["pdfSource"], "uploaded");
    assert_eq!(body["documentStats"]["totalPages"], 2);
    assert_eq!(
        body["annotations"]["annotations"]["textAnnotations"][0]["content"],
        "Check clause 4"
    );
    assert_eq!(body["annotations"]["documentStats"]["totalTextAnnotations"], 1);
}

#[tokio::test]
async fn remote_rejection_surfaces_status() {
    let server = TestServer::start(create_test_pdf(1)).await;
    let mut session = annotated_session(Some(server.url("/api/reject")));

    let task = session.begin_save().unwrap();
    let err = session.complete_save(task.run().await).unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Http { status: 500 }));
    assert!(matches!(session.save_state(), TaskState::Failed(_)));
    assert!(server.saved().is_empty());
}

#[test]
fn save_without_endpoint_is_rejected() {
    let mut session = annotated_session(None);
    assert!(matches!(
        session.begin_save(),
        Err(SessionError::RemoteNotConfigured)
    ));
    assert_eq!(session.save_state(), &TaskState::Idle);
}

#[test]
fn action_results_become_notifications() {
    let mut session = annotated_session(None);

    let (file, notice) = handle_action("export_json", session.export_json(), |file| {
        format!("Saved {}", file.file_name)
    });
    assert!(file.is_some());
    assert_eq!(notice.level, NotificationLevel::Success);
    assert_eq!(notice.message, "Saved contract_annotations.json");

    let (info, notice) = handle_action(
        "upload",
        session.load_bytes("notes.txt", b"plain text".to_vec()),
        |info| format!("{} pages", info.page_count),
    );
    assert!(info.is_none());
    assert_eq!(notice.level, NotificationLevel::Error);

    // A rejected upload leaves the current document in place
    assert_eq!(session.document().unwrap().file_name, "contract.pdf");
    assert_eq!(
        session
            .store()
            .snapshot()
            .of_kind(AnnotationKind::Stamp)
            .count(),
        1
    );
}

#[test]
fn import_during_drag_leaves_imported_geometry_alone() {
    let mut incoming = session_with_endpoint(None);
    incoming
        .load_bytes("contract.pdf", create_test_pdf(1))
        .unwrap();
    {
        let (controller, store) = incoming.editor();
        let note = controller
            .invoke(store, ToolRequest::Text("Imported".to_string()))
            .unwrap();
        store.update_position(note.id, 300.0, 300.0);
    }
    let json = String::from_utf8(incoming.export_json().unwrap().bytes).unwrap();

    let mut session = session_with_endpoint(None);
    session
        .load_bytes("contract.pdf", create_test_pdf(1))
        .unwrap();
    let (controller, store) = session.editor();
    let local = controller
        .invoke(store, ToolRequest::Text("Local".to_string()))
        .unwrap();
    assert!(controller.begin_drag(store, local.id, 0.0, 0.0));
    controller.drag_to(store, 10.0, 10.0);

    assert_eq!(session.import_json(&json).unwrap(), 1);
    assert!(session.controller().selected().is_none());

    let (controller, store) = session.editor();
    assert_eq!(controller.end_drag(store), None);
    let imported = session.store().get(local.id).unwrap();
    assert_eq!(imported.position.x, 300.0);
    assert_eq!(imported.position.y, 300.0);
}
