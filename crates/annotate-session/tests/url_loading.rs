//! Loading documents over HTTP, including superseded and cancelled loads

#[path = "common/fixtures.rs"]
mod fixtures;
#[path = "common/server.rs"]
mod server;

use std::time::Duration;

use annotate_core::{DocumentSource, StampContent, ToolRequest};
use annotate_session::{EditorConfig, EditorSession, SessionError, TaskState};
use fixtures::create_test_pdf;
use pretty_assertions::assert_eq;
use server::TestServer;

fn session() -> EditorSession {
    EditorSession::new(EditorConfig::default()).unwrap()
}

#[tokio::test]
async fn pdf_url_loads_document() {
    let server = TestServer::start(create_test_pdf(2)).await;
    let mut session = session();

    let task = session
        .begin_load_url(&server.url("/docs/sample.pdf"))
        .unwrap();
    assert!(session.load_state().is_pending());

    let info = session.complete_load(task.run().await).unwrap().unwrap();
    assert_eq!(info.page_count, 2);
    assert_eq!(session.load_state(), &TaskState::Succeeded);

    let document = session.document().unwrap();
    assert_eq!(document.file_name, "sample.pdf");
    assert_eq!(
        document.source,
        DocumentSource::Url(server.url("/docs/sample.pdf"))
    );
    assert_eq!(session.controller().page_count(), 2);
    assert_eq!(session.controller().current_page(), 1);
}

#[tokio::test]
async fn html_response_is_rejected() {
    let server = TestServer::start(create_test_pdf(1)).await;
    let mut session = session();

    let task = session.begin_load_url(&server.url("/page.html")).unwrap();
    let err = session
        .complete_load(task.run().await)
        .unwrap()
        .unwrap_err();

    assert!(matches!(
        &err,
        SessionError::NotPdf { content_type } if content_type.starts_with("text/html")
    ));
    assert!(err.is_input_error());
    assert!(session.document().is_none());
    assert!(matches!(session.load_state(), TaskState::Failed(_)));
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let server = TestServer::start(create_test_pdf(1)).await;
    let mut session = session();

    let task = session.begin_load_url(&server.url("/missing.pdf")).unwrap();
    let err = session
        .complete_load(task.run().await)
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, SessionError::Http { status: 404 }));
    assert!(session.document().is_none());
}

#[tokio::test]
async fn invalid_url_never_starts_a_task() {
    let mut session = session();
    assert!(matches!(
        session.begin_load_url(""),
        Err(SessionError::EmptyUrl)
    ));
    assert!(matches!(
        session.begin_load_url("file:///etc/passwd"),
        Err(SessionError::InvalidUrl(_))
    ));
    assert_eq!(session.load_state(), &TaskState::Idle);
}

#[tokio::test]
async fn newer_load_supersedes_slow_one() {
    let server = TestServer::start(create_test_pdf(3)).await;
    let mut session = session();

    let slow = session.begin_load_url(&server.url("/slow.pdf")).unwrap();
    let fast = session
        .begin_load_url(&server.url("/docs/sample.pdf"))
        .unwrap();

    let (slow_outcome, fast_outcome) = tokio::time::timeout(
        Duration::from_secs(5),
        async { tokio::join!(slow.run(), fast.run()) },
    )
    .await
    .unwrap();

    assert!(matches!(slow_outcome.result, Err(SessionError::Cancelled)));
    assert!(session.complete_load(slow_outcome).is_none());

    let info = session.complete_load(fast_outcome).unwrap().unwrap();
    assert_eq!(info.page_count, 3);
    assert_eq!(session.document().unwrap().file_name, "sample.pdf");
}

#[tokio::test]
async fn upload_cancels_pending_url_load() {
    let server = TestServer::start(create_test_pdf(3)).await;
    let mut session = session();

    let pending = session.begin_load_url(&server.url("/slow.pdf")).unwrap();
    session
        .load_bytes("local.pdf", create_test_pdf(1))
        .unwrap();
    assert_eq!(session.load_state(), &TaskState::Cancelled);

    let outcome = tokio::time::timeout(Duration::from_secs(5), pending.run())
        .await
        .unwrap();
    assert!(session.complete_load(outcome).is_none());

    let document = session.document().unwrap();
    assert_eq!(document.file_name, "local.pdf");
    assert_eq!(document.page_count(), 1);
}

#[tokio::test]
async fn loading_new_document_discards_annotations() {
    let server = TestServer::start(create_test_pdf(2)).await;
    let mut session = session();
    session
        .load_bytes("first.pdf", create_test_pdf(4))
        .unwrap();
    {
        let (controller, store) = session.editor();
        controller.go_to_page(4);
        controller
            .invoke(store, ToolRequest::Stamp(StampContent::text("DRAFT", "#888888")))
            .unwrap();
    }
    assert_eq!(session.store().len(), 1);

    let task = session
        .begin_load_url(&server.url("/docs/sample.pdf"))
        .unwrap();
    session.complete_load(task.run().await).unwrap().unwrap();

    assert!(session.store().is_empty());
    assert_eq!(session.controller().current_page(), 1);
    assert_eq!(session.controller().page_count(), 2);
}
