//! Editing session around the annotation engine
//!
//! Everything in `annotate-core` is synchronous and I/O free. This crate adds
//! the parts of an editor that talk to the outside world:
//!
//! - [`config`]: TOML configuration for the viewer, tools and endpoints
//! - [`startup`]: one-time tracing and renderer initialization
//! - [`loader`]: PDF uploads and HTTP fetches
//! - [`remote`]: optional POST of annotations to a storage server
//! - [`tasks`]: cancellable one-shot tasks, newest wins
//! - [`session`]: the [`EditorSession`] tying it together

pub mod config;
pub mod error;
pub mod loader;
pub mod remote;
pub mod session;
pub mod startup;
pub mod tasks;

pub use config::{
    EditorConfig, FetchConfig, InteractionConfig, RemoteConfig, RendererConfig, ViewerConfig,
    CONFIG_ENV,
};
pub use error::SessionError;
pub use loader::{fetch_pdf, parse_pdf_url, validate_content_type, LoadedPdf};
pub use remote::RemoteStore;
pub use session::{
    handle_action, EditorSession, ExportTask, ExportedFile, LoadTask, Notification,
    NotificationLevel, SaveTask,
};
pub use startup::{init_tracing, initialize, renderer, DEFAULT_LOG_DIRECTIVES};
pub use tasks::{CancellationToken, TaskOutcome, TaskSlot, TaskState, TaskTicket};
