//! One-time process initialization
//!
//! Installs the tracing subscriber and records the renderer settings every
//! editor session in the process shares. Call [`initialize`] once at start-up,
//! before the first session is created.

use std::sync::OnceLock;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{EditorConfig, RendererConfig};
use crate::error::SessionError;

/// Used when `RUST_LOG` is not set
pub const DEFAULT_LOG_DIRECTIVES: &str = "annotate_session=info,annotate_core=info";

static RENDERER: OnceLock<RendererConfig> = OnceLock::new();

/// Install the fmt subscriber. A subscriber that is already installed wins.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Initialize logging and the renderer settings.
///
/// Calling again with the same renderer settings is a no-op; different
/// settings are rejected because running sessions already depend on them.
pub fn initialize(config: &EditorConfig) -> Result<&'static RendererConfig, SessionError> {
    init_tracing();

    let installed = RENDERER.get_or_init(|| config.renderer.clone());
    if *installed != config.renderer {
        return Err(SessionError::AlreadyInitialized);
    }
    info!(worker_src = %installed.worker_src, "editor initialized");
    Ok(installed)
}

/// Renderer settings, once [`initialize`] has run
pub fn renderer() -> Option<&'static RendererConfig> {
    RENDERER.get()
}
