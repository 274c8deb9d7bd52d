//! Editor configuration
//!
//! TOML file with one section per concern. Every field has a default, so an
//! empty file (or no file at all) yields a working editor.
//!
//! ```toml
//! [viewer]
//! default_scale = 1.25
//!
//! [interaction]
//! drag_commit = "continuous"
//!
//! [remote]
//! save_endpoint = "https://annotations.example.com/api/save"
//! ```

use std::fs;
use std::path::Path;

use annotate_core::{DragCommit, InteractionSettings, Size, Viewport};
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file read by [`EditorConfig::load`]
pub const CONFIG_ENV: &str = "ANNOTATE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

impl EditorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Read the file named by `ANNOTATE_CONFIG`, or fall back to defaults
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Initial zoom, clamped into [0.5, 2.0]
    #[serde(default = "default_scale")]
    pub default_scale: f64,
    #[serde(default = "default_scale_step")]
    pub scale_step: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_scale: default_scale(),
            scale_step: default_scale_step(),
        }
    }
}

impl ViewerConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.default_scale).with_step(self.scale_step)
    }
}

fn default_scale() -> f64 {
    1.0
}

fn default_scale_step() -> f64 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "default_min_width")]
    pub min_width: f64,
    #[serde(default = "default_min_height")]
    pub min_height: f64,
    /// Degrees added per rotate click
    #[serde(default = "default_rotation_step")]
    pub rotation_step: f64,
    #[serde(default)]
    pub drag_commit: DragCommit,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            min_height: default_min_height(),
            rotation_step: default_rotation_step(),
            drag_commit: DragCommit::default(),
        }
    }
}

impl InteractionConfig {
    pub fn settings(&self) -> InteractionSettings {
        InteractionSettings {
            min_size: Size::new(self.min_width, self.min_height),
            rotation_step: self.rotation_step,
            drag_commit: self.drag_commit,
        }
    }
}

fn default_min_width() -> f64 {
    50.0
}

fn default_min_height() -> f64 {
    30.0
}

fn default_rotation_step() -> f64 {
    15.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("annotate-session/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Where "Save to server" POSTs the annotation payload; disabled when unset
    #[serde(default)]
    pub save_endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            save_endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Process-wide settings for the external PDF page renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Script URL of the renderer's background worker
    #[serde(default = "default_worker_src")]
    pub worker_src: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            worker_src: default_worker_src(),
        }
    }
}

fn default_worker_src() -> String {
    "/pdf.worker.min.js".to_string()
}
