//! Engine Settings
//!
//! Static configuration consumed at [`Engine`](crate::Engine) construction.
//! Every field has a default, so a settings file only needs the keys it
//! overrides.
//!
//! # Example
//!
//! ```rust,ignore
//! use vizm::EngineSettings;
//!
//! let settings = EngineSettings {
//!     target_frame_rate: 30.0,
//!     framerate_lock: true,
//!     ..Default::default()
//! };
//!
//! let from_disk = EngineSettings::from_json_file("viewer.json")?;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::renderer::InfoDisplay;

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Name reported in logs and the profiling overlay.
    pub core_name: String,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Canvas size given to a camera's renderer at creation.
    pub canvas_init_width: u32,
    pub canvas_init_height: u32,
    pub canvas_init_dpi: f32,
    /// Render targets are never smaller than this in either dimension.
    pub min_canvas_extent: u32,

    /// Fixed-update rate in Hz.
    pub target_frame_rate: f32,
    /// Sleep away the remainder of early frames.
    pub framerate_lock: bool,
    /// Run the fixed-update accumulator.
    pub frameskip: bool,
    /// Depth of the per-renderer fence ring.
    pub frames_in_flight: usize,
    /// Upper bound of a single fence wait, in milliseconds.
    pub fence_timeout_ms: u64,

    /// Overlay switches given to new renderers.
    pub default_info_display: InfoDisplay,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            core_name: "VzmEngine".to_string(),
            log_filter: "info".to_string(),
            canvas_init_width: 16,
            canvas_init_height: 16,
            canvas_init_dpi: 96.0,
            min_canvas_extent: 16,
            target_frame_rate: 60.0,
            framerate_lock: false,
            frameskip: true,
            frames_in_flight: 3,
            fence_timeout_ms: 1000,
            default_info_display: InfoDisplay::empty(),
        }
    }
}

impl EngineSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Fixed-update step in seconds.
    #[inline]
    #[must_use]
    pub fn fixed_step(&self) -> f32 {
        1.0 / self.target_frame_rate.max(1.0)
    }
}
