//! Batcher configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! { "overflow": "reject", "frame_cap": 60, "asset_root": "assets" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a tint batch does when it reaches the 16-bit index ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Start a new batch for the same image and tint. Costs one extra draw call.
    #[default]
    Split,
    /// Refuse the quad with [`BatchError::IndexOverflow`](crate::BatchError::IndexOverflow).
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    pub overflow: OverflowPolicy,
    /// Target frames per second for the frame driver. `None` runs unpaced.
    pub frame_cap: Option<u32>,
    /// Base directory for static image and typeface paths.
    pub asset_root: PathBuf,
    /// Base directory holding `main.<v>/` and `patch.<v>/` archive trees.
    pub expansion_root: Option<PathBuf>,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            overflow: OverflowPolicy::Split,
            frame_cap: None,
            asset_root: PathBuf::from("."),
            expansion_root: None,
        }
    }
}

impl BatcherConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded batcher config from {}", path.display());
        Ok(config)
    }
}
