//! Check options
//!
//! Options can come from command-line flags or a TOML file:
//!
//! ```toml
//! ignore-voice-source = true
//! interruptible-pattern = false
//! triangleshot = true
//! ```

use crate::error::LevelResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckOptions {
    /// Treat every cue as spoken by the same voice
    pub ignore_voice_source: bool,
    /// Counted cues stop a running oneshot pattern
    pub interruptible_pattern: bool,
    /// Lay out multi-count squareshots as triangleshots
    pub triangleshot: bool,
}

impl CheckOptions {
    pub fn from_toml_str(content: &str) -> LevelResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> LevelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Options enabled in either set
    pub fn union(self, other: CheckOptions) -> Self {
        Self {
            ignore_voice_source: self.ignore_voice_source || other.ignore_voice_source,
            interruptible_pattern: self.interruptible_pattern || other.interruptible_pattern,
            triangleshot: self.triangleshot || other.triangleshot,
        }
    }
}
