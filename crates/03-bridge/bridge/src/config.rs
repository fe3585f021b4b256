//! Bridge configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Channel name the target runtime announces itself on unless configured otherwise.
pub const DEFAULT_BRIDGE_NAME: &str = "flash";

/// Startup settings for one bridge instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BridgeConfig {
    /// Channel whose ready callbacks are flushed when the barrier opens.
    pub bridge_name: String,
    /// Runtime image handed to the embedder by [`crate::Bridge::load`].
    pub loader_path: Option<PathBuf>,
    /// Validate member names against the bound descriptor before calling the target.
    pub strict_members: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bridge_name: DEFAULT_BRIDGE_NAME.to_owned(),
            loader_path: None,
            strict_members: true,
        }
    }
}

impl BridgeConfig {
    pub fn named(bridge_name: impl Into<String>) -> Self {
        Self {
            bridge_name: bridge_name.into(),
            ..Self::default()
        }
    }

    pub fn with_loader_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.loader_path = Some(path.into());
        self
    }

    pub fn with_strict_members(mut self, strict: bool) -> Self {
        self.strict_members = strict;
        self
    }

    /// Parses a JSON config document; absent keys take their defaults.
    pub fn from_json(text: &str) -> BridgeResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| BridgeError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> BridgeResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| BridgeError::Config(format!("failed to read {path:?}: {err}")))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.bridge_name.trim().is_empty() {
            return Err(BridgeError::Config("bridge_name must not be empty".into()));
        }
        Ok(())
    }
}
