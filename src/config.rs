//! Runtime switches of the patcher.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AlterationResult;
use crate::serialization::read_json;

/// Patcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropsConfig {
    /// Enables manipulation of drop tables. When false every patch is a no-op.
    pub enabled: bool,
    /// Writes the contents of altered holders to the log on live patches.
    pub debug: bool,
    /// Dry runs the holders of every loaded scene, see
    /// [`DropsPatcher::on_scene_loaded_with`](crate::DropsPatcher::on_scene_loaded_with).
    pub simulate: bool,
}

impl Default for DropsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            simulate: false,
        }
    }
}

impl DropsConfig {
    /// Loads a config from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> AlterationResult<Self> {
        let config: Self = read_json("config", path)?;
        tracing::info!(
            enabled = config.enabled,
            debug = config.debug,
            simulate = config.simulate,
            "Loaded drops config"
        );
        Ok(config)
    }

    /// Config with debug reports turned on.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Config with scene-load dry runs turned on or off.
    #[must_use]
    pub const fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Config with the patcher switched on or off.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
