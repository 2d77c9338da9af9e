//! Build configuration

use serde::{Deserialize, Serialize};

/// Knobs shared by the module builder and the round scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Emit a warning for every socket left without a bean.
    pub warn_unwired: bool,

    /// Upper bound on scheduler rounds before generation gives up.
    pub max_rounds: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            warn_unwired: true,
            max_rounds: 1024,
        }
    }
}
