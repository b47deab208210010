//! User settings.

use serde::{Deserialize, Serialize};

/// Per-account preferences. Synced as a single unit gated by one dirty flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub use_imperial: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self { use_imperial: true }
    }
}

impl UserSettings {
    /// Unit label for weights.
    #[must_use]
    pub const fn weight_unit(&self) -> &'static str {
        if self.use_imperial { "lbs" } else { "kg" }
    }

    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(use_imperial) = patch.use_imperial {
            self.use_imperial = use_imperial;
        }
    }
}

/// Partial settings write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub use_imperial: Option<bool>,
}
