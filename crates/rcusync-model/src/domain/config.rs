//! Model Configuration
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "strict_registration": true,
//!   "check_locks_at_end": true,
//!   "check_read_sections_at_end": true,
//!   "max_read_nesting": 64,
//!   "hooks": { "functions": { "spin_lock": "lock" } }
//! }
//! ```

use super::hook::{HookOverrides, HookTable};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Default read-side nesting limit
pub const DEFAULT_MAX_READ_NESTING: u32 = 64;

/// Knobs of a model instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Report operations on undeclared locks and slots
    pub strict_registration: bool,
    /// Run `check_all_released` at the end of a replayed program
    pub check_locks_at_end: bool,
    /// Run `check_read_sections_closed` at the end of a replayed program
    pub check_read_sections_at_end: bool,
    /// Deepest read-side nesting accepted before `ReadNestingOverflow`
    pub max_read_nesting: u32,
    /// Additions to the instrumentation hook table
    pub hooks: HookOverrides,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            strict_registration: true,
            check_locks_at_end: true,
            check_read_sections_at_end: true,
            max_read_nesting: DEFAULT_MAX_READ_NESTING,
            hooks: HookOverrides::default(),
        }
    }
}

impl ModelConfig {
    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| ModelError::json("config", e))
    }

    /// Configuration with implicit registration allowed
    pub fn lenient() -> Self {
        Self {
            strict_registration: false,
            ..Self::default()
        }
    }

    /// Effective hook table
    pub fn hook_table(&self) -> HookTable {
        HookTable::with_overrides(&self.hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hook::HookKind;

    #[test]
    fn test_empty_object_is_default() {
        let config = ModelConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ModelConfig::default());
        assert!(config.strict_registration);
        assert_eq!(config.max_read_nesting, 64);
    }

    #[test]
    fn test_partial_config() {
        let config = ModelConfig::from_json_str(
            r#"{ "strict_registration": false, "hooks": { "functions": { "spin_lock": "lock" } } }"#,
        )
        .unwrap();
        assert!(!config.strict_registration);
        assert!(config.check_locks_at_end);
        assert_eq!(config.hook_table().resolve("spin_lock"), Some(HookKind::Lock));
    }

    #[test]
    fn test_invalid_config() {
        let err = ModelConfig::from_json_str(r#"{ "max_read_nesting": "deep" }"#).unwrap_err();
        assert!(matches!(err, ModelError::Json { what: "config", .. }));
    }
}
