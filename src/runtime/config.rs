//! Engine settings
//!
//! Settings can be built in code or loaded from JSON:
//!
//! ```
//! use wasm_machine::runtime::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "max_call_depth": 64 }"#).unwrap();
//! assert_eq!(config.max_call_depth, 64);
//! ```

use serde::{Deserialize, Serialize};

/// Default bound on nested calls within one configuration
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("max_call_depth must be at least 1")]
    ZeroCallDepth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Calls nested deeper than this trap with "call stack exhausted"
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Parse and validate settings; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }
        Ok(())
    }
}
