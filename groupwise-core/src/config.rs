//! Configuration management

use crate::error::{GroupwiseError, GroupwiseResult};
use crate::types::{ChangeView, GroupwiseConfig};

use std::path::Path;

impl Default for GroupwiseConfig {
    fn default() -> Self {
        Self {
            snapshot: crate::types::SnapshotConfig {
                path: "groupwise.json".to_string(),
            },
            apply: crate::types::ApplyConfig { timeout_ms: 30000 },
            review: crate::types::ReviewConfig {
                group_by: ChangeView::User,
                auth_user_name: None,
            },
        }
    }
}

impl GroupwiseConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> GroupwiseResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GroupwiseError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: GroupwiseConfig =
            toml::from_str(&content).map_err(|e| GroupwiseError::Config {
                message: format!("Failed to parse config: {}", e),
                source: Some(Box::new(e)),
                context: crate::ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in config file"),
            })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> GroupwiseResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| GroupwiseError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| GroupwiseError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> GroupwiseResult<()> {
        if self.snapshot.path.trim().is_empty() {
            return Err(GroupwiseError::Config {
                message: "Snapshot path must not be empty".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set snapshot.path to a JSON snapshot file"),
            });
        }

        if self.apply.timeout_ms == 0 {
            return Err(GroupwiseError::Config {
                message: "Apply timeout_ms must be greater than 0".to_string(),
                source: None,
                context: crate::ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set apply.timeout_ms to a positive value"),
            });
        }

        Ok(())
    }
}
