//! Speech Model Configuration
//!
//! Name and purpose of the model instance feeding the pipeline. Both are
//! validated before any task starts.

use thiserror::Error;
use tracing::info;

/// Rejected model configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelConfigError {
    #[error("model name is empty")]
    EmptyName,

    #[error("purpose is empty")]
    EmptyPurpose,
}

/// What the environment check found for a purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentCheck {
    /// The purpose asks for realtime operation
    pub realtime: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub name: String,
    pub purpose: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new("voxcache-speech", "Realtime command transcription")
    }
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
        }
    }

    /// Name and purpose must both contain something besides whitespace
    pub fn validate(&self) -> Result<(), ModelConfigError> {
        if self.name.trim().is_empty() {
            return Err(ModelConfigError::EmptyName);
        }
        if self.purpose.trim().is_empty() {
            return Err(ModelConfigError::EmptyPurpose);
        }
        Ok(())
    }

    /// Inspect the purpose for requirements on the host
    pub fn check_environment(&self) -> EnvironmentCheck {
        let realtime = self.purpose.to_lowercase().contains("realtime");
        if realtime {
            info!(model = %self.name, "Environment check: realtime purpose, verify low-latency support");
        } else {
            info!(model = %self.name, "Environment check passed");
        }
        EnvironmentCheck { realtime }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ModelConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!(config.check_environment().realtime);
    }

    #[test]
    fn test_blank_fields_rejected() {
        assert_eq!(
            ModelConfig::new("", "transcription").validate(),
            Err(ModelConfigError::EmptyName)
        );
        assert_eq!(
            ModelConfig::new("model", "  \t").validate(),
            Err(ModelConfigError::EmptyPurpose)
        );
        // Name is checked first
        assert_eq!(
            ModelConfig::new(" ", "").validate(),
            Err(ModelConfigError::EmptyName)
        );
    }

    #[test]
    fn test_environment_keyed_off_purpose() {
        assert!(ModelConfig::new("m", "REALTIME control").check_environment().realtime);
        assert!(!ModelConfig::new("m", "batch transcription").check_environment().realtime);
    }
}
