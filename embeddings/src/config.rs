//! Embedding model configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Provider and dimension of a known embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub provider: &'static str,
    pub dimensions: usize,
}

/// Models whose provider and dimension are known up front.
pub const KNOWN_MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "text-embedding-3-small",
        provider: "openai",
        dimensions: 1536,
    },
    ModelInfo {
        name: "text-embedding-3-large",
        provider: "openai",
        dimensions: 3072,
    },
    ModelInfo {
        name: "text-embedding-ada-002",
        provider: "openai",
        dimensions: 1536,
    },
    ModelInfo {
        name: "text-embedding-004",
        provider: "google",
        dimensions: 768,
    },
    ModelInfo {
        name: "text-multilingual-embedding-002",
        provider: "google",
        dimensions: 768,
    },
    ModelInfo {
        name: "all-MiniLM-L6-v2",
        provider: "local",
        dimensions: 384,
    },
    ModelInfo {
        name: "all-mpnet-base-v2",
        provider: "local",
        dimensions: 768,
    },
];

/// Look up a known model by name.
pub fn model_info(model: &str) -> Option<&'static ModelInfo> {
    KNOWN_MODELS.iter().find(|info| info.name == model)
}

/// Configuration for generating embeddings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider identifier (`openai`, `google`, `local`, ...).
    pub provider: String,

    /// Model identifier.
    pub model: String,

    /// Output dimension of the model.
    pub dimensions: usize,

    /// Maximum number of texts per provider call.
    pub batch_size: usize,

    /// Whether vectors are L2-normalized after embedding.
    pub normalize: bool,
}

impl EmbeddingConfig {
    /// Configuration for a model, filling provider and dimensions from
    /// [`KNOWN_MODELS`]. Unknown models get `openai` and 1536 dimensions.
    pub fn for_model(model: impl Into<String>) -> Self {
        let model = model.into();
        let (provider, dimensions) = match model_info(&model) {
            Some(info) => (info.provider, info.dimensions),
            None => ("openai", crate::DEFAULT_DIMENSION),
        };
        Self {
            provider: provider.to_string(),
            model,
            dimensions,
            ..Self::default()
        }
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the output dimension.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Enable or disable normalization.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfiguration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfiguration(
                "dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: crate::DEFAULT_DIMENSION,
            batch_size: 100,
            normalize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_for_known_model() {
        let config = EmbeddingConfig::for_model("text-embedding-004");
        assert_eq!(config.provider, "google");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.batch_size, 100);
        assert!(config.normalize);
    }

    #[test]
    fn test_for_unknown_model() {
        let config = EmbeddingConfig::for_model("my-custom-model");
        assert_eq!(config.provider, "openai");
        assert_eq!(config.dimensions, 1536);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = EmbeddingConfig::default().with_batch_size(0);
        assert!(matches!(
            config.validate(),
            Err(EmbeddingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EmbeddingConfig::from_toml_str(
            r#"
            model = "all-MiniLM-L6-v2"
            provider = "local"
            dimensions = 384
            batch_size = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "all-MiniLM-L6-v2");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 16);
        assert!(config.normalize);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(matches!(
            EmbeddingConfig::from_toml_str("batch_size = 0"),
            Err(EmbeddingError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            EmbeddingConfig::from_toml_str("batch_size = \"lots\""),
            Err(EmbeddingError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embedding.toml");
        std::fs::write(&path, "normalize = false\n").unwrap();

        let config = EmbeddingConfig::load(&path).unwrap();
        assert!(!config.normalize);
        assert_eq!(config.model, "text-embedding-3-small");
    }
}
