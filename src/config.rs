//! Weaver configuration
//!
//! Loaded from `weaver.yaml`. Every section has defaults, so an absent file or
//! an empty document yields a usable configuration.

use crate::advice::{IntroductionScope, OverrideStrategy};
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up by [`WeaverConfig::load_from_dir`]
pub const CONFIG_FILE: &str = "weaver.yaml";

/// Root configuration (`weaver.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WeaverConfig {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Template handling
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Member introduction defaults
    #[serde(default)]
    pub introduction: IntroductionConfig,

    /// Pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Log output of the binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Template handling
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TemplatesConfig {
    /// Attributes of template members never copied to introduced members
    #[serde(default = "default_excluded_attributes")]
    pub excluded_attributes: Vec<String>,

    /// Use the async template for any awaitable target, not only `async` ones
    #[serde(default)]
    pub use_async_template_for_any_awaitable: bool,

    /// Use enumerable templates for any enumerable target, not only iterators
    #[serde(default)]
    pub use_enumerable_template_for_any_enumerable: bool,
}

fn default_excluded_attributes() -> Vec<String> {
    ["Template", "Introduce", "InterfaceMember", "CompileTime"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            excluded_attributes: default_excluded_attributes(),
            use_async_template_for_any_awaitable: false,
            use_enumerable_template_for_any_enumerable: false,
        }
    }
}

/// Member introduction defaults
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IntroductionConfig {
    /// What `OverrideStrategy::Default` means for introductions
    #[serde(default = "default_override_strategy")]
    pub default_override_strategy: OverrideStrategy,

    /// Scope used when neither the advice nor the template names one
    #[serde(default)]
    pub default_scope: IntroductionScope,
}

fn default_override_strategy() -> OverrideStrategy {
    OverrideStrategy::Fail
}

impl Default for IntroductionConfig {
    fn default() -> Self {
        Self {
            default_override_strategy: default_override_strategy(),
            default_scope: IntroductionScope::Default,
        }
    }
}

/// Pipeline behavior
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    /// Drop the transformations of an aspect instance that failed in a step
    #[serde(default = "default_true")]
    pub discard_failed_aspect_transformations: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            discard_failed_aspect_transformations: true,
        }
    }
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    /// Default filter when `WEAVER_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            templates: TemplatesConfig::default(),
            introduction: IntroductionConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WeaverConfig {
    /// Parse and validate a configuration document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WeaverConfig = if yaml.trim().is_empty() {
            WeaverConfig::default()
        } else {
            serde_norway::from_str(yaml)
                .map_err(|e| Error::Other(format!("Failed to parse {}: {}", CONFIG_FILE, e)))?
        };

        if config.version != 1 {
            return Err(Error::Other(format!(
                "Unsupported {} version: {}",
                CONFIG_FILE, config.version
            )));
        }
        if config.introduction.default_override_strategy == OverrideStrategy::Default {
            return Err(Error::Other(
                "introduction.default_override_strategy cannot itself be 'default'".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_yaml(&content)
    }

    /// Load `weaver.yaml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let file = dir.join(CONFIG_FILE);
        if !file.exists() {
            return Ok(None);
        }
        Self::load(&file).map(Some)
    }

    /// Resolve `OverrideStrategy::Default` for introductions
    pub fn introduction_strategy(&self, strategy: OverrideStrategy) -> OverrideStrategy {
        match strategy {
            OverrideStrategy::Default => self.introduction.default_override_strategy,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WeaverConfig::from_yaml("").unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(
            config.introduction.default_override_strategy,
            OverrideStrategy::Fail
        );
        assert!(config.pipeline.discard_failed_aspect_transformations);
        assert!(config
            .templates
            .excluded_attributes
            .contains(&"Template".to_string()));
    }

    #[test]
    fn test_partial_document() {
        let config = WeaverConfig::from_yaml(
            "version: 1\nintroduction:\n  default_override_strategy: ignore\nlogging:\n  json: true\n",
        )
        .unwrap();
        assert_eq!(
            config.introduction_strategy(OverrideStrategy::Default),
            OverrideStrategy::Ignore
        );
        assert_eq!(
            config.introduction_strategy(OverrideStrategy::New),
            OverrideStrategy::New
        );
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_unknown_version() {
        assert!(WeaverConfig::from_yaml("version: 2\n").is_err());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WeaverConfig::load_from_dir(dir.path()).unwrap().is_none());

        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE)).unwrap();
        writeln!(file, "version: 1\npipeline:\n  discard_failed_aspect_transformations: false").unwrap();

        let config = WeaverConfig::load_from_dir(dir.path()).unwrap().unwrap();
        assert!(!config.pipeline.discard_failed_aspect_transformations);
    }
}
