//! Generator configuration
//!
//! `defaults/protogen.default.toml` is embedded so that documented defaults
//! and runtime behavior stay in sync. Hosts layer their own files and key
//! overrides on top of it via [`Loader`] before deserializing into
//! [`GeneratorConfig`].

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use super::symbols::Mangler;

const DEFAULT_TOML: &str = include_str!("../../defaults/protogen.default.toml");

static SLOT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratorConfig {
    pub mangling: ManglingConfig,
    pub lowering: LoweringConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManglingConfig {
    pub slot_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoweringConfig {
    pub coverage: Coverage,
    pub narrowing: Narrowing,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuntimeConfig {
    pub max_call_depth: usize,
}

/// What happens to protocol methods an impl does not override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Coverage {
    /// The slot stays null; calling it fails at runtime
    Lenient,
    /// Generation fails with an incomplete-coverage diagnostic
    Strict,
}

/// How an override rebinds its self parameter to the impl type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Narrowing {
    Checked,
    Reinterpret,
}

impl GeneratorConfig {
    pub fn mangler(&self) -> Mangler {
        Mangler::new(self.mangling.slot_suffix.clone())
    }

    pub fn strict(mut self) -> Self {
        self.lowering.coverage = Coverage::Strict;
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !SLOT_SUFFIX.is_match(&self.mangling.slot_suffix) {
            return Err(ConfigError::Message(format!(
                "mangling.slot_suffix must be a non-empty run of letters, digits or `_`, got {:?}",
                self.mangling.slot_suffix
            )));
        }
        if self.runtime.max_call_depth == 0 {
            return Err(ConfigError::Message(
                "runtime.max_call_depth must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mangling: ManglingConfig {
                slot_suffix: "_impl".to_string(),
            },
            lowering: LoweringConfig {
                coverage: Coverage::Lenient,
                narrowing: Narrowing::Checked,
            },
            runtime: RuntimeConfig {
                max_call_depth: 256,
            },
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer TOML text, e.g. a section embedded in a host's own config.
    pub fn with_toml(mut self, toml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(toml, FileFormat::Toml));
        self
    }

    /// Apply a single key/value override.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder, deserialize and validate the configuration.
    pub fn build(self) -> Result<GeneratorConfig, ConfigError> {
        self.builder
            .build()?
            .try_deserialize::<GeneratorConfig>()?
            .validate()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the embedded defaults.
pub fn load_default_config() -> Result<GeneratorConfig, ConfigError> {
    Loader::new().build()
}
