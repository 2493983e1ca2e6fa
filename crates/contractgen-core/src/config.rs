//! Configuration management for contractgen runs.
//!
//! This module defines the `Config` struct and related functionality for managing
//! generation settings. The configuration can be loaded from a YAML or TOML file
//! (picked by extension), created programmatically, or built from command-line
//! arguments.
//!
//! # Examples
//!
//! ```no_run
//! use contractgen_core::config::Config;
//! use contractgen_core::templates::TargetFramework;
//!
//! # async fn example() -> contractgen_core::Result<()> {
//! // Create a new config programmatically
//! let mut config = Config::new("petshop", "petshop.yaml", "generated");
//! config.targets = vec![TargetFramework::Laravel, TargetFramework::Slim];
//!
//! // Or load from a config file
//! let config = Config::from_file("contractgen.toml").await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::contract::BuildOptions;
use crate::security::SecuritySemantics;
use crate::templates::TargetFramework;

/// Configuration for a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project name, used in log output and as the namespace fallback
    pub project_name: String,

    /// Path or URL of the normalized description
    pub input_path: String,

    /// Output directory; every target gets its own subdirectory
    pub output_dir: String,

    /// Frameworks to emit
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetFramework>,

    /// PHP namespace root; defaults to the description's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Optional path to a template override directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,

    /// How requirement objects naming several schemes are read
    #[serde(default)]
    pub security_semantics: SecuritySemantics,

    /// Operations to include; empty means all
    #[serde(default)]
    pub include_operations: Vec<String>,

    /// Operations to exclude
    #[serde(default)]
    pub exclude_operations: Vec<String>,

    /// Whether consistency findings fail the run
    #[serde(default = "default_fail_on_inconsistency")]
    pub fail_on_inconsistency: bool,
}

impl Config {
    /// Create a new Config with default values
    pub fn new(
        project_name: impl Into<String>,
        input_path: impl Into<String>,
        output_dir: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            targets: default_targets(),
            namespace: None,
            template_dir: None,
            security_semantics: SecuritySemantics::default(),
            include_operations: Vec::new(),
            exclude_operations: Vec::new(),
            fail_on_inconsistency: default_fail_on_inconsistency(),
        }
    }

    /// Load configuration from a file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let config: Self = match Format::of(path) {
            Format::Toml => toml::from_str(&content)?,
            Format::Json => serde_json::from_str(&content)?,
            Format::Yaml => serde_yaml::from_str(&content)?,
        };
        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        let content = match Format::of(path) {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Yaml => serde_yaml::to_string(self)?,
        };
        fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.targets.is_empty() {
            return Err(crate::Error::config("no targets selected"));
        }
        if self.input_path.trim().is_empty() {
            return Err(crate::Error::config("input_path is empty"));
        }
        Ok(())
    }

    /// Options for the contract builder
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            security_semantics: self.security_semantics,
            include_operations: self.include_operations.clone(),
            exclude_operations: self.exclude_operations.clone(),
        }
    }
}

enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

fn default_targets() -> Vec<TargetFramework> {
    TargetFramework::all().collect()
}

fn default_fail_on_inconsistency() -> bool {
    true
}
