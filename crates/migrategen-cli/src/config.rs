//! Configuration file handling

use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::args::OutputFormat;

const CONFIG_FILE_NAME: &str = "migrategen.toml";

/// Configuration for migrategen
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target framework (laravel, doctrine, identity)
    #[serde(default)]
    pub target: Option<String>,

    /// Output format (human, json)
    #[serde(default)]
    pub format: Option<String>,

    /// Tables to leave out of the plan (e.g., ["migrations"])
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Database name to strip from view definitions when the snapshot has none
    #[serde(default)]
    pub database: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).into_diagnostic()
    }

    /// Try to find and load migrategen.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "loading config");
                return Ok(Some(Self::from_file(&config_path)?));
            }

            // Try parent directory
            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Load an explicit config path, or search for one
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::find_and_load()?.unwrap_or_default()),
        }
    }

    /// Merge CLI arguments into configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_with_args(
        mut self,
        target: &Option<String>,
        format: &Option<OutputFormat>,
        exclude: &[String],
    ) -> Self {
        if target.is_some() {
            self.target = target.clone();
        }

        if let Some(fmt) = format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        if !exclude.is_empty() {
            self.exclude = exclude.to_vec();
        }

        self
    }

    pub fn output_format(&self) -> OutputFormat {
        match self.format.as_deref() {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml(
            r#"
            target = "laravel"
            format = "json"
            exclude = ["migrations", "password_resets"]
            "#,
        )
        .unwrap();

        assert_eq!(config.target.as_deref(), Some("laravel"));
        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.exclude, vec!["migrations", "password_resets"]);
        assert_eq!(config.database, None);
    }

    #[test]
    fn test_args_override_config() {
        let config = Config::from_toml("target = \"doctrine\"\nexclude = [\"a\"]").unwrap();
        let merged = config.merge_with_args(
            &Some("laravel".to_string()),
            &Some(OutputFormat::Json),
            &[],
        );

        assert_eq!(merged.target.as_deref(), Some("laravel"));
        assert_eq!(merged.format.as_deref(), Some("json"));
        assert_eq!(merged.exclude, vec!["a"]);
    }
}
