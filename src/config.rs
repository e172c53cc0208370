//! Runtime settings: YAML file, then environment overrides.

use std::{env, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_ENDPOINT: &str = "NCBI_MAPPER_ENDPOINT";
pub const ENV_MODEL: &str = "NCBI_MAPPER_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperSettings {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound for a single request; the trigger enforces its own deadline.
    pub timeout_secs: u64,
    pub api_key_env: String,
    pub api_version: String,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-sonnet-20240229".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_secs: 20,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_version: "2023-06-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// When set, trigger notifications from stores whose name lacks this
    /// substring are rejected.
    pub store_marker: Option<String>,
    pub input_encoding: String,
    pub mapper: MapperSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_marker: None,
            input_encoding: "utf-8".to_string(),
            mapper: MapperSettings::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening settings file {path:?}"))?;
        let settings: Settings = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing settings YAML {path:?}"))?;
        Ok(settings)
    }

    /// Loads `path` if given, otherwise defaults, then applies environment
    /// overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| env::var(name).ok());
        Ok(settings)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.mapper.endpoint = endpoint;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.mapper.model = model;
        }
    }
}
