use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::plan_validator::PlanDefaults;
use crate::engine::store::StoreOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    /// `POST /api/generate` with `{model, prompt, stream}`
    Ollama,
    /// OpenAI-compatible `POST /v1/chat/completions`
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            url: "http://localhost:11434/api/generate".to_string(),
            model: "phi3:mini".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notebook_bind: String,
    pub agent_bind: String,
    pub notebook_dir: PathBuf,
    pub persist_corrupt_recovery: bool,
    pub strict_names: bool,
    pub llm: LlmSettings,
    pub action_timeout_secs: u64,
    pub default_notebook: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notebook_bind: "127.0.0.1:5001".to_string(),
            agent_bind: "127.0.0.1:8000".to_string(),
            notebook_dir: PathBuf::from("."),
            persist_corrupt_recovery: false,
            strict_names: true,
            llm: LlmSettings::default(),
            action_timeout_secs: 10,
            default_notebook: "example.ipynb".to_string(),
        }
    }
}

impl Settings {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            persist_corrupt_recovery: self.persist_corrupt_recovery,
            strict_names: self.strict_names,
        }
    }

    pub fn plan_defaults(&self) -> PlanDefaults {
        PlanDefaults {
            notebook_name: self.default_notebook.clone(),
            ..PlanDefaults::default()
        }
    }
}

pub fn default_settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("notebook_agent");
    path.push("settings.json");
    path
}

/// Load settings from an explicit path (which must parse) or from the default
/// location (where a missing or broken file falls back to defaults).
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => read_settings(path)?
            .with_context(|| format!("settings file {} not found", path.display())),
        None => {
            let path = default_settings_path();
            match read_settings(&path) {
                Ok(settings) => Ok(settings.unwrap_or_default()),
                Err(err) => {
                    log::warn!("Ignoring settings file {}: {:#}", path.display(), err);
                    Ok(Settings::default())
                }
            }
        }
    }
}

fn read_settings(path: &Path) -> Result<Option<Settings>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let settings =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(settings))
}
