//! Configuration system (layered: code > env > TOML file > defaults).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfabError;
use crate::run_loop::RunLimits;

const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_VISION_MAX_TOKENS: u32 = 1000;

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const CHAT_MODEL_ENV: &str = "CONFAB_CHAT_MODEL";
const MAX_ITERATIONS_ENV: &str = "CONFAB_MAX_ITERATIONS";
const DATA_DIR_ENV: &str = "CONFAB_DATA_DIR";

/// `[run]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub max_iterations: Option<usize>,
}

/// Layered configuration for confab.
///
/// Resolution order for every key:
/// 1. Values set in code (`set_*` / `with_*`)
/// 2. Environment variables (a `.env` file is loaded first when present)
/// 3. `config.toml` in the platform config directory, or an explicit path
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfabConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    chat_model: Option<String>,
    vision_model: Option<String>,
    image_model: Option<String>,
    speech_model: Option<String>,
    voice: Option<String>,
    stream: Option<bool>,
    vision_max_tokens: Option<u32>,
    data_dir: Option<PathBuf>,
    run: RunSection,
}

impl ConfabConfig {
    /// Empty config; every accessor falls back to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the default config file (if any), then overlay the environment.
    pub fn load() -> Result<Self, ConfabError> {
        let base = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Ok(base.overlay_env(|key| std::env::var(key).ok()))
    }

    /// Defaults overlaid with the environment only.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfabError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| {
            ConfabError::Configuration(format!("{}: {}", path.display(), e))
        })
    }

    /// Parse TOML; a zero `[run] max_iterations` is ignored like its env counterpart.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfabError> {
        let mut config: Self =
            toml::from_str(raw).map_err(|e| ConfabError::Configuration(e.to_string()))?;
        if config.run.max_iterations == Some(0) {
            tracing::warn!("ignoring zero iteration limit in config file");
            config.run.max_iterations = None;
        }
        Ok(config)
    }

    /// `config.toml` under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Overlay values found through `lookup` on top of `self`.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty(BASE_URL_ENV) {
            self.base_url = Some(url);
        }
        if let Some(model) = non_empty(CHAT_MODEL_ENV) {
            self.chat_model = Some(model);
        }
        if let Some(dir) = non_empty(DATA_DIR_ENV) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = non_empty(MAX_ITERATIONS_ENV) {
            match parse_positive_usize(&raw) {
                Some(max) => self.run.max_iterations = Some(max),
                None => tracing::warn!(
                    key = MAX_ITERATIONS_ENV,
                    value = %raw,
                    "ignoring invalid iteration limit"
                ),
            }
        }
        self
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
    }

    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.base_url = Some(url.into());
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.set_api_key(key);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.set_base_url(url);
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.run.max_iterations = max_iterations;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    pub fn base_url(&self) -> Option<String> {
        self.base_url.clone()
    }

    pub fn chat_model(&self) -> &str {
        self.chat_model.as_deref().unwrap_or("gpt-4o")
    }

    pub fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or("gpt-4o")
    }

    pub fn image_model(&self) -> &str {
        self.image_model.as_deref().unwrap_or("dall-e-3")
    }

    pub fn speech_model(&self) -> &str {
        self.speech_model.as_deref().unwrap_or("tts-1")
    }

    /// Speech voice; speech generation is skipped when unset.
    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    pub fn vision_max_tokens(&self) -> u32 {
        self.vision_max_tokens.unwrap_or(DEFAULT_VISION_MAX_TOKENS)
    }

    /// `None` means the run loop is unbounded.
    pub fn max_iterations(&self) -> Option<usize> {
        self.run.max_iterations
    }

    /// Root directory for the file blob store.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
    }

    /// Settings the message manager needs from this config.
    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            limits: RunLimits::new(self.max_iterations()),
            vision_max_tokens: self.vision_max_tokens(),
        }
    }
}

/// Per-manager settings derived from [`ConfabConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerSettings {
    pub limits: RunLimits,
    pub vision_max_tokens: u32,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            limits: RunLimits::unbounded(),
            vision_max_tokens: DEFAULT_VISION_MAX_TOKENS,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "confab", "confab")
}

fn parse_positive_usize(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|value| *value > 0)
}
