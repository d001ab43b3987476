use crate::errors::{AppError, AppResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DATA_CHANGED_TOPIC: &str = "ideanode:data_changed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub autosave_debounce_ms: u64,
    pub background_debounce_ms: u64,
    pub drag_activation_distance: f64,
    pub change_topic: String,
    pub default_background_color: String,
    pub default_memo_color: String,
    pub database_file: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 1_200,
            background_debounce_ms: 500,
            drag_activation_distance: 2.0,
            change_topic: DATA_CHANGED_TOPIC.to_string(),
            default_background_color: "#0b1020".to_string(),
            default_memo_color: "#ffffff".to_string(),
            database_file: "ideanode.sqlite3".to_string(),
        }
    }
}

impl ClientConfig {
    /// Reads `path` if it exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_yaml(&raw)?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(raw) = lookup("IDEANODE_AUTOSAVE_MS") {
            self.autosave_debounce_ms = raw
                .trim()
                .parse()
                .map_err(|_| AppError::InvalidInput(format!("IDEANODE_AUTOSAVE_MS is not a number: {raw}")))?;
        }
        if let Some(raw) = lookup("IDEANODE_DRAG_DISTANCE") {
            self.drag_activation_distance = raw
                .trim()
                .parse()
                .map_err(|_| AppError::InvalidInput(format!("IDEANODE_DRAG_DISTANCE is not a number: {raw}")))?;
        }
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        if !self.drag_activation_distance.is_finite() || self.drag_activation_distance < 0.0 {
            return Err(AppError::InvalidInput(
                "drag_activation_distance must be a non-negative number".to_string(),
            ));
        }
        if self.change_topic.trim().is_empty() {
            return Err(AppError::InvalidInput("change_topic must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn background_delay(&self) -> Duration {
        Duration::from_millis(self.background_debounce_ms)
    }
}
