//! Viewer settings

use serde::{Deserialize, Serialize};

pub const ENV_API_BASE: &str = "HEARTVIEW_API_BASE";
pub const ENV_DATA_BASE: &str = "HEARTVIEW_DATA_BASE";

/// Where models and patient data are fetched from, and how models are placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Base URL for model assets
    pub api_base: String,
    /// Base URL for patient data; empty means `api_base`
    pub data_base: String,
    /// Directory bare model names are resolved under
    pub model_dir: String,
    /// Second candidate prefix for backends that nest models under it
    pub legacy_prefix: String,
    /// Model shown when a patient has no usable reference
    pub default_model: String,
    /// Uniform scale applied to every loaded model
    pub model_scale: f32,
    /// Ruler lattice cells per axis
    pub ruler_divisions: u32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:4000".into(),
            data_base: String::new(),
            model_dir: "/models".into(),
            legacy_prefix: "/api".into(),
            default_model: "/models/heart.glb".into(),
            model_scale: 0.01,
            ruler_divisions: 10,
        }
    }
}

impl ViewerSettings {
    /// Load settings from file, or return default if not found
    pub fn load() -> Self {
        if let Some(dirs) = directories::ProjectDirs::from("org", "heartview", "heartview") {
            let config_path = dirs.config_dir().join("settings.json");
            if let Ok(json) = std::fs::read_to_string(&config_path) {
                match serde_json::from_str(&json) {
                    Ok(settings) => return settings,
                    Err(e) => tracing::warn!("Ignoring invalid {}: {}", config_path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Save settings to file
    pub fn save(&self) {
        if let Some(dirs) = directories::ProjectDirs::from("org", "heartview", "heartview") {
            let config_dir = dirs.config_dir();
            if std::fs::create_dir_all(config_dir).is_ok() {
                let config_path = config_dir.join("settings.json");
                if let Ok(json) = serde_json::to_string_pretty(self) {
                    if let Err(e) = std::fs::write(&config_path, json) {
                        tracing::warn!("Failed to save {}: {}", config_path.display(), e);
                    }
                }
            }
        }
    }

    /// Apply `HEARTVIEW_*` environment overrides
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_API_BASE).ok(),
            std::env::var(ENV_DATA_BASE).ok(),
        )
    }

    pub fn with_overrides(mut self, api_base: Option<String>, data_base: Option<String>) -> Self {
        if let Some(base) = api_base.filter(|s| !s.trim().is_empty()) {
            self.api_base = base;
        }
        if let Some(base) = data_base.filter(|s| !s.trim().is_empty()) {
            self.data_base = base;
        }
        self
    }

    /// Model asset base without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    /// Patient data base without a trailing slash
    pub fn data_base(&self) -> &str {
        let base = self.data_base.trim_end_matches('/');
        if base.is_empty() {
            self.api_base()
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ViewerSettings::default();
        assert_eq!(s.api_base(), "http://localhost:4000");
        assert_eq!(s.data_base(), "http://localhost:4000");
        assert_eq!(s.model_scale, 0.01);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: ViewerSettings = serde_json::from_str(r#"{"api_base":"http://h:1/"}"#).unwrap();
        assert_eq!(s.api_base(), "http://h:1");
        assert_eq!(s.default_model, "/models/heart.glb");
        assert_eq!(s.ruler_divisions, 10);
    }

    #[test]
    fn test_overrides() {
        let s = ViewerSettings::default()
            .with_overrides(Some("http://api".into()), Some("  ".into()));
        assert_eq!(s.api_base(), "http://api");
        assert_eq!(s.data_base(), "http://api");

        let s = s.with_overrides(None, Some("http://data/".into()));
        assert_eq!(s.data_base(), "http://data");
    }
}
