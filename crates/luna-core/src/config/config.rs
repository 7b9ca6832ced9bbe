use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the chat client.
///
/// Loaded from `~/.luna/config.json`, then shallow-merged with a project-local
/// `.luna.json` if one exists in the working directory:
/// ```json
/// {
///   "model": "mistralai/mistral-7b-instruct:free",
///   "cycle_service_url": "http://127.0.0.1:5000",
///   "render_markdown": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LunaConfig {
    /// Model identifier sent to the completion service.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the OpenRouter-compatible API (`/chat/completions` is appended).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sent as `HTTP-Referer`.
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Sent as `X-Title`.
    #[serde(default = "default_title")]
    pub title: String,
    /// Base URL of the local cycle calculation service.
    #[serde(default = "default_cycle_service_url")]
    pub cycle_service_url: String,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Interpret assistant replies as Markdown in the chat view.
    #[serde(default = "default_render_markdown")]
    pub render_markdown: bool,
    /// Upper bound for each outbound HTTP call. There is no retry.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    std::env::var("LUNA_MODEL").unwrap_or_else(|_| "mistralai/mistral-7b-instruct:free".to_string())
}

fn default_base_url() -> String {
    std::env::var("LUNA_BASE_URL").unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string())
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_referer() -> String {
    "https://www.menstrual-health-chatbot.com".to_string()
}

fn default_title() -> String {
    "menstrual-health-chatbot".to_string()
}

fn default_cycle_service_url() -> String {
    std::env::var("LUNA_CYCLE_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string())
}

fn default_db_path() -> PathBuf {
    LunaConfig::resolve_path("luna.db")
}

fn default_render_markdown() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for LunaConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            referer: default_referer(),
            title: default_title(),
            cycle_service_url: default_cycle_service_url(),
            db_path: default_db_path(),
            render_markdown: default_render_markdown(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl LunaConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::resolve_path("config.json");

        let config = if config_path.exists() {
            let data = std::fs::read_to_string(&config_path)?;
            serde_json::from_str::<LunaConfig>(&data)?
        } else {
            LunaConfig::default()
        };

        let local_path = std::env::current_dir()
            .ok()
            .map(|d| d.join(".luna.json"))
            .filter(|p| p.exists());

        match local_path {
            Some(local) => {
                let data = std::fs::read_to_string(local)?;
                config.merged_with(&data)
            }
            None => Ok(config),
        }
    }

    /// Overlay the top-level keys of a JSON object onto this config.
    pub fn merged_with(self, overrides: &str) -> Result<Self> {
        let override_val: serde_json::Value = serde_json::from_str(overrides)?;
        let mut base = serde_json::to_value(&self)?;
        if let (Some(base_obj), Some(over_obj)) = (base.as_object_mut(), override_val.as_object()) {
            for (k, v) in over_obj {
                base_obj.insert(k.clone(), v.clone());
            }
        }
        Ok(serde_json::from_value(base)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resolve_path(relative: &str) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".luna")
            .join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: LunaConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.title, "menstrual-health-chatbot");
        assert!(config.render_markdown);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.db_path.ends_with(".luna/luna.db"));
    }

    #[test]
    fn local_overrides_replace_only_given_keys() {
        let base = LunaConfig {
            model: "base-model".to_string(),
            ..LunaConfig::default()
        };
        let merged = base
            .merged_with(r#"{ "cycle_service_url": "http://localhost:9000", "render_markdown": false }"#)
            .unwrap();

        assert_eq!(merged.model, "base-model");
        assert_eq!(merged.cycle_service_url, "http://localhost:9000");
        assert!(!merged.render_markdown);
    }

    #[test]
    fn non_object_override_is_ignored() {
        let merged = LunaConfig::default().merged_with("[1, 2]").unwrap();
        assert_eq!(merged.max_tokens, 1000);
    }
}
