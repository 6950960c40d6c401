//! Resolved runtime configuration.

use super::Settings;
use crate::history::DEFAULT_SYSTEM_PROMPT;
use crate::provider::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Values given on the command line or in the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub chat_id: Option<String>,
    pub show_thinking: bool,
}

/// Effective configuration for one run.
///
/// Precedence: overrides, then stored settings, then built-in defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub system_prompt: String,
    pub chat_id: Option<String>,
    pub show_thinking: bool,
}

impl AppConfig {
    /// Merge overrides with stored settings, if a database is available.
    pub fn resolve(overrides: ConfigOverrides, settings: Option<&Settings<'_>>) -> Self {
        Self {
            api_key: overrides.api_key.filter(|k| !k.trim().is_empty()),
            api_base: overrides
                .api_base
                .or_else(|| settings.map(|s| s.api_base()))
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: overrides
                .model
                .or_else(|| settings.map(|s| s.model()))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: settings
                .map(|s| s.system_prompt())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            chat_id: overrides.chat_id.filter(|c| !c.trim().is_empty()),
            show_thinking: overrides.show_thinking
                || settings.map(|s| s.show_thinking()).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_database() {
        let config = AppConfig::resolve(ConfigOverrides::default(), None);

        assert_eq!(config.api_key, None);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(!config.show_thinking);
    }

    #[test]
    fn overrides_beat_settings_beat_defaults() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open_at(tmp.path().join("test.db")).unwrap();
        db.migrate().unwrap();
        let settings = Settings::new(&db);
        settings.set("model", "stored-model").unwrap();
        settings.set("api_base", "http://stored").unwrap();
        settings.set("show_thinking", "true").unwrap();

        let overrides = ConfigOverrides {
            model: Some("flag-model".into()),
            ..Default::default()
        };
        let config = AppConfig::resolve(overrides, Some(&settings));

        assert_eq!(config.model, "flag-model");
        assert_eq!(config.api_base, "http://stored");
        assert!(config.show_thinking);
    }

    #[test]
    fn blank_values_are_treated_as_absent() {
        let overrides = ConfigOverrides {
            api_key: Some("  ".into()),
            chat_id: Some("".into()),
            ..Default::default()
        };
        let config = AppConfig::resolve(overrides, None);

        assert_eq!(config.api_key, None);
        assert_eq!(config.chat_id, None);
    }
}
