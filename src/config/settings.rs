//! Settings management via SQLite.

use crate::db::Database;
use crate::history::DEFAULT_SYSTEM_PROMPT;
use crate::provider::{DEFAULT_API_BASE, DEFAULT_MODEL};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Unknown setting: {0}")]
    UnknownKey(String),
}

/// Keys accepted by `set`, with a one-line description.
pub const KNOWN_KEYS: &[(&str, &str)] = &[
    ("model", "Model name sent to the endpoint"),
    ("api_base", "Base URL of the OpenAI-compatible endpoint"),
    ("system_prompt", "Instruction that opens every conversation"),
    ("show_thinking", "Expand thinking spans by default (true/false)"),
];

/// Settings manager backed by SQLite.
pub struct Settings<'a> {
    db: &'a Database,
}

impl<'a> Settings<'a> {
    /// Create a new settings manager.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Get a setting value.
    pub fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let result: Result<String, _> = self.db.conn().query_row(
            "SELECT value FROM settings WHERE key = ?",
            [key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SettingsError::Database(e)),
        }
    }

    /// Get a setting value or return a default.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .ok()
            .flatten()
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a boolean setting.
    pub fn get_bool(&self, key: &str) -> Result<bool, SettingsError> {
        match self.get(key)? {
            Some(v) => Ok(matches!(
                v.to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )),
            None => Ok(false),
        }
    }

    /// Set a setting value. Only [`KNOWN_KEYS`] are accepted.
    pub fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        if !KNOWN_KEYS.iter().any(|(k, _)| *k == key) {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }
        self.db.conn().execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, unixepoch())
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value],
        )?;
        Ok(())
    }

    /// Delete a setting.
    pub fn delete(&self, key: &str) -> Result<(), SettingsError> {
        self.db
            .conn()
            .execute("DELETE FROM settings WHERE key = ?", [key])?;
        Ok(())
    }

    /// List all settings.
    pub fn list(&self) -> Result<Vec<(String, String)>, SettingsError> {
        let mut stmt = self
            .db
            .conn()
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    // Convenience accessors for common settings

    /// Get the model name.
    pub fn model(&self) -> String {
        self.get_or("model", DEFAULT_MODEL)
    }

    /// Get the endpoint base URL.
    pub fn api_base(&self) -> String {
        self.get_or("api_base", DEFAULT_API_BASE)
    }

    /// Get the system instruction.
    pub fn system_prompt(&self) -> String {
        self.get_or("system_prompt", DEFAULT_SYSTEM_PROMPT)
    }

    /// Whether thinking spans are expanded by default.
    pub fn show_thinking(&self) -> bool {
        self.get_bool("show_thinking").unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_at(temp_dir.path().join("test.db")).unwrap();
        db.migrate().unwrap();
        (temp_dir, db)
    }

    #[test]
    fn defaults_when_unset() {
        let (_temp, db) = setup_test_db();
        let settings = Settings::new(&db);

        assert_eq!(settings.model(), DEFAULT_MODEL);
        assert_eq!(settings.api_base(), DEFAULT_API_BASE);
        assert_eq!(settings.system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert!(!settings.show_thinking());
    }

    #[test]
    fn set_get_and_upsert() {
        let (_temp, db) = setup_test_db();
        let settings = Settings::new(&db);

        settings.set("model", "llama-3.3-70b").unwrap();
        settings.set("model", "qwen-qwq-32b").unwrap();

        assert_eq!(settings.get("model").unwrap().as_deref(), Some("qwen-qwq-32b"));
        assert_eq!(settings.model(), "qwen-qwq-32b");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (_temp, db) = setup_test_db();
        let settings = Settings::new(&db);

        assert!(matches!(
            settings.set("colour", "blue"),
            Err(SettingsError::UnknownKey(_))
        ));
    }

    #[test]
    fn get_bool_variants() {
        let (_temp, db) = setup_test_db();
        let settings = Settings::new(&db);

        for truthy in ["true", "1", "YES", "on"] {
            settings.set("show_thinking", truthy).unwrap();
            assert!(settings.show_thinking(), "{} should be true", truthy);
        }
        settings.set("show_thinking", "nope").unwrap();
        assert!(!settings.show_thinking());
    }

    #[test]
    fn delete_and_list() {
        let (_temp, db) = setup_test_db();
        let settings = Settings::new(&db);

        settings.set("system_prompt", "Be brief.").unwrap();
        settings.set("api_base", "http://localhost:11434/v1").unwrap();

        let listed = settings.list().unwrap();
        assert_eq!(listed[0].0, "api_base");
        assert_eq!(listed[1], ("system_prompt".to_string(), "Be brief.".to_string()));

        settings.delete("system_prompt").unwrap();
        assert_eq!(settings.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }
}
