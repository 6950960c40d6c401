//! Configuration management.

mod app;
mod settings;

pub use app::{AppConfig, ConfigOverrides};
pub use settings::{Settings, SettingsError, KNOWN_KEYS};
