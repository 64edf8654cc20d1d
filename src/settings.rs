use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::reader::LineTerminator;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "lowercase")]
pub struct Settings {
    #[serde(alias = "SERIAL")]
    pub serial: SerialSettings,
    #[serde(alias = "DASHBOARD")]
    pub dashboard: DashboardSettings,
    #[serde(alias = "NOTIFY")]
    pub notify: NotifySettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub struct SerialSettings {
    #[serde(alias = "PORT")]
    pub port: String,
    #[serde(alias = "BAUD")]
    pub baud: u32,
    #[serde(alias = "TERMINATOR")]
    pub terminator: LineTerminator,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub struct DashboardSettings {
    #[serde(alias = "PORT")]
    pub port: u16,
    #[serde(alias = "HISTORY_CAPACITY")]
    pub history_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub struct NotifySettings {
    #[serde(alias = "ENABLED")]
    pub enabled: bool,
    #[serde(alias = "CREDENTIALS_FILE")]
    pub credentials_file: Option<String>,
    #[serde(alias = "TOPIC")]
    pub topic: String,
    #[serde(alias = "TITLE")]
    pub title: String,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 115_200,
            terminator: LineTerminator::Cr,
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            port: 5000,
            history_capacity: 50,
        }
    }
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            credentials_file: None,
            topic: "floor_all".to_string(),
            title: "🌍 Earthquake Alert 🌍".to_string(),
        }
    }
}

impl Settings {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // 1. Load defaults
        let default_settings = Settings::default();
        builder = builder.add_source(Config::try_from(&default_settings)?);

        // 2. Load from file if specified
        if let Some(path) = config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path));
            } else {
                warn!("Configuration file not found: {:?}", path);
            }
        } else if let Some(home) = dirs::home_dir() {
            let toml_path = home.join(".quakebridge").join("settings.toml");
            if toml_path.exists() {
                builder = builder.add_source(File::from(toml_path));
            }
        }

        // 3. Environment variables
        builder = builder.add_source(
            Environment::with_prefix("QUAKEBRIDGE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;

        // Detect unknown sections
        if let Ok(table) = config.clone().try_deserialize::<serde_json::Value>() {
            if let Some(map) = table.as_object() {
                let known_sections = ["serial", "dashboard", "notify"];
                for key in map.keys() {
                    let lower_key = key.to_lowercase();
                    if !known_sections.contains(&lower_key.as_str()) {
                        warn!("Unknown configuration section: {}", key);
                    }
                }
            }
        }

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File as StdFile;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.serial.port, "/dev/ttyACM0");
        assert_eq!(settings.serial.baud, 115_200);
        assert_eq!(settings.serial.terminator, LineTerminator::Cr);
        assert_eq!(settings.dashboard.port, 5000);
        assert!(!settings.notify.enabled);
        assert_eq!(settings.notify.topic, "floor_all");
    }

    #[test]
    fn test_load_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");
        let mut file = StdFile::create(&config_path).unwrap();
        writeln!(
            file,
            "[serial]\nport = \"COM10\"\nterminator = \"lf\"\n\n[dashboard]\nport = 6001"
        )
        .unwrap();

        let settings = Settings::new(Some(config_path)).unwrap();
        assert_eq!(settings.serial.port, "COM10");
        assert_eq!(settings.serial.terminator, LineTerminator::Lf);
        assert_eq!(settings.dashboard.port, 6001);
        // Untouched sections keep their defaults.
        assert_eq!(settings.serial.baud, 115_200);
        assert_eq!(settings.notify.title, "🌍 Earthquake Alert 🌍");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::new(Some(dir.path().join("nope.toml"))).unwrap();
        assert_eq!(settings.dashboard.port, 5000);
    }
}
