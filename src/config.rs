//! Configuration
//!
//! Device normalization settings, publish parameters and the extra block
//! layout, stored together as one TOML file. A missing file falls back to
//! defaults so the bridge always starts; a file that exists but does not
//! parse is reported.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::controller::axis::AxisSlot;

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "JOYBRIDGE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Per-device normalization settings
///
/// `dead_zone` is used literally by the axis processing; values outside
/// [0, 1] are not rejected.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub dead_zone: f32,
    pub invert_left_x: bool,
    pub invert_left_y: bool,
    pub invert_right_x: bool,
    pub invert_right_y: bool,
    pub invert_left_trigger: bool,
    pub invert_right_trigger: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.05,
            invert_left_x: false,
            invert_left_y: false,
            invert_right_x: false,
            invert_right_y: false,
            invert_left_trigger: false,
            invert_right_trigger: false,
        }
    }
}

impl DeviceConfig {
    pub fn inverted(&self, slot: AxisSlot) -> bool {
        match slot {
            AxisSlot::LeftX => self.invert_left_x,
            AxisSlot::LeftY => self.invert_left_y,
            AxisSlot::RightX => self.invert_right_x,
            AxisSlot::RightY => self.invert_right_y,
            AxisSlot::LeftTrigger => self.invert_left_trigger,
            AxisSlot::RightTrigger => self.invert_right_trigger,
        }
    }
}

/// Parameters of one publishing session
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PublishParams {
    pub domain_id: i32,
    pub namespace: String,
    pub period_ms: u64,
}

impl Default for PublishParams {
    fn default() -> Self {
        Self {
            domain_id: 0,
            namespace: String::new(),
            period_ms: 20,
        }
    }
}

/// Size and initial state of the auxiliary block appended to each frame
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ExtraConfig {
    pub axes: usize,
    pub buttons: usize,
    pub enabled: bool,
}

impl Default for ExtraConfig {
    fn default() -> Self {
        Self {
            axes: 4,
            buttons: 8,
            enabled: true,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub publish: PublishParams,
    pub extra: ExtraConfig,
}

impl AppConfig {
    /// Default location: `$JOYBRIDGE_CONFIG`, else `<config dir>/joybridge/config.toml`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| {
                warn!("No config directory found, using current directory");
                PathBuf::from(".")
            })
            .join("joybridge")
            .join("config.toml")
    }

    pub async fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()).await
    }

    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if !exists {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        debug!("Config: {:?}", config);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("joybridge-test-{}-{}", std::process::id(), name))
            .join("config.toml")
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.device.dead_zone, 0.05);
        assert!(!config.device.invert_left_x);
        assert_eq!(config.publish.period_ms, 20);
        assert_eq!(config.publish.domain_id, 0);
        assert_eq!(config.publish.namespace, "");
        assert_eq!(config.extra.axes, 4);
        assert_eq!(config.extra.buttons, 8);
        assert!(config.extra.enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = AppConfig::parse(
            r#"
            [device]
            dead_zone = 0.1
            invert_right_y = true

            [publish]
            namespace = "robot1"
            "#,
        )
        .unwrap();
        assert_eq!(config.device.dead_zone, 0.1);
        assert!(config.device.invert_right_y);
        assert!(!config.device.invert_left_y);
        assert_eq!(config.publish.namespace, "robot1");
        assert_eq!(config.publish.period_ms, 20);
        assert_eq!(config.extra, ExtraConfig::default());
    }

    #[test]
    fn test_inverted_follows_slot() {
        let device = DeviceConfig {
            invert_left_trigger: true,
            ..DeviceConfig::default()
        };
        assert!(device.inverted(AxisSlot::LeftTrigger));
        assert!(!device.inverted(AxisSlot::RightTrigger));
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let path = temp_path("missing");
        let config = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = temp_path("save");
        let mut config = AppConfig::default();
        config.publish.domain_id = 7;
        config.publish.namespace = "arm".to_string();
        config.extra.enabled = false;
        config.save_to(&path).await.unwrap();

        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let path = temp_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[publish]\nperiod_ms = \"fast\"\n").unwrap();

        let result = AppConfig::load_from(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
