//! Configuration system
//!
//! TOML configuration with defaults for every field, so a partial file (or
//! none at all) is always usable.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::input::{Command, KeyBinding, Modifiers};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub keyboard: KeyboardConfig,
    pub pan: PanConfig,
    pub limits: LimitsConfig,
    /// Key bindings
    pub bindings: Vec<BindingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            keyboard: KeyboardConfig::default(),
            pan: PanConfig::default(),
            limits: LimitsConfig::default(),
            bindings: default_bindings(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).or_else(Self::find_config_file);

        match config_path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {:?}", path);
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {path:?}"))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config file: {path:?}"))
            }
            Some(path) => {
                warn!("Config file not found at {:?}, using defaults", path);
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            dirs::config_dir().map(|p| p.join("planar/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/planar/config.toml")),
            Some(PathBuf::from("/etc/planar/config.toml")),
        ];

        candidates.into_iter().flatten().find(|p| p.exists())
    }

    /// Generate default configuration as a string
    pub fn default_config_string() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }

    /// Check that every binding and the accelerator parse.
    pub fn validate(&self) -> Result<()> {
        let accelerator = Modifiers::from_str_list(&self.general.accelerator)
            .with_context(|| format!("Invalid accelerator {:?}", self.general.accelerator))?;
        for binding in &self.bindings {
            let parsed = KeyBinding::parse(&binding.keys)
                .with_context(|| format!("Invalid binding keys {:?}", binding.keys))?;
            if !parsed.modifiers.contains(accelerator) {
                anyhow::bail!(
                    "Binding {:?} lacks the accelerator {:?}",
                    binding.keys,
                    self.general.accelerator
                );
            }
            if let Command::Unknown(cmd) = Command::parse(&binding.command) {
                anyhow::bail!("Unknown command {cmd:?} bound to {}", binding.keys);
            }
        }
        if self.keyboard.repeat_rate_ms == 0 {
            anyhow::bail!("keyboard.repeat_rate_ms must be positive");
        }
        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Modifier that must be held for compositor bindings
    pub accelerator: String,
    /// Cursor image shown over the bare desktop
    pub default_cursor: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            accelerator: "Alt".to_string(),
            default_cursor: "default".to_string(),
        }
    }
}

/// Keyboard repeat settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Delay before a held pan key starts repeating
    pub repeat_delay_ms: u64,
    /// Interval between repeated pan steps
    pub repeat_rate_ms: u64,
    /// Repeat rate advertised to clients (keys per second)
    pub client_repeat_rate: i32,
    /// Repeat delay advertised to clients
    pub client_repeat_delay: i32,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            repeat_delay_ms: 400,
            repeat_rate_ms: 40,
            client_repeat_rate: 25,
            client_repeat_delay: 600,
        }
    }
}

/// Viewport panning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanConfig {
    /// Pixels moved per key step
    pub key_step: f64,
    /// Pointer button that starts a pan (Linux event code)
    pub button: u32,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            key_step: 10.0,
            button: 0x112, // BTN_MIDDLE
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Upper bound on live surface tree nodes
    pub max_surface_nodes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_surface_nodes: 4096,
        }
    }
}

/// Key binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Key combination (e.g., "Alt+Escape")
    pub keys: String,
    /// Command to execute
    pub command: String,
}

fn default_bindings() -> Vec<BindingConfig> {
    [
        ("Alt+Escape", "exit"),
        ("Alt+F1", "focus next"),
        ("Alt+Left", "pan left"),
        ("Alt+Right", "pan right"),
        ("Alt+Up", "pan up"),
        ("Alt+Down", "pan down"),
    ]
    .into_iter()
    .map(|(keys, command)| BindingConfig {
        keys: keys.to_string(),
        command: command.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.keyboard.repeat_delay_ms, 400);
        assert_eq!(config.pan.button, 274);
        assert_eq!(config.bindings.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.bindings.len(), config.bindings.len());
        assert_eq!(parsed.limits.max_surface_nodes, config.limits.max_surface_nodes);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml("[pan]\nkey_step = 25.0\n").unwrap();
        assert!((config.pan.key_step - 25.0).abs() < f64::EPSILON);
        assert_eq!(config.pan.button, 274);
        assert_eq!(config.general.accelerator, "Alt");
    }

    #[test]
    fn test_validate_rejects_unknown_command() {
        let mut config = Config::default();
        config.bindings.push(BindingConfig {
            keys: "Alt+F2".into(),
            command: "launch rockets".into(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_binding_without_accelerator() {
        let mut config = Config::default();
        config.bindings.push(BindingConfig {
            keys: "Super+Left".into(),
            command: "pan Left".into(),
        });
        assert!(config.validate().is_err());

        config.general.accelerator = "Super".into();
        config.bindings = vec![BindingConfig {
            keys: "Super+Left".into(),
            command: "pan Left".into(),
        }];
        assert!(config.validate().is_ok());
    }
}
