use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analytics::FEEDBACK_LABELS;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  pub portal: PortalConfig,
  /// Custom title for header (defaults to the portal host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub attendance: AttendanceConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Where quarter boundaries are kept (default: next to the config file)
  pub quarters_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
  /// Data endpoint of the attendance proxy
  pub url: String,
  pub username: String,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs: u64,
}

impl Default for PortalConfig {
  fn default() -> Self {
    Self {
      url: String::new(),
      username: String::new(),
      request_timeout_secs: default_request_timeout(),
    }
  }
}

fn default_request_timeout() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Minimum seconds between two accepted manual refreshes
  #[serde(default = "default_cooldown")]
  pub refresh_cooldown_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      refresh_cooldown_secs: default_cooldown(),
    }
  }
}

fn default_cooldown() -> u64 {
  60
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceConfig {
  /// Attendance percentage that must be kept
  #[serde(default = "default_min_percentage")]
  pub min_percentage: f64,
  /// Survey questions the portal appends to the attendance table
  #[serde(default = "default_feedback_labels")]
  pub feedback_labels: Vec<String>,
}

impl Default for AttendanceConfig {
  fn default() -> Self {
    Self {
      min_percentage: default_min_percentage(),
      feedback_labels: default_feedback_labels(),
    }
  }
}

fn default_min_percentage() -> f64 {
  85.0
}

fn default_feedback_labels() -> Vec<String> {
  FEEDBACK_LABELS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Cache database location (default: $XDG_DATA_HOME/attendr/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

fn default_true() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./attendr.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/attendr/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/attendr/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("attendr.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("attendr").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.portal.url.trim().is_empty() {
      return Err(eyre!("portal.url must not be empty"));
    }
    let min = self.attendance.min_percentage;
    if !(1.0..=100.0).contains(&min) {
      return Err(eyre!(
        "attendance.min_percentage must be between 1 and 100, got {}",
        min
      ));
    }
    Ok(())
  }

  /// Location of the quarters file.
  pub fn quarters_path(&self) -> Result<PathBuf> {
    if let Some(p) = &self.quarters_path {
      return Ok(p.clone());
    }
    let config_dir = dirs::config_dir().ok_or_else(|| eyre!("Could not determine config directory"))?;
    Ok(config_dir.join("attendr").join("quarters.json"))
  }

  /// Get the portal password from environment variables.
  ///
  /// Checks ATTENDR_PASSWORD first, then PORTAL_PASSWORD as fallback.
  pub fn get_password() -> Option<String> {
    std::env::var("ATTENDR_PASSWORD")
      .or_else(|_| std::env::var("PORTAL_PASSWORD"))
      .ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config = Config::parse(
      "portal:\n  url: https://proxy.example.edu/api/data\n  username: s123\n",
    )
    .unwrap();

    assert_eq!(config.portal.request_timeout_secs, 30);
    assert_eq!(config.sync.refresh_cooldown_secs, 60);
    assert_eq!(config.attendance.min_percentage, 85.0);
    assert_eq!(config.attendance.feedback_labels.len(), 10);
    assert!(config.cache.enabled);
  }

  #[test]
  fn test_overrides_are_read() {
    let config = Config::parse(
      r#"
portal:
  url: https://proxy.example.edu/api/data
  username: s123
sync:
  refresh_cooldown_secs: 15
attendance:
  min_percentage: 75
  feedback_labels: ["Queries were clarified"]
cache:
  enabled: false
"#,
    )
    .unwrap();

    assert_eq!(config.sync.refresh_cooldown_secs, 15);
    assert_eq!(config.attendance.min_percentage, 75.0);
    assert_eq!(config.attendance.feedback_labels, vec!["Queries were clarified"]);
    assert!(!config.cache.enabled);
  }

  #[test]
  fn test_out_of_range_min_percentage_is_rejected() {
    let result = Config::parse(
      "portal:\n  url: https://x.edu\n  username: s\nattendance:\n  min_percentage: 120\n",
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_missing_portal_is_rejected() {
    assert!(Config::parse("title: hi\n").is_err());
  }
}
