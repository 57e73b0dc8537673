use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ResourceKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// May be left out when the URL comes from the command line or environment
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the backend host if not set)
  pub title: Option<String>,
  /// Collection shown at startup (e.g. "leads", "orders")
  #[serde(default = "default_resource")]
  pub default_resource: String,
  /// Rows per page in list views
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Field list views sort by
  #[serde(default = "default_sort_field")]
  pub sort_field: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the REST API, e.g. "http://localhost:8080/api/v1"
  #[serde(default)]
  pub base_url: String,
  /// Transport timeout; no timeout when unset
  pub timeout_secs: Option<u64>,
}

fn default_resource() -> String {
  "leads".to_string()
}

fn default_page_size() -> u32 {
  10
}

fn default_sort_field() -> String {
  "id".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./bizdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bizdesk/config.yaml
  ///
  /// The backend URL is taken from `api_url` if given, then from
  /// `BIZDESK_API_URL`, then from the file. Without a file one of the first
  /// two is enough.
  pub fn load(explicit_path: Option<&Path>, api_url: Option<&str>) -> Result<Self> {
    let path = match explicit_path {
      Some(p) if p.exists() => Some(p.to_path_buf()),
      Some(p) => return Err(eyre!("Config file not found: {}", p.display())),
      None => Self::find_config_file(),
    };
    Self::resolve(path.as_deref(), api_url, Self::api_url_override())
  }

  /// Merge the file (if any) with the URL overrides, flag before environment.
  fn resolve(path: Option<&Path>, api_url: Option<&str>, env_url: Option<String>) -> Result<Self> {
    let mut config = match path {
      Some(p) => Self::load_from_path(p)?,
      None => Self::defaults(),
    };

    if let Some(url) = api_url.map(str::to_string).or(env_url) {
      config.api.base_url = url;
    }
    if config.api.base_url.trim().is_empty() {
      return Err(match path {
        Some(p) => eyre!(
          "No API URL: set api.base_url in {}, set BIZDESK_API_URL or pass --api-url.",
          p.display()
        ),
        None => eyre!(
          "No configuration file found. Create one at ~/.config/bizdesk/config.yaml,\n\
           set BIZDESK_API_URL or pass --api-url."
        ),
      });
    }

    config.validate()?;
    Ok(config)
  }

  /// Defaults for everything, with no backend URL
  fn defaults() -> Self {
    Self {
      api: ApiConfig::default(),
      title: None,
      default_resource: default_resource(),
      page_size: default_page_size(),
      sort_field: default_sort_field(),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("bizdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("bizdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub(crate) fn from_yaml(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  fn validate(&self) -> Result<()> {
    if self.page_size == 0 {
      return Err(eyre!("page_size must be greater than zero"));
    }
    if self.sort_field.trim().is_empty() {
      return Err(eyre!("sort_field must not be empty"));
    }
    if ResourceKind::parse(&self.default_resource).is_none() {
      return Err(eyre!("Unknown default_resource '{}'", self.default_resource));
    }
    Ok(())
  }

  /// Get the API base URL override from the environment.
  ///
  /// Checks BIZDESK_API_URL.
  pub fn api_url_override() -> Option<String> {
    std::env::var("BIZDESK_API_URL")
      .ok()
      .filter(|url| !url.trim().is_empty())
  }

  /// Collection shown at startup
  pub fn start_resource(&self) -> ResourceKind {
    ResourceKind::parse(&self.default_resource).unwrap_or(ResourceKind::Lead)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("api:\n  base_url: http://localhost:8080/api/v1\n").unwrap();
    assert_eq!(config.page_size, 10);
    assert_eq!(config.sort_field, "id");
    assert_eq!(config.start_resource(), ResourceKind::Lead);
    assert!(config.api.timeout_secs.is_none());
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  base_url: https://erp.example.com/api/v1
  timeout_secs: 15
title: Acme Back Office
default_resource: orders
page_size: 25
sort_field: orderDate
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.api.timeout_secs, Some(15));
    assert_eq!(config.title.as_deref(), Some("Acme Back Office"));
    assert_eq!(config.start_resource(), ResourceKind::SalesOrder);
    assert_eq!(config.page_size, 25);
  }

  #[test]
  fn test_validation_rejects_bad_values() {
    let config =
      Config::from_yaml("api:\n  base_url: http://x\npage_size: 0\n").unwrap();
    assert!(config.validate().is_err());

    let config =
      Config::from_yaml("api:\n  base_url: http://x\ndefault_resource: widgets\n").unwrap();
    assert!(config.validate().is_err());
  }

  fn write_config(dir: &tempfile::TempDir, yaml: &str) -> PathBuf {
    let path = dir.path().join("bizdesk.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
  }

  #[test]
  fn test_url_only_config() {
    let config = Config::resolve(None, None, Some("http://env:8080/api/v1".to_string())).unwrap();
    assert_eq!(config.api.base_url, "http://env:8080/api/v1");
    assert_eq!(config.page_size, 10);
    assert_eq!(config.start_resource(), ResourceKind::Lead);
  }

  #[test]
  fn test_flag_beats_env_beats_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "api:\n  base_url: http://file/api\npage_size: 20\n");

    let config = Config::resolve(Some(&path), None, None).unwrap();
    assert_eq!(config.api.base_url, "http://file/api");

    let config = Config::resolve(Some(&path), None, Some("http://env/api".to_string())).unwrap();
    assert_eq!(config.api.base_url, "http://env/api");

    let config = Config::resolve(
      Some(&path),
      Some("http://flag/api"),
      Some("http://env/api".to_string()),
    )
    .unwrap();
    assert_eq!(config.api.base_url, "http://flag/api");
    assert_eq!(config.page_size, 20);
  }

  #[test]
  fn test_file_without_api_section_takes_flag_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "title: Back Office\npage_size: 5\n");

    let config = Config::resolve(Some(&path), Some("http://flag/api"), None).unwrap();
    assert_eq!(config.api.base_url, "http://flag/api");
    assert_eq!(config.title.as_deref(), Some("Back Office"));
    assert_eq!(config.page_size, 5);

    let config = Config::load(Some(&path), Some("http://flag/api")).unwrap();
    assert_eq!(config.api.base_url, "http://flag/api");
  }

  #[test]
  fn test_missing_url_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "title: nothing else\n");
    let err = Config::resolve(Some(&path), None, None).unwrap_err();
    assert!(err.to_string().contains("--api-url"));

    let err = Config::resolve(None, None, None).unwrap_err();
    assert!(err.to_string().contains("--api-url"));
  }

  #[test]
  fn test_explicit_missing_path_fails() {
    let err = Config::load(Some(Path::new("/nonexistent/bizdesk.yaml")), None).unwrap_err();
    assert!(err.to_string().contains("not found"));
  }
}
