use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::constants;

/// User preferences persisted in `prefs.toml` under the platform config dir.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub api_key: Option<String>,
  pub language: Option<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", &constants().app_name) {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Ok(config) = toml::from_str(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", &constants().app_name) {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }

  /// Resolve the API key: CLI flag, then prefs.toml, then the embedded default.
  pub fn resolve_api_key(&self, cli: Option<&str>) -> String {
    pick(cli, self.api_key.as_deref(), &constants().api_key)
  }

  /// Resolve the response language with the same precedence as the API key.
  pub fn resolve_language(&self, cli: Option<&str>) -> String {
    pick(cli, self.language.as_deref(), &constants().language)
  }
}

fn pick(cli: Option<&str>, file: Option<&str>, fallback: &str) -> String {
  [cli, file]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|s| !s.is_empty())
    .unwrap_or(fallback)
    .to_string()
}
