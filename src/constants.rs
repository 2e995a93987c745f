//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file
//! I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Name used for the config/data directories and the log file.
  pub app_name: String,

  // TMDB
  pub api_base_url: String,
  pub image_base_url: String,
  /// Default API key. Empty means one must come from prefs.toml or `--api-key`.
  pub api_key: String,
  pub language: String,
  pub request_timeout_secs: u64,
  pub backdrop_size: String,

  // Embedded player
  pub player_base_url: String,

  // Watch history
  pub history_key: String,
  pub history_capacity: usize,

  // Search
  pub search_debounce_ms: u64,
  pub min_search_chars: usize,

  // Featured banner
  pub featured_pool_size: usize,

  pub error_display_secs: u64,
}

impl Constants {
  pub fn search_debounce(&self) -> Duration {
    Duration::from_millis(self.search_debounce_ms)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
