use anyhow::{Result, anyhow};
use std::process::{Command, Stdio};
use tracing::info;

use crate::media::MediaKind;

/// What to play: a movie, or one episode of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayRequest {
  pub id: u64,
  pub kind: MediaKind,
  pub season: Option<u32>,
  pub episode: Option<u32>,
}

/// Third-party embedded player reached through a constructed URL.
#[derive(Debug, Clone)]
pub struct EmbedPlayer {
  base_url: String,
}

impl EmbedPlayer {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into().trim_end_matches('/').to_string() }
  }

  /// Movies play by id; series play a season/episode, defaulting to S1E1.
  pub fn embed_url(&self, request: &PlayRequest) -> String {
    match request.kind {
      MediaKind::Movie => format!("{}/movie/{}", self.base_url, request.id),
      MediaKind::Series => format!(
        "{}/tv/{}/{}/{}",
        self.base_url,
        request.id,
        request.season.unwrap_or(1),
        request.episode.unwrap_or(1)
      ),
    }
  }

  /// Open the player URL in the default browser.
  pub fn launch(&self, url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";

    let mut child = Command::new(cmd)
      .arg(url)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()
      .map_err(|e| anyhow!("Failed to open browser with {}: {}", cmd, e))?;

    // Reap the child in a background thread to avoid zombie processes.
    std::thread::spawn(move || {
      let _ = child.wait();
    });
    info!(url = %url, "player: opened in browser");
    Ok(())
  }
}
