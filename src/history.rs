//! Watch history: a capped, de-duplicated, most-recent-first list of played
//! items, persisted as one JSON value under a fixed key.
//!
//! Storage failures never reach the caller. The in-memory list stays the
//! source of truth for the session and every mutation rewrites the whole list.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::media::{MediaItem, MediaKind};

/// One played item. Field names match the persisted JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHistoryItem {
  pub id: u64,
  #[serde(rename = "type")]
  pub kind: MediaKind,
  pub title: String,
  #[serde(default)]
  pub poster_path: Option<String>,
  /// Epoch milliseconds.
  pub timestamp: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub season: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub episode: Option<u32>,
}

impl WatchHistoryItem {
  /// Build the entry for a play action. Season and episode are kept for series only.
  pub fn from_play(item: &MediaItem, season: Option<u32>, episode: Option<u32>, timestamp: i64) -> Self {
    let (season, episode) = match item.kind() {
      MediaKind::Series => (season, episode),
      MediaKind::Movie => (None, None),
    };
    Self {
      id: item.id(),
      kind: item.kind(),
      title: item.title().to_string(),
      poster_path: item.poster_path().map(str::to_string),
      timestamp,
      season,
      episode,
    }
  }

  pub fn same_identity(&self, other: &WatchHistoryItem) -> bool {
    self.id == other.id && self.kind == other.kind
  }

  /// `S2E5`-style label for series entries that carry an episode.
  pub fn episode_label(&self) -> Option<String> {
    match (self.season, self.episode) {
      (Some(s), Some(e)) => Some(format!("S{}E{}", s, e)),
      _ => None,
    }
  }
}

// --- Storage ---

/// Minimal key-value persistence used by the history store.
pub trait Storage {
  fn read(&self, key: &str) -> Result<Option<String>>;
  fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
  dir: PathBuf,
}

impl FileStorage {
  pub fn new(dir: PathBuf) -> Self {
    Self { dir }
  }

  /// Storage rooted at the platform data directory, if one can be resolved.
  pub fn open_default() -> Option<Self> {
    ProjectDirs::from("", "", &constants().app_name).map(|dirs| Self::new(dirs.data_dir().to_path_buf()))
  }

  fn path(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }
}

impl Storage for FileStorage {
  fn read(&self, key: &str) -> Result<Option<String>> {
    let path = self.path(key);
    match std::fs::read_to_string(&path) {
      Ok(content) => Ok(Some(content)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
  }

  fn write(&self, key: &str, value: &str) -> Result<()> {
    std::fs::create_dir_all(&self.dir).with_context(|| format!("Failed to create {}", self.dir.display()))?;
    let path = self.path(key);
    std::fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))
  }
}

/// Session-only storage, used when no data directory is available.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  values: RefCell<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
  fn read(&self, key: &str) -> Result<Option<String>> {
    Ok(self.values.borrow().get(key).cloned())
  }

  fn write(&self, key: &str, value: &str) -> Result<()> {
    self.values.borrow_mut().insert(key.to_string(), value.to_string());
    Ok(())
  }
}

// --- Store ---

pub struct WatchHistory {
  storage: Box<dyn Storage>,
  key: String,
  capacity: usize,
  items: Vec<WatchHistoryItem>,
}

impl WatchHistory {
  /// Load the persisted list. Missing or unreadable data yields an empty history.
  pub fn load(storage: Box<dyn Storage>, key: &str, capacity: usize) -> Self {
    let items = match storage.read(key) {
      Ok(Some(raw)) => match serde_json::from_str::<Vec<WatchHistoryItem>>(&raw) {
        Ok(items) => normalize(items, capacity),
        Err(e) => {
          warn!(err = %e, key, "history: persisted value is corrupt, starting empty");
          Vec::new()
        }
      },
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(err = %format!("{:#}", e), key, "history: failed to read persisted value, starting empty");
        Vec::new()
      }
    };
    info!(entries = items.len(), "history: loaded");
    Self { storage, key: key.to_string(), capacity, items }
  }

  /// Move `item` to the front, replacing any entry with the same identity,
  /// drop whatever falls past capacity, then persist the full list.
  pub fn record(&mut self, item: WatchHistoryItem) {
    self.items.retain(|existing| !existing.same_identity(&item));
    debug!(id = item.id, kind = item.kind.path_segment(), "history: record");
    self.items.insert(0, item);
    self.items.truncate(self.capacity);
    self.persist();
  }

  pub fn current(&self) -> &[WatchHistoryItem] {
    &self.items
  }

  pub fn get(&self, id: u64, kind: MediaKind) -> Option<&WatchHistoryItem> {
    self.items.iter().find(|h| h.id == id && h.kind == kind)
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  fn persist(&self) {
    let result = serde_json::to_string(&self.items)
      .context("Failed to serialize watch history")
      .and_then(|json| self.storage.write(&self.key, &json));
    if let Err(e) = result {
      warn!(err = %format!("{:#}", e), "history: failed to persist, keeping in-memory list");
    }
  }
}

/// Enforce the list invariants on data read from disk: first occurrence of
/// each identity wins, and at most `capacity` entries survive.
fn normalize(items: Vec<WatchHistoryItem>, capacity: usize) -> Vec<WatchHistoryItem> {
  let mut seen = HashSet::new();
  items.into_iter().filter(|h| seen.insert((h.id, h.kind))).take(capacity).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::rc::Rc;

  /// Shares one in-memory map between the store under test and the assertions.
  #[derive(Clone, Default)]
  struct SharedStorage(Rc<MemoryStorage>);

  impl Storage for SharedStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
      self.0.read(key)
    }
    fn write(&self, key: &str, value: &str) -> Result<()> {
      self.0.write(key, value)
    }
  }

  struct FailingStorage;

  impl Storage for FailingStorage {
    fn read(&self, _key: &str) -> Result<Option<String>> {
      Err(anyhow::anyhow!("disk on fire"))
    }
    fn write(&self, _key: &str, _value: &str) -> Result<()> {
      Err(anyhow::anyhow!("disk on fire"))
    }
  }

  fn make_item(id: u64, kind: MediaKind, timestamp: i64) -> WatchHistoryItem {
    WatchHistoryItem {
      id,
      kind,
      title: format!("title {}", id),
      poster_path: Some(format!("/p{}.jpg", id)),
      timestamp,
      season: None,
      episode: None,
    }
  }

  fn empty_store() -> WatchHistory {
    WatchHistory::load(Box::new(MemoryStorage::default()), "watch_history", 20)
  }

  #[test]
  fn missing_value_loads_empty() {
    assert!(empty_store().is_empty());
  }

  #[test]
  fn corrupt_value_loads_empty() {
    let storage = MemoryStorage::default();
    storage.write("watch_history", "{not json").unwrap();
    let history = WatchHistory::load(Box::new(storage), "watch_history", 20);
    assert!(history.current().is_empty());
  }

  #[test]
  fn read_failure_loads_empty_and_write_failure_is_swallowed() {
    let mut history = WatchHistory::load(Box::new(FailingStorage), "watch_history", 20);
    history.record(make_item(1, MediaKind::Movie, 1));
    assert_eq!(history.current().len(), 1);
  }

  #[test]
  fn replaying_same_identity_keeps_one_entry_with_newer_data_at_front() {
    let mut history = empty_store();
    history.record(make_item(5, MediaKind::Movie, 100));
    history.record(make_item(7, MediaKind::Series, 150));
    history.record(make_item(5, MediaKind::Movie, 200));

    let items = history.current();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, 5);
    assert_eq!(items[0].timestamp, 200);
    assert_eq!(items.iter().filter(|h| h.id == 5 && h.kind == MediaKind::Movie).count(), 1);
  }

  #[test]
  fn same_id_different_kind_are_distinct() {
    let mut history = empty_store();
    history.record(make_item(5, MediaKind::Movie, 1));
    history.record(make_item(5, MediaKind::Series, 2));
    assert_eq!(history.current().len(), 2);
    assert!(history.get(5, MediaKind::Movie).is_some());
    assert!(history.get(5, MediaKind::Series).is_some());
  }

  #[test]
  fn rerecording_moves_to_front_without_changing_length() {
    let mut history = empty_store();
    for id in 1..=4 {
      history.record(make_item(id, MediaKind::Movie, id as i64));
    }
    history.record(make_item(2, MediaKind::Movie, 99));
    let ids: Vec<u64> = history.current().iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![2, 4, 3, 1]);
  }

  #[test]
  fn twenty_one_distinct_items_evict_the_oldest() {
    let mut history = empty_store();
    for id in 1..=21 {
      history.record(make_item(id, MediaKind::Movie, id as i64));
    }
    let items = history.current();
    assert_eq!(items.len(), 20);
    assert_eq!(items[0].id, 21);
    assert!(history.get(1, MediaKind::Movie).is_none());
  }

  #[test]
  fn arbitrary_sequences_respect_capacity_and_identity() {
    let mut history = empty_store();
    // Deterministic pseudo-random walk over 30 identities.
    let mut x: u64 = 17;
    for step in 0..500 {
      x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
      let id = (x >> 33) % 30;
      let kind = if (x >> 20) & 1 == 0 { MediaKind::Movie } else { MediaKind::Series };
      history.record(make_item(id, kind, step));

      let items = history.current();
      assert!(items.len() <= 20);
      assert_eq!(items[0].timestamp, step);
      let unique: HashSet<_> = items.iter().map(|h| (h.id, h.kind)).collect();
      assert_eq!(unique.len(), items.len());
    }
  }

  #[test]
  fn every_record_persists_the_full_list() {
    let storage = SharedStorage::default();
    let mut history = WatchHistory::load(Box::new(storage.clone()), "watch_history", 20);
    history.record(make_item(1, MediaKind::Movie, 1));
    history.record(make_item(2, MediaKind::Series, 2));

    let raw = storage.read("watch_history").unwrap().unwrap();
    let persisted: Vec<WatchHistoryItem> = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted, history.current());

    let reloaded = WatchHistory::load(Box::new(storage), "watch_history", 20);
    assert_eq!(reloaded.current(), history.current());
  }

  #[test]
  fn loading_normalizes_duplicates_and_overflow() {
    let mut raw: Vec<WatchHistoryItem> = (1..=25).map(|id| make_item(id, MediaKind::Movie, id as i64)).collect();
    raw.insert(1, make_item(1, MediaKind::Movie, 0));
    let storage = MemoryStorage::default();
    storage.write("watch_history", &serde_json::to_string(&raw).unwrap()).unwrap();

    let history = WatchHistory::load(Box::new(storage), "watch_history", 20);
    assert_eq!(history.current().len(), 20);
    assert_eq!(history.current()[0].timestamp, 1);
    assert_eq!(history.current().iter().filter(|h| h.id == 1).count(), 1);
  }

  #[test]
  fn persisted_layout_matches_browser_format() {
    let json = r#"[{"id":1399,"type":"tv","title":"Game of Thrones","poster_path":"/got.jpg","timestamp":1700000000000,"season":2,"episode":5},
      {"id":550,"type":"movie","title":"Fight Club","poster_path":"/fc.jpg","timestamp":1690000000000}]"#;
    let items: Vec<WatchHistoryItem> = serde_json::from_str(json).unwrap();
    assert_eq!(items[0].kind, MediaKind::Series);
    assert_eq!(items[0].episode_label().as_deref(), Some("S2E5"));
    assert_eq!(items[1].season, None);

    let out = serde_json::to_string(&items[1]).unwrap();
    assert!(out.contains(r#""type":"movie""#));
    assert!(!out.contains("season"));
  }

  #[test]
  fn movie_plays_drop_season_and_episode() {
    let movie: crate::media::Movie = serde_json::from_str(r#"{"id": 3, "title": "M", "poster_path": "/m.jpg"}"#).unwrap();
    let entry = WatchHistoryItem::from_play(&movie.into(), Some(2), Some(4), 10);
    assert_eq!(entry.kind, MediaKind::Movie);
    assert_eq!(entry.season, None);
    assert_eq!(entry.poster_path.as_deref(), Some("/m.jpg"));
  }

  #[test]
  fn file_storage_round_trip() {
    let dir = std::env::temp_dir().join(format!("sinema-history-test-{}", std::process::id()));
    let storage = FileStorage::new(dir.clone());
    assert_eq!(storage.read("watch_history").unwrap(), None);
    storage.write("watch_history", "[]").unwrap();
    assert_eq!(storage.read("watch_history").unwrap().as_deref(), Some("[]"));
    let _ = std::fs::remove_dir_all(dir);
  }
}
