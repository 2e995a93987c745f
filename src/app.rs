use anyhow::Result;
use chrono::Utc;
use futures::future::try_join_all;
use image::DynamicImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::art::fetch_backdrop;
use crate::catalog::{CatalogClient, Listing, SearchResults};
use crate::config::Config;
use crate::constants::constants;
use crate::debounce::Debouncer;
use crate::display::DisplayMode;
use crate::featured::select_featured;
use crate::history::{WatchHistory, WatchHistoryItem};
use crate::media::{Episode, MediaItem, MediaKind, Season};
use crate::player::{EmbedPlayer, PlayRequest};
use crate::theme::{THEMES, Theme};

// --- Types ---

type ListingResult = (usize, Result<Vec<MediaItem>>);
type SearchOutcome = (String, Result<SearchResults>);
type ArtResult = (String, Result<DynamicImage>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// Carousels (or search results) have focus.
  Browse,
  /// The search bar has focus.
  Search,
  Details,
}

/// Identifies one carousel row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowId {
  ContinueWatching,
  Listing(usize),
  MovieResults,
  SeriesResults,
}

/// A titled, horizontally scrolled list of media.
#[derive(Debug, Clone, Default)]
pub struct Row {
  pub title: String,
  pub items: Vec<MediaItem>,
  pub selected: usize,
  pub loading: bool,
}

impl Row {
  fn new(title: impl Into<String>) -> Self {
    Self { title: title.into(), ..Default::default() }
  }

  pub(crate) fn set_items(&mut self, items: Vec<MediaItem>) {
    self.items = items;
    self.selected = 0;
    self.loading = false;
  }

  pub fn selected_item(&self) -> Option<&MediaItem> {
    self.items.get(self.selected)
  }

  fn move_by(&mut self, delta: isize) {
    if self.items.is_empty() {
      return;
    }
    let last = self.items.len() - 1;
    self.selected = self.selected.saturating_add_signed(delta).min(last);
  }
}

/// Open details for one item: season selection and episode cursor for series.
#[derive(Debug, Clone)]
pub struct DetailsView {
  pub item: MediaItem,
  pub season_idx: usize,
  pub episodes: ListState,
}

impl DetailsView {
  pub fn new(item: MediaItem) -> Self {
    // Season 1 first, like the web player; specials (season 0) stay reachable.
    let season_idx = item.seasons().iter().position(|s| s.season_number == 1).unwrap_or(0);
    let mut view = Self { item, season_idx, episodes: ListState::default() };
    view.reset_episode_cursor();
    view
  }

  pub fn current_season(&self) -> Option<&Season> {
    self.item.seasons().get(self.season_idx)
  }

  pub fn selected_episode(&self) -> Option<&Episode> {
    let season = self.current_season()?;
    season.episodes.get(self.episodes.selected()?)
  }

  fn reset_episode_cursor(&mut self) {
    let has_episodes = self.current_season().is_some_and(|s| !s.episodes.is_empty());
    self.episodes.select(has_episodes.then_some(0));
  }

  pub fn cycle_season(&mut self, delta: isize) {
    let count = self.item.seasons().len();
    if count == 0 {
      return;
    }
    self.season_idx = (self.season_idx as isize + delta).rem_euclid(count as isize) as usize;
    self.reset_episode_cursor();
  }

  pub fn move_episode(&mut self, delta: isize) {
    let count = self.current_season().map_or(0, |s| s.episodes.len());
    if count == 0 {
      return;
    }
    let i = self.episodes.selected().unwrap_or(0) as isize + delta;
    self.episodes.select(Some(i.rem_euclid(count as isize) as usize));
  }

  /// What pressing play starts: the movie, or the selected episode.
  pub fn play_request(&self) -> PlayRequest {
    let (season, episode) = match self.item.kind() {
      MediaKind::Movie => (None, None),
      MediaKind::Series => (
        self.current_season().map(|s| s.season_number),
        self.selected_episode().map(|e| e.episode_number),
      ),
    };
    PlayRequest { id: self.item.id(), kind: self.item.kind(), season, episode }
  }
}

/// Backdrop art: the decoded source and a copy fitted to the last drawn area.
#[derive(Default)]
pub struct ArtCache {
  pub source: Option<(String, DynamicImage)>,
  pub fitted: Option<(String, u16, u16, DynamicImage)>,
  pub(crate) requested: Option<String>,
}

/// In-flight async task receivers. Replacing a receiver discards the older
/// request's response.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) featured_rx: Option<oneshot::Receiver<Result<MediaItem>>>,
  pub(crate) listings_rx: Option<mpsc::UnboundedReceiver<ListingResult>>,
  pub(crate) search_rx: Option<oneshot::Receiver<SearchOutcome>>,
  pub(crate) details_rx: Option<oneshot::Receiver<Result<MediaItem>>>,
  pub(crate) history_rx: Option<oneshot::Receiver<Result<Vec<MediaItem>>>>,
  pub(crate) art_rx: Option<oneshot::Receiver<ArtResult>>,
}

/// The consumer-side search policy: short queries mean "no search".
/// Length counts characters as typed, whitespace included.
pub fn active_query(committed: &str, min_chars: usize) -> Option<&str> {
  (committed.chars().count() >= min_chars).then_some(committed)
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  pub featured: Option<MediaItem>,
  pub continue_watching: Row,
  pub listings: Vec<Row>,
  pub movie_results: Row,
  pub series_results: Row,
  /// The committed query currently driving the results rows.
  pub active_query: Option<String>,
  pub searching: bool,
  /// Index into `visible_rows()`.
  pub focus: usize,
  pub details: Option<DetailsView>,
  pub history: WatchHistory,
  pub debouncer: Debouncer,
  pub display_mode: DisplayMode,
  pub art: ArtCache,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, lower priority than status/error.
  pub info_message: Option<String>,
  pub should_quit: bool,
  catalog: CatalogClient,
  player: EmbedPlayer,
  pub(crate) tasks: AsyncTasks,
  message_time: Option<Instant>,
}

impl App {
  pub fn new(
    catalog: CatalogClient,
    player: EmbedPlayer,
    history: WatchHistory,
    display_mode: DisplayMode,
    theme_index: usize,
  ) -> Self {
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Browse,
      theme_index: theme_index.min(THEMES.len() - 1),
      featured: None,
      continue_watching: Row::new("Continue Watching"),
      listings: Listing::BROWSE.iter().map(|l| Row::new(l.title())).collect(),
      movie_results: Row::new("Movie Results"),
      series_results: Row::new("Series Results"),
      active_query: None,
      searching: false,
      focus: 0,
      details: None,
      history,
      debouncer: Debouncer::new(constants().search_debounce()),
      display_mode,
      art: ArtCache::default(),
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      catalog,
      player,
      tasks: AsyncTasks::default(),
      message_time: None,
    }
  }

  /// Kick off the startup fetches: featured pick, carousels, history details.
  pub fn start(&mut self) {
    self.trigger_featured();
    self.trigger_listings();
    self.trigger_history_details();
  }

  pub fn theme(&self) -> &'static Theme {
    &THEMES[self.theme_index]
  }

  pub fn language(&self) -> &str {
    self.catalog.language()
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    let mut config = Config::load();
    config.theme_name = Some(self.theme().name.to_string());
    config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    warn!(err = %msg, "shown to user");
    self.last_error = Some(msg);
    self.message_time = Some(Instant::now());
  }

  pub fn set_info(&mut self, msg: String) {
    self.info_message = Some(msg);
    self.message_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
  }

  /// Clear error and info messages once they have been visible long enough.
  pub fn expire_messages(&mut self) {
    if let Some(t) = self.message_time
      && t.elapsed() >= Duration::from_secs(constants().error_display_secs)
    {
      self.last_error = None;
      self.info_message = None;
      self.message_time = None;
    }
  }

  // --- Rows ---

  /// Rows in display order for the current browse/search state.
  pub fn visible_rows(&self) -> Vec<RowId> {
    if self.active_query.is_some() {
      return [RowId::MovieResults, RowId::SeriesResults]
        .into_iter()
        .filter(|id| !self.row(*id).items.is_empty())
        .collect();
    }
    let history = (!self.continue_watching.items.is_empty()).then_some(RowId::ContinueWatching);
    let listings = (0..self.listings.len())
      .filter(|&i| self.listings[i].loading || !self.listings[i].items.is_empty())
      .map(RowId::Listing);
    history.into_iter().chain(listings).collect()
  }

  pub fn row(&self, id: RowId) -> &Row {
    match id {
      RowId::ContinueWatching => &self.continue_watching,
      RowId::Listing(i) => &self.listings[i],
      RowId::MovieResults => &self.movie_results,
      RowId::SeriesResults => &self.series_results,
    }
  }

  fn row_mut(&mut self, id: RowId) -> &mut Row {
    match id {
      RowId::ContinueWatching => &mut self.continue_watching,
      RowId::Listing(i) => &mut self.listings[i],
      RowId::MovieResults => &mut self.movie_results,
      RowId::SeriesResults => &mut self.series_results,
    }
  }

  pub fn focused_row(&self) -> Option<RowId> {
    let rows = self.visible_rows();
    rows.get(self.focus.min(rows.len().saturating_sub(1))).copied()
  }

  pub fn move_focus(&mut self, delta: isize) {
    let count = self.visible_rows().len();
    if count == 0 {
      self.focus = 0;
      return;
    }
    self.focus = self.focus.min(count - 1).saturating_add_signed(delta).min(count - 1);
  }

  pub fn move_selection(&mut self, delta: isize) {
    if let Some(id) = self.focused_row() {
      self.row_mut(id).move_by(delta);
    }
  }

  pub fn selected_item(&self) -> Option<&MediaItem> {
    self.focused_row().and_then(|id| self.row(id).selected_item())
  }

  // --- Search ---

  /// Feed the current input through the debouncer.
  pub fn on_input_changed(&mut self, now: Instant) {
    self.debouncer.push(&self.input, now);
  }

  /// Per-frame housekeeping: error expiry and debounced query commits.
  pub fn tick(&mut self, now: Instant) {
    self.expire_messages();
    if let Some(committed) = self.debouncer.poll(now) {
      self.apply_query(&committed);
    }
    self.request_wanted_art();
  }

  /// Commit the input immediately (Enter in the search bar).
  pub fn submit_input(&mut self) {
    let input = self.input.clone();
    self.debouncer.commit_now(&input);
    self.apply_query(&input);
  }

  /// Clear the search bar and return to the browse rows.
  pub fn clear_search(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.debouncer.commit_now("");
    self.apply_query("");
  }

  fn apply_query(&mut self, committed: &str) {
    let next = active_query(committed, constants().min_search_chars).map(str::to_string);
    if next == self.active_query {
      return;
    }
    self.focus = 0;
    match next {
      Some(query) => self.trigger_search(query),
      None => {
        debug!("search suppressed, query too short");
        self.active_query = None;
        self.searching = false;
        self.tasks.search_rx = None;
        self.movie_results.set_items(Vec::new());
        self.series_results.set_items(Vec::new());
      }
    }
  }

  fn trigger_search(&mut self, query: String) {
    info!(query = %query, "search triggered");
    self.active_query = Some(query.clone());
    self.searching = true;
    self.movie_results.set_items(Vec::new());
    self.series_results.set_items(Vec::new());

    let catalog = self.catalog.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = catalog.search(&query).await;
      let _ = tx.send((query, result));
    });
    self.tasks.search_rx = Some(rx);
  }

  // --- Fetch triggers ---

  fn trigger_featured(&mut self) {
    let catalog = self.catalog.clone();
    let pool = constants().featured_pool_size;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let mut rng = StdRng::from_os_rng();
      let _ = tx.send(select_featured(&catalog, &mut rng, pool).await);
    });
    self.tasks.featured_rx = Some(rx);
  }

  /// One task per carousel; results are applied as each arrives.
  fn trigger_listings(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    for (i, listing) in Listing::BROWSE.into_iter().enumerate() {
      self.listings[i].loading = true;
      let catalog = self.catalog.clone();
      let tx = tx.clone();
      tokio::spawn(async move {
        let _ = tx.send((i, catalog.list(listing).await));
      });
    }
    self.tasks.listings_rx = Some(rx);
  }

  /// Fetch full details for every history entry; all must succeed.
  fn trigger_history_details(&mut self) {
    if self.history.is_empty() {
      self.continue_watching.set_items(Vec::new());
      self.tasks.history_rx = None;
      return;
    }
    let keys: Vec<(u64, MediaKind)> = self.history.current().iter().map(|h| (h.id, h.kind)).collect();
    self.continue_watching.loading = true;

    let catalog = self.catalog.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = try_join_all(keys.into_iter().map(|(id, kind)| catalog.details(id, kind))).await;
      let _ = tx.send(result);
    });
    self.tasks.history_rx = Some(rx);
  }

  fn trigger_details(&mut self, id: u64, kind: MediaKind) {
    self.clear_error();
    self.status_message = Some("Loading details…".to_string());
    let catalog = self.catalog.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(catalog.details(id, kind).await);
    });
    self.tasks.details_rx = Some(rx);
  }

  /// The backdrop the current view wants on screen.
  pub fn wanted_art_path(&self) -> Option<&str> {
    if !self.display_mode.shows_art() {
      return None;
    }
    match self.mode {
      AppMode::Details => self.details.as_ref().and_then(|d| d.item.backdrop_path()),
      _ if self.active_query.is_none() => self.featured.as_ref().and_then(|f| f.backdrop_path()),
      _ => None,
    }
  }

  fn request_wanted_art(&mut self) {
    let Some(path) = self.wanted_art_path().map(str::to_string) else { return };
    let have = self.art.source.as_ref().is_some_and(|(p, _)| *p == path);
    if have || self.art.requested.as_deref() == Some(path.as_str()) {
      return;
    }
    self.art.requested = Some(path.clone());

    let client = self.catalog.http().clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = fetch_backdrop(&client, &path, &constants().backdrop_size).await;
      let _ = tx.send((path, result));
    });
    self.tasks.art_rx = Some(rx);
  }

  // --- Actions ---

  /// Open details for the selected carousel item. History rows already hold
  /// full details; everything else is fetched.
  pub fn open_selected_details(&mut self) {
    let Some(item) = self.selected_item().cloned() else { return };
    if self.focused_row() == Some(RowId::ContinueWatching) {
      self.show_details(item);
    } else {
      self.trigger_details(item.id(), item.kind());
    }
  }

  pub fn open_featured_details(&mut self) {
    if let Some(item) = self.featured.clone() {
      self.show_details(item);
    }
  }

  fn show_details(&mut self, item: MediaItem) {
    self.details = Some(DetailsView::new(item));
    self.mode = AppMode::Details;
  }

  pub fn close_details(&mut self) {
    self.details = None;
    self.tasks.details_rx = None;
    self.mode = AppMode::Browse;
  }

  /// Play the selected carousel item. History entries resume their episode.
  pub fn play_selected(&mut self) {
    let Some(item) = self.selected_item().cloned() else { return };
    let (season, episode) = match self.focused_row() {
      Some(RowId::ContinueWatching) => {
        self.history.get(item.id(), item.kind()).map_or((None, None), |h| (h.season, h.episode))
      }
      _ => (None, None),
    };
    let request = PlayRequest { id: item.id(), kind: item.kind(), season, episode };
    self.play(&item, request);
  }

  pub fn play_featured(&mut self) {
    if let Some(item) = self.featured.clone() {
      let request = PlayRequest { id: item.id(), kind: item.kind(), season: None, episode: None };
      self.play(&item, request);
    }
  }

  /// Play from the details view. Playing an episode closes the view.
  pub fn play_details(&mut self) {
    let Some(view) = self.details.as_ref() else { return };
    let item = view.item.clone();
    let request = view.play_request();
    self.play(&item, request);
    if item.kind() == MediaKind::Series {
      self.close_details();
    }
  }

  /// Open the embedded player and record the play in the watch history.
  pub fn play(&mut self, item: &MediaItem, request: PlayRequest) {
    let url = self.player.embed_url(&request);
    match self.player.launch(&url) {
      Ok(()) => self.set_info(format!("Playing {} in browser", item.title())),
      Err(e) => self.set_error(format!("{:#} (open {} manually)", e, url)),
    }
    self.record_play(item, request);
  }

  fn record_play(&mut self, item: &MediaItem, request: PlayRequest) {
    let entry = WatchHistoryItem::from_play(item, request.season, request.episode, Utc::now().timestamp_millis());
    self.history.record(entry);
    self.trigger_history_details();
  }

  /// Cancel timers on shutdown.
  pub fn teardown(&mut self) {
    self.debouncer.cancel();
  }

  // --- Async results ---

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.featured_rx.take() {
      match rx.try_recv() {
        Ok(Ok(item)) => self.featured = Some(item),
        Ok(Err(e)) => self.set_error(format!("Featured pick failed: {:#}", e)),
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.featured_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => self.set_error("Featured task failed.".to_string()),
      }
    }

    if let Some(mut rx) = self.tasks.listings_rx.take() {
      let mut open = true;
      loop {
        match rx.try_recv() {
          Ok((i, Ok(items))) => {
            debug!(listing = i, count = items.len(), "listing loaded");
            self.listings[i].set_items(items);
          }
          Ok((i, Err(e))) => {
            self.listings[i].loading = false;
            self.set_error(format!("{} failed: {:#}", self.listings[i].title, e));
          }
          Err(mpsc::error::TryRecvError::Empty) => break,
          Err(mpsc::error::TryRecvError::Disconnected) => {
            open = false;
            break;
          }
        }
      }
      if open {
        self.tasks.listings_rx = Some(rx);
      }
    }

    if let Some(mut rx) = self.tasks.search_rx.take() {
      match rx.try_recv() {
        Ok((query, result)) => {
          self.searching = false;
          match result {
            Ok(results) if results.is_empty() => {
              info!(query = %query, "search found nothing");
              self.movie_results.set_items(Vec::new());
              self.series_results.set_items(Vec::new());
            }
            Ok(results) => {
              info!(query = %query, movies = results.movies.len(), series = results.series.len(), "search done");
              self.movie_results.set_items(results.movies);
              self.series_results.set_items(results.series);
              self.focus = 0;
            }
            Err(e) => self.set_error(format!("Search failed: {:#}", e)),
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.search_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.searching = false;
          self.set_error("Search task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.details_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.status_message = None;
          match result {
            Ok(item) => self.show_details(item),
            Err(e) => self.set_error(format!("Failed to load details: {:#}", e)),
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.details_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Details task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.history_rx.take() {
      match rx.try_recv() {
        Ok(Ok(items)) => self.continue_watching.set_items(items),
        Ok(Err(e)) => {
          self.continue_watching.loading = false;
          self.set_error(format!("Continue Watching failed: {:#}", e));
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.history_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => self.continue_watching.loading = false,
      }
    }

    if let Some(mut rx) = self.tasks.art_rx.take() {
      match rx.try_recv() {
        Ok((path, Ok(image))) => {
          self.art.source = Some((path, image));
          self.art.fitted = None;
        }
        Ok((path, Err(e))) => {
          // Art is decoration; log and leave the area blank.
          warn!(path = %path, err = %format!("{:#}", e), "art: backdrop unavailable");
        }
        Err(oneshot::error::TryRecvError::Empty) => self.tasks.art_rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => {}
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::history::MemoryStorage;
  use crate::media::{Movie, Show};

  fn movie(id: u64, title: &str) -> MediaItem {
    serde_json::from_value::<Movie>(serde_json::json!({ "id": id, "title": title, "overview": "o" })).unwrap().into()
  }

  fn show_with_seasons() -> MediaItem {
    serde_json::from_value::<Show>(serde_json::json!({
      "id": 1399,
      "name": "Game of Thrones",
      "seasons": [
        { "season_number": 0, "episodes": [{ "id": 1, "episode_number": 1 }] },
        { "season_number": 1, "episodes": [
          { "id": 11, "episode_number": 1 }, { "id": 12, "episode_number": 2 }, { "id": 13, "episode_number": 3 }
        ] },
        { "season_number": 2, "episodes": [] }
      ]
    }))
    .unwrap()
    .into()
  }

  fn test_app() -> App {
    let catalog = CatalogClient::new("test-key".into(), "en-US".into()).unwrap();
    let history = WatchHistory::load(Box::new(MemoryStorage::default()), "watch_history", 20);
    App::new(catalog, EmbedPlayer::new("https://vidlink.pro"), history, DisplayMode::Off, 0)
  }

  // --- active_query ---

  #[test]
  fn short_queries_are_not_active() {
    assert_eq!(active_query("", 3), None);
    assert_eq!(active_query("ab", 3), None);
    assert_eq!(active_query("abc", 3), Some("abc"));
    assert_eq!(active_query("  ab", 3), Some("  ab"));
    assert_eq!(active_query("ab ", 3), Some("ab "));
    assert_eq!(active_query("çöş", 3), Some("çöş"));
  }

  // --- Row ---

  #[test]
  fn row_selection_clamps_at_both_ends() {
    let mut row = Row::new("r");
    row.move_by(1);
    assert_eq!(row.selected, 0);
    row.set_items(vec![movie(1, "a"), movie(2, "b"), movie(3, "c")]);
    row.move_by(-1);
    assert_eq!(row.selected, 0);
    row.move_by(5);
    assert_eq!(row.selected, 2);
    assert_eq!(row.selected_item().map(MediaItem::id), Some(3));
  }

  // --- DetailsView ---

  #[test]
  fn details_start_on_season_one_first_episode() {
    let view = DetailsView::new(show_with_seasons());
    assert_eq!(view.current_season().map(|s| s.season_number), Some(1));
    assert_eq!(view.selected_episode().map(|e| e.episode_number), Some(1));
  }

  #[test]
  fn details_play_request_carries_selected_episode() {
    let mut view = DetailsView::new(show_with_seasons());
    view.move_episode(2);
    let req = view.play_request();
    assert_eq!((req.season, req.episode), (Some(1), Some(3)));
    view.move_episode(1);
    assert_eq!(view.play_request().episode, Some(1));
  }

  #[test]
  fn cycling_into_empty_season_clears_episode_cursor() {
    let mut view = DetailsView::new(show_with_seasons());
    view.cycle_season(1);
    assert_eq!(view.current_season().map(|s| s.season_number), Some(2));
    assert_eq!(view.selected_episode(), None);
    view.cycle_season(1);
    assert_eq!(view.current_season().map(|s| s.season_number), Some(0));
  }

  #[test]
  fn movie_details_play_request_has_no_episode() {
    let view = DetailsView::new(movie(550, "Fight Club"));
    let req = view.play_request();
    assert_eq!(req.kind, MediaKind::Movie);
    assert_eq!((req.season, req.episode), (None, None));
  }

  // --- App ---

  #[tokio::test]
  async fn rows_hide_empty_listings_and_show_history_first() {
    let mut app = test_app();
    assert!(app.visible_rows().is_empty());
    app.listings[2].set_items(vec![movie(1, "a")]);
    app.continue_watching.set_items(vec![movie(9, "z")]);
    assert_eq!(app.visible_rows(), vec![RowId::ContinueWatching, RowId::Listing(2)]);

    app.move_focus(5);
    assert_eq!(app.focused_row(), Some(RowId::Listing(2)));
    assert_eq!(app.selected_item().map(MediaItem::id), Some(1));
  }

  #[tokio::test]
  async fn short_committed_query_suppresses_search() {
    let mut app = test_app();
    let t0 = Instant::now();
    app.input = "ab".into();
    app.on_input_changed(t0);
    app.tick(t0 + Duration::from_millis(600));
    assert_eq!(app.debouncer.committed(), "ab");
    assert_eq!(app.active_query, None);
    assert!(app.tasks.search_rx.is_none());
  }

  #[tokio::test]
  async fn debounced_query_triggers_one_search() {
    let mut app = test_app();
    let t0 = Instant::now();
    for (i, text) in ["d", "du", "dun"].into_iter().enumerate() {
      app.input = text.into();
      app.on_input_changed(t0 + Duration::from_millis(100 * i as u64));
    }
    app.tick(t0 + Duration::from_millis(400));
    assert_eq!(app.active_query, None);
    app.tick(t0 + Duration::from_millis(800));
    assert_eq!(app.active_query.as_deref(), Some("dun"));
    assert!(app.searching);
    assert!(app.tasks.search_rx.is_some());

    app.clear_search();
    assert_eq!(app.active_query, None);
    assert!(!app.searching);
    assert!(app.tasks.search_rx.is_none());
  }

  #[tokio::test]
  async fn padded_query_is_searched_as_typed() {
    let mut app = test_app();
    let t0 = Instant::now();
    app.input = "ab ".into();
    app.on_input_changed(t0);
    app.tick(t0 + Duration::from_millis(600));
    assert_eq!(app.active_query.as_deref(), Some("ab "));
    assert!(app.tasks.search_rx.is_some());
  }

  #[tokio::test]
  async fn continue_watching_opens_details_without_fetching() {
    let mut app = test_app();
    app.continue_watching.set_items(vec![movie(9, "z"), show_with_seasons()]);
    app.move_selection(1);
    app.open_selected_details();
    assert_eq!(app.mode, AppMode::Details);
    assert_eq!(app.details.as_ref().map(|d| d.item.id()), Some(1399));
    assert!(app.tasks.details_rx.is_none());

    app.close_details();
    app.listings[0].set_items(vec![movie(550, "Fight Club")]);
    app.move_focus(1);
    app.open_selected_details();
    assert_eq!(app.mode, AppMode::Browse);
    assert!(app.tasks.details_rx.is_some());
  }

  #[tokio::test]
  async fn search_rows_replace_browse_rows() {
    let mut app = test_app();
    app.listings[0].set_items(vec![movie(1, "a")]);
    app.active_query = Some("dune".into());
    assert!(app.visible_rows().is_empty());
    app.series_results.set_items(vec![movie(2, "b")]);
    assert_eq!(app.visible_rows(), vec![RowId::SeriesResults]);
  }

  #[tokio::test]
  async fn playing_records_history_and_resumes_episode() {
    let mut app = test_app();
    let show = show_with_seasons();
    app.record_play(&show, PlayRequest { id: 1399, kind: MediaKind::Series, season: Some(2), episode: Some(5) });
    app.record_play(&movie(550, "Fight Club"), PlayRequest {
      id: 550,
      kind: MediaKind::Movie,
      season: None,
      episode: None,
    });

    let entries = app.history.current();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, 550);
    assert_eq!(entries[1].episode_label().as_deref(), Some("S2E5"));
    assert!(app.continue_watching.loading);
    assert!(app.tasks.history_rx.is_some());
  }

  #[tokio::test]
  async fn teardown_cancels_pending_query() {
    let mut app = test_app();
    let t0 = Instant::now();
    app.input = "matrix".into();
    app.on_input_changed(t0);
    app.teardown();
    app.tick(t0 + Duration::from_secs(1));
    assert_eq!(app.active_query, None);
  }
}
