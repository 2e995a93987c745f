use anyhow::{Context, Result, anyhow, bail};
use futures::future::try_join_all;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::constants::constants;
use crate::media::{MediaItem, MediaKind, Movie, Season, Show};

/// Which carousel listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
  Trending,
  Popular,
  TopRated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
  pub category: Category,
  pub kind: MediaKind,
}

impl Listing {
  /// Browse carousels, in display order.
  pub const BROWSE: [Listing; 6] = [
    Listing { category: Category::Trending, kind: MediaKind::Movie },
    Listing { category: Category::Trending, kind: MediaKind::Series },
    Listing { category: Category::Popular, kind: MediaKind::Movie },
    Listing { category: Category::Popular, kind: MediaKind::Series },
    Listing { category: Category::TopRated, kind: MediaKind::Movie },
    Listing { category: Category::TopRated, kind: MediaKind::Series },
  ];

  pub const POPULAR_MOVIES: Listing = Listing { category: Category::Popular, kind: MediaKind::Movie };

  pub fn path(self) -> String {
    let kind = self.kind.path_segment();
    match self.category {
      Category::Trending => format!("/trending/{}/week", kind),
      Category::Popular => format!("/{}/popular", kind),
      Category::TopRated => format!("/{}/top_rated", kind),
    }
  }

  pub fn title(self) -> &'static str {
    match (self.category, self.kind) {
      (Category::Trending, MediaKind::Movie) => "Trending Movies This Week",
      (Category::Trending, MediaKind::Series) => "Trending Series This Week",
      (Category::Popular, MediaKind::Movie) => "Popular Movies",
      (Category::Popular, MediaKind::Series) => "Popular Series",
      (Category::TopRated, MediaKind::Movie) => "Top Rated Movies",
      (Category::TopRated, MediaKind::Series) => "Top Rated Series",
    }
  }
}

/// Paged list envelope used by every TMDB listing and search endpoint.
#[derive(Debug, Deserialize)]
struct Page<T> {
  #[serde(default = "Vec::new")]
  results: Vec<T>,
}

/// Results of a combined movie + series search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
  pub movies: Vec<MediaItem>,
  pub series: Vec<MediaItem>,
}

impl SearchResults {
  pub fn is_empty(&self) -> bool {
    self.movies.is_empty() && self.series.is_empty()
  }
}

/// The catalog operations the featured selector depends on.
pub trait Catalog {
  fn list(&self, listing: Listing) -> impl Future<Output = Result<Vec<MediaItem>>> + Send;
  fn details(&self, id: u64, kind: MediaKind) -> impl Future<Output = Result<MediaItem>> + Send;
}

/// TMDB REST client. Every request carries the session's API key and language.
#[derive(Debug, Clone)]
pub struct CatalogClient {
  http: Client,
  base_url: String,
  api_key: String,
  language: String,
}

impl CatalogClient {
  pub fn new(api_key: String, language: String) -> Result<Self> {
    if api_key.trim().is_empty() {
      bail!("TMDB API key is missing. Pass --api-key or set api_key in prefs.toml");
    }
    let http = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self { http, base_url: constants().api_base_url.clone(), api_key, language })
  }

  /// Point the client at another server, e.g. a local stand-in.
  #[cfg(test)]
  fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  pub fn http(&self) -> &Client {
    &self.http
  }

  pub fn language(&self) -> &str {
    &self.language
  }

  /// Full image URL for a TMDB file path, e.g. `image_url("/abc.jpg", "w780")`.
  pub fn image_url(path: &str, size: &str) -> String {
    format!("{}/{}{}", constants().image_base_url, size, path)
  }

  fn url(&self, path: &str, extra: &[(&str, &str)]) -> Result<Url> {
    let params = [("api_key", self.api_key.as_str()), ("language", self.language.as_str())]
      .into_iter()
      .chain(extra.iter().copied());
    Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
      .with_context(|| format!("Invalid TMDB URL for {}", path))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, extra: &[(&str, &str)]) -> Result<T> {
    let url = self.url(path, extra)?;
    debug!(path = %path, "catalog request");

    let response = self.http.get(url).send().await.with_context(|| format!("TMDB request to {} failed", path))?;

    check_status(response.status(), path)?;
    response.json::<T>().await.with_context(|| format!("Failed to parse TMDB response from {}", path))
  }

  async fn get_items(&self, path: &str, kind: MediaKind, extra: &[(&str, &str)]) -> Result<Vec<MediaItem>> {
    Ok(match kind {
      MediaKind::Movie => {
        let page: Page<Movie> = self.get(path, extra).await?;
        page.results.into_iter().map(MediaItem::from).collect()
      }
      MediaKind::Series => {
        let page: Page<Show> = self.get(path, extra).await?;
        page.results.into_iter().map(MediaItem::from).collect()
      }
    })
  }

  pub async fn list(&self, listing: Listing) -> Result<Vec<MediaItem>> {
    self.get_items(&listing.path(), listing.kind, &[]).await
  }

  pub async fn season(&self, show_id: u64, season_number: u32) -> Result<Season> {
    self.get(&format!("/tv/{}/season/{}", show_id, season_number), &[]).await
  }

  /// Full details. For series, every season is fetched concurrently and must
  /// succeed; the summary seasons are replaced with the full records.
  pub async fn details(&self, id: u64, kind: MediaKind) -> Result<MediaItem> {
    match kind {
      MediaKind::Movie => {
        let movie: Movie = self.get(&format!("/movie/{}", id), &[]).await?;
        Ok(movie.into())
      }
      MediaKind::Series => {
        let mut show: Show = self.get(&format!("/tv/{}", id), &[]).await?;
        let numbers: Vec<u32> = show.seasons.iter().map(|s| s.season_number).collect();
        show.seasons = try_join_all(numbers.into_iter().map(|n| self.season(id, n))).await?;
        debug!(show_id = id, seasons = show.seasons.len(), "series details expanded");
        Ok(show.into())
      }
    }
  }

  /// Search movies and series concurrently.
  pub async fn search(&self, query: &str) -> Result<SearchResults> {
    let extra = [("query", query)];
    let (movies, series) = tokio::try_join!(
      self.get_items("/search/movie", MediaKind::Movie, &extra),
      self.get_items("/search/tv", MediaKind::Series, &extra)
    )?;
    Ok(SearchResults { movies, series })
  }
}

/// Map a TMDB response status to an error. No retries.
fn check_status(status: StatusCode, path: &str) -> Result<()> {
  match status {
    StatusCode::UNAUTHORIZED => bail!("TMDB API key is invalid or missing"),
    StatusCode::NOT_FOUND => bail!("TMDB resource not found: {}", path),
    StatusCode::TOO_MANY_REQUESTS => bail!("TMDB rate limit exceeded, try again later"),
    s if !s.is_success() => Err(anyhow!("TMDB {} returned error status: {}", path, s)),
    _ => Ok(()),
  }
}

impl Catalog for CatalogClient {
  fn list(&self, listing: Listing) -> impl Future<Output = Result<Vec<MediaItem>>> + Send {
    CatalogClient::list(self, listing)
  }

  fn details(&self, id: u64, kind: MediaKind) -> impl Future<Output = Result<MediaItem>> + Send {
    CatalogClient::details(self, id, kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client() -> CatalogClient {
    CatalogClient::new("k3y".into(), "tr-TR".into()).unwrap()
  }

  #[test]
  fn listing_paths() {
    let paths: Vec<String> = Listing::BROWSE.iter().map(|l| l.path()).collect();
    assert_eq!(
      paths,
      ["/trending/movie/week", "/trending/tv/week", "/movie/popular", "/tv/popular", "/movie/top_rated", "/tv/top_rated"]
    );
  }

  #[test]
  fn every_request_carries_key_and_language() {
    let url = client().url("/movie/popular", &[]).unwrap();
    assert_eq!(url.path(), "/3/movie/popular");
    let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    assert!(pairs.contains(&("api_key".into(), "k3y".into())));
    assert!(pairs.contains(&("language".into(), "tr-TR".into())));
  }

  #[test]
  fn search_query_is_encoded() {
    let url = client().url("/search/tv", &[("query", "the office & co")]).unwrap();
    let query = url.query_pairs().find(|(k, _)| k == "query").map(|(_, v)| v.into_owned());
    assert_eq!(query.as_deref(), Some("the office & co"));
    assert!(!url.as_str().contains(' '));
  }

  #[test]
  fn empty_api_key_is_rejected() {
    assert!(CatalogClient::new("  ".into(), "en-US".into()).is_err());
  }

  #[test]
  fn image_url_joins_size_and_path() {
    assert_eq!(CatalogClient::image_url("/abc.jpg", "w780"), "https://image.tmdb.org/t/p/w780/abc.jpg");
  }

  #[test]
  fn status_mapping() {
    assert!(check_status(StatusCode::OK, "/movie/1").is_ok());
    let msg = |status| format!("{:#}", check_status(status, "/movie/1").unwrap_err());
    assert!(msg(StatusCode::UNAUTHORIZED).contains("invalid or missing"));
    assert!(msg(StatusCode::NOT_FOUND).contains("not found: /movie/1"));
    assert!(msg(StatusCode::TOO_MANY_REQUESTS).contains("rate limit"));
    assert!(msg(StatusCode::SERVICE_UNAVAILABLE).contains("503"));
  }

  /// Serve canned JSON bodies by request path on a local port, one connection per request.
  async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      loop {
        let Ok((mut socket, _)) = listener.accept().await else { return };
        let routes = routes.clone();
        tokio::spawn(async move {
          let mut buf = vec![0u8; 8192];
          let n = socket.read(&mut buf).await.unwrap_or(0);
          let request = String::from_utf8_lossy(&buf[..n]);
          let target = request.split_whitespace().nth(1).unwrap_or("");
          let path = target.split('?').next().unwrap_or("");
          let (status, body) =
            routes.iter().find(|(p, _, _)| *p == path).map_or((404, "{}"), |(_, s, b)| (*s, *b));
          let response = format!(
            "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
          );
          let _ = socket.write_all(response.as_bytes()).await;
          let _ = socket.shutdown().await;
        });
      }
    });
    format!("http://{}", addr)
  }

  #[tokio::test]
  async fn series_details_replace_summary_seasons_with_full_records() {
    let base = serve(vec![
      (
        "/tv/1399",
        200,
        r#"{"id": 1399, "name": "Game of Thrones", "overview": "o", "seasons": [
          {"id": 10, "season_number": 1, "episode_count": 2},
          {"id": 20, "season_number": 2, "episode_count": 1}
        ]}"#,
      ),
      (
        "/tv/1399/season/1",
        200,
        r#"{"id": 10, "season_number": 1, "name": "Season 1", "episodes": [
          {"id": 11, "episode_number": 1, "name": "Winter Is Coming"},
          {"id": 12, "episode_number": 2, "name": "The Kingsroad"}
        ]}"#,
      ),
      (
        "/tv/1399/season/2",
        200,
        r#"{"id": 20, "season_number": 2, "name": "Season 2", "episodes": [
          {"id": 21, "episode_number": 1, "name": "The North Remembers"}
        ]}"#,
      ),
    ])
    .await;

    let item = client().with_base_url(base).details(1399, MediaKind::Series).await.unwrap();
    let seasons = item.seasons();
    assert_eq!(seasons.len(), 2);
    assert_eq!(seasons[0].episodes.len(), 2);
    assert_eq!(seasons[0].episodes[1].name, "The Kingsroad");
    assert_eq!(seasons[1].name, "Season 2");
    assert_eq!(seasons[1].episodes[0].name, "The North Remembers");
  }

  #[tokio::test]
  async fn series_details_fail_when_any_season_fails() {
    let base = serve(vec![
      ("/tv/7", 200, r#"{"id": 7, "name": "S", "seasons": [{"season_number": 1}, {"season_number": 2}]}"#),
      ("/tv/7/season/1", 200, r#"{"id": 1, "season_number": 1, "episodes": []}"#),
      ("/tv/7/season/2", 429, "{}"),
    ])
    .await;

    let err = client().with_base_url(base).details(7, MediaKind::Series).await.unwrap_err();
    assert!(format!("{:#}", err).contains("rate limit"));
  }

  #[test]
  fn page_without_results_is_empty() {
    let page: Page<Movie> = serde_json::from_str(r#"{"page": 1}"#).unwrap();
    assert!(page.results.is_empty());
  }

  #[test]
  fn trending_page_ignores_extra_fields() {
    let json = r#"{"page": 1, "results": [
      {"id": 1, "title": "A", "overview": "a", "media_type": "movie", "genre_ids": [28]},
      {"id": 2, "title": "B", "overview": "", "adult": false}
    ], "total_pages": 500}"#;
    let page: Page<Movie> = serde_json::from_str(json).unwrap();
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.results[1].title, "B");
  }
}
