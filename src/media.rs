//! Catalog data model.
//!
//! TMDB returns movies and series with different field names (`title` vs
//! `name`, `release_date` vs `first_air_date`). Each shape gets its own struct
//! and [`MediaItem`] tags which one it is, so callers never probe fields.

use serde::{Deserialize, Deserializer, Serialize};

/// Discriminant shared by catalog paths and persisted history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
  #[serde(rename = "movie")]
  Movie,
  #[serde(rename = "tv")]
  Series,
}

impl MediaKind {
  /// Path segment used by the catalog API and the embedded player.
  pub fn path_segment(self) -> &'static str {
    match self {
      MediaKind::Movie => "movie",
      MediaKind::Series => "tv",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      MediaKind::Movie => "Movie",
      MediaKind::Series => "Series",
    }
  }
}

/// TMDB sends `null` for some text fields; treat it as empty.
fn nullable_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Genre {
  pub id: u64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Movie {
  pub id: u64,
  #[serde(default, deserialize_with = "nullable_string")]
  pub title: String,
  #[serde(default, deserialize_with = "nullable_string")]
  pub overview: String,
  #[serde(default)]
  pub poster_path: Option<String>,
  #[serde(default)]
  pub backdrop_path: Option<String>,
  #[serde(default, deserialize_with = "nullable_string")]
  pub release_date: String,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub runtime: Option<u32>,
  #[serde(default)]
  pub genres: Vec<Genre>,
  #[serde(default)]
  pub vote_count: Option<u64>,
  #[serde(default)]
  pub original_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Show {
  pub id: u64,
  #[serde(default, deserialize_with = "nullable_string")]
  pub name: String,
  #[serde(default, deserialize_with = "nullable_string")]
  pub overview: String,
  #[serde(default)]
  pub poster_path: Option<String>,
  #[serde(default)]
  pub backdrop_path: Option<String>,
  #[serde(default, deserialize_with = "nullable_string")]
  pub first_air_date: String,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub number_of_seasons: Option<u32>,
  #[serde(default)]
  pub genres: Vec<Genre>,
  #[serde(default)]
  pub vote_count: Option<u64>,
  #[serde(default)]
  pub original_language: Option<String>,
  /// Summary records from `/tv/{id}`; replaced by full season records
  /// (episodes included) when details are fetched.
  #[serde(default)]
  pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Season {
  #[serde(default)]
  pub id: u64,
  #[serde(default, deserialize_with = "nullable_string")]
  pub name: String,
  #[serde(default, deserialize_with = "nullable_string")]
  pub overview: String,
  #[serde(default)]
  pub poster_path: Option<String>,
  #[serde(default)]
  pub air_date: Option<String>,
  pub season_number: u32,
  #[serde(default)]
  pub episode_count: u32,
  #[serde(default)]
  pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Episode {
  pub id: u64,
  #[serde(default, deserialize_with = "nullable_string")]
  pub name: String,
  #[serde(default, deserialize_with = "nullable_string")]
  pub overview: String,
  #[serde(default)]
  pub still_path: Option<String>,
  #[serde(default)]
  pub air_date: Option<String>,
  pub episode_number: u32,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub runtime: Option<u32>,
}

/// A movie or a series, tagged by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaItem {
  Movie(Movie),
  Series(Show),
}

impl MediaItem {
  pub fn id(&self) -> u64 {
    match self {
      MediaItem::Movie(m) => m.id,
      MediaItem::Series(s) => s.id,
    }
  }

  pub fn kind(&self) -> MediaKind {
    match self {
      MediaItem::Movie(_) => MediaKind::Movie,
      MediaItem::Series(_) => MediaKind::Series,
    }
  }

  pub fn title(&self) -> &str {
    match self {
      MediaItem::Movie(m) => &m.title,
      MediaItem::Series(s) => &s.name,
    }
  }

  pub fn overview(&self) -> &str {
    match self {
      MediaItem::Movie(m) => &m.overview,
      MediaItem::Series(s) => &s.overview,
    }
  }

  pub fn poster_path(&self) -> Option<&str> {
    match self {
      MediaItem::Movie(m) => m.poster_path.as_deref(),
      MediaItem::Series(s) => s.poster_path.as_deref(),
    }
  }

  pub fn backdrop_path(&self) -> Option<&str> {
    match self {
      MediaItem::Movie(m) => m.backdrop_path.as_deref(),
      MediaItem::Series(s) => s.backdrop_path.as_deref(),
    }
  }

  pub fn vote_average(&self) -> f64 {
    match self {
      MediaItem::Movie(m) => m.vote_average,
      MediaItem::Series(s) => s.vote_average,
    }
  }

  pub fn genres(&self) -> &[Genre] {
    match self {
      MediaItem::Movie(m) => &m.genres,
      MediaItem::Series(s) => &s.genres,
    }
  }

  /// Release year for movies, first-air year for series.
  pub fn year(&self) -> Option<i32> {
    let date = match self {
      MediaItem::Movie(m) => &m.release_date,
      MediaItem::Series(s) => &s.first_air_date,
    };
    date.get(..4).and_then(|y| y.parse().ok())
  }

  /// Runtime formatted as `1h 52m`; movies only.
  pub fn runtime_label(&self) -> Option<String> {
    match self {
      MediaItem::Movie(Movie { runtime: Some(minutes), .. }) if *minutes > 0 => {
        Some(format!("{}h {}m", minutes / 60, minutes % 60))
      }
      _ => None,
    }
  }

  pub fn seasons_label(&self) -> Option<String> {
    match self {
      MediaItem::Series(Show { number_of_seasons: Some(n), .. }) if *n > 0 => {
        Some(format!("{} Season{}", n, if *n > 1 { "s" } else { "" }))
      }
      _ => None,
    }
  }

  pub fn seasons(&self) -> &[Season] {
    match self {
      MediaItem::Series(s) => &s.seasons,
      MediaItem::Movie(_) => &[],
    }
  }

  /// Whether the item can headline the featured banner: both a title and a synopsis.
  pub fn has_title_and_overview(&self) -> bool {
    !self.title().trim().is_empty() && !self.overview().trim().is_empty()
  }
}

impl From<Movie> for MediaItem {
  fn from(m: Movie) -> Self {
    MediaItem::Movie(m)
  }
}

impl From<Show> for MediaItem {
  fn from(s: Show) -> Self {
    MediaItem::Series(s)
  }
}
