//! Picks the movie shown in the featured banner.
//!
//! The primary path picks at random among the first few popular movies that
//! have both a title and a synopsis, then insists the detailed record still has
//! a synopsis. Any failure falls back to the first qualifying movie of a fresh
//! listing. The fallback returns that movie's details as-is, without
//! re-checking the detailed synopsis.

use anyhow::{Result, bail};
use rand::Rng;
use tracing::{info, warn};

use crate::catalog::{Catalog, Listing};
use crate::media::{MediaItem, MediaKind};

pub async fn select_featured<C, R>(catalog: &C, rng: &mut R, pool_size: usize) -> Result<MediaItem>
where
  C: Catalog,
  R: Rng,
{
  match pick_random(catalog, rng, pool_size).await {
    Ok(item) => {
      info!(id = item.id(), title = %item.title(), "featured: picked");
      Ok(item)
    }
    Err(e) => {
      warn!(err = %format!("{:#}", e), "featured: random pick failed, using first qualifying movie");
      pick_first(catalog).await
    }
  }
}

async fn pick_random<C: Catalog, R: Rng>(catalog: &C, rng: &mut R, pool_size: usize) -> Result<MediaItem> {
  let movies = catalog.list(Listing::POPULAR_MOVIES).await?;
  let qualifying: Vec<&MediaItem> = movies.iter().filter(|m| m.has_title_and_overview()).collect();
  if qualifying.is_empty() {
    bail!("No popular movie has both a title and a synopsis");
  }

  let pool = qualifying.len().min(pool_size.max(1));
  let choice = qualifying[rng.random_range(0..pool)];

  let details = catalog.details(choice.id(), MediaKind::Movie).await?;
  if details.overview().trim().is_empty() {
    bail!("Movie {} has no synopsis in its details", choice.id());
  }
  Ok(details)
}

async fn pick_first<C: Catalog>(catalog: &C) -> Result<MediaItem> {
  let movies = catalog.list(Listing::POPULAR_MOVIES).await?;
  let Some(first) = movies.iter().find(|m| m.has_title_and_overview()) else {
    bail!("No popular movie with a title and synopsis is available");
  };
  catalog.details(first.id(), MediaKind::Movie).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::media::Movie;
  use anyhow::anyhow;
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use std::collections::HashMap;
  use std::future::{Future, ready};
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Default)]
  struct FakeCatalog {
    popular: Vec<MediaItem>,
    details: HashMap<u64, MediaItem>,
    fail_first_listing: bool,
    list_calls: AtomicUsize,
  }

  impl Catalog for FakeCatalog {
    fn list(&self, listing: Listing) -> impl Future<Output = Result<Vec<MediaItem>>> + Send {
      assert_eq!(listing, Listing::POPULAR_MOVIES);
      let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_first_listing && call == 0 {
        ready(Err(anyhow!("connection reset")))
      } else {
        ready(Ok(self.popular.clone()))
      }
    }

    fn details(&self, id: u64, _kind: MediaKind) -> impl Future<Output = Result<MediaItem>> + Send {
      ready(self.details.get(&id).cloned().ok_or_else(|| anyhow!("TMDB resource not found: /movie/{}", id)))
    }
  }

  fn movie(id: u64, title: &str, overview: &str) -> MediaItem {
    MediaItem::Movie(Movie {
      id,
      title: title.to_string(),
      overview: overview.to_string(),
      poster_path: None,
      backdrop_path: None,
      release_date: String::new(),
      vote_average: 0.0,
      runtime: None,
      genres: Vec::new(),
      vote_count: None,
      original_language: None,
    })
  }

  fn catalog_with(popular: Vec<MediaItem>) -> FakeCatalog {
    let details = popular.iter().map(|m| (m.id(), m.clone())).collect();
    FakeCatalog { popular, details, ..Default::default() }
  }

  #[tokio::test]
  async fn picks_only_qualifying_movies_from_the_pool() {
    let mut popular = vec![movie(1, "", "no title"), movie(2, "No Overview", "  ")];
    popular.extend((10..30).map(|id| movie(id, &format!("Movie {}", id), "A synopsis.")));
    let catalog = catalog_with(popular);

    for seed in 0..50 {
      let mut rng = StdRng::seed_from_u64(seed);
      let item = select_featured(&catalog, &mut rng, 10).await.unwrap();
      assert!(item.has_title_and_overview());
      // First ten qualifying ids are 10..20.
      assert!((10..20).contains(&item.id()), "picked {} outside the pool", item.id());
    }
  }

  #[tokio::test]
  async fn small_listing_uses_all_qualifying_items() {
    let catalog = catalog_with(vec![movie(7, "Only", "One.")]);
    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(select_featured(&catalog, &mut rng, 10).await.unwrap().id(), 7);
  }

  #[tokio::test]
  async fn blank_detailed_synopsis_falls_back_to_first_qualifying() {
    let mut catalog = catalog_with(vec![movie(1, "First", "Listed synopsis."), movie(2, "Second", "Listed synopsis.")]);
    catalog.details.insert(2, movie(2, "Second", ""));
    catalog.details.insert(1, movie(1, "First", "Detailed synopsis."));

    // Whichever the random pick is, the result must be the first movie's details.
    for seed in 0..20 {
      let mut rng = StdRng::seed_from_u64(seed);
      let item = select_featured(&catalog, &mut rng, 10).await.unwrap();
      assert_eq!(item.id(), 1);
      assert_eq!(item.overview(), "Detailed synopsis.");
    }
  }

  #[tokio::test]
  async fn fallback_does_not_recheck_detailed_synopsis() {
    let mut catalog = catalog_with(vec![movie(1, "First", "Listed synopsis.")]);
    catalog.details.insert(1, movie(1, "First", ""));
    let mut rng = StdRng::seed_from_u64(0);

    let item = select_featured(&catalog, &mut rng, 10).await.unwrap();
    assert_eq!(item.id(), 1);
    assert_eq!(item.overview(), "");
  }

  #[tokio::test]
  async fn listing_error_retries_listing_once() {
    let mut catalog = catalog_with(vec![movie(4, "Four", "Synopsis."), movie(5, "Five", "Synopsis.")]);
    catalog.fail_first_listing = true;
    let mut rng = StdRng::seed_from_u64(1);

    let item = select_featured(&catalog, &mut rng, 10).await.unwrap();
    assert_eq!(item.id(), 4);
    assert_eq!(catalog.list_calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn no_qualifying_item_is_an_error() {
    let catalog = catalog_with(vec![movie(1, "", "x"), movie(2, "Y", "")]);
    let mut rng = StdRng::seed_from_u64(9);
    let err = select_featured(&catalog, &mut rng, 10).await.unwrap_err();
    assert!(err.to_string().contains("No popular movie"));
  }
}
