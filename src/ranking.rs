//! Landing-page ranking: the Latest, Top-of-Week and Trending book lists.
//!
//! The three lists are computed independently per request, against the
//! same catalog, with no shared state and no cross-list deduplication.
//! `now` and the random source are parameters so the window boundaries
//! and the randomized components are testable.

use std::cmp::Ordering;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use mongodb::bson::oid::ObjectId;
use rand::Rng;

use crate::covers::CoverCache;
use crate::models::{Book, BookCard};
use crate::repo::{BookStore, EngagementLog};

/// Latest shows up to 12 books but guarantees at least 8 when the
/// catalog has them, backfilling with random picks.
pub const LATEST_LIMIT: usize = 12;
pub const LATEST_MIN: usize = 8;
/// Top-of-Week and Trending cap.
pub const SECTION_LIMIT: usize = 8;

const BOOKMARK_WEIGHT: f64 = 2.0;
const REVIEW_WEIGHT: f64 = 1.5;
const DIVERSITY_MAX: i64 = 100;

#[derive(Debug)]
pub struct HomeLists {
    pub latest: Vec<BookCard>,
    pub top_week: Vec<BookCard>,
    pub trending: Vec<BookCard>,
}

/// Computes the three landing-page lists sequentially. Store failures
/// propagate; the cover side effect never does.
pub async fn build_home_page<R: Rng + Send>(
    store: &dyn BookStore,
    log: &dyn EngagementLog,
    covers: &CoverCache,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<HomeLists> {
    let latest = latest_books(store, covers).await?;
    let top_week = top_week_books(store, log, now).await?;
    let trending = trending_books(store, log, now, rng).await?;
    Ok(HomeLists {
        latest: latest.iter().map(BookCard::from).collect(),
        top_week: top_week.iter().map(BookCard::from).collect(),
        trending: trending.iter().map(BookCard::from).collect(),
    })
}

/// Newest books first, backfilled with random distinct picks when the
/// primary result is short. A single surviving book is duplicated so the
/// carousel always has two slides (presentation accommodation, not a
/// data invariant).
pub async fn latest_books(store: &dyn BookStore, covers: &CoverCache) -> Result<Vec<Book>> {
    let mut rows = store.most_recent(LATEST_LIMIT).await?;
    if rows.len() < LATEST_MIN {
        let exclude: Vec<_> = rows.iter().filter_map(|b| b.id).collect();
        let extra = store.random_excluding(&exclude, LATEST_MIN - rows.len()).await?;
        rows.extend(extra);
    }
    for book in rows.iter_mut() {
        localize_cover(store, covers, book).await;
    }
    if rows.len() == 1 {
        let only = rows[0].clone();
        rows.push(only);
    }
    Ok(rows)
}

// Best effort, single attempt: on any fetch failure the external URL
// stays as-is and the list request proceeds.
async fn localize_cover(store: &dyn BookStore, covers: &CoverCache, book: &mut Book) {
    let Some(url) = book.cover_url.clone() else { return };
    let Some(local) = covers.localize(&url).await else { return };
    if let Some(id) = book.id {
        if let Err(e) = store.set_cover(id, &local).await {
            eprintln!("cover rewrite for {id}: {e}");
        }
    }
    book.cover_url = Some(local);
}

/// Books with approved reviews in the trailing 7 days, most reviewed
/// first, ties broken by newest book. No backfill: this list reflects
/// only real weekly activity and may be short or empty.
pub async fn top_week_books(
    store: &dyn BookStore,
    log: &dyn EngagementLog,
    now: DateTime<Utc>,
) -> Result<Vec<Book>> {
    let counts = log.approved_reviews_since(now - Duration::days(7)).await?;
    if counts.is_empty() {
        return Ok(Vec::new());
    }
    // Fetch only the contenders: the top counts plus ties at the cutoff,
    // so the created_at tie-break still sees every candidate for last place.
    let mut entries: Vec<(ObjectId, i64)> = counts.iter().map(|(id, n)| (*id, *n)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    let cutoff = entries[entries.len().min(SECTION_LIMIT) - 1].1;
    let ids: Vec<ObjectId> = entries
        .iter()
        .take_while(|(_, n)| *n >= cutoff)
        .map(|(id, _)| *id)
        .collect();

    let mut books = store.by_ids(&ids).await?;
    books.sort_by(|a, b| {
        let ca = a.id.and_then(|id| counts.get(&id)).copied().unwrap_or(0);
        let cb = b.id.and_then(|id| counts.get(&id)).copied().unwrap_or(0);
        cb.cmp(&ca).then(b.created_at.cmp(&a.created_at))
    });
    books.truncate(SECTION_LIMIT);
    Ok(books)
}

/// Every book is a candidate, ranked by the composite score. The
/// diversity draw and the random tie-break are re-evaluated on every
/// request on purpose, so the section varies across visits; never cache
/// this computation.
pub async fn trending_books<R: Rng + Send>(
    store: &dyn BookStore,
    log: &dyn EngagementLog,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Vec<Book>> {
    let books = store.all().await?;
    let bookmarks = log.bookmarks_since(now - Duration::days(30)).await?;
    let reviews = log.approved_reviews_total().await?;

    let mut scored: Vec<(f64, u32, Book)> = books
        .into_iter()
        .map(|book| {
            let id = book.id;
            let bm = id.and_then(|i| bookmarks.get(&i)).copied().unwrap_or(0);
            let rv = id.and_then(|i| reviews.get(&i)).copied().unwrap_or(0);
            let diversity = rng.gen_range(0..DIVERSITY_MAX);
            let score = composite_score(bm, rv, book.created_at, now, diversity);
            // segundo sorteo independiente para el desempate
            (score, rng.gen::<u32>(), book)
        })
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    scored.truncate(SECTION_LIMIT);
    Ok(scored.into_iter().map(|(_, _, book)| book).collect())
}

/// Shared scoring utility for Trending: recent bookmarks weighted 2,
/// all-time approved reviews weighted 1.5, plus the newness bonus and
/// the caller-supplied diversity draw in [0, 99].
pub fn composite_score(
    bookmarks_30d: i64,
    reviews_total: i64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    diversity: i64,
) -> f64 {
    bookmarks_30d as f64 * BOOKMARK_WEIGHT
        + reviews_total as f64 * REVIEW_WEIGHT
        + newness_score(created_at, now)
        + diversity as f64
}

/// 10 within the trailing 7 days, 5 within 30, 0 otherwise. Boundaries
/// inclusive.
pub fn newness_score(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    if created_at >= now - Duration::days(7) {
        10.0
    } else if created_at >= now - Duration::days(30) {
        5.0
    } else {
        0.0
    }
}
