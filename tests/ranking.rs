//! Engine tests against the in-memory catalog with a fixed clock and
//! seeded RNGs. Trending assertions stick to scores and membership; tie
//! order is randomized by design.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use mongodb::bson::oid::ObjectId;
use rand::rngs::StdRng;
use rand::SeedableRng;

use booknook::covers::{CoverCache, CoverFetcher};
use booknook::models::{Book, Bookmark, Review, ReviewStatus};
use booknook::ranking::{
    latest_books, top_week_books, trending_books, LATEST_LIMIT, LATEST_MIN, SECTION_LIMIT,
};
use booknook::repo::{BookStore, EngagementLog, MemoryCatalog, SortOrder};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn book(title: &str, age_days: i64, now: DateTime<Utc>) -> Book {
    Book {
        id: None,
        title: title.to_string(),
        author: "Test Author".to_string(),
        cover_url: None,
        genre: Some("Fantasy".to_string()),
        description: None,
        publisher: None,
        pages: None,
        created_at: now - Duration::days(age_days),
    }
}

fn review(book_id: ObjectId, status: ReviewStatus, age_days: i64, now: DateTime<Utc>) -> Review {
    Review {
        id: None,
        book_id,
        rating: 4,
        text: "solid read".to_string(),
        status,
        created_at: now - Duration::days(age_days),
    }
}

fn bookmark(book_id: ObjectId, age_days: i64, now: DateTime<Utc>) -> Bookmark {
    Bookmark {
        id: None,
        book_id,
        user_id: ObjectId::new(),
        created_at: now - Duration::days(age_days),
    }
}

/// Never fetches; ranking tests only use local or absent covers.
struct PanicFetcher;

#[async_trait]
impl CoverFetcher for PanicFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        panic!("unexpected cover fetch for {url}");
    }
}

fn no_covers() -> CoverCache {
    CoverCache::new(std::env::temp_dir().join("booknook-test-unused"), Box::new(PanicFetcher))
}

fn ids_of(books: &[Book]) -> Vec<ObjectId> {
    books.iter().filter_map(|b| b.id).collect()
}

fn assert_distinct(books: &[Book]) {
    let ids = ids_of(books);
    let set: HashSet<_> = ids.iter().collect();
    assert_eq!(set.len(), ids.len(), "duplicate book ids in list");
}

// ---------- Latest ----------

#[tokio::test]
async fn latest_caps_at_twelve_newest_first() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    for i in 0..20 {
        catalog.insert_book(book(&format!("b{i}"), i, now));
    }

    let latest = latest_books(&catalog, &no_covers()).await.unwrap();

    assert_eq!(latest.len(), LATEST_LIMIT);
    assert_distinct(&latest);
    // newest first: ages 0..11
    assert_eq!(latest[0].title, "b0");
    assert_eq!(latest[11].title, "b11");
}

#[tokio::test]
async fn latest_short_catalog_returns_everything_once() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    for i in 0..5 {
        catalog.insert_book(book(&format!("b{i}"), i, now));
    }

    let latest = latest_books(&catalog, &no_covers()).await.unwrap();

    // backfill has nothing left to add
    assert_eq!(latest.len(), 5);
    assert_distinct(&latest);
}

/// Store whose primary "most recent" query is artificially short, to
/// drive the backfill path while more books exist.
struct SparseRecent {
    inner: MemoryCatalog,
    recent_limit: usize,
}

#[async_trait]
impl BookStore for SparseRecent {
    async fn most_recent(&self, limit: usize) -> Result<Vec<Book>> {
        let capped = limit.min(self.recent_limit);
        self.inner.most_recent(capped).await
    }
    async fn random_excluding(&self, exclude: &[ObjectId], limit: usize) -> Result<Vec<Book>> {
        self.inner.random_excluding(exclude, limit).await
    }
    async fn all(&self) -> Result<Vec<Book>> {
        self.inner.all().await
    }
    async fn by_id(&self, id: ObjectId) -> Result<Option<Book>> {
        self.inner.by_id(id).await
    }
    async fn by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Book>> {
        self.inner.by_ids(ids).await
    }
    async fn distinct_genres(&self) -> Result<Vec<String>> {
        self.inner.distinct_genres().await
    }
    async fn set_cover(&self, id: ObjectId, cover_url: &str) -> Result<()> {
        self.inner.set_cover(id, cover_url).await
    }
    async fn browse(
        &self,
        q: Option<&str>,
        genre: Option<&str>,
        sort: SortOrder,
    ) -> Result<Vec<Book>> {
        self.inner.browse(q, genre, sort).await
    }
}

#[tokio::test]
async fn latest_backfills_to_minimum_without_duplicates() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    for i in 0..10 {
        catalog.insert_book(book(&format!("b{i}"), i, now));
    }
    let store = SparseRecent { inner: catalog, recent_limit: 3 };

    let latest = latest_books(&store, &no_covers()).await.unwrap();

    assert_eq!(latest.len(), LATEST_MIN);
    assert_distinct(&latest);
    // primary result survives in front
    assert_eq!(latest[0].title, "b0");
    assert_eq!(latest[1].title, "b1");
    assert_eq!(latest[2].title, "b2");
}

#[tokio::test]
async fn latest_single_book_is_duplicated_for_the_carousel() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let id = catalog.insert_book(book("only", 1, now));

    let latest = latest_books(&catalog, &no_covers()).await.unwrap();

    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].id, Some(id));
    assert_eq!(latest[1].id, Some(id));
}

#[tokio::test]
async fn empty_catalog_produces_empty_lists() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let mut rng = StdRng::seed_from_u64(7);

    let latest = latest_books(&catalog, &no_covers()).await.unwrap();
    let top = top_week_books(&catalog, &catalog, now).await.unwrap();
    let trending = trending_books(&catalog, &catalog, now, &mut rng).await.unwrap();

    assert!(latest.is_empty());
    assert!(top.is_empty());
    assert!(trending.is_empty());
}

// ---------- Top-of-Week ----------

#[tokio::test]
async fn top_week_only_counts_approved_reviews_inside_the_window() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let fresh = catalog.insert_book(book("fresh", 20, now));
    let stale = catalog.insert_book(book("stale", 20, now));
    let pending = catalog.insert_book(book("pending", 20, now));

    catalog.insert_review(review(fresh, ReviewStatus::Approved, 6, now));
    catalog.insert_review(review(stale, ReviewStatus::Approved, 8, now));
    catalog.insert_review(review(pending, ReviewStatus::Pending, 2, now));

    let top = top_week_books(&catalog, &catalog, now).await.unwrap();

    assert_eq!(ids_of(&top), vec![fresh]);
}

#[tokio::test]
async fn top_week_orders_by_count_then_book_recency() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let busy = catalog.insert_book(book("busy", 50, now));
    let newer = catalog.insert_book(book("newer", 1, now));
    let older = catalog.insert_book(book("older", 60, now));

    for d in 1..=3 {
        catalog.insert_review(review(busy, ReviewStatus::Approved, d, now));
    }
    catalog.insert_review(review(newer, ReviewStatus::Approved, 2, now));
    catalog.insert_review(review(older, ReviewStatus::Approved, 3, now));

    let top = top_week_books(&catalog, &catalog, now).await.unwrap();

    // 3 reviews first, then the 1-review tie broken by newest book
    assert_eq!(ids_of(&top), vec![busy, newer, older]);
}

#[tokio::test]
async fn top_week_caps_at_eight() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    for i in 0..12 {
        let id = catalog.insert_book(book(&format!("b{i}"), 30, now));
        catalog.insert_review(review(id, ReviewStatus::Approved, 1, now));
    }

    let top = top_week_books(&catalog, &catalog, now).await.unwrap();

    assert_eq!(top.len(), SECTION_LIMIT);
    assert_distinct(&top);
}

/// Records how many ids each `by_ids` call asks for, to pin down how
/// much of the catalog the weekly list actually loads.
struct FetchLedger {
    inner: MemoryCatalog,
    requested: std::sync::Mutex<Vec<usize>>,
}

impl FetchLedger {
    fn new(inner: MemoryCatalog) -> Self {
        Self { inner, requested: std::sync::Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl BookStore for FetchLedger {
    async fn most_recent(&self, limit: usize) -> Result<Vec<Book>> {
        self.inner.most_recent(limit).await
    }
    async fn random_excluding(&self, exclude: &[ObjectId], limit: usize) -> Result<Vec<Book>> {
        self.inner.random_excluding(exclude, limit).await
    }
    async fn all(&self) -> Result<Vec<Book>> {
        self.inner.all().await
    }
    async fn by_id(&self, id: ObjectId) -> Result<Option<Book>> {
        self.inner.by_id(id).await
    }
    async fn by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Book>> {
        self.requested.lock().unwrap().push(ids.len());
        self.inner.by_ids(ids).await
    }
    async fn distinct_genres(&self) -> Result<Vec<String>> {
        self.inner.distinct_genres().await
    }
    async fn set_cover(&self, id: ObjectId, cover_url: &str) -> Result<()> {
        self.inner.set_cover(id, cover_url).await
    }
    async fn browse(
        &self,
        q: Option<&str>,
        genre: Option<&str>,
        sort: SortOrder,
    ) -> Result<Vec<Book>> {
        self.inner.browse(q, genre, sort).await
    }
}

#[tokio::test]
async fn top_week_fetches_only_the_contending_books() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    // distinct counts 1..=12: only the best 8 are contenders
    let mut best = None;
    for i in 0..12 {
        let id = catalog.insert_book(book(&format!("b{i}"), 30, now));
        for _ in 0..=i {
            catalog.insert_review(review(id, ReviewStatus::Approved, 1, now));
        }
        best = Some(id);
    }
    let store = FetchLedger::new(catalog);

    let top = top_week_books(&store, &store.inner, now).await.unwrap();

    assert_eq!(top.len(), SECTION_LIMIT);
    assert_eq!(top[0].id, best);
    assert_eq!(*store.requested.lock().unwrap(), vec![SECTION_LIMIT]);
}

#[tokio::test]
async fn top_week_keeps_cutoff_ties_for_the_recency_break() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let big = catalog.insert_book(book("big", 50, now));
    for _ in 0..3 {
        catalog.insert_review(review(big, ReviewStatus::Approved, 1, now));
    }
    // nine two-review books tied at the cutoff, distinct ages
    let mut tied = Vec::new();
    for age in 1..=9 {
        let id = catalog.insert_book(book(&format!("tied{age}"), age, now));
        for _ in 0..2 {
            catalog.insert_review(review(id, ReviewStatus::Approved, 2, now));
        }
        tied.push(id);
    }

    let top = top_week_books(&catalog, &catalog, now).await.unwrap();

    // 3-review book first, then the newest seven of the tied books
    let mut expected = vec![big];
    expected.extend(tied.iter().take(7).copied());
    assert_eq!(ids_of(&top), expected);
}

// ---------- Trending ----------

#[tokio::test]
async fn trending_never_excludes_engagement_free_books() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let quiet = catalog.insert_book(book("quiet", 0, now));
    let busy = catalog.insert_book(book("busy", 40, now));
    for d in 0..5 {
        catalog.insert_bookmark(bookmark(busy, d, now));
    }

    let mut rng = StdRng::seed_from_u64(1);
    let trending = trending_books(&catalog, &catalog, now, &mut rng).await.unwrap();

    let ids: HashSet<_> = ids_of(&trending).into_iter().collect();
    assert!(ids.contains(&quiet));
    assert!(ids.contains(&busy));
}

#[tokio::test]
async fn trending_heavy_engagement_beats_any_random_draw() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    // 100 bookmarks * 2 = 200, above the 109 ceiling a zero-engagement
    // book can reach (newness 10 + diversity 99)
    let hit = catalog.insert_book(book("hit", 40, now));
    for _ in 0..100 {
        catalog.insert_bookmark(bookmark(hit, 5, now));
    }
    for i in 0..5 {
        catalog.insert_book(book(&format!("quiet{i}"), 0, now));
    }

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let trending = trending_books(&catalog, &catalog, now, &mut rng).await.unwrap();
        assert_eq!(trending[0].id, Some(hit), "seed {seed}");
    }
}

#[tokio::test]
async fn trending_window_rules() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let a = catalog.insert_book(book("a", 40, now));
    // bookmarks outside the 30-day window must not count; all-time
    // approved reviews always count
    catalog.insert_bookmark(bookmark(a, 31, now));
    catalog.insert_review(review(a, ReviewStatus::Approved, 200, now));

    let bookmarks = catalog.bookmarks_since(now - Duration::days(30)).await.unwrap();
    let reviews = catalog.approved_reviews_total().await.unwrap();

    assert!(!bookmarks.contains_key(&a));
    assert_eq!(reviews.get(&a), Some(&1));
}

#[tokio::test]
async fn trending_caps_at_eight_and_is_distinct() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    for i in 0..20 {
        catalog.insert_book(book(&format!("b{i}"), i, now));
    }

    let mut rng = StdRng::seed_from_u64(99);
    let trending = trending_books(&catalog, &catalog, now, &mut rng).await.unwrap();

    assert_eq!(trending.len(), SECTION_LIMIT);
    assert_distinct(&trending);
}

// ---------- Store queries used by the backfill ----------

#[tokio::test]
async fn random_excluding_respects_the_exclusion_set() {
    let now = fixed_now();
    let catalog = MemoryCatalog::new();
    let mut excluded = Vec::new();
    for i in 0..6 {
        excluded.push(catalog.insert_book(book(&format!("x{i}"), i, now)));
    }
    let kept: HashSet<_> = (0..4)
        .map(|i| catalog.insert_book(book(&format!("k{i}"), 50 + i, now)))
        .collect();

    let picked = catalog.random_excluding(&excluded, 10).await.unwrap();

    assert_eq!(picked.len(), kept.len());
    for b in &picked {
        assert!(kept.contains(&b.id.unwrap()));
    }
}
