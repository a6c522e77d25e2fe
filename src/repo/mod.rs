use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::models::{Book, Review};

pub mod memory;
pub mod mongo;

pub use memory::MemoryCatalog;
pub use mongo::MongoCatalog;

/// book_id -> number of qualifying events.
pub type EngagementCounts = HashMap<ObjectId, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Newest,
    Title,
}

/// Store of catalog records. The ranking engine only needs a handful of
/// query shapes; anything else stays behind this trait so tests can run
/// against the in-memory implementation.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Up to `limit` books, newest `created_at` first.
    async fn most_recent(&self, limit: usize) -> Result<Vec<Book>>;

    /// Up to `limit` books drawn uniformly at random, without replacement,
    /// skipping the given ids.
    async fn random_excluding(&self, exclude: &[ObjectId], limit: usize) -> Result<Vec<Book>>;

    async fn all(&self) -> Result<Vec<Book>>;

    async fn by_id(&self, id: ObjectId) -> Result<Option<Book>>;

    async fn by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Book>>;

    /// Distinct genre labels, sorted, with the "Other" sentinel standing in
    /// for books that have none.
    async fn distinct_genres(&self) -> Result<Vec<String>>;

    /// Rewrites one book's stored cover reference.
    async fn set_cover(&self, id: ObjectId, cover_url: &str) -> Result<()>;

    /// Catalog browse: optional case-insensitive match on title/author,
    /// optional genre filter ("Other" matches books without a genre).
    async fn browse(
        &self,
        q: Option<&str>,
        genre: Option<&str>,
        sort: SortOrder,
    ) -> Result<Vec<Book>>;
}

/// Read side of the engagement history (bookmarks and approved reviews).
/// Append-only from the engine's perspective; it only reads aggregates.
#[async_trait]
pub trait EngagementLog: Send + Sync {
    async fn approved_reviews_since(&self, since: DateTime<Utc>) -> Result<EngagementCounts>;

    async fn approved_reviews_total(&self) -> Result<EngagementCounts>;

    async fn bookmarks_since(&self, since: DateTime<Utc>) -> Result<EngagementCounts>;

    /// Approved reviews for one book, newest first (detail page).
    async fn approved_reviews_for(&self, book_id: ObjectId) -> Result<Vec<Review>>;
}
