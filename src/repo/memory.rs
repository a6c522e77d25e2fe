use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rand::seq::SliceRandom;

use super::{BookStore, EngagementCounts, EngagementLog, SortOrder};
use crate::models::{Book, Bookmark, Review, ReviewStatus, OTHER_GENRE};

/// In-memory catalog. Used when no MONGO_URI is configured (dev) and by
/// the integration tests; same role the no-op cache plays for Redis.
#[derive(Default)]
pub struct MemoryCatalog {
    books: Mutex<Vec<Book>>,
    reviews: Mutex<Vec<Review>>,
    bookmarks: Mutex<Vec<Bookmark>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_book(&self, mut book: Book) -> ObjectId {
        let id = book.id.unwrap_or_else(ObjectId::new);
        book.id = Some(id);
        self.books.lock().unwrap().push(book);
        id
    }

    pub fn insert_review(&self, mut review: Review) -> ObjectId {
        let id = review.id.unwrap_or_else(ObjectId::new);
        review.id = Some(id);
        self.reviews.lock().unwrap().push(review);
        id
    }

    pub fn insert_bookmark(&self, mut bookmark: Bookmark) -> ObjectId {
        let id = bookmark.id.unwrap_or_else(ObjectId::new);
        bookmark.id = Some(id);
        self.bookmarks.lock().unwrap().push(bookmark);
        id
    }
}

fn matches_genre(book: &Book, genre: &str) -> bool {
    match &book.genre {
        Some(g) => g == genre,
        None => genre == OTHER_GENRE,
    }
}

#[async_trait]
impl BookStore for MemoryCatalog {
    async fn most_recent(&self, limit: usize) -> Result<Vec<Book>> {
        let mut books = self.books.lock().unwrap().clone();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        books.truncate(limit);
        Ok(books)
    }

    async fn random_excluding(&self, exclude: &[ObjectId], limit: usize) -> Result<Vec<Book>> {
        let books = self.books.lock().unwrap();
        let pool: Vec<&Book> = books
            .iter()
            .filter(|b| b.id.map(|id| !exclude.contains(&id)).unwrap_or(false))
            .collect();
        let picked = pool
            .choose_multiple(&mut rand::thread_rng(), limit)
            .map(|b| (*b).clone())
            .collect();
        Ok(picked)
    }

    async fn all(&self) -> Result<Vec<Book>> {
        Ok(self.books.lock().unwrap().clone())
    }

    async fn by_id(&self, id: ObjectId) -> Result<Option<Book>> {
        Ok(self
            .books
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == Some(id))
            .cloned())
    }

    async fn by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Book>> {
        Ok(self
            .books
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.id.map(|id| ids.contains(&id)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn distinct_genres(&self) -> Result<Vec<String>> {
        let books = self.books.lock().unwrap();
        let mut genres: Vec<String> = books
            .iter()
            .map(|b| b.genre.clone().unwrap_or_else(|| OTHER_GENRE.into()))
            .collect();
        genres.sort();
        genres.dedup();
        Ok(genres)
    }

    async fn set_cover(&self, id: ObjectId, cover_url: &str) -> Result<()> {
        let mut books = self.books.lock().unwrap();
        if let Some(book) = books.iter_mut().find(|b| b.id == Some(id)) {
            book.cover_url = Some(cover_url.to_string());
        }
        Ok(())
    }

    async fn browse(
        &self,
        q: Option<&str>,
        genre: Option<&str>,
        sort: SortOrder,
    ) -> Result<Vec<Book>> {
        let needle = q.map(str::to_lowercase);
        let mut books: Vec<Book> = self
            .books
            .lock()
            .unwrap()
            .iter()
            .filter(|b| match &needle {
                Some(n) => {
                    b.title.to_lowercase().contains(n) || b.author.to_lowercase().contains(n)
                }
                None => true,
            })
            .filter(|b| genre.map(|g| matches_genre(b, g)).unwrap_or(true))
            .cloned()
            .collect();
        match sort {
            SortOrder::Newest => books.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Title => books.sort_by(|a, b| a.title.cmp(&b.title)),
        }
        Ok(books)
    }
}

#[async_trait]
impl EngagementLog for MemoryCatalog {
    async fn approved_reviews_since(&self, since: DateTime<Utc>) -> Result<EngagementCounts> {
        let reviews = self.reviews.lock().unwrap();
        let mut counts = EngagementCounts::new();
        for r in reviews
            .iter()
            .filter(|r| r.status == ReviewStatus::Approved && r.created_at >= since)
        {
            *counts.entry(r.book_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn approved_reviews_total(&self) -> Result<EngagementCounts> {
        let reviews = self.reviews.lock().unwrap();
        let mut counts = EngagementCounts::new();
        for r in reviews.iter().filter(|r| r.status == ReviewStatus::Approved) {
            *counts.entry(r.book_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn bookmarks_since(&self, since: DateTime<Utc>) -> Result<EngagementCounts> {
        let bookmarks = self.bookmarks.lock().unwrap();
        let mut counts = EngagementCounts::new();
        for bm in bookmarks.iter().filter(|bm| bm.created_at >= since) {
            *counts.entry(bm.book_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn approved_reviews_for(&self, book_id: ObjectId) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.book_id == book_id && r.status == ReviewStatus::Approved)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }
}
