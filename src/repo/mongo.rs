use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, Bson, Document},
    Collection, Database,
};

use super::{BookStore, EngagementCounts, EngagementLog, SortOrder};
use crate::models::{Book, Review, OTHER_GENRE};

/// MongoDB-backed catalog. Implements both sides: book records and the
/// engagement aggregates the ranking engine reads.
#[derive(Clone)]
pub struct MongoCatalog {
    db: Database,
}

impl MongoCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn books(&self) -> Collection<Book> {
        self.db.collection::<Book>("books")
    }

    fn reviews(&self) -> Collection<Review> {
        self.db.collection::<Review>("reviews")
    }

    async fn grouped_counts(&self, coll: &str, filter: Document) -> Result<EngagementCounts> {
        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": { "_id": "$book_id", "n": { "$sum": 1 } } },
        ];
        let mut cur = self.db.collection::<Document>(coll).aggregate(pipeline).await?;
        let mut counts = EngagementCounts::new();
        while let Some(d) = cur.try_next().await? {
            counts.insert(d.get_object_id("_id")?, count_field(&d));
        }
        Ok(counts)
    }
}

fn count_field(d: &Document) -> i64 {
    match d.get("n") {
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Int64(n)) => *n,
        _ => 0,
    }
}

fn bson_date(t: DateTime<Utc>) -> Bson {
    Bson::DateTime(mongodb::bson::DateTime::from_chrono(t))
}

#[async_trait]
impl BookStore for MongoCatalog {
    async fn most_recent(&self, limit: usize) -> Result<Vec<Book>> {
        let cur = self
            .books()
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(limit as i64)
            .await?;
        Ok(cur.try_collect().await?)
    }

    async fn random_excluding(&self, exclude: &[ObjectId], limit: usize) -> Result<Vec<Book>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut pipeline = Vec::new();
        if !exclude.is_empty() {
            pipeline.push(doc! { "$match": { "_id": { "$nin": exclude.to_vec() } } });
        }
        // $sample muestrea sin reemplazo
        pipeline.push(doc! { "$sample": { "size": limit as i64 } });

        let mut cur = self.books().aggregate(pipeline).await?;
        let mut books = Vec::new();
        while let Some(d) = cur.try_next().await? {
            books.push(from_document::<Book>(d)?);
        }
        Ok(books)
    }

    async fn all(&self) -> Result<Vec<Book>> {
        Ok(self.books().find(doc! {}).await?.try_collect().await?)
    }

    async fn by_id(&self, id: ObjectId) -> Result<Option<Book>> {
        Ok(self.books().find_one(doc! { "_id": id }).await?)
    }

    async fn by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cur = self.books().find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cur.try_collect().await?)
    }

    async fn distinct_genres(&self) -> Result<Vec<String>> {
        let raw = self.books().distinct("genre", doc! {}).await?;
        let mut genres: Vec<String> = raw
            .into_iter()
            .filter_map(|b| match b {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect();
        // {"genre": null} matches both null and missing fields
        if self.books().count_documents(doc! { "genre": Bson::Null }).await? > 0 {
            genres.push(OTHER_GENRE.to_string());
        }
        genres.sort();
        genres.dedup();
        Ok(genres)
    }

    async fn set_cover(&self, id: ObjectId, cover_url: &str) -> Result<()> {
        self.books()
            .update_one(doc! { "_id": id }, doc! { "$set": { "cover_url": cover_url } })
            .await?;
        Ok(())
    }

    async fn browse(
        &self,
        q: Option<&str>,
        genre: Option<&str>,
        sort: SortOrder,
    ) -> Result<Vec<Book>> {
        let mut filter = doc! {};
        if let Some(q) = q {
            let rx = doc! { "$regex": q, "$options": "i" };
            filter.insert(
                "$or",
                vec![doc! { "title": rx.clone() }, doc! { "author": rx }],
            );
        }
        if let Some(g) = genre {
            if g == OTHER_GENRE {
                filter.insert("genre", Bson::Null);
            } else {
                filter.insert("genre", g);
            }
        }
        let sort_doc = match sort {
            SortOrder::Newest => doc! { "created_at": -1 },
            SortOrder::Title => doc! { "title": 1 },
        };
        let cur = self.books().find(filter).sort(sort_doc).await?;
        Ok(cur.try_collect().await?)
    }
}

#[async_trait]
impl EngagementLog for MongoCatalog {
    async fn approved_reviews_since(&self, since: DateTime<Utc>) -> Result<EngagementCounts> {
        self.grouped_counts(
            "reviews",
            doc! { "status": "approved", "created_at": { "$gte": bson_date(since) } },
        )
        .await
    }

    async fn approved_reviews_total(&self) -> Result<EngagementCounts> {
        self.grouped_counts("reviews", doc! { "status": "approved" }).await
    }

    async fn bookmarks_since(&self, since: DateTime<Utc>) -> Result<EngagementCounts> {
        self.grouped_counts("bookmarks", doc! { "created_at": { "$gte": bson_date(since) } })
            .await
    }

    async fn approved_reviews_for(&self, book_id: ObjectId) -> Result<Vec<Review>> {
        let cur = self
            .reviews()
            .find(doc! { "book_id": book_id, "status": "approved" })
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cur.try_collect().await?)
    }
}
