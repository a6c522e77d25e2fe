use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Sentinel genre label for books without one.
pub const OTHER_GENRE: &str = "Other";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Book {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,       // external URL, or /static/uploads/... once cached
    pub genre: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub pages: Option<i32>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,       // set at insert, immutable
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub book_id: ObjectId,   // relación N:1 con Book
    pub rating: i32,         // 1..5
    pub text: String,
    pub status: ReviewStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bookmark {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub book_id: ObjectId,
    pub user_id: ObjectId,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Lo que reciben las plantillas por cada libro de una lista.
#[derive(Debug, Serialize, Clone)]
pub struct BookCard {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    pub genre: String,
    pub description: String,
}

impl From<&Book> for BookCard {
    fn from(b: &Book) -> Self {
        BookCard {
            id: b.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: b.title.clone(),
            author: b.author.clone(),
            cover_url: b.cover_url.clone(),
            genre: b.genre.clone().unwrap_or_else(|| OTHER_GENRE.into()),
            description: b.description.clone().unwrap_or_default(),
        }
    }
}
