use std::collections::HashSet;

use anyhow::Result;
use chrono::{Duration, Utc};
use dotenvy::dotenv;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::{Sentence, Words};
use fake::faker::name::raw::Name;
use fake::locales::EN;
use fake::Fake;
use mongodb::{
    bson::{self, oid::ObjectId},
    options::ClientOptions,
    Client, Collection,
};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
struct BookDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    title: String,
    author: String,
    cover_url: Option<String>,
    genre: Option<String>,
    description: Option<String>,
    publisher: Option<String>,
    pages: Option<i32>,
    created_at: bson::DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ReviewDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    book_id: ObjectId,
    rating: i32,
    text: String,
    status: String,
    created_at: bson::DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct BookmarkDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    book_id: ObjectId,
    user_id: ObjectId,
    created_at: bson::DateTime,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let uri = std::env::var("MONGO_URI").expect("MONGO_URI not set");
    let db_name = std::env::var("DB_NAME").unwrap_or_else(|_| "booknook_dev".into());

    let mut client_opts = ClientOptions::parse(&uri).await?;
    client_opts.app_name = Some("booknook-seeder".into());
    let client = Client::with_options(client_opts)?;
    let db = client.database(&db_name);

    let books: Collection<BookDoc> = db.collection("books");
    let reviews: Collection<ReviewDoc> = db.collection("reviews");
    let bookmarks: Collection<BookmarkDoc> = db.collection("bookmarks");

    let genres = [
        "Fantasy", "Sci-Fi", "Romance", "Mystery", "History", "Poetry", "Self-help",
    ];
    let statuses = ["approved", "approved", "approved", "pending", "rejected"];

    let mut rng = rand::thread_rng();
    let now = Utc::now();

    // ---- Books: 40 titles spread over the last 120 days ----
    let mut uniques = HashSet::<String>::new();
    let mut book_docs: Vec<BookDoc> = Vec::new();

    while book_docs.len() < 40 {
        let words: Vec<String> = Words(2..5).fake();
        let title = words
            .iter()
            .map(|w| {
                let mut c = w.chars();
                match c.next() {
                    Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        if !uniques.insert(title.clone()) {
            continue; // avoid exact duplicates
        }

        let author: String = Name(EN).fake();
        let description: String = Sentence(8..20).fake();
        let publisher: String = CompanyName().fake();

        // mezcla de portadas externas, locales y faltantes
        let cover_url = match rng.gen_range(0..4) {
            0 => Some(format!("https://picsum.photos/seed/{}/400/600", book_docs.len())),
            1 => None,
            _ => Some(format!("/static/uploads/seed_{}.jpg", book_docs.len())),
        };

        let age_days = rng.gen_range(0..120);
        let created = now - Duration::days(age_days) - Duration::minutes(rng.gen_range(0..1440));

        book_docs.push(BookDoc {
            id: Some(ObjectId::new()),
            title,
            author,
            cover_url,
            genre: if rng.gen_range(0..5) == 0 {
                None
            } else {
                Some(genres.choose(&mut rng).unwrap().to_string())
            },
            description: Some(description),
            publisher: Some(publisher),
            pages: Some(rng.gen_range(80..900)),
            created_at: bson::DateTime::from_chrono(created),
        });
    }

    books.insert_many(&book_docs).await?;
    println!("Inserted {} books", book_docs.len());

    // ---- Reviews: 0..12 per book, timestamps within the last 40 days ----
    let mut review_docs: Vec<ReviewDoc> = Vec::new();
    for book in &book_docs {
        for _ in 0..rng.gen_range(0..12) {
            let text: String = Sentence(6..18).fake();
            let created = now - Duration::days(rng.gen_range(0..40)) - Duration::minutes(rng.gen_range(0..1440));
            review_docs.push(ReviewDoc {
                id: None,
                book_id: book.id.unwrap(),
                rating: rng.gen_range(1..=5),
                text,
                status: statuses.choose(&mut rng).unwrap().to_string(),
                created_at: bson::DateTime::from_chrono(created),
            });
        }
    }
    if !review_docs.is_empty() {
        reviews.insert_many(&review_docs).await?;
    }
    println!("Inserted {} reviews", review_docs.len());

    // ---- Bookmarks: 0..20 per book, within the last 60 days ----
    let mut bookmark_docs: Vec<BookmarkDoc> = Vec::new();
    for book in &book_docs {
        for _ in 0..rng.gen_range(0..20) {
            let created = now - Duration::days(rng.gen_range(0..60)) - Duration::minutes(rng.gen_range(0..1440));
            bookmark_docs.push(BookmarkDoc {
                id: None,
                book_id: book.id.unwrap(),
                user_id: ObjectId::new(),
                created_at: bson::DateTime::from_chrono(created),
            });
        }
    }
    if !bookmark_docs.is_empty() {
        bookmarks.insert_many(&bookmark_docs).await?;
    }
    println!("Inserted {} bookmarks", bookmark_docs.len());

    Ok(())
}
