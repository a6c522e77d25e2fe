use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mongodb::{bson::doc, options::ClientOptions, Client, Database, IndexModel};

use crate::cache::{Cache, NoopCache};
use crate::config::AppConfig;
use crate::covers::{CoverCache, HttpCoverFetcher};
use crate::repo::{BookStore, EngagementLog, MemoryCatalog, MongoCatalog};

pub struct AppState {
    pub store: Arc<dyn BookStore>,
    pub engagement: Arc<dyn EngagementLog>,
    pub covers: CoverCache,
    pub cache: Arc<dyn Cache>,
}

impl AppState {
    pub const GENRES_CACHE_KEY: &'static str = "home:genres";
    const GENRES_TTL: Duration = Duration::from_secs(300);

    /// Genre labels for the filter menu, cached briefly. The ranking
    /// lists themselves are never cached.
    pub async fn genres_cached(&self) -> Result<Vec<String>> {
        if let Some(raw) = self.cache.get(Self::GENRES_CACHE_KEY).await {
            if let Ok(genres) = serde_json::from_slice::<Vec<String>>(&raw) {
                return Ok(genres);
            }
        }
        let genres = self.store.distinct_genres().await?;
        if let Ok(raw) = serde_json::to_vec(&genres) {
            self.cache
                .set(Self::GENRES_CACHE_KEY, &raw, Some(Self::GENRES_TTL))
                .await;
        }
        Ok(genres)
    }
}

pub async fn ensure_indexes(db: &Database) -> mongodb::error::Result<()> {
    // ========== BOOKS ==========
    let books = db.collection::<mongodb::bson::Document>("books");

    // created_at (lista "Latest" y desempates)
    let created_idx = IndexModel::builder()
        .keys(doc! { "created_at": -1 })
        .build();
    let _ = books.create_index(created_idx).await?;

    // genre (menú de filtros y browse)
    let genre_idx = IndexModel::builder().keys(doc! { "genre": 1 }).build();
    let _ = books.create_index(genre_idx).await?;

    // ========== REVIEWS ==========
    let reviews = db.collection::<mongodb::bson::Document>("reviews");
    let reviews_idx = IndexModel::builder()
        .keys(doc! { "book_id": 1, "status": 1, "created_at": -1 })
        .build();
    let _ = reviews.create_index(reviews_idx).await?;

    // conteos semanales (status + ventana)
    let weekly_idx = IndexModel::builder()
        .keys(doc! { "status": 1, "created_at": -1 })
        .build();
    let _ = reviews.create_index(weekly_idx).await?;

    // ========== BOOKMARKS ==========
    let bookmarks = db.collection::<mongodb::bson::Document>("bookmarks");
    let bookmarks_idx = IndexModel::builder()
        .keys(doc! { "book_id": 1, "created_at": -1 })
        .build();
    let _ = bookmarks.create_index(bookmarks_idx).await?;

    Ok(())
}

pub async fn init_state(cfg: &AppConfig) -> AppState {
    let (store, engagement): (Arc<dyn BookStore>, Arc<dyn EngagementLog>) = match &cfg.mongo_uri {
        Some(uri) => {
            let mut opts = ClientOptions::parse(uri).await.expect("Invalid MONGO_URI");
            opts.app_name = Some("booknook".into());

            let client = Client::with_options(opts).expect("Cannot create Mongo client");
            let db = client.database(&cfg.db_name);

            if let Err(e) = ensure_indexes(&db).await {
                eprintln!("Failed to create indexes: {e}");
            }

            let catalog = Arc::new(MongoCatalog::new(db));
            (catalog.clone() as Arc<dyn BookStore>, catalog as Arc<dyn EngagementLog>)
        }
        None => {
            eprintln!("MONGO_URI not set; using the in-memory catalog");
            let catalog = Arc::new(MemoryCatalog::new());
            (catalog.clone() as Arc<dyn BookStore>, catalog as Arc<dyn EngagementLog>)
        }
    };

    let cache = build_cache(cfg).await;
    let covers = CoverCache::new(&cfg.uploads_dir, Box::new(HttpCoverFetcher::new()));

    AppState { store, engagement, covers, cache }
}

async fn build_cache(cfg: &AppConfig) -> Arc<dyn Cache> {
    if let Some(url) = cfg.cache_url.as_deref() {
        #[cfg(feature = "redis-cache")]
        match crate::cache::redis::RedisCache::new(url).await {
            Ok(c) => return Arc::new(c),
            Err(e) => eprintln!("Redis cache unavailable ({e}); using no-op cache"),
        }
        #[cfg(not(feature = "redis-cache"))]
        eprintln!("CACHE_URL set ({url}) but the redis-cache feature is disabled");
    }
    Arc::new(NoopCache)
}
