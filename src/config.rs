use std::env;

pub struct AppConfig {
    pub mongo_uri: Option<String>,
    pub db_name: String,
    pub cache_url: Option<String>,
    pub uploads_dir: String,
    pub static_dir: String,
    pub serve_static_from_app: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignora si no existe .env

        let get = |k: &str, d: &str| env::var(k).unwrap_or_else(|_| d.to_string());

        Self {
            // sin MONGO_URI se usa el catálogo en memoria
            mongo_uri: env::var("MONGO_URI").ok(),
            db_name: get("DB_NAME", "booknook_dev"),
            cache_url: env::var("CACHE_URL").ok(),
            uploads_dir: get("UPLOADS_DIR", "./static/uploads"),
            static_dir: get("STATIC_DIR", "./static"),
            serve_static_from_app: get("SERVE_STATIC", "app") == "app",
        }
    }
}
