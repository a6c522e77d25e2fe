use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);
const ALLOWED_IMAGE_EXT: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const PUBLIC_PREFIX: &str = "/static/uploads";

#[async_trait]
pub trait CoverFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpCoverFetcher {
    client: reqwest::Client,
}

impl HttpCoverFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("error building HTTP client");
        Self { client }
    }
}

impl Default for HttpCoverFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoverFetcher for HttpCoverFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("cover fetch {url}: status {}", resp.status()));
        }
        let body = resp.bytes().await?;
        if body.is_empty() {
            return Err(anyhow!("cover fetch {url}: empty body"));
        }
        Ok(body.to_vec())
    }
}

/// Downloads external cover images into the uploads directory so they are
/// served locally from then on. Strictly best effort: any failure keeps
/// the original URL and is never surfaced to the list request.
pub struct CoverCache {
    dir: PathBuf,
    fetcher: Box<dyn CoverFetcher>,
}

impl CoverCache {
    pub fn new(dir: impl Into<PathBuf>, fetcher: Box<dyn CoverFetcher>) -> Self {
        Self { dir: dir.into(), fetcher }
    }

    /// If `url` is an external absolute URL, fetch it once and return the
    /// local public path. `None` means "keep whatever reference you had".
    pub async fn localize(&self, url: &str) -> Option<String> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return None;
        }
        let body = match self.fetcher.fetch(url).await {
            Ok(b) => b,
            Err(e) => {
                eprintln!("cover fetch failed: {e}");
                return None;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            eprintln!("cannot create uploads dir {}: {e}", self.dir.display());
            return None;
        }
        let (path, name) = unused_destination(&self.dir, &derive_name(url));
        match std::fs::write(&path, &body) {
            Ok(()) => Some(format!("{PUBLIC_PREFIX}/{name}")),
            Err(e) => {
                eprintln!("cannot write cover {}: {e}", path.display());
                None
            }
        }
    }
}

/// Filename from the URL's last path segment, sanitized, forced to a
/// known image extension.
fn derive_name(url: &str) -> String {
    let tail = url.split(['?', '#']).next().unwrap_or(url);
    let raw = tail.rsplit('/').next().unwrap_or("");
    let mut name: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if name.trim_matches('.').is_empty() {
        name = "cover".to_string();
    }
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_IMAGE_EXT.contains(&ext.as_str()) {
        name.push_str(".jpg");
    }
    name
}

/// Appends _1, _2, ... to the stem until the destination name is unused.
fn unused_destination(dir: &Path, name: &str) -> (PathBuf, String) {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), e.to_string()),
        None => (name.to_string(), "jpg".to_string()),
    };
    let mut candidate = name.to_string();
    let mut path = dir.join(&candidate);
    let mut i = 1;
    while path.exists() {
        candidate = format!("{stem}_{i}.{ext}");
        path = dir.join(&candidate);
        i += 1;
    }
    (path, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_name_keeps_plain_filenames() {
        assert_eq!(derive_name("http://example.com/a.jpg"), "a.jpg");
        assert_eq!(derive_name("https://cdn.example.com/img/book-1.webp"), "book-1.webp");
    }

    #[test]
    fn derive_name_strips_query_and_forces_extension() {
        assert_eq!(derive_name("http://example.com/a.jpg?size=large"), "a.jpg");
        assert_eq!(derive_name("http://example.com/cover.php"), "cover.php.jpg");
        assert_eq!(derive_name("http://example.com/"), "cover.jpg");
    }
}
