use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use blake3::Hasher;
use reqwest::header::{CACHE_CONTROL, HeaderMap};

const CACHE_LIMIT: usize = 32;

struct CacheEntry {
    key: String,
    body: String,
    expires_at: Instant,
}

/// In-memory store for GET responses the tracking tool marks cacheable.
/// Shared by every scope created from one client.
#[derive(Default)]
pub struct ResponseCache {
    entries: Mutex<Vec<CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let key = Self::compute_key(url);
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|entry| entry.expires_at > now);
        entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.body.clone())
    }

    pub fn insert(&self, url: &str, body: String, max_age: Duration) {
        let key = Self::compute_key(url);
        let mut entries = self.lock();
        entries.retain(|entry| entry.key != key);
        entries.push(CacheEntry {
            key,
            body,
            expires_at: Instant::now() + max_age,
        });

        if entries.len() > CACHE_LIMIT {
            let overflow = entries.len() - CACHE_LIMIT;
            entries.drain(0..overflow);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn compute_key(url: &str) -> String {
        let mut hasher = Hasher::new();
        hasher.update(url.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Freshness lifetime from `Cache-Control`, if the response may be stored.
pub fn cacheable_for(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(CACHE_CONTROL)?.to_str().ok()?;
    let mut max_age = None;
    for directive in value.split(',').map(|d| d.trim().to_ascii_lowercase()) {
        match directive.as_str() {
            "no-store" | "no-cache" | "private" => return None,
            other => {
                if let Some(seconds) = other.strip_prefix("max-age=") {
                    max_age = seconds.trim_matches('"').parse::<u64>().ok();
                }
            }
        }
    }
    max_age.filter(|seconds| *seconds > 0).map(Duration::from_secs)
}
