use crate::cache::{ResultCacheKey, ResultCacheValue};
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Storage abstraction for caching extraction results
pub trait ResultStorage {
    fn get_result(&self, cache_key: &ResultCacheKey) -> Result<Option<ResultCacheValue>>;
    fn store_result(&self, cache_key: &ResultCacheKey, cache_value: &ResultCacheValue) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: String,
}

impl FileStorage {
    pub fn new(cache_dir: &str) -> Result<Self> {
        fs::create_dir_all(format!("{cache_dir}/results"))?;

        Ok(Self {
            cache_dir: cache_dir.to_string(),
        })
    }

    fn result_path(&self, cache_key: &ResultCacheKey) -> String {
        format!("{}/results/{}.json", self.cache_dir, cache_key.file_stem())
    }
}

impl ResultStorage for FileStorage {
    fn get_result(&self, cache_key: &ResultCacheKey) -> Result<Option<ResultCacheValue>> {
        let path = self.result_path(cache_key);
        if Path::new(&path).exists() {
            let json_str = fs::read_to_string(&path)?;
            let cache_value: ResultCacheValue = serde_json::from_str(&json_str)
                .map_err(|e| anyhow!("Failed to deserialize cached extraction: {}", e))?;
            if !cache_value.answers(cache_key) {
                tracing::debug!("ignoring stale cache entry {}", path);
                return Ok(None);
            }
            Ok(Some(cache_value))
        } else {
            Ok(None)
        }
    }

    fn store_result(&self, cache_key: &ResultCacheKey, cache_value: &ResultCacheValue) -> Result<()> {
        let path = self.result_path(cache_key);
        let json_str = serde_json::to_string_pretty(cache_value)
            .map_err(|e| anyhow!("Failed to serialize extraction for cache: {}", e))?;
        fs::write(path, json_str)?;
        Ok(())
    }
}

/// Hash the full document content
pub fn calculate_document_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.len().to_le_bytes());
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Calculate hash for a layout profile (part of the cache key)
pub fn calculate_profile_hash<T: serde::Serialize>(profile: &T) -> Result<String> {
    let profile_json = serde_json::to_string(profile)
        .map_err(|e| anyhow!("Failed to serialize profile for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(profile_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// No-op storage implementation that disables all caching
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl ResultStorage for NoOpStorage {
    fn get_result(&self, _cache_key: &ResultCacheKey) -> Result<Option<ResultCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_result(&self, _cache_key: &ResultCacheKey, _cache_value: &ResultCacheValue) -> Result<()> {
        Ok(()) // No-op
    }
}
