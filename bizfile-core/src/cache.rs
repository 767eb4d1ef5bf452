use crate::config::LayoutProfile;
use crate::storage::{calculate_document_hash, calculate_profile_hash};
use crate::types::{ExtractionResult, SCHEMA_VERSION};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Bump when walking or normalization behaviour changes; older cache
/// entries then stop matching.
pub const EXTRACTION_VERSION: &str = "1.0.0";

/// Identity of one extraction: which document, under which profile, by
/// which extractor.
///
/// The profile name is kept in the clear so cache entries can be told apart
/// per profile; the profile hash catches edits that keep the name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResultCacheKey {
    pub profile_name: String,
    pub profile_hash: String,
    pub document_hash: String,
    pub extraction_version: String,
}

impl ResultCacheKey {
    pub fn new(profile_name: &str, profile_hash: String, document_hash: String) -> Self {
        Self {
            profile_name: profile_name.to_string(),
            profile_hash,
            document_hash,
            extraction_version: EXTRACTION_VERSION.to_string(),
        }
    }

    /// Key for `content` extracted with `profile`.
    pub fn for_document(content: &[u8], profile: &LayoutProfile) -> Result<Self> {
        Ok(Self::new(
            &profile.name,
            calculate_profile_hash(profile)?,
            calculate_document_hash(content),
        ))
    }

    /// File-name-safe stem: the profile name followed by a digest of the whole key.
    pub fn file_stem(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            &self.profile_name,
            &self.profile_hash,
            &self.document_hash,
            &self.extraction_version,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let digest = format!("{:x}", hasher.finalize());

        let profile: String = self
            .profile_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}-{}", profile, &digest[..32])
    }
}

/// A stored extraction with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCacheValue {
    pub key: ResultCacheKey,
    pub result: ExtractionResult,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
}

impl ResultCacheValue {
    pub fn new(key: ResultCacheKey, result: ExtractionResult, processing_time_ms: u64) -> Self {
        Self {
            key,
            result,
            created_at: Utc::now(),
            processing_time_ms,
        }
    }

    /// True when this entry was stored under `key` with the current output schema.
    pub fn answers(&self, key: &ResultCacheKey) -> bool {
        &self.key == key
            && self.result.schema_version == SCHEMA_VERSION
            && self.result.profile == key.profile_name
    }
}
