//! Offline copy of the day's questions.
//!
//! One entry lives under [`STORAGE_KEY`] and every save replaces it. Entries expire after
//! [`CACHE_TTL_DAYS`]. This cache is an accelerator, not a system of record: reads turn every
//! storage problem into "nothing cached" and log it, only writes report errors.

use chrono::{DateTime, Duration, Utc};
use drill_content::QuestionRecord;
use satchel::{StorageBackend, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::Clock;

pub const STORAGE_KEY: &str = "cache";
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
pub const CACHE_TTL_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("cache entry was written by schema version {0}, newer than this build")]
    FutureSchema(u32),
    #[error("cache entry is malformed: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub questions: Vec<QuestionRecord>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub cached_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub schema_version: u32,
}

impl CacheEntry {
    fn new(questions: Vec<QuestionRecord>, now: DateTime<Utc>) -> Self {
        Self {
            questions,
            cached_at: now,
            expires_at: now + ttl(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, tsify::Tsify, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[tsify(type = "number")]
    pub cached_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[tsify(type = "number")]
    pub expires_at: DateTime<Utc>,
    pub question_count: usize,
    /// The version the entry was written with, before any migration.
    pub schema_version: u32,
}

fn ttl() -> Duration {
    Duration::days(CACHE_TTL_DAYS)
}

/// An entry as read from storage, already brought up to the current schema.
struct StoredEntry {
    entry: CacheEntry,
    stored_version: u32,
    migrated: bool,
}

pub struct OfflineQuestionCache<B, C> {
    backend: B,
    clock: C,
}

impl<B: StorageBackend, C: Clock> OfflineQuestionCache<B, C> {
    pub fn new(backend: B, clock: C) -> Self {
        Self { backend, clock }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_schema_version(&self) -> u32 {
        CURRENT_SCHEMA_VERSION
    }

    pub async fn save(&self, questions: &[QuestionRecord]) -> Result<(), CacheError> {
        self.save_at(questions, self.clock.now()).await
    }

    /// Replace the cached entry. On failure the previous entry is still there.
    pub async fn save_at(
        &self,
        questions: &[QuestionRecord],
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry::new(questions.to_vec(), now);
        satchel::put_json(&self.backend, STORAGE_KEY, &entry)
            .await
            .inspect_err(|e| log::error!("Failed to save {} questions to cache: {e}", questions.len()))?;
        log::info!("Cached {} questions until {}", questions.len(), entry.expires_at);
        Ok(())
    }

    /// The cached questions, or nothing if there is no fresh entry.
    ///
    /// An expired entry is deleted on the way out. If that deletion fails it is logged and
    /// retried on the next load.
    pub async fn load(&self) -> Vec<QuestionRecord> {
        let now = self.clock.now();
        let stored = match self.read_entry().await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Vec::new(),
            Err(CacheError::FutureSchema(version)) => {
                log::warn!("Ignoring cache entry from schema version {version}");
                return Vec::new();
            }
            Err(CacheError::Storage(e)) if e.is_transient() => {
                log::warn!("Question cache unavailable: {e}");
                return Vec::new();
            }
            Err(e) => {
                log::error!("Failed to read question cache: {e}");
                return Vec::new();
            }
        };

        if stored.entry.is_expired(now) {
            log::info!("Question cache expired at {}", stored.entry.expires_at);
            self.remove_best_effort().await;
            return Vec::new();
        }

        stored.entry.questions
    }

    /// Metadata of the stored entry, even if it has expired.
    pub async fn info(&self) -> Option<CacheInfo> {
        match self.read_entry().await {
            Ok(Some(stored)) => Some(CacheInfo {
                cached_at: stored.entry.cached_at,
                expires_at: stored.entry.expires_at,
                question_count: stored.entry.questions.len(),
                schema_version: stored.stored_version,
            }),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to read question cache info: {e}");
                None
            }
        }
    }

    pub async fn clear_expired(&self) {
        let now = self.clock.now();
        match self.read_entry().await {
            Ok(Some(stored)) if stored.entry.is_expired(now) => self.remove_best_effort().await,
            Ok(_) => {}
            Err(e) => log::warn!("Failed to check question cache expiry: {e}"),
        }
    }

    pub async fn clear_all(&self) -> Result<(), CacheError> {
        self.backend
            .remove(STORAGE_KEY)
            .await
            .inspect_err(|e| log::error!("Failed to clear question cache: {e}"))?;
        Ok(())
    }

    /// Rewrite an entry from an older schema in the current one, keeping its timestamps.
    /// Returns whether anything was written.
    pub async fn migrate_if_needed(&self) -> Result<bool, CacheError> {
        let stored = match self.read_entry().await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(false),
            Err(CacheError::FutureSchema(version)) => {
                log::warn!("Not migrating cache entry from newer schema version {version}");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if !stored.migrated {
            return Ok(false);
        }

        satchel::put_json(&self.backend, STORAGE_KEY, &stored.entry).await?;
        log::info!(
            "Migrated question cache from schema version {} to {CURRENT_SCHEMA_VERSION}",
            stored.stored_version
        );
        Ok(true)
    }

    async fn read_entry(&self) -> Result<Option<StoredEntry>, CacheError> {
        let Some(value) = satchel::get_json_value(&self.backend, STORAGE_KEY).await? else {
            return Ok(None);
        };
        migrate(value).map(Some)
    }

    async fn remove_best_effort(&self) {
        if let Err(e) = self.backend.remove(STORAGE_KEY).await {
            log::warn!("Failed to remove expired question cache: {e}");
        }
    }
}

/// Bring a stored entry up to [`CURRENT_SCHEMA_VERSION`].
///
/// Entries without `schemaVersion` predate versioning and count as version 0. Fields added since
/// (`expiresAt` on the entry, `explanation` and `tags` on questions) get their defaults. Questions
/// that still don't parse are dropped.
fn migrate(value: Value) -> Result<StoredEntry, CacheError> {
    let Value::Object(mut object) = value else {
        return Err(CacheError::Malformed("entry is not an object".to_string()));
    };

    let stored_version = match object.get("schemaVersion") {
        None => 0,
        Some(version) => version
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| CacheError::Malformed(format!("bad schemaVersion {version}")))?,
    };
    if stored_version > CURRENT_SCHEMA_VERSION {
        return Err(CacheError::FutureSchema(stored_version));
    }
    let mut migrated = stored_version < CURRENT_SCHEMA_VERSION;

    let cached_at = object
        .get("cachedAt")
        .and_then(Value::as_i64)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| CacheError::Malformed("missing cachedAt".to_string()))?;
    let expires_at = match object.get("expiresAt").and_then(Value::as_i64) {
        Some(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| CacheError::Malformed(format!("bad expiresAt {ms}")))?,
        None => {
            migrated = true;
            cached_at + ttl()
        }
    };

    let raw_questions = match object.remove("questions") {
        Some(Value::Array(questions)) => questions,
        Some(_) => return Err(CacheError::Malformed("questions is not a list".to_string())),
        None => Vec::new(),
    };

    let mut questions = Vec::with_capacity(raw_questions.len());
    for mut raw in raw_questions {
        if let Value::Object(fields) = &mut raw {
            for (field, default) in [("explanation", Value::from("")), ("tags", Value::Array(vec![]))] {
                // null counts as missing
                if matches!(fields.get(field), None | Some(Value::Null)) {
                    fields.insert(field.to_string(), default);
                    migrated = true;
                }
            }
        }
        match serde_json::from_value::<QuestionRecord>(raw) {
            Ok(question) => questions.push(question),
            Err(e) => {
                log::warn!("Dropping cached question that no longer parses: {e}");
                migrated = true;
            }
        }
    }

    Ok(StoredEntry {
        entry: CacheEntry {
            questions,
            cached_at,
            expires_at,
            schema_version: CURRENT_SCHEMA_VERSION,
        },
        stored_version,
        migrated,
    })
}
