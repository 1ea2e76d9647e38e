use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use swimcal_common::{Config, Event, EventRecord};

const DEFAULT_TTL_DAYS: i64 = 30;
const TEXT_PREVIEW_CHARS: usize = 100;

/// One persisted cache record: the extraction result for a single
/// (normalized text, config fingerprint) pair, stored as `<key>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub cached_at: DateTime<Utc>,
    pub text_preview: String,
    pub event_count: usize,
    pub config_fingerprint: String,
    pub events: Vec<EventRecord>,
}

/// Point-in-time cache statistics. Entry count and size come from the
/// directory; hit/miss counters belong to this instance only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size_kb: f64,
    pub hits: u64,
    pub misses: u64,
    /// Percent of lookups served from cache (0 when no lookups yet).
    pub hit_rate: f64,
    pub ttl_days: i64,
}

/// Internal lookup outcome. The public `get` collapses everything but
/// `Hit` into `None`; keeping the distinction makes corruption handling
/// observable in tests.
#[derive(Debug)]
enum Lookup {
    Hit(Vec<EventRecord>),
    Miss,
    Corrupt(anyhow::Error),
}

/// Subset of the config that invalidates cached extractions when changed.
/// Field order matches the canonical key-sorted serialization.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    default_title: &'a str,
    locations: BTreeMap<&'a str, &'a str>,
    model: &'a str,
    timezone: &'a str,
}

/// Content-addressed store of extraction results, one JSON file per
/// (text, config) pair, with time-based expiry.
pub struct ExtractionCache {
    cache_dir: PathBuf,
    ttl_days: i64,
    hits: u64,
    misses: u64,
}

impl ExtractionCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_ttl(cache_dir, DEFAULT_TTL_DAYS)
    }

    pub fn with_ttl(cache_dir: impl Into<PathBuf>, ttl_days: i64) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
        Ok(Self {
            cache_dir,
            ttl_days,
            hits: 0,
            misses: 0,
        })
    }

    /// Fingerprint of the config fields that affect extraction output:
    /// canonical key-sorted JSON of `{default_title, locations, model,
    /// timezone}`, SHA-256, first 16 hex chars.
    pub fn config_fingerprint(config: &Config) -> String {
        let input = FingerprintInput {
            default_title: &config.default_event_title,
            locations: config
                .locations
                .iter()
                .map(|(name, loc)| (name.as_str(), loc.address.as_str()))
                .collect(),
            model: &config.model,
            timezone: &config.timezone,
        };
        let json = serde_json::to_string(&input).expect("fingerprint input serializes");
        let digest = hex::encode(Sha256::digest(json.as_bytes()));
        digest[..16].to_string()
    }

    /// Cache key for a (text, config) pair: text is trimmed and
    /// lowercased, joined to the config fingerprint with `"||"`,
    /// SHA-256, first 32 hex chars.
    pub fn cache_key(text: &str, config: &Config) -> String {
        let normalized = text.trim().to_lowercase();
        let combined = format!("{}||{}", normalized, Self::config_fingerprint(config));
        let digest = hex::encode(Sha256::digest(combined.as_bytes()));
        digest[..32].to_string()
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }

    fn is_expired(&self, record: &CacheRecord) -> bool {
        Utc::now() - record.cached_at > Duration::days(self.ttl_days)
    }

    fn lookup(&self, key: &str) -> Lookup {
        let path = self.record_path(key);
        if !path.exists() {
            return Lookup::Miss;
        }

        let record = fs::read_to_string(&path)
            .context("unreadable cache record")
            .and_then(|content| {
                serde_json::from_str::<CacheRecord>(&content).context("unparseable cache record")
            });

        match record {
            Ok(record) if self.is_expired(&record) => {
                let _ = fs::remove_file(&path);
                Lookup::Miss
            }
            Ok(record) => Lookup::Hit(record.events),
            Err(err) => {
                let _ = fs::remove_file(&path);
                Lookup::Corrupt(err)
            }
        }
    }

    /// Cached extraction result for this text and config, if a fresh
    /// record exists. Corrupted and expired records are deleted and
    /// reported as misses. Location names are re-resolved against the
    /// current registry.
    pub fn get(&mut self, text: &str, config: &Config) -> Option<Vec<Event>> {
        let key = Self::cache_key(text, config);
        match self.lookup(&key) {
            Lookup::Hit(records) => {
                self.hits += 1;
                debug!(key, count = records.len(), "Cache hit");
                Some(
                    records
                        .into_iter()
                        .map(|record| record.into_event(&config.locations))
                        .collect(),
                )
            }
            Lookup::Miss => {
                self.misses += 1;
                None
            }
            Lookup::Corrupt(err) => {
                warn!(key, error = %err, "Cache read failed, record deleted");
                self.misses += 1;
                None
            }
        }
    }

    /// Persist an extraction result. Best-effort: write failures are
    /// logged, never raised.
    pub fn set(&self, text: &str, config: &Config, events: &[Event]) {
        let key = Self::cache_key(text, config);
        let record = CacheRecord {
            cached_at: Utc::now(),
            text_preview: text_preview(text),
            event_count: events.len(),
            config_fingerprint: Self::config_fingerprint(config),
            events: events.iter().map(EventRecord::from_event).collect(),
        };

        let result = serde_json::to_string_pretty(&record)
            .context("serialize cache record")
            .and_then(|json| {
                fs::write(self.record_path(&key), json).context("write cache record")
            });

        if let Err(err) = result {
            warn!(key, error = %err, "Cache write failed");
        }
    }

    /// Delete every record and reset the hit/miss counters. Returns the
    /// number of records deleted.
    pub fn clear(&mut self) -> usize {
        let mut count = 0;
        for path in self.record_files() {
            if fs::remove_file(&path).is_ok() {
                count += 1;
            }
        }
        self.hits = 0;
        self.misses = 0;
        count
    }

    /// Sweep the cache directory, deleting expired and unparseable
    /// records. Returns the number deleted.
    pub fn cleanup_expired(&self) -> usize {
        let mut count = 0;
        for path in self.record_files() {
            let keep = fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<CacheRecord>(&content).ok())
                .map(|record| !self.is_expired(&record))
                .unwrap_or(false);
            if !keep && fs::remove_file(&path).is_ok() {
                count += 1;
            }
        }
        count
    }

    pub fn stats(&self) -> CacheStats {
        let files = self.record_files();
        let total_size: u64 = files
            .iter()
            .filter_map(|path| fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum();

        let total_requests = self.hits + self.misses;
        let hit_rate = if total_requests > 0 {
            self.hits as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: files.len(),
            total_size_kb: total_size as f64 / 1024.0,
            hits: self.hits,
            misses: self.misses,
            hit_rate,
            ttl_days: self.ttl_days,
        }
    }

    fn record_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}

/// First 100 characters of the text, with an ellipsis when truncated.
fn text_preview(text: &str) -> String {
    if text.chars().count() > TEXT_PREVIEW_CHARS {
        let truncated: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
