// Local session cache: one JSONL file per (season, event, session, driver) key

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_jsonlines::{json_lines, write_json_lines};

use crate::errors::ParabolicaError;
use crate::telemetry::{Sample, SampleSequence, SessionKey};

const CACHE_SUBDIR: &str = "sessions";

/// Where cached sessions live. The fallback directory is used when the
/// preferred location cannot be created or written.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    pub fallback_dir: PathBuf,
}

impl CacheConfig {
    /// Preferred location under the user data dir, system temp as fallback.
    pub fn default_dirs() -> Result<Self, ParabolicaError> {
        let data_dir = dirs::data_dir().ok_or(ParabolicaError::NoDataDir)?;
        Ok(Self {
            cache_dir: data_dir.join("parabolica").join(CACHE_SUBDIR),
            fallback_dir: std::env::temp_dir().join("parabolica").join(CACHE_SUBDIR),
        })
    }

    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            fallback_dir: std::env::temp_dir().join("parabolica").join(CACHE_SUBDIR),
        }
    }
}

/// File-backed telemetry cache. Entries persist until externally removed:
/// historical telemetry never changes for a finished session, so there is no
/// eviction and `put` is an idempotent overwrite.
pub struct TelemetryCache {
    active_dir: PathBuf,
    used_fallback: bool,
}

impl TelemetryCache {
    /// Create the cache, settling on whichever configured directory is
    /// actually writable. Falling back is not an error.
    pub fn new(config: CacheConfig) -> Result<Self, ParabolicaError> {
        if Self::ensure_writable(&config.cache_dir) {
            return Ok(Self {
                active_dir: config.cache_dir,
                used_fallback: false,
            });
        }

        warn!(
            "Cache directory {:?} is not writable, falling back to {:?}",
            config.cache_dir, config.fallback_dir
        );
        if Self::ensure_writable(&config.fallback_dir) {
            return Ok(Self {
                active_dir: config.fallback_dir,
                used_fallback: true,
            });
        }

        Err(ParabolicaError::NoCacheDir)
    }

    pub fn new_default() -> Result<Self, ParabolicaError> {
        Self::new(CacheConfig::default_dirs()?)
    }

    /// The directory entries are actually written to.
    pub fn active_dir(&self) -> &Path {
        &self.active_dir
    }

    /// True when the preferred directory was unusable and the fallback is in effect.
    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    fn ensure_writable(dir: &Path) -> bool {
        if fs::create_dir_all(dir).is_err() {
            return false;
        }
        // Creating the directory is not enough on read-only mounts; probe with
        // a real write.
        let probe = dir.join(".write_probe");
        match fs::write(&probe, b"") {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                true
            }
            Err(_) => false,
        }
    }

    fn entry_path(&self, key: &SessionKey) -> PathBuf {
        self.active_dir.join(format!("{}.jsonl", key.slug()))
    }

    /// Look up a cached session. A missing, unreadable, or corrupt entry is a
    /// miss, never a failure; the caller falls through to the source.
    pub fn get(&self, key: &SessionKey) -> Option<SampleSequence> {
        let path = self.entry_path(key);
        if !path.exists() {
            debug!("Cache miss for {}", key);
            return None;
        }

        let samples = match json_lines(&path) {
            Ok(lines) => match lines.collect::<Result<Vec<Sample>, std::io::Error>>() {
                Ok(samples) => samples,
                Err(e) => {
                    warn!("Corrupt cache entry {:?}, treating as miss: {}", path, e);
                    return None;
                }
            },
            Err(e) => {
                warn!("Unreadable cache entry {:?}, treating as miss: {}", path, e);
                return None;
            }
        };

        match SampleSequence::new(samples) {
            Ok(seq) => {
                info!("Cache hit for {} ({} samples)", key, seq.len());
                Some(seq)
            }
            Err(e) => {
                warn!("Invalid cache entry {:?}, treating as miss: {}", path, e);
                None
            }
        }
    }

    /// Write a session to the cache, creating directories as needed. Writes go
    /// to a temporary file first so a failed write never leaves a partial
    /// entry behind.
    pub fn put(&self, key: &SessionKey, seq: &SampleSequence) -> Result<PathBuf, ParabolicaError> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ParabolicaError::CacheWriteError {
                key: key.slug(),
                source: e,
            })?;
        }

        let tmp_path = path.with_extension("jsonl.tmp");
        write_json_lines(&tmp_path, seq.samples()).map_err(|e| {
            ParabolicaError::CacheWriteError {
                key: key.slug(),
                source: e,
            }
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ParabolicaError::CacheWriteError {
                key: key.slug(),
                source: e,
            }
        })?;

        info!("Cached {} samples for {} at {:?}", seq.len(), key, path);
        Ok(path)
    }
}
