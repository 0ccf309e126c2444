// Telemetry source contract and the JSONL replay implementation

use std::fs;
use std::path::PathBuf;

use log::{debug, info};
use serde_jsonlines::json_lines;

use crate::errors::ParabolicaError;
use crate::telemetry::{Sample, SampleSequence, SessionKey};

/// Upstream supplier of raw telemetry samples for a session/driver pair.
///
/// Implementations wrap whatever actually provides the data: a live F1 API
/// client, a recorded session archive, or a test double. A fetch either
/// returns the complete sample sequence for the session or fails; partial
/// sequences are never returned.
pub trait TelemetrySource {
    /// Fetch all samples for the given session key, ordered by time.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the (season, event, session) tuple does
    /// not resolve to a session, `DriverNotFound` if the session exists but
    /// carries no telemetry for the driver, and `NetworkError` for transport
    /// failures.
    fn fetch(&self, key: &SessionKey) -> Result<SampleSequence, ParabolicaError>;
}

/// Replay source backed by a directory of recorded JSONL session files.
///
/// Each session/driver pair lives in `<slug>.jsonl` with one serialized
/// `Sample` per line, the same layout the cache writes. Useful for working
/// offline and for driving the CLI without a live API client.
pub struct JsonlTelemetrySource {
    session_dir: PathBuf,
}

impl JsonlTelemetrySource {
    pub fn new(session_dir: PathBuf) -> Self {
        Self { session_dir }
    }

    fn session_file(&self, key: &SessionKey) -> PathBuf {
        self.session_dir.join(format!("{}.jsonl", key.slug()))
    }

    /// True when the directory holds this exact session (season, event, and
    /// session type) for any driver. Lets us tell a missing session apart
    /// from a missing driver.
    fn session_exists_for_other_driver(&self, key: &SessionKey) -> bool {
        // the slug ends in the driver code, so stripping it leaves the
        // `{season}_{event}_{sessionType}_` prefix shared by all drivers
        let slug = key.slug();
        let prefix = slug
            .strip_suffix(&key.driver_code.to_ascii_lowercase())
            .unwrap_or(&slug);
        let Ok(entries) = fs::read_dir(&self.session_dir) else {
            return false;
        };
        entries.flatten().any(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.starts_with(prefix))
        })
    }
}

impl TelemetrySource for JsonlTelemetrySource {
    fn fetch(&self, key: &SessionKey) -> Result<SampleSequence, ParabolicaError> {
        let file = self.session_file(key);
        debug!("Replaying telemetry from {:?}", file);

        if !file.exists() {
            if self.session_exists_for_other_driver(key) {
                return Err(ParabolicaError::DriverNotFound {
                    driver_code: key.driver_code.clone(),
                });
            }
            return Err(ParabolicaError::SessionNotFound {
                season: key.season,
                event: key.event.clone(),
                session_type: key.session_type.to_string(),
            });
        }

        let samples = json_lines(&file)
            .map_err(|e| ParabolicaError::TelemetryLoaderError { source: e })?
            .collect::<Result<Vec<Sample>, std::io::Error>>()
            .map_err(|e| ParabolicaError::TelemetryLoaderError { source: e })?;

        info!("Replayed {} samples for {}", samples.len(), key);
        SampleSequence::new(samples)
    }
}
