pub(crate) mod fetch;
pub(crate) mod source;

use serde::{Deserialize, Serialize};

pub use fetch::{FetchHandle, FetchOutcome, fetch_in_background};
pub use source::{JsonlTelemetrySource, TelemetrySource};

use crate::errors::ParabolicaError;

/// One timestamped GPS + speed reading from a car during a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds from the start of the lap/session
    pub time: f64,
    /// Planar position in source units (FastF1 uses decimeters)
    pub x: f64,
    pub y: f64,
    /// Elevation, missing on flat-track data feeds
    pub z: Option<f64>,
    /// Speed in source units (km/h), not reported by every feed
    pub speed: Option<f64>,
}

impl Sample {
    pub fn new(time: f64, x: f64, y: f64) -> Self {
        Self {
            time,
            x,
            y,
            z: None,
            speed: None,
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Elevation with the flat-track default applied.
    pub fn z_or_flat(&self) -> f64 {
        self.z.unwrap_or(0.)
    }
}

/// Ordered telemetry samples for one session/driver. Never empty: a fetch
/// that yields no samples fails with `EmptyTelemetry` instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleSequence {
    samples: Vec<Sample>,
}

impl SampleSequence {
    pub fn new(samples: Vec<Sample>) -> Result<Self, ParabolicaError> {
        if samples.is_empty() {
            return Err(ParabolicaError::EmptyTelemetry);
        }
        // time starts at or after zero and never goes backwards
        let mut previous_time = 0.0;
        for sample in &samples {
            if !sample.time.is_finite() || !sample.x.is_finite() || !sample.y.is_finite() {
                return Err(ParabolicaError::TelemetrySourceError {
                    description: format!(
                        "non-finite sample at t={}: ({}, {})",
                        sample.time, sample.x, sample.y
                    ),
                });
            }
            if sample.time < previous_time {
                return Err(ParabolicaError::TelemetrySourceError {
                    description: format!(
                        "sample times out of order: {} after {}",
                        sample.time, previous_time
                    ),
                });
            }
            previous_time = sample.time;
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

/// One practice/qualifying/race segment of a race weekend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum SessionType {
    FP1,
    FP2,
    FP3,
    Qualifying,
    SprintQualifying,
    SprintRace,
    Race,
}

impl SessionType {
    /// Short code used in file names and curve names
    pub fn code(&self) -> &'static str {
        match self {
            SessionType::FP1 => "FP1",
            SessionType::FP2 => "FP2",
            SessionType::FP3 => "FP3",
            SessionType::Qualifying => "Q",
            SessionType::SprintQualifying => "SQ",
            SessionType::SprintRace => "SR",
            SessionType::Race => "R",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

const FIRST_F1_SEASON: u16 = 1950;

/// Identifies one (season, event, session, driver) telemetry fetch. Used as
/// the cache lookup key and for CSV/curve name derivation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub season: u16,
    pub event: String,
    pub session_type: SessionType,
    pub driver_code: String,
}

impl SessionKey {
    pub fn new(
        season: u16,
        event: impl Into<String>,
        session_type: SessionType,
        driver_code: impl Into<String>,
    ) -> Result<Self, ParabolicaError> {
        let event = event.into();
        let driver_code: String = driver_code.into();

        if season < FIRST_F1_SEASON {
            return Err(ParabolicaError::InvalidConfig {
                field: "season".to_string(),
                reason: format!("season {} predates the first F1 season (1950)", season),
            });
        }
        if event.trim().is_empty() {
            return Err(ParabolicaError::InvalidConfig {
                field: "event".to_string(),
                reason: "event name cannot be empty".to_string(),
            });
        }
        if driver_code.len() != 3 || !driver_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ParabolicaError::InvalidConfig {
                field: "driver_code".to_string(),
                reason: format!("'{}' is not a 3-letter driver code", driver_code),
            });
        }

        Ok(Self {
            season,
            event,
            session_type,
            driver_code: driver_code.to_ascii_uppercase(),
        })
    }

    /// Filesystem-safe identifier for cache entries and CSV files
    pub fn slug(&self) -> String {
        let event: String = self
            .event
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!(
            "{}_{}_{}_{}",
            self.season,
            event,
            self.session_type.code().to_lowercase(),
            self.driver_code.to_lowercase()
        )
    }

    /// Name for the generated curve object: `<event>_<sessionType>_<driverCode>`
    pub fn curve_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.event,
            self.session_type.code(),
            self.driver_code
        )
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.season, self.event, self.session_type, self.driver_code
        )
    }
}
