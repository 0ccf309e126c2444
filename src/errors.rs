// Error types for parabolica

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum ParabolicaError {
    // Errors from the telemetry source
    #[snafu(display("No session found for {season} {event} {session_type}"))]
    SessionNotFound {
        season: u16,
        event: String,
        session_type: String,
    },
    #[snafu(display("No telemetry for driver {driver_code} in this session"))]
    DriverNotFound { driver_code: String },
    #[snafu(display("Network error while fetching telemetry: {description}"))]
    NetworkError { description: String },
    #[snafu(display("Session produced no telemetry samples"))]
    EmptyTelemetry,
    #[snafu(display("Telemetry source error: {description}"))]
    TelemetrySourceError { description: String },

    // Errors for the session cache
    #[snafu(display("Error writing cache entry for {key}"))]
    CacheWriteError { key: String, source: io::Error },
    #[snafu(display("No writable cache directory available"))]
    NoCacheDir,

    // Errors for the CSV exporter
    #[snafu(display("Error writing telemetry CSV file"))]
    CsvWriteError { source: csv::Error },
    #[snafu(display("Error parsing telemetry CSV file: {description}"))]
    CsvParseError { description: String },

    // Errors for generated artifacts
    #[snafu(display("Error writing curve geometry file"))]
    CurveWriteError { source: io::Error },

    // Geometry pipeline errors
    #[snafu(display("Not enough points to build a curve (need at least 1)"))]
    InsufficientPoints,
    #[snafu(display("Invalid curve configuration: {field} - {reason}"))]
    InvalidConfig { field: String, reason: String },

    // Background fetch errors
    #[snafu(display("Fetch cancelled by caller"))]
    FetchCancelled,
    #[snafu(display("Error delivering fetch result to caller"))]
    FetchDeliveryError,

    // File and serialization plumbing
    #[snafu(display("Could not find application data directory"))]
    NoDataDir,
    #[snafu(display("Error reading telemetry file"))]
    TelemetryLoaderError { source: io::Error },
    #[snafu(display("Error serializing telemetry data"))]
    TelemetrySerializeError { source: serde_json::Error },
}

impl From<csv::Error> for ParabolicaError {
    fn from(value: csv::Error) -> Self {
        ParabolicaError::CsvWriteError { source: value }
    }
}
