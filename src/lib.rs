// Library interface for parabolica
// This allows integration tests to access internal modules

pub mod cache;
pub mod errors;
pub mod export;
pub mod geometry;
pub mod pipeline;
pub mod telemetry;

// Re-export commonly used types
pub use cache::{CacheConfig, TelemetryCache};
pub use errors::ParabolicaError;
pub use geometry::{CurveBuilder, CurveConfig, CurveType, NormalizedPoint, Normalizer, TrackCurve};
pub use pipeline::TrackPipeline;
pub use telemetry::{Sample, SampleSequence, SessionKey, SessionType, TelemetrySource};
