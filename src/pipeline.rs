// End-to-end pipeline: source/cache -> CSV side channel -> normalizer ->
// curve builder. Each invocation operates on its own session key; the cache
// is the only shared resource.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::cache::TelemetryCache;
use crate::errors::ParabolicaError;
use crate::export;
use crate::geometry::{CurveBuilder, CurveConfig, Normalizer, TrackCurve};
use crate::telemetry::{SampleSequence, SessionKey, TelemetrySource};

pub struct TrackPipeline<S: TelemetrySource> {
    source: S,
    cache: TelemetryCache,
    normalizer: Normalizer,
    builder: CurveBuilder,
}

impl<S: TelemetrySource> TrackPipeline<S> {
    pub fn new(source: S, cache: TelemetryCache) -> Self {
        Self {
            source,
            cache,
            normalizer: Normalizer::new(),
            builder: CurveBuilder::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Fetch the sample sequence for a session, cache-first. A hit bypasses
    /// the source entirely; a successful source fetch is written back before
    /// returning. Either a complete sequence comes back or an error does.
    pub fn fetch(&self, key: &SessionKey) -> Result<SampleSequence, ParabolicaError> {
        if let Some(seq) = self.cache.get(key) {
            return Ok(seq);
        }

        let seq = self.source.fetch(key)?;
        self.cache.put(key, &seq)?;
        Ok(seq)
    }

    /// Write the raw (pre-normalization) samples to
    /// `<dir>/telemetry_<slug>.csv` and return the path.
    pub fn export_csv(
        &self,
        key: &SessionKey,
        seq: &SampleSequence,
        dir: &Path,
    ) -> Result<PathBuf, ParabolicaError> {
        fs::create_dir_all(dir).map_err(|e| ParabolicaError::CsvWriteError {
            source: csv::Error::from(e),
        })?;
        let path = dir.join(format!("telemetry_{}.csv", key.slug()));
        export::write_csv(&path, seq)?;
        Ok(path)
    }

    /// Normalize the samples and build the curve named
    /// `<event>_<sessionType>_<driverCode>`.
    pub fn build_curve(
        &self,
        key: &SessionKey,
        seq: &SampleSequence,
        config: &CurveConfig,
    ) -> Result<TrackCurve, ParabolicaError> {
        let track = self.normalizer.normalize(seq, config)?;
        let curve = self.builder.build(key.curve_name(), &track, config)?;
        info!(
            "Pipeline complete for {}: {} control points, cyclic={}",
            key,
            curve.control_points.len(),
            curve.cyclic
        );
        Ok(curve)
    }

    pub fn cache(&self) -> &TelemetryCache {
        &self.cache
    }
}
