// Coordinate normalizer: recenters raw telemetry around the bounding-box
// midpoint, applies the configured scale, and closes the loop on circuits
// whose start and finish coincide

use log::{debug, info};

use crate::errors::ParabolicaError;
use crate::geometry::{BoundingBox, CurveConfig, NormalizedPoint, Vec3};
use crate::telemetry::SampleSequence;

/// Share of the normalized bounding-box diagonal under which the first and
/// last points count as coincident. Tunable; real circuits end within a
/// fraction of a percent, point-to-point courses end far apart.
pub const DEFAULT_CLOSURE_THRESHOLD_PCT: f64 = 0.02;

/// The offset and scale actually applied, reported alongside the points so
/// callers can map other data into the same space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub offset: Vec3,
    pub scale: f64,
}

impl Transform {
    pub fn apply(&self, x: f64, y: f64, z: f64) -> Vec3 {
        Vec3::new(
            (x + self.offset.x) * self.scale,
            (y + self.offset.y) * self.scale,
            (z + self.offset.z) * self.scale,
        )
    }
}

/// Normalizer output: the ordered points, the transform that produced them,
/// and whether the closure heuristic fired.
#[derive(Clone, Debug)]
pub struct NormalizedTrack {
    pub points: Vec<NormalizedPoint>,
    pub transform: Transform,
    pub closed: bool,
}

pub struct Normalizer {
    closure_threshold_pct: f64,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            closure_threshold_pct: DEFAULT_CLOSURE_THRESHOLD_PCT,
        }
    }

    pub fn with_closure_threshold(closure_threshold_pct: f64) -> Self {
        Self {
            closure_threshold_pct,
        }
    }

    /// Normalize a sample sequence into output space.
    ///
    /// Output length equals input length, plus one iff the closure heuristic
    /// fires: a closed circuit gets a copy of its first point appended so the
    /// curve builder closes the loop visually. A single sample yields a single
    /// point and never closes.
    pub fn normalize(
        &self,
        seq: &SampleSequence,
        config: &CurveConfig,
    ) -> Result<NormalizedTrack, ParabolicaError> {
        config.validate()?;

        let mut bbox = BoundingBox::new();
        for sample in seq.iter() {
            bbox.update(sample.x, sample.y, sample.z_or_flat());
        }

        let center = bbox.center();
        let transform = Transform {
            offset: center.scale(-1.0),
            scale: config.scale_factor,
        };
        debug!(
            "Normalizing {} samples, center ({:.2}, {:.2}, {:.2}), scale {}",
            seq.len(),
            center.x,
            center.y,
            center.z,
            config.scale_factor
        );

        let mut points: Vec<NormalizedPoint> = seq
            .iter()
            .map(|sample| {
                let position = transform.apply(sample.x, sample.y, sample.z_or_flat());
                let speed = if config.include_speed {
                    sample.speed
                } else {
                    None
                };
                NormalizedPoint::new(position, speed)
            })
            .collect();

        let closed = self.detect_closure(&points, &bbox, config.scale_factor);
        if closed {
            // closing the loop visually: the appended point is an exact copy
            points.push(points[0]);
        }

        info!(
            "Normalized {} points ({})",
            points.len(),
            if closed { "closed circuit" } else { "open track" }
        );
        Ok(NormalizedTrack {
            points,
            transform,
            closed,
        })
    }

    fn detect_closure(
        &self,
        points: &[NormalizedPoint],
        bbox: &BoundingBox,
        scale: f64,
    ) -> bool {
        if points.len() < 2 {
            return false;
        }
        let diagonal = bbox.diagonal() * scale;
        if diagonal <= 0.0 {
            return false;
        }
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return false;
        };
        let gap = first.position.distance(&last.position);
        debug!(
            "Closure check: gap {:.3} vs threshold {:.3} ({}% of diagonal {:.3})",
            gap,
            diagonal * self.closure_threshold_pct,
            self.closure_threshold_pct * 100.0,
            diagonal
        );
        gap < diagonal * self.closure_threshold_pct
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
