pub(crate) mod curve;
pub(crate) mod normalizer;

use serde::{Deserialize, Serialize};

pub use curve::{ControlPoint, CurveBuilder, TrackCurve};
pub use normalizer::{NormalizedTrack, Normalizer, Transform};

use crate::errors::ParabolicaError;

/// A 3D position in normalized output space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

/// One normalized telemetry point: recentered, scaled, with optional speed
/// carried through for color mapping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub position: Vec3,
    pub speed: Option<f64>,
}

impl NormalizedPoint {
    pub fn new(position: Vec3, speed: Option<f64>) -> Self {
        Self { position, speed }
    }
}

/// Planar bounding box over raw (x, y); elevation is tracked independently.
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Planar diagonal, the reference length for the closure heuristic.
    pub fn diagonal(&self) -> f64 {
        (self.width().powi(2) + self.height().powi(2)).sqrt()
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
            (self.min_z + self.max_z) / 2.0,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Parametric representation used for the generated curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum CurveType {
    /// Uniform cubic B-spline with unit weights (smoother)
    Nurbs,
    /// Piecewise cubic Bezier with Catmull-Rom tangents
    Bezier,
}

const MIN_SCALE_FACTOR: f64 = 1.0;
const MAX_SCALE_FACTOR: f64 = 100.0;

/// Configuration for the normalize + build pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurveConfig {
    /// Multiplies every recentered coordinate, 1.0 to 100.0
    pub scale_factor: f64,
    pub curve_type: CurveType,
    /// Bevel radius stored on the curve, not baked into geometry
    pub thickness: f64,
    /// Interpolation subdivisions per segment when evaluating the curve
    pub resolution: u32,
    /// Carry per-point speed through for downstream color mapping
    pub include_speed: bool,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            scale_factor: 10.0,
            curve_type: CurveType::Nurbs,
            thickness: 0.05,
            resolution: 12,
            include_speed: false,
        }
    }
}

impl CurveConfig {
    /// Validate before any pipeline stage runs; a bad config never produces
    /// a partial result.
    pub fn validate(&self) -> Result<(), ParabolicaError> {
        if !self.scale_factor.is_finite()
            || self.scale_factor < MIN_SCALE_FACTOR
            || self.scale_factor > MAX_SCALE_FACTOR
        {
            return Err(ParabolicaError::InvalidConfig {
                field: "scale_factor".to_string(),
                reason: format!(
                    "{} is outside [{}, {}]",
                    self.scale_factor, MIN_SCALE_FACTOR, MAX_SCALE_FACTOR
                ),
            });
        }
        if !self.thickness.is_finite() || self.thickness <= 0.0 {
            return Err(ParabolicaError::InvalidConfig {
                field: "thickness".to_string(),
                reason: format!("{} must be positive", self.thickness),
            });
        }
        if self.resolution == 0 {
            return Err(ParabolicaError::InvalidConfig {
                field: "resolution".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        Ok(())
    }
}
