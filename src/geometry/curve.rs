// Curve builder: turns a normalized point sequence into a smooth parametric
// curve (clamped uniform B-spline or piecewise Bezier with Catmull-Rom
// tangents) ready for the presentation layer

use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::ParabolicaError;
use crate::geometry::{CurveConfig, CurveType, NormalizedPoint, Vec3};
use crate::geometry::normalizer::NormalizedTrack;

const MAX_NURBS_DEGREE: usize = 3;

/// One control point of the generated curve. Bezier curves carry per-point
/// handles; NURBS control points are bare positions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub position: Vec3,
    pub handle_left: Option<Vec3>,
    pub handle_right: Option<Vec3>,
}

/// Output geometry handed to the presentation layer. The control
/// representation is exact; `evaluate` discretizes on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackCurve {
    /// `<event>_<sessionType>_<driverCode>`
    pub name: String,
    pub curve_type: CurveType,
    /// Bevel radius applied along the curve when rendered, not baked into
    /// the geometry
    pub thickness: f64,
    /// Evaluated points exported per segment
    pub resolution: u32,
    /// Loop the curve: set when the normalizer detected a closed circuit
    pub cyclic: bool,
    pub control_points: Vec<ControlPoint>,
    /// Spline degree after clamping; only set for NURBS curves
    pub nurbs_degree: Option<usize>,
    /// Per-control-point speed for color mapping, parallel to
    /// `control_points`; the palette itself is the renderer's concern
    pub speeds: Option<Vec<f64>>,
}

pub struct CurveBuilder;

impl CurveBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a curve through every normalized point, in order. The builder
    /// never fabricates points: control count always equals the
    /// closure-adjusted input count.
    pub fn build(
        &self,
        name: impl Into<String>,
        track: &NormalizedTrack,
        config: &CurveConfig,
    ) -> Result<TrackCurve, ParabolicaError> {
        config.validate()?;
        if track.points.is_empty() {
            return Err(ParabolicaError::InsufficientPoints);
        }

        let name = name.into();
        let control_points = match config.curve_type {
            CurveType::Bezier => bezier_control_points(&track.points, track.closed),
            CurveType::Nurbs => track
                .points
                .iter()
                .map(|p| ControlPoint {
                    position: p.position,
                    handle_left: None,
                    handle_right: None,
                })
                .collect(),
        };

        let nurbs_degree = match config.curve_type {
            CurveType::Nurbs => Some(MAX_NURBS_DEGREE.min(track.points.len() - 1)),
            CurveType::Bezier => None,
        };

        let speeds = if config.include_speed {
            let speeds = track
                .points
                .iter()
                .map(|p| p.speed)
                .collect::<Option<Vec<f64>>>();
            // the attribute is column-level: any point without a speed drops
            // the whole column
            if speeds.is_none() {
                warn!(
                    "Speed attribute requested for '{}' but not every point carries one, omitting it",
                    name
                );
            }
            speeds
        } else {
            None
        };

        info!(
            "Built {:?} curve '{}' with {} control points",
            config.curve_type,
            name,
            control_points.len()
        );
        Ok(TrackCurve {
            name,
            curve_type: config.curve_type,
            thickness: config.thickness,
            resolution: config.resolution,
            cyclic: track.closed,
            control_points,
            nurbs_degree,
            speeds,
        })
    }
}

impl Default for CurveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackCurve {
    /// Discretize the curve for renderers that want a polyline:
    /// `resolution` evaluated points per segment plus the starting point.
    /// The exact control representation is unaffected.
    pub fn evaluate(&self) -> Vec<Vec3> {
        match self.curve_type {
            CurveType::Bezier => self.evaluate_bezier(),
            CurveType::Nurbs => self.evaluate_nurbs(),
        }
    }

    fn evaluate_bezier(&self) -> Vec<Vec3> {
        let points = &self.control_points;
        if points.len() < 2 {
            return points.iter().map(|p| p.position).collect();
        }

        let mut evaluated = vec![points[0].position];
        for (start, end) in points.iter().tuple_windows() {
            let b0 = start.position;
            let b1 = start.handle_right.unwrap_or(b0);
            let b3 = end.position;
            let b2 = end.handle_left.unwrap_or(b3);
            for step in 1..=self.resolution {
                let t = step as f64 / self.resolution as f64;
                evaluated.push(cubic_bezier(&b0, &b1, &b2, &b3, t));
            }
        }
        evaluated
    }

    fn evaluate_nurbs(&self) -> Vec<Vec3> {
        let control: Vec<Vec3> = self.control_points.iter().map(|p| p.position).collect();
        let degree = self.nurbs_degree.unwrap_or(0);
        if control.len() < 2 || degree == 0 {
            return control;
        }

        let knots = clamped_uniform_knots(control.len(), degree);
        let spans = control.len() - degree;
        let total_steps = spans as u32 * self.resolution;

        let mut evaluated = Vec::with_capacity(total_steps as usize + 1);
        for step in 0..=total_steps {
            let u = step as f64 / total_steps as f64;
            evaluated.push(de_boor(&control, degree, &knots, u));
        }
        evaluated
    }
}

/// Bezier handles from Catmull-Rom tangent estimation: the tangent at each
/// point is half the chord between its neighbors, which keeps adjacent
/// segments C1-continuous.
fn bezier_control_points(points: &[NormalizedPoint], cyclic: bool) -> Vec<ControlPoint> {
    let n = points.len();
    if n == 1 {
        return vec![ControlPoint {
            position: points[0].position,
            handle_left: Some(points[0].position),
            handle_right: Some(points[0].position),
        }];
    }

    (0..n)
        .map(|i| {
            let position = points[i].position;
            let tangent = tangent_at(points, i, cyclic);
            ControlPoint {
                position,
                handle_left: Some(position.sub(&tangent.scale(1.0 / 3.0))),
                handle_right: Some(position.add(&tangent.scale(1.0 / 3.0))),
            }
        })
        .collect()
}

fn tangent_at(points: &[NormalizedPoint], i: usize, cyclic: bool) -> Vec3 {
    let n = points.len();
    let prev = if i > 0 {
        Some(points[i - 1].position)
    } else if cyclic && n > 2 {
        // the last point duplicates the first, so the real predecessor is the
        // one before it
        Some(points[n - 2].position)
    } else {
        None
    };
    let next = if i + 1 < n {
        Some(points[i + 1].position)
    } else if cyclic && n > 2 {
        Some(points[1].position)
    } else {
        None
    };

    match (prev, next) {
        (Some(prev), Some(next)) => next.sub(&prev).scale(0.5),
        (None, Some(next)) => next.sub(&points[i].position),
        (Some(prev), None) => points[i].position.sub(&prev),
        (None, None) => Vec3::new(0.0, 0.0, 0.0),
    }
}

fn cubic_bezier(b0: &Vec3, b1: &Vec3, b2: &Vec3, b3: &Vec3, t: f64) -> Vec3 {
    let s = 1.0 - t;
    let c0 = s * s * s;
    let c1 = 3.0 * s * s * t;
    let c2 = 3.0 * s * t * t;
    let c3 = t * t * t;
    Vec3::new(
        c0 * b0.x + c1 * b1.x + c2 * b2.x + c3 * b3.x,
        c0 * b0.y + c1 * b1.y + c2 * b2.y + c3 * b3.y,
        c0 * b0.z + c1 * b1.z + c2 * b2.z + c3 * b3.z,
    )
}

/// Clamped uniform knot vector over [0, 1]: degree+1 repeats at each end so
/// the spline passes through its endpoints.
fn clamped_uniform_knots(control_count: usize, degree: usize) -> Vec<f64> {
    let spans = control_count - degree;
    let mut knots = Vec::with_capacity(control_count + degree + 1);
    knots.extend(std::iter::repeat_n(0.0, degree + 1));
    for i in 1..spans {
        knots.push(i as f64 / spans as f64);
    }
    knots.extend(std::iter::repeat_n(1.0, degree + 1));
    knots
}

/// De Boor's algorithm for a non-rational B-spline with unit weights.
fn de_boor(control: &[Vec3], degree: usize, knots: &[f64], u: f64) -> Vec3 {
    let n = control.len();
    // knot span index k with knots[k] <= u < knots[k+1]; the final parameter
    // value belongs to the last non-degenerate span
    let mut k = degree;
    while k + 1 < n && u >= knots[k + 1] {
        k += 1;
    }

    let mut d: Vec<Vec3> = (0..=degree).map(|j| control[j + k - degree]).collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let i = j + k - degree;
            let denominator = knots[i + degree + 1 - r] - knots[i];
            let alpha = if denominator.abs() < f64::EPSILON {
                0.0
            } else {
                (u - knots[i]) / denominator
            };
            d[j] = d[j - 1].scale(1.0 - alpha).add(&d[j].scale(alpha));
        }
    }
    d[degree]
}
