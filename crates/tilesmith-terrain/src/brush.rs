//! Brush footprints and falloff kernels.
//!
//! Every kernel is monotonically non-increasing in distance and zero beyond
//! the radius. `inner_ratio` gives a full-strength core as a fraction of the
//! radius; the falloff is stretched over the remaining ring.

use core::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};
use tilesmith_geom::Vec3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushShape {
    Flat,
    #[default]
    Linear,
    Smooth,
    Polynomial,
    Trigonometric,
    /// Square footprint measured with the Chebyshev distance.
    Square,
}

impl BrushShape {
    pub const ALL: [BrushShape; 6] = [
        BrushShape::Flat,
        BrushShape::Linear,
        BrushShape::Smooth,
        BrushShape::Polynomial,
        BrushShape::Trigonometric,
        BrushShape::Square,
    ];

    /// Falloff for a normalized distance `t` in `[0, 1]`.
    fn kernel(self, t: f32) -> f32 {
        match self {
            BrushShape::Flat | BrushShape::Square => 1.0,
            BrushShape::Linear => 1.0 - t,
            BrushShape::Smooth => 1.0 - t * t * (3.0 - 2.0 * t),
            BrushShape::Polynomial => {
                let k = 1.0 - t * t;
                k * k
            }
            BrushShape::Trigonometric => (t * FRAC_PI_2).cos(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub shape: BrushShape,
    pub radius: f32,
    #[serde(default)]
    pub inner_ratio: f32,
}

impl Brush {
    pub const fn new(shape: BrushShape, radius: f32, inner_ratio: f32) -> Self {
        Self {
            shape,
            radius,
            inner_ratio,
        }
    }

    #[inline]
    pub fn is_noop(&self) -> bool {
        !(self.radius > 0.0)
    }

    /// Radius of the circle that encloses the whole footprint.
    pub fn reach(&self) -> f32 {
        match self.shape {
            BrushShape::Square => self.radius * core::f32::consts::SQRT_2,
            _ => self.radius,
        }
    }

    /// Distance from `center` in the brush metric, ground plane only.
    pub fn distance(&self, center: Vec3, x: f32, z: f32) -> f32 {
        let dx = (x - center.x).abs();
        let dz = (z - center.z).abs();
        match self.shape {
            BrushShape::Square => dx.max(dz),
            _ => (dx * dx + dz * dz).sqrt(),
        }
    }

    /// Weight for a distance already in the brush metric.
    pub fn falloff(&self, dist: f32) -> f32 {
        if self.is_noop() || !(dist <= self.radius) {
            return 0.0;
        }
        let inner = self.inner_ratio.clamp(0.0, 1.0);
        let t = dist / self.radius;
        if t <= inner {
            return 1.0;
        }
        let t = ((t - inner) / (1.0 - inner)).clamp(0.0, 1.0);
        self.shape.kernel(t).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn weight_at(&self, center: Vec3, x: f32, z: f32) -> f32 {
        self.falloff(self.distance(center, x, z))
    }
}
