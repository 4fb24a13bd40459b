use crate::{Aabb, Mat4, Vec3};

/// Plane `a*x + b*y + c*z + d = 0`, normal pointing inside the frustum.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Plane {
    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    pub fn normalized(self) -> Self {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > 0.0 {
            Self::new(self.a / len, self.b / len, self.c / len, self.d / len)
        } else {
            self
        }
    }

    #[inline]
    pub fn distance(&self, p: Vec3) -> f32 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }
}

/// View frustum extracted from a view-projection matrix.
#[derive(Clone, Copy, Debug, Default)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_view_projection(m: &Mat4) -> Self {
        let c = &m.cols;
        let row = |r: usize| [c[0][r], c[1][r], c[2][r], c[3][r]];
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let combine = |a: [f32; 4], b: [f32; 4], sign: f32| {
            Plane::new(
                a[0] + sign * b[0],
                a[1] + sign * b[1],
                a[2] + sign * b[2],
                a[3] + sign * b[3],
            )
            .normalized()
        };
        Self {
            planes: [
                combine(r3, r0, 1.0),
                combine(r3, r0, -1.0),
                combine(r3, r1, 1.0),
                combine(r3, r1, -1.0),
                combine(r3, r2, 1.0),
                combine(r3, r2, -1.0),
            ],
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes.iter().all(|pl| pl.distance(p) >= 0.0)
    }

    /// Conservative test: `false` only when the box is fully outside one plane.
    pub fn intersects_aabb(&self, bb: &Aabb) -> bool {
        self.planes.iter().all(|pl| {
            let p = Vec3::new(
                if pl.a >= 0.0 { bb.max.x } else { bb.min.x },
                if pl.b >= 0.0 { bb.max.y } else { bb.min.y },
                if pl.c >= 0.0 { bb.max.z } else { bb.min.z },
            );
            pl.distance(p) >= 0.0
        })
    }
}
