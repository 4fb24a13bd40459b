use proptest::num::f32::NORMAL;
use proptest::prelude::*;
use proptest::strategy::Strategy;
use tilesmith_geom::{Aabb, Vec3, angled_height};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn bounded_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("bounded", |v| v.is_finite() && v.abs() <= 1e4)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (bounded_f32(), bounded_f32(), bounded_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // Every input point lies inside the box built from them
    #[test]
    fn from_points_contains_all(points in prop::collection::vec(arb_vec3(), 1..32)) {
        let bb = Aabb::from_points(points.iter().copied()).unwrap();
        for p in points {
            prop_assert!(bb.contains(p));
        }
    }

    // The centre of a box always intersects a zero-radius circle around itself
    #[test]
    fn centre_hits_circle(a in arb_vec3(), b in arb_vec3()) {
        let bb = Aabb::from_points([a, b]).unwrap();
        prop_assert!(bb.intersects_circle_xz(bb.center(), 0.0));
    }

    // A circle strictly outside the footprint on x misses
    #[test]
    fn circle_outside_misses(a in arb_vec3(), b in arb_vec3(), gap in 1.0f32..100.0, r in 0.0f32..0.9) {
        let bb = Aabb::from_points([a, b]).unwrap();
        let c = Vec3::new(bb.max.x + gap, 0.0, bb.center().z);
        prop_assert!(!bb.intersects_circle_xz(c, r * gap));
    }

    // Zero angle keeps the plane level at the origin height
    #[test]
    fn angled_height_flat_at_zero_angle(o in arb_vec3(), x in bounded_f32(), z in bounded_f32(), orient in 0.0f32..6.28) {
        prop_assert!(approx(angled_height(o, x, z, 0.0, orient), o.y, 1e-3));
    }
}

#[test]
fn from_points_empty_is_none() {
    assert!(Aabb::from_points(std::iter::empty()).is_none());
}

#[test]
fn angled_height_rises_along_orientation() {
    let o = Vec3::new(10.0, 5.0, 10.0);
    let h = angled_height(o, 20.0, 10.0, 45f32.to_radians(), 0.0);
    assert!(approx(h, 15.0, 1e-4));
    let behind = angled_height(o, 0.0, 10.0, 45f32.to_radians(), 0.0);
    assert!(approx(behind, -5.0, 1e-4));
}
