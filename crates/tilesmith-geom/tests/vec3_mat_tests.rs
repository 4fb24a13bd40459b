use tilesmith_geom::{Mat4, Vec3};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn vec3_approx_eq(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps) && approx_eq(a.z, b.z, eps)
}

#[test]
fn vec3_distance_xz_ignores_height() {
    let a = Vec3::new(0.0, 100.0, 0.0);
    let b = Vec3::new(3.0, -50.0, 4.0);
    assert!(approx_eq(a.distance_xz(b), 5.0, 1e-6));
    assert!(a.distance(b) > 100.0);
}

#[test]
fn vec3_cross_of_axes() {
    let x = Vec3::new(1.0, 0.0, 0.0);
    let z = Vec3::new(0.0, 0.0, 1.0);
    assert!(vec3_approx_eq(z.cross(x), Vec3::UP, 1e-6));
    assert!(vec3_approx_eq(-Vec3::UP, Vec3::new(0.0, -1.0, 0.0), 0.0));
}

#[test]
fn mat_identity_is_neutral() {
    let t = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(Mat4::IDENTITY * t, t);
    assert_eq!(t * Mat4::IDENTITY, t);
    assert!(vec3_approx_eq(
        t.transform_point(Vec3::ZERO),
        Vec3::new(1.0, 2.0, 3.0),
        1e-6
    ));
}

#[test]
fn look_at_moves_target_onto_negative_z() {
    let eye = Vec3::new(10.0, 5.0, 10.0);
    let target = Vec3::new(10.0, 5.0, 0.0);
    let view = Mat4::look_at(eye, target, Vec3::UP);
    let p = view.transform_point(target);
    assert!(vec3_approx_eq(p, Vec3::new(0.0, 0.0, -10.0), 1e-4));
}

#[test]
fn perspective_maps_near_and_far_planes() {
    let proj = Mat4::perspective(90f32.to_radians(), 1.0, 1.0, 100.0);
    let near = proj.transform_point(Vec3::new(0.0, 0.0, -1.0));
    let far = proj.transform_point(Vec3::new(0.0, 0.0, -100.0));
    assert!(approx_eq(near.z, -1.0, 1e-4));
    assert!(approx_eq(far.z, 1.0, 1e-4));
}
