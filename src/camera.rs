use tilesmith_geom::{Mat4, Vec3};

pub const FOV_Y_DEGREES: f32 = 70.0;
pub const NEAR: f32 = 1.0;
pub const FAR: f32 = 5000.0;

pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,   // degrees
    pub pitch: f32, // degrees
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub captured: bool,
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: -45.0,
            pitch: -15.0,
            move_speed: 120.0,
            mouse_sensitivity: 0.1,
            captured: true,
        }
    }

    pub fn looking(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-89.9, 89.9),
            ..Self::new(position)
        }
    }

    pub fn forward(&self) -> Vec3 {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();
        Vec3::new(
            yaw_rad.cos() * pitch_rad.cos(),
            pitch_rad.sin(),
            yaw_rad.sin() * pitch_rad.cos(),
        )
        .normalized()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::UP).normalized()
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective(FOV_Y_DEGREES.to_radians(), aspect, NEAR, FAR);
        let view = Mat4::look_at(self.position, self.position + self.forward(), Vec3::UP);
        proj * view
    }
}

#[cfg(feature = "viewer")]
mod input {
    use raylib::prelude::*;
    use tilesmith_render::backend::conv::vec3_to_rl;

    use super::FlyCamera;

    impl FlyCamera {
        pub fn to_camera3d(&self) -> Camera3D {
            Camera3D::perspective(
                vec3_to_rl(self.position),
                vec3_to_rl(self.position + self.forward()),
                Vector3::new(0.0, 1.0, 0.0),
                super::FOV_Y_DEGREES,
            )
        }

        pub fn update(&mut self, rl: &mut RaylibHandle, dt: f32) {
            if rl.is_key_pressed(KeyboardKey::KEY_TAB) {
                self.captured = !self.captured;
                if self.captured {
                    rl.disable_cursor();
                } else {
                    rl.enable_cursor();
                }
            }

            if self.captured {
                let md = rl.get_mouse_delta();
                self.yaw += md.x * self.mouse_sensitivity;
                self.pitch -= md.y * self.mouse_sensitivity;
                self.pitch = self.pitch.clamp(-89.9, 89.9);
            }

            let mut wish_dir = tilesmith_geom::Vec3::ZERO;
            let f = self.forward();
            let r = self.right();
            let up = tilesmith_geom::Vec3::UP;
            for (key, dir) in [
                (KeyboardKey::KEY_W, f),
                (KeyboardKey::KEY_S, -f),
                (KeyboardKey::KEY_A, -r),
                (KeyboardKey::KEY_D, r),
                (KeyboardKey::KEY_E, up),
                (KeyboardKey::KEY_Q, -up),
            ] {
                if rl.is_key_down(key) {
                    wish_dir += dir;
                }
            }
            if wish_dir.length() > 0.0 {
                let speed = if rl.is_key_down(KeyboardKey::KEY_LEFT_SHIFT) {
                    self.move_speed * 3.0
                } else {
                    self.move_speed
                };
                self.position += wish_dir.normalized() * speed * dt;
            }
        }
    }
}
