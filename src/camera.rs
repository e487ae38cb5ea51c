//! Audio-driven orbit camera with pointer bias and pointer picking.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::audio::AudioEnergy;
use crate::orb::NO_HIT;
use crate::params::CameraParams;

/// Where the camera starts before the first tick
const INITIAL_POSITION: Vec3 = Vec3::new(2.0, -2.0, 5.0);

/// Camera orbiting the orb at the origin
pub struct CameraController {
    params: CameraParams,
    position: Vec3,
    target: Vec3,
    aspect: f32,
}

impl CameraController {
    pub fn new(params: CameraParams, aspect: f32) -> Self {
        Self {
            params,
            position: INITIAL_POSITION,
            target: Vec3::ZERO,
            aspect,
        }
    }

    /// Grow the orbit angles by this tick's low-bin energy
    ///
    /// `dt` is in frames (1.0 at 60 Hz).
    pub fn accumulate_rotation(&self, rotation: &mut Vec3, dt: f32, energy: &AudioEnergy) {
        let f = dt * self.params.rotation_rate;
        let input = energy.input_bins.map(|b| b as f32 / 255.0);
        let output = energy.output_bins.map(|b| b as f32 / 255.0);

        rotation.x += f * 0.5 * output[1];
        rotation.z += f * 0.5 * input[1];
        rotation.y += f * 0.25 * input[2];
        rotation.y += f * 0.25 * output[2];
    }

    /// Place the camera on the rotated orbit, pulled toward the pointer
    pub fn update_pose(&mut self, rotation: Vec3, pointer: Vec2) -> Vec3 {
        let p = &self.params;
        let orientation = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
        let orbit = orientation * Vec3::new(0.0, 0.0, p.orbit_distance);
        let desired = Vec3::new(
            pointer.x * p.pointer_bias,
            pointer.y * p.pointer_bias,
            p.orbit_distance,
        );

        self.position = orbit.lerp(desired, p.follow_factor);
        self.position
    }

    /// Aspect ratio changes only through a valid resize
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn view(&self) -> Mat4 {
        // Degenerate only if the camera sits on the Y axis above the target
        let forward = (self.target - self.position).normalize_or_zero();
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-8 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.params.fov_degrees.to_radians(),
            self.aspect,
            self.params.near_plane,
            self.params.far_plane,
        )
    }

    /// Create view-projection matrix for rendering
    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Unit ray direction through a point in normalized device coordinates
    pub fn ray_direction(&self, pointer: Vec2) -> Vec3 {
        let inverse = self.view_proj().inverse();
        let through = inverse.project_point3(Vec3::new(pointer.x, pointer.y, 0.5));
        (through - self.position).normalize_or_zero()
    }

    /// Cast a ray through the pointer against the orb sphere at the origin.
    /// Returns the nearest hit point, or [`NO_HIT`].
    pub fn cast_pointer_ray(&self, pointer: Vec2, orb_radius: f32) -> Vec3 {
        let direction = self.ray_direction(pointer);
        if direction == Vec3::ZERO || orb_radius <= 0.0 {
            return NO_HIT;
        }

        match ray_sphere(self.position, direction, self.target, orb_radius) {
            Some(t) if t >= self.params.near_plane && t <= self.params.far_plane => {
                self.position + direction * t
            }
            _ => NO_HIT,
        }
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }
}

/// Distance along a unit ray to the first sphere crossing in front of the origin
fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = -b - root;
    if near >= 0.0 {
        return Some(near);
    }
    // Origin inside the sphere
    let far = -b + root;
    (far >= 0.0).then_some(far)
}
