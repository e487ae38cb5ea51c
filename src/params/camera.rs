//! Camera orbit and pointer parameters.

use serde::{Deserialize, Serialize};

/// Camera projection, orbit and pointer-follow parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// Distance of the orbit offset vector (0, 0, d) from the orb
    pub orbit_distance: f32,

    /// Per-frame lerp factor toward the pointer-biased position
    pub follow_factor: f32,

    /// Pointer NDC to world offset for the desired camera position
    pub pointer_bias: f32,

    /// Rotation accumulated per frame per unit of normalized energy
    pub rotation_rate: f32,

    /// Per-frame lerp factor of the effective pointer toward the target
    pub pointer_lag: f32,

    /// Starting pointer position in NDC (off-screen)
    pub initial_pointer: [f32; 2],
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            orbit_distance: 5.0,
            follow_factor: 0.02,
            pointer_bias: 2.0,
            rotation_rate: 0.001,
            pointer_lag: 0.05,
            initial_pointer: [-10.0, -10.0],
        }
    }
}
