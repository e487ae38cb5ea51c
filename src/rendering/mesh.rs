//! Orb sphere mesh.

use bytemuck::{Pod, Zeroable};
use std::f32::consts::PI;

/// Vertex data for the orb mesh (position + normal)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OrbVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Indexed sphere centred at the origin
pub struct OrbMesh {
    pub vertices: Vec<OrbVertex>,
    pub indices: Vec<u32>,
}

impl OrbMesh {
    /// Latitude/longitude sphere with `segments` columns and `rings` rows
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        for ring in 0..=rings {
            let theta = ring as f32 / rings as f32 * PI;
            let (sin_theta, cos_theta) = theta.sin_cos();
            for segment in 0..=segments {
                let phi = segment as f32 / segments as f32 * 2.0 * PI;
                let (sin_phi, cos_phi) = phi.sin_cos();
                let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
                vertices.push(OrbVertex {
                    position: normal.map(|n| n * radius),
                    normal,
                });
            }
        }

        // Counter-clockwise seen from outside
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
        let stride = segments + 1;
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_vertices_on_radius() {
        let mesh = OrbMesh::uv_sphere(1.5, 16, 8);
        assert_eq!(mesh.vertices.len(), 17 * 9);
        assert_eq!(mesh.indices.len(), 16 * 8 * 6);
        for v in &mesh.vertices {
            let r = v.position.iter().map(|c| c * c).sum::<f32>().sqrt();
            assert!((r - 1.5).abs() < 1e-5);
        }
        let max_index = *mesh.indices.iter().max().unwrap();
        assert!((max_index as usize) < mesh.vertices.len());
    }

    #[test]
    fn test_outward_winding() {
        let mesh = OrbMesh::uv_sphere(1.0, 8, 4);
        // First quad below the north pole, second triangle
        let tri = &mesh.indices[(8 * 6) + 3..(8 * 6) + 6];
        let p = |i: u32| glam::Vec3::from_array(mesh.vertices[i as usize].position);
        let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
        let normal = (b - a).cross(c - a);
        let centroid = (a + b + c) / 3.0;
        assert!(normal.dot(centroid) > 0.0);
    }
}
