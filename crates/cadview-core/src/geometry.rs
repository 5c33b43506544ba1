//! Procedural mesh data for the displayed geometry

use glam::Vec3;
use std::collections::BTreeSet;
use std::f32::consts::TAU;

/// Triangle mesh in model space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle list, counter-clockwise front faces
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Closed cylinder along +Y centred on the origin
    pub fn cylinder(radius: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let half = height / 2.0;
        let mut mesh = MeshData::default();

        // Side wall: one ring of vertices at each end, normals point outwards
        for (y, _) in [(-half, 0), (half, 1)] {
            for i in 0..segments {
                let angle = i as f32 / segments as f32 * TAU;
                let (sin, cos) = angle.sin_cos();
                mesh.positions.push([radius * sin, y, radius * cos]);
                mesh.normals.push([sin, 0.0, cos]);
            }
        }
        for i in 0..segments {
            let next = (i + 1) % segments;
            let (b0, b1) = (i, next);
            let (t0, t1) = (i + segments, next + segments);
            mesh.indices.extend_from_slice(&[b0, b1, t1, b0, t1, t0]);
        }

        // Caps get their own vertices so the normals stay flat
        for (y, normal_y) in [(half, 1.0f32), (-half, -1.0f32)] {
            let center = mesh.positions.len() as u32;
            mesh.positions.push([0.0, y, 0.0]);
            mesh.normals.push([0.0, normal_y, 0.0]);
            for i in 0..segments {
                let angle = i as f32 / segments as f32 * TAU;
                let (sin, cos) = angle.sin_cos();
                mesh.positions.push([radius * sin, y, radius * cos]);
                mesh.normals.push([0.0, normal_y, 0.0]);
            }
            for i in 0..segments {
                let a = center + 1 + i;
                let b = center + 1 + (i + 1) % segments;
                if normal_y > 0.0 {
                    mesh.indices.extend_from_slice(&[center, a, b]);
                } else {
                    mesh.indices.extend_from_slice(&[center, b, a]);
                }
            }
        }

        mesh
    }

    pub fn translated(mut self, offset: Vec3) -> Self {
        for p in &mut self.positions {
            p[0] += offset.x;
            p[1] += offset.y;
            p[2] += offset.z;
        }
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Unique undirected triangle edges as a line list (wireframe rendering)
    pub fn edge_indices(&self) -> Vec<u32> {
        let mut edges = BTreeSet::new();
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
    }

    /// Axis-aligned bounds as (min, max); None for an empty mesh
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

/// Dimensions of the placeholder flanged part
pub mod placeholder {
    pub const SEGMENTS: u32 = 48;
    pub const BODY_RADIUS: f32 = 1.0;
    pub const BODY_HEIGHT: f32 = 2.4;
    pub const FLANGE_RADIUS: f32 = 1.6;
    pub const FLANGE_HEIGHT: f32 = 0.3;
    pub const BOLT_COUNT: u32 = 8;
    pub const BOLT_CIRCLE_RADIUS: f32 = 1.3;
    pub const BOLT_RADIUS: f32 = 0.12;
    /// Bolt holes stand slightly proud of the flange faces
    pub const BOLT_HEIGHT: f32 = FLANGE_HEIGHT + 0.04;
}

/// Named part of the placeholder model
#[derive(Debug, Clone, PartialEq)]
pub struct PartMesh {
    pub name: String,
    pub mesh: MeshData,
}

/// Build the placeholder part: a cylindrical body with a flange at each end
/// and a ring of bolt holes through the top flange. The part rests on y = 0.
pub fn placeholder_part() -> Vec<PartMesh> {
    use placeholder::*;

    let mut parts = Vec::with_capacity(3 + BOLT_COUNT as usize);

    parts.push(PartMesh {
        name: "body".to_string(),
        mesh: MeshData::cylinder(BODY_RADIUS, BODY_HEIGHT, SEGMENTS)
            .translated(Vec3::new(0.0, BODY_HEIGHT / 2.0, 0.0)),
    });

    let bottom_y = FLANGE_HEIGHT / 2.0;
    let top_y = BODY_HEIGHT - FLANGE_HEIGHT / 2.0;
    for (name, y) in [("flange-bottom", bottom_y), ("flange-top", top_y)] {
        parts.push(PartMesh {
            name: name.to_string(),
            mesh: MeshData::cylinder(FLANGE_RADIUS, FLANGE_HEIGHT, SEGMENTS)
                .translated(Vec3::new(0.0, y, 0.0)),
        });
    }

    for i in 0..BOLT_COUNT {
        let angle = i as f32 / BOLT_COUNT as f32 * TAU;
        let offset = Vec3::new(
            BOLT_CIRCLE_RADIUS * angle.cos(),
            top_y,
            BOLT_CIRCLE_RADIUS * angle.sin(),
        );
        parts.push(PartMesh {
            name: format!("bolt-hole-{}", i),
            mesh: MeshData::cylinder(BOLT_RADIUS, BOLT_HEIGHT, 16).translated(offset),
        });
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_counts() {
        let mesh = MeshData::cylinder(1.0, 2.0, 8);
        // 2 side rings + 2 caps with centre vertex
        assert_eq!(mesh.vertex_count(), 8 * 2 + (8 + 1) * 2);
        assert_eq!(mesh.triangle_count(), 8 * 2 + 8 * 2);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_cylinder_bounds() {
        let (lo, hi) = MeshData::cylinder(0.5, 3.0, 32).bounds().unwrap();
        assert!((hi.y - 1.5).abs() < 1e-6);
        assert!((lo.y + 1.5).abs() < 1e-6);
        assert!(hi.x <= 0.5 + 1e-6 && lo.x >= -0.5 - 1e-6);
    }

    #[test]
    fn test_edges_are_unique() {
        let mesh = MeshData::cylinder(1.0, 1.0, 6);
        let edges = mesh.edge_indices();
        assert_eq!(edges.len() % 2, 0);
        let pairs: BTreeSet<(u32, u32)> = edges.chunks_exact(2).map(|e| (e[0], e[1])).collect();
        assert_eq!(pairs.len(), edges.len() / 2);
        assert!(pairs.iter().all(|(a, b)| a < b));
    }

    #[test]
    fn test_placeholder_layout() {
        let parts = placeholder_part();
        assert_eq!(parts.len(), 3 + placeholder::BOLT_COUNT as usize);
        assert_eq!(parts[0].name, "body");
        assert!(parts.iter().any(|p| p.name == "flange-top"));
        assert!(parts.iter().any(|p| p.name == "bolt-hole-7"));

        // Rests on the ground plane
        let min_y = parts
            .iter()
            .filter_map(|p| p.mesh.bounds())
            .map(|(lo, _)| lo.y)
            .fold(f32::INFINITY, f32::min);
        assert!(min_y.abs() < 1e-5);
    }

    #[test]
    fn test_bounds_empty() {
        assert!(MeshData::default().bounds().is_none());
    }
}
