//! Scene setup - lights, grid, axes, fog and the displayed geometry group
//!
//! The scene is an explicit list of named nodes owned by the viewport
//! session. Helpers and lights are fixed furniture; the only node that is
//! ever replaced is the displayed-geometry group.

use glam::Vec3;
use std::sync::Arc;
use tracing::debug;

use crate::config::{parse_hex_color, Rgb, SceneConfig};
use crate::geometry::{placeholder_part, MeshData, PartMesh};

/// Well-known node names
pub mod names {
    pub const AMBIENT_LIGHT: &str = "ambient-light";
    pub const KEY_LIGHT: &str = "key-light";
    pub const FILL_LIGHT: &str = "fill-light";
    pub const ACCENT_LIGHT: &str = "accent-light";
    pub const GRID: &str = "grid";
    pub const AXES: &str = "axes";
    pub const DISPLAYED_GEOMETRY: &str = "displayed-geometry";
}

/// Grid sits just below y = 0 so it never z-fights the part's base
pub const GRID_HEIGHT: f32 = -0.01;

/// Axes indicator tucked into a corner of the grid
pub const AXES_POSITION: Vec3 = Vec3::new(-8.0, 0.0, -8.0);

const FALLBACK_BACKGROUND: Rgb = Rgb::new(0.102, 0.114, 0.137);
const FALLBACK_ACCENT: Rgb = Rgb::new(0.29, 0.565, 0.851);

/// Surface description applied to a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Physically based, lit
    Standard { color: Rgb, roughness: f32, metalness: f32 },
    /// Unlit, triangle edges only
    Wireframe { color: Rgb },
    /// Unlit point cloud of the mesh vertices
    Points { color: Rgb, size: f32 },
    /// Unlit lines used by the helpers
    Line { color: Rgb, opacity: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
    pub shadow: Option<ShadowSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: Rgb,
    pub intensity: f32,
    pub range: f32,
}

/// Square ground grid in the XZ plane
#[derive(Debug, Clone, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
    pub center_color: Rgb,
    pub material: Material,
}

impl GridHelper {
    /// Line segments making up the grid, in the node's local space
    pub fn line_segments(&self) -> Vec<[Vec3; 2]> {
        let divisions = self.divisions.max(1);
        let half = self.size / 2.0;
        let step = self.size / divisions as f32;
        let mut lines = Vec::with_capacity((divisions as usize + 1) * 2);
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            lines.push([Vec3::new(-half, 0.0, k), Vec3::new(half, 0.0, k)]);
            lines.push([Vec3::new(k, 0.0, -half), Vec3::new(k, 0.0, half)]);
        }
        lines
    }
}

/// Three coloured lines along +X, +Y and +Z
#[derive(Debug, Clone, PartialEq)]
pub struct AxesHelper {
    pub length: f32,
    pub material: Material,
}

impl AxesHelper {
    pub fn segments(&self) -> [([Vec3; 2], Rgb); 3] {
        [
            ([Vec3::ZERO, Vec3::X * self.length], Rgb::new(1.0, 0.0, 0.0)),
            ([Vec3::ZERO, Vec3::Y * self.length], Rgb::new(0.0, 1.0, 0.0)),
            ([Vec3::ZERO, Vec3::Z * self.length], Rgb::new(0.0, 0.0, 1.0)),
        ]
    }
}

/// A single mesh inside the displayed geometry group
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub geometry: Arc<MeshData>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// Where the displayed geometry came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometrySource {
    Placeholder,
    Resolved(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshGroup {
    pub source: GeometrySource,
    pub meshes: Vec<MeshNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    AmbientLight(AmbientLight),
    DirectionalLight(DirectionalLight),
    PointLight(PointLight),
    Grid(GridHelper),
    Axes(AxesHelper),
    Group(MeshGroup),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub visible: bool,
    pub translation: Vec3,
    /// Rotation about +Y in radians
    pub yaw: f32,
    pub kind: NodeKind,
}

impl SceneNode {
    fn new(name: &str, translation: Vec3, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            translation,
            yaw: 0.0,
            kind,
        }
    }
}

/// Resolves a model reference to real geometry.
///
/// Returning `None` makes the scene fall back to the placeholder part.
pub trait GeometryResolver {
    fn resolve(&self, model_ref: &str) -> Option<Vec<PartMesh>>;
}

/// Resolver used while no model format is supported: never resolves
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResolver;

impl GeometryResolver for PlaceholderResolver {
    fn resolve(&self, model_ref: &str) -> Option<Vec<PartMesh>> {
        debug!(model_ref, "No loader for model reference, showing placeholder");
        None
    }
}

/// The complete scene of one viewport
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub background: Rgb,
    pub fog: Fog,
    nodes: Vec<SceneNode>,
    /// Bumped on every change a renderer has to mirror
    revision: u64,
    /// Bumped whenever the displayed geometry group is replaced
    generation: u64,
}

impl SceneGraph {
    /// Build the fixed scene with the placeholder part in solid shading
    pub fn build(config: &SceneConfig) -> Self {
        let background = parse_hex_color(&config.background).unwrap_or(FALLBACK_BACKGROUND);
        let accent = accent_color(config);

        let nodes = vec![
            SceneNode::new(
                names::AMBIENT_LIGHT,
                Vec3::ZERO,
                NodeKind::AmbientLight(AmbientLight {
                    color: Rgb::WHITE,
                    intensity: 0.4,
                }),
            ),
            SceneNode::new(
                names::KEY_LIGHT,
                Vec3::new(10.0, 20.0, 10.0),
                NodeKind::DirectionalLight(DirectionalLight {
                    color: Rgb::WHITE,
                    intensity: 1.0,
                    shadow: Some(ShadowSettings {
                        map_size: config.shadow_map_size,
                        near: 0.5,
                        far: 50.0,
                    }),
                }),
            ),
            SceneNode::new(
                names::FILL_LIGHT,
                Vec3::new(-10.0, 10.0, -5.0),
                NodeKind::DirectionalLight(DirectionalLight {
                    color: Rgb::from_hex(0xc4d4ff),
                    intensity: 0.3,
                    shadow: None,
                }),
            ),
            SceneNode::new(
                names::ACCENT_LIGHT,
                Vec3::new(-5.0, 8.0, 5.0),
                NodeKind::PointLight(PointLight {
                    color: accent,
                    intensity: 0.5,
                    range: 50.0,
                }),
            ),
            SceneNode::new(
                names::GRID,
                Vec3::new(0.0, GRID_HEIGHT, 0.0),
                NodeKind::Grid(GridHelper {
                    size: config.grid_size,
                    divisions: config.grid_divisions,
                    center_color: Rgb::from_hex(0x888888),
                    material: Material::Line {
                        color: Rgb::from_hex(0x444444),
                        opacity: config.grid_opacity,
                    },
                }),
            ),
            SceneNode::new(
                names::AXES,
                AXES_POSITION,
                NodeKind::Axes(AxesHelper {
                    length: config.axes_length,
                    material: Material::Line {
                        color: Rgb::WHITE,
                        opacity: 1.0,
                    },
                }),
            ),
        ];

        let mut scene = Self {
            background,
            fog: Fog {
                color: background,
                near: config.fog_near,
                far: config.fog_far,
            },
            nodes,
            revision: 0,
            generation: 0,
        };
        let solid = Material::Standard {
            color: accent,
            roughness: 0.3,
            metalness: 0.1,
        };
        scene.replace_displayed_geometry(None, &PlaceholderResolver, solid);
        scene
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Mutable lookup; counts as a change for renderers
    pub fn node_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        let node = self.nodes.iter_mut().find(|n| n.name == name)?;
        self.revision += 1;
        Some(node)
    }

    /// Swap the displayed geometry for whatever `model_ref` resolves to,
    /// or the placeholder. Any previous group is removed first.
    pub fn replace_displayed_geometry(
        &mut self,
        model_ref: Option<&str>,
        resolver: &dyn GeometryResolver,
        material: Material,
    ) -> GeometrySource {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.name != names::DISPLAYED_GEOMETRY);
        let removed = before - self.nodes.len();

        let (source, parts) = match model_ref.and_then(|r| resolver.resolve(r).map(|p| (r, p))) {
            Some((model_ref, parts)) => (GeometrySource::Resolved(model_ref.to_string()), parts),
            None => (GeometrySource::Placeholder, placeholder_part()),
        };

        let meshes = parts
            .into_iter()
            .map(|part| MeshNode {
                name: part.name,
                geometry: Arc::new(part.mesh),
                material,
                cast_shadow: true,
                receive_shadow: true,
            })
            .collect();

        self.nodes.push(SceneNode::new(
            names::DISPLAYED_GEOMETRY,
            Vec3::ZERO,
            NodeKind::Group(MeshGroup {
                source: source.clone(),
                meshes,
            }),
        ));
        self.revision += 1;
        self.generation += 1;

        debug!(removed, ?source, "Displayed geometry replaced");
        source
    }

    pub fn displayed_geometry(&self) -> Option<&MeshGroup> {
        self.nodes.iter().find_map(|n| match &n.kind {
            NodeKind::Group(group) if n.name == names::DISPLAYED_GEOMETRY => Some(group),
            _ => None,
        })
    }

    /// Number of displayed-geometry groups attached (0 or 1)
    pub fn displayed_geometry_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.name == names::DISPLAYED_GEOMETRY)
            .count()
    }

    /// Yaw of the displayed geometry, if attached
    pub fn displayed_yaw(&self) -> Option<f32> {
        self.node(names::DISPLAYED_GEOMETRY).map(|n| n.yaw)
    }

    /// Set the displayed geometry's yaw; false when no group is attached.
    ///
    /// Per-frame motion is not a structural change, so the revision is
    /// left alone.
    pub fn set_displayed_yaw(&mut self, yaw: f32) -> bool {
        match self.nodes.iter_mut().find(|n| n.name == names::DISPLAYED_GEOMETRY) {
            Some(node) => {
                node.yaw = yaw;
                true
            }
            None => false,
        }
    }

    /// Detach the displayed geometry without replacing it
    pub fn remove_displayed_geometry(&mut self) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.name != names::DISPLAYED_GEOMETRY);
        let removed = before != self.nodes.len();
        if removed {
            self.revision += 1;
            self.generation += 1;
        }
        removed
    }

    /// Every mesh of every group; helpers are never included
    pub fn meshes_mut(&mut self) -> impl Iterator<Item = &mut MeshNode> {
        self.revision += 1;
        self.nodes
            .iter_mut()
            .filter_map(|n| match &mut n.kind {
                NodeKind::Group(group) => Some(group.meshes.iter_mut()),
                _ => None,
            })
            .flatten()
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshNode> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Group(group) => Some(group.meshes.iter()),
                _ => None,
            })
            .flatten()
    }

    /// Flip a node's visibility. Returns the new state, or None if missing.
    pub fn toggle_visibility(&mut self, name: &str) -> Option<bool> {
        let node = self.node_mut(name)?;
        node.visible = !node.visible;
        Some(node.visible)
    }

    /// Drop every node; returns how many meshes were released
    pub fn clear(&mut self) -> usize {
        let meshes = self.meshes().count();
        self.nodes.clear();
        self.revision += 1;
        self.generation += 1;
        meshes
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Accent colour from config, falling back to the stock blue
pub fn accent_color(config: &SceneConfig) -> Rgb {
    parse_hex_color(&config.accent).unwrap_or(FALLBACK_ACCENT)
}
