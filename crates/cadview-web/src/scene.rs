//! Bevy side of the viewport: mirrors the session's scene graph into entities
//!
//! The session renders into a [`BevyTarget`], which only records what the
//! frame should look like. The systems here turn that record into camera,
//! light and mesh entities that Bevy's renderer draws.

use bevy::asset::RenderAssetUsages;
use bevy::light::{CascadeShadowConfigBuilder, DirectionalLightShadowMap};
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::pbr::{DistanceFog, FogFalloff};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use tracing::{debug, info};

use cadview_core::scene::{names, AxesHelper, GridHelper, MeshGroup};
use cadview_core::{
    CameraView, Material, MeshData, NodeKind, PerspectiveLens, RenderTarget, Result, Rgb,
    SceneGraph, SceneNode, SurfaceSettings, SurfaceSize, ViewportError,
};

use crate::app::{Viewport, ViewportSystems};

/// Illuminance (lux) of a directional light with intensity 1.0
const LUX_PER_INTENSITY: f32 = 5000.0;
/// Luminous power (lumens) of a point light with intensity 1.0
const LUMENS_PER_INTENSITY: f32 = 200_000.0;
/// Ambient brightness of an ambient light with intensity 1.0
const AMBIENT_BRIGHTNESS_PER_INTENSITY: f32 = 500.0;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneMirror>().add_systems(
            Update,
            (
                release_scene,
                spawn_scene,
                rebuild_displayed_geometry,
                apply_scene_changes,
                apply_frame,
                apply_surface_size,
            )
                .chain()
                .in_set(ViewportSystems::Sync),
        );
    }
}

/// What the last rendered frame should show
#[derive(Debug, Clone, Copy)]
pub struct FrameSnapshot {
    pub camera: CameraView,
    /// Yaw of the displayed geometry, if attached
    pub yaw: Option<f32>,
}

/// Render target backed by the Bevy renderer.
///
/// Rendering is deferred: `render` stores a snapshot that the sync systems
/// apply to the ECS world before Bevy draws the frame.
#[derive(Debug, Default)]
pub struct BevyTarget {
    gpu_available: bool,
    settings: Option<SurfaceSettings>,
    pending_size: Option<SurfaceSize>,
    frame: Option<FrameSnapshot>,
    released: bool,
}

impl BevyTarget {
    pub fn set_gpu_available(&mut self, available: bool) {
        self.gpu_available = available;
    }

    pub fn settings(&self) -> Option<&SurfaceSettings> {
        self.settings.as_ref()
    }

    pub fn take_frame(&mut self) -> Option<FrameSnapshot> {
        self.frame.take()
    }

    pub fn take_resize(&mut self) -> Option<SurfaceSize> {
        self.pending_size.take()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl RenderTarget for BevyTarget {
    fn initialize(&mut self, settings: &SurfaceSettings) -> Result<()> {
        if !self.gpu_available {
            return Err(ViewportError::ContextUnavailable(
                "no GPU device was created".to_string(),
            ));
        }
        canvas_present()?;
        self.settings = Some(*settings);
        self.released = false;
        Ok(())
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.pending_size = Some(size);
    }

    fn render(&mut self, scene: &SceneGraph, camera: &CameraView) -> Result<()> {
        if self.released {
            return Err(ViewportError::NotMounted);
        }
        self.frame = Some(FrameSnapshot {
            camera: *camera,
            yaw: scene.displayed_yaw(),
        });
        Ok(())
    }

    fn release(&mut self) {
        self.settings = None;
        self.pending_size = None;
        self.frame = None;
        self.released = true;
    }
}

#[cfg(target_arch = "wasm32")]
fn canvas_present() -> Result<()> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| ViewportError::ContextUnavailable("no document".to_string()))?;
    match document.query_selector(crate::app::CANVAS_SELECTOR) {
        Ok(Some(_)) => Ok(()),
        _ => Err(ViewportError::ContextUnavailable(format!(
            "canvas {} not found",
            crate::app::CANVAS_SELECTOR
        ))),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn canvas_present() -> Result<()> {
    Ok(())
}

/// Which parts of the scene graph already exist as entities
#[derive(Resource, Default)]
pub struct SceneMirror {
    spawned: bool,
    revision: Option<u64>,
    generation: Option<u64>,
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Top-level entity owned by the viewport; despawned on unmount
#[derive(Component)]
pub struct ViewportEntity;

/// Links an entity to the scene node it mirrors
#[derive(Component)]
pub struct SceneNodeEntity {
    pub name: String,
}

/// Parent entity of the displayed meshes
#[derive(Component)]
pub struct DisplayedGeometry;

/// One mesh of the displayed geometry group
#[derive(Component)]
pub struct DisplayedPart {
    pub index: usize,
}

/// The same part prepared for each view mode
#[derive(Component)]
pub struct PartMeshes {
    pub triangles: Handle<Mesh>,
    pub edges: Handle<Mesh>,
    pub points: Handle<Mesh>,
}

impl PartMeshes {
    fn for_material(&self, material: &Material) -> Handle<Mesh> {
        match material {
            Material::Wireframe { .. } | Material::Line { .. } => self.edges.clone(),
            Material::Points { .. } => self.points.clone(),
            Material::Standard { .. } => self.triangles.clone(),
        }
    }
}

fn srgb(color: Rgb) -> Color {
    Color::srgb(color.r, color.g, color.b)
}

fn node_visibility(node: &SceneNode) -> Visibility {
    if node.visible {
        Visibility::Visible
    } else {
        Visibility::Hidden
    }
}

fn perspective(lens: &PerspectiveLens) -> PerspectiveProjection {
    PerspectiveProjection {
        fov: lens.fov_y_radians,
        aspect_ratio: lens.aspect,
        near: lens.near,
        far: lens.far,
        ..default()
    }
}

fn standard_material(material: &Material) -> StandardMaterial {
    match *material {
        Material::Standard {
            color,
            roughness,
            metalness,
        } => StandardMaterial {
            base_color: srgb(color),
            perceptual_roughness: roughness,
            metallic: metalness,
            ..default()
        },
        // wgpu draws points at a fixed size, so the point size has no effect here
        Material::Wireframe { color } | Material::Points { color, .. } => StandardMaterial {
            base_color: srgb(color),
            unlit: true,
            ..default()
        },
        Material::Line { color, opacity } => StandardMaterial {
            base_color: Color::srgba(color.r, color.g, color.b, opacity),
            unlit: true,
            alpha_mode: if opacity < 1.0 {
                AlphaMode::Blend
            } else {
                AlphaMode::Opaque
            },
            ..default()
        },
    }
}

fn triangle_mesh(data: &MeshData) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone())
        .with_inserted_indices(Indices::U32(data.indices.clone()))
}

/// Unique triangle edges as a line list; WebGL has no polygon line mode
fn edge_mesh(data: &MeshData) -> Mesh {
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone())
        .with_inserted_indices(Indices::U32(data.edge_indices()))
}

fn point_mesh(data: &MeshData) -> Mesh {
    Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone())
}

/// Line list with per-vertex colours
fn colored_lines(segments: &[([Vec3; 2], Rgb)]) -> Mesh {
    let mut positions = Vec::with_capacity(segments.len() * 2);
    let mut colors = Vec::with_capacity(segments.len() * 2);
    for (segment, color) in segments {
        let linear = LinearRgba::from(srgb(*color)).to_f32_array();
        for point in segment {
            positions.push(point.to_array());
            colors.push(linear);
        }
    }
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
}

fn grid_mesh(grid: &GridHelper) -> Mesh {
    let line_color = match grid.material {
        Material::Line { color, .. } => color,
        _ => grid.center_color,
    };
    let segments: Vec<_> = grid
        .line_segments()
        .into_iter()
        .map(|[a, b]| {
            let through_center =
                (a.x.abs() < 1e-4 && b.x.abs() < 1e-4) || (a.z.abs() < 1e-4 && b.z.abs() < 1e-4);
            let color = if through_center {
                grid.center_color
            } else {
                line_color
            };
            ([a, b], color)
        })
        .collect();
    colored_lines(&segments)
}

fn axes_mesh(axes: &AxesHelper) -> Mesh {
    colored_lines(&axes.segments())
}

/// Helper material: vertex colours carry the hue, the material only opacity
fn helper_material(material: &Material) -> StandardMaterial {
    let opacity = match *material {
        Material::Line { opacity, .. } => opacity,
        _ => 1.0,
    };
    standard_material(&Material::Line {
        color: Rgb::WHITE,
        opacity,
    })
}

/// Despawn everything once the session has released its render target
fn release_scene(
    mut commands: Commands,
    viewport: Res<Viewport>,
    mut mirror: ResMut<SceneMirror>,
    entities: Query<Entity, With<ViewportEntity>>,
) {
    if !mirror.spawned || !viewport.target.is_released() {
        return;
    }
    let mut count = 0;
    for entity in entities.iter() {
        commands.entity(entity).despawn();
        count += 1;
    }
    *mirror = SceneMirror::default();
    info!(entities = count, "Viewport entities released");
}

/// Spawn camera, lights and helpers once the session is mounted
fn spawn_scene(
    mut commands: Commands,
    viewport: Res<Viewport>,
    mut mirror: ResMut<SceneMirror>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if mirror.spawned || !viewport.session.is_ready() {
        return;
    }
    let Some(settings) = viewport.target.settings() else {
        return;
    };
    let scene = viewport.session.scene();
    let camera = viewport.session.camera_view();

    commands.insert_resource(ClearColor(srgb(settings.clear_color)));
    commands.insert_resource(DirectionalLightShadowMap {
        size: settings.shadow_map_size as usize,
    });

    let msaa = if settings.antialias {
        Msaa::Sample4
    } else {
        Msaa::Off
    };
    let mut camera_entity = commands.spawn((
        Camera3d::default(),
        Projection::Perspective(perspective(&camera.lens)),
        Transform::from_translation(camera.position).looking_at(camera.target, Vec3::Y),
        msaa,
        DistanceFog {
            color: srgb(scene.fog.color),
            falloff: FogFalloff::Linear {
                start: scene.fog.near,
                end: scene.fog.far,
            },
            ..default()
        },
        MainCamera,
        ViewportEntity,
    ));

    for node in scene.nodes() {
        if let NodeKind::AmbientLight(light) = &node.kind {
            camera_entity.insert(AmbientLight {
                color: srgb(light.color),
                brightness: light.intensity * AMBIENT_BRIGHTNESS_PER_INTENSITY,
                ..default()
            });
        }
    }

    for node in scene.nodes() {
        let tag = SceneNodeEntity {
            name: node.name.clone(),
        };
        let visibility = node_visibility(node);
        match &node.kind {
            NodeKind::DirectionalLight(light) => {
                let mut entity = commands.spawn((
                    DirectionalLight {
                        color: srgb(light.color),
                        illuminance: light.intensity * LUX_PER_INTENSITY,
                        shadows_enabled: light.shadow.is_some(),
                        ..default()
                    },
                    Transform::from_translation(node.translation).looking_at(Vec3::ZERO, Vec3::Y),
                    visibility,
                    tag,
                    ViewportEntity,
                ));
                if let Some(shadow) = light.shadow {
                    entity.insert(
                        CascadeShadowConfigBuilder {
                            num_cascades: 1,
                            minimum_distance: shadow.near,
                            maximum_distance: shadow.far,
                            ..default()
                        }
                        .build(),
                    );
                }
            }
            NodeKind::PointLight(light) => {
                commands.spawn((
                    PointLight {
                        color: srgb(light.color),
                        intensity: light.intensity * LUMENS_PER_INTENSITY,
                        range: light.range,
                        shadows_enabled: false,
                        ..default()
                    },
                    Transform::from_translation(node.translation),
                    visibility,
                    tag,
                    ViewportEntity,
                ));
            }
            NodeKind::Grid(grid) => {
                commands.spawn((
                    Mesh3d(meshes.add(grid_mesh(grid))),
                    MeshMaterial3d(materials.add(helper_material(&grid.material))),
                    Transform::from_translation(node.translation),
                    visibility,
                    tag,
                    ViewportEntity,
                ));
            }
            NodeKind::Axes(axes) => {
                commands.spawn((
                    Mesh3d(meshes.add(axes_mesh(axes))),
                    MeshMaterial3d(materials.add(helper_material(&axes.material))),
                    Transform::from_translation(node.translation),
                    visibility,
                    tag,
                    ViewportEntity,
                ));
            }
            // Ambient light lives on the camera; the group is built separately
            NodeKind::AmbientLight(_) | NodeKind::Group(_) => {}
        }
    }

    mirror.spawned = true;
    info!(nodes = scene.nodes().len(), "Viewport scene spawned");
}

fn spawn_group(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    node: &SceneNode,
    group: &MeshGroup,
) {
    commands
        .spawn((
            Transform::from_translation(node.translation)
                .with_rotation(Quat::from_rotation_y(node.yaw)),
            node_visibility(node),
            SceneNodeEntity {
                name: node.name.clone(),
            },
            DisplayedGeometry,
            ViewportEntity,
        ))
        .with_children(|parent| {
            for (index, part) in group.meshes.iter().enumerate() {
                let variants = PartMeshes {
                    triangles: meshes.add(triangle_mesh(&part.geometry)),
                    edges: meshes.add(edge_mesh(&part.geometry)),
                    points: meshes.add(point_mesh(&part.geometry)),
                };
                parent.spawn((
                    Mesh3d(variants.for_material(&part.material)),
                    MeshMaterial3d(materials.add(standard_material(&part.material))),
                    Transform::default(),
                    DisplayedPart { index },
                    variants,
                ));
            }
        });
}

/// Replace the displayed geometry entities when the session swaps the group
fn rebuild_displayed_geometry(
    mut commands: Commands,
    viewport: Res<Viewport>,
    mut mirror: ResMut<SceneMirror>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    groups: Query<Entity, With<DisplayedGeometry>>,
) {
    if !mirror.spawned || !viewport.session.is_ready() {
        return;
    }
    let scene = viewport.session.scene();
    if mirror.generation == Some(scene.generation()) {
        return;
    }

    for entity in groups.iter() {
        commands.entity(entity).despawn();
    }
    if let Some(node) = scene.node(names::DISPLAYED_GEOMETRY) {
        if let NodeKind::Group(group) = &node.kind {
            spawn_group(&mut commands, &mut meshes, &mut materials, node, group);
            debug!(meshes = group.meshes.len(), source = ?group.source, "Displayed geometry spawned");
        }
    }
    mirror.generation = Some(scene.generation());
}

/// Push visibility and material changes onto the existing entities
fn apply_scene_changes(
    viewport: Res<Viewport>,
    mut mirror: ResMut<SceneMirror>,
    mut nodes: Query<(&SceneNodeEntity, &mut Visibility)>,
    mut parts: Query<(
        &DisplayedPart,
        &PartMeshes,
        &mut Mesh3d,
        &MeshMaterial3d<StandardMaterial>,
    )>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !mirror.spawned || !viewport.session.is_ready() {
        return;
    }
    let scene = viewport.session.scene();
    if mirror.revision == Some(scene.revision()) {
        return;
    }

    for (tag, mut visibility) in nodes.iter_mut() {
        if let Some(node) = scene.node(&tag.name) {
            *visibility = node_visibility(node);
        }
    }

    if let Some(group) = scene.displayed_geometry() {
        for (part, variants, mut mesh, material) in parts.iter_mut() {
            let Some(node) = group.meshes.get(part.index) else {
                continue;
            };
            mesh.0 = variants.for_material(&node.material);
            if let Some(existing) = materials.get_mut(&material.0) {
                *existing = standard_material(&node.material);
            }
        }
    }
    mirror.revision = Some(scene.revision());
}

/// Move the camera and spin the geometry to match the rendered frame
fn apply_frame(
    mut viewport: ResMut<Viewport>,
    mut cameras: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
    mut groups: Query<&mut Transform, (With<DisplayedGeometry>, Without<MainCamera>)>,
) {
    let Some(frame) = viewport.target.take_frame() else {
        return;
    };

    if let Ok((mut transform, mut projection)) = cameras.single_mut() {
        *transform = Transform::from_translation(frame.camera.position)
            .looking_at(frame.camera.target, Vec3::Y);
        if let Projection::Perspective(perspective) = projection.as_mut() {
            perspective.fov = frame.camera.lens.fov_y_radians;
            perspective.near = frame.camera.lens.near;
            perspective.far = frame.camera.lens.far;
        }
    }

    if let Some(yaw) = frame.yaw {
        for mut transform in groups.iter_mut() {
            transform.rotation = Quat::from_rotation_y(yaw);
        }
    }
}

/// Cap the backing-store density at the session's pixel ratio
fn apply_surface_size(
    mut viewport: ResMut<Viewport>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    let Some(size) = viewport.target.take_resize() else {
        return;
    };
    let Ok(mut window) = windows.single_mut() else {
        return;
    };
    // Only denser-than-capped screens need an override
    if window.resolution.base_scale_factor() > size.pixel_ratio {
        window
            .resolution
            .set_scale_factor_override(Some(size.pixel_ratio));
    }
    debug!(
        width = size.width,
        height = size.height,
        pixel_ratio = size.pixel_ratio,
        "Surface size applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadview_core::config::SceneConfig;

    fn grid() -> GridHelper {
        let scene = SceneGraph::build(&SceneConfig::default());
        match &scene.node(names::GRID).unwrap().kind {
            NodeKind::Grid(grid) => grid.clone(),
            other => panic!("unexpected grid kind {other:?}"),
        }
    }

    #[test]
    fn test_part_meshes_per_topology() {
        let data = MeshData::cylinder(1.0, 2.0, 8);

        let triangles = triangle_mesh(&data);
        assert_eq!(triangles.primitive_topology(), PrimitiveTopology::TriangleList);
        assert_eq!(triangles.indices().unwrap().len(), data.indices.len());

        let edges = edge_mesh(&data);
        assert_eq!(edges.primitive_topology(), PrimitiveTopology::LineList);
        assert_eq!(edges.indices().unwrap().len() % 2, 0);

        let points = point_mesh(&data);
        assert_eq!(points.primitive_topology(), PrimitiveTopology::PointList);
        assert_eq!(points.count_vertices(), data.vertex_count());
        assert!(points.indices().is_none());
    }

    #[test]
    fn test_grid_mesh_has_two_vertices_per_line() {
        let grid = grid();
        let mesh = grid_mesh(&grid);
        assert_eq!(mesh.count_vertices(), grid.line_segments().len() * 2);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_COLOR).is_some());
    }

    #[test]
    fn test_helper_material_is_translucent() {
        let material = helper_material(&grid().material);
        assert!(material.unlit);
        assert!(matches!(material.alpha_mode, AlphaMode::Blend));
    }

    #[test]
    fn test_materials_follow_view_mode() {
        let color = Rgb::new(0.2, 0.4, 0.8);
        let solid = standard_material(&Material::Standard {
            color,
            roughness: 0.3,
            metalness: 0.1,
        });
        assert!(!solid.unlit);
        assert_eq!(solid.perceptual_roughness, 0.3);
        assert_eq!(solid.metallic, 0.1);

        let wire = standard_material(&Material::Wireframe { color });
        assert!(wire.unlit);
    }

    #[test]
    fn test_target_records_frames_after_initialize() {
        let mut target = BevyTarget::default();
        let settings = SurfaceSettings::from_config(&Default::default(), Rgb::WHITE);
        assert!(matches!(
            target.initialize(&settings),
            Err(ViewportError::ContextUnavailable(_))
        ));

        target.set_gpu_available(true);
        target.initialize(&settings).unwrap();
        let scene = SceneGraph::build(&SceneConfig::default());
        let rig = cadview_core::OrbitRig::new(&Default::default());
        let lens = PerspectiveLens::new(&Default::default());
        target.render(&scene, &CameraView::new(&rig, lens)).unwrap();
        let frame = target.take_frame().unwrap();
        assert_eq!(frame.yaw, Some(0.0));
        assert!(target.take_frame().is_none());

        target.release();
        assert!(target.is_released());
        assert!(target.render(&scene, &CameraView::new(&rig, lens)).is_err());
    }
}
