//! View modes and toggle state

use std::fmt;

use crate::config::Rgb;
use crate::scene::{Material, SceneGraph};

/// Shading applied to the displayed geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Solid,
    Wireframe,
    Points,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Solid, ViewMode::Wireframe, ViewMode::Points];

    /// solid -> wireframe -> points -> solid
    pub fn next(self) -> Self {
        match self {
            ViewMode::Solid => ViewMode::Wireframe,
            ViewMode::Wireframe => ViewMode::Points,
            ViewMode::Points => ViewMode::Solid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Solid => "Solid",
            ViewMode::Wireframe => "Wireframe",
            ViewMode::Points => "Points",
        }
    }

    /// Material used for displayed meshes in this mode
    pub fn material(self, palette: &Palette) -> Material {
        match self {
            ViewMode::Solid => Material::Standard {
                color: palette.accent,
                roughness: 0.3,
                metalness: 0.1,
            },
            ViewMode::Wireframe => Material::Wireframe {
                color: palette.accent,
            },
            ViewMode::Points => Material::Points {
                color: palette.accent,
                size: palette.point_size,
            },
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Colours and sizes shared by every view mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub accent: Rgb,
    pub point_size: f32,
}

/// Restyle every displayed mesh for `mode`; helpers are left untouched
pub fn apply_view_mode(scene: &mut SceneGraph, mode: ViewMode, palette: &Palette) -> usize {
    let material = mode.material(palette);
    let mut restyled = 0;
    for mesh in scene.meshes_mut() {
        mesh.material = material;
        restyled += 1;
    }
    restyled
}

/// Session flags mirrored by the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub mode: ViewMode,
    pub grid_visible: bool,
    pub axes_visible: bool,
    pub fullscreen: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            mode: ViewMode::Solid,
            grid_visible: true,
            axes_visible: true,
            fullscreen: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::scene::{accent_color, names, NodeKind};

    fn palette() -> Palette {
        let config = SceneConfig::default();
        Palette {
            accent: accent_color(&config),
            point_size: config.point_size,
        }
    }

    #[test]
    fn test_cycle_order() {
        assert_eq!(ViewMode::Solid.next(), ViewMode::Wireframe);
        assert_eq!(ViewMode::Wireframe.next(), ViewMode::Points);
        assert_eq!(ViewMode::Points.next(), ViewMode::Solid);
        for mode in ViewMode::ALL {
            assert_eq!(mode.next().next().next(), mode);
        }
    }

    #[test]
    fn test_materials_per_mode() {
        let palette = palette();
        assert!(matches!(
            ViewMode::Solid.material(&palette),
            Material::Standard { roughness, metalness, .. } if roughness == 0.3 && metalness == 0.1
        ));
        assert!(matches!(
            ViewMode::Wireframe.material(&palette),
            Material::Wireframe { .. }
        ));
        assert!(matches!(
            ViewMode::Points.material(&palette),
            Material::Points { size, .. } if size == 0.05
        ));
    }

    #[test]
    fn test_apply_skips_helpers() {
        let palette = palette();
        let mut scene = SceneGraph::build(&SceneConfig::default());
        let grid_before = scene.node(names::GRID).cloned();
        let axes_before = scene.node(names::AXES).cloned();

        let restyled = apply_view_mode(&mut scene, ViewMode::Points, &palette);
        assert_eq!(restyled, scene.meshes().count());
        assert!(scene
            .meshes()
            .all(|m| matches!(m.material, Material::Points { .. })));

        assert_eq!(scene.node(names::GRID).cloned(), grid_before);
        assert_eq!(scene.node(names::AXES).cloned(), axes_before);
        assert!(matches!(
            scene.node(names::GRID).map(|n| &n.kind),
            Some(NodeKind::Grid(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(ViewMode::Wireframe.to_string(), "Wireframe");
    }
}
