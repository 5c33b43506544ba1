//! Viewer configuration loading
//!
//! Every field has a default matching the stock viewer, so an empty file
//! (or no file at all) yields the standard scene.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Invalid colour '{0}', expected #rrggbb")]
    InvalidColor(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Radians of orbit per pixel of pointer travel
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Fraction of the remaining distance covered per drag update
    #[serde(default = "default_drag_smoothing")]
    pub drag_smoothing: f32,
    /// Radius multiplier per wheel step away from the model
    #[serde(default = "default_zoom_out_factor")]
    pub zoom_out_factor: f32,
    /// Radius multiplier per wheel step towards the model
    #[serde(default = "default_zoom_in_factor")]
    pub zoom_in_factor: f32,
    #[serde(default = "default_min_radius")]
    pub min_radius: f32,
    #[serde(default = "default_max_radius")]
    pub max_radius: f32,
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            drag_smoothing: default_drag_smoothing(),
            zoom_out_factor: default_zoom_out_factor(),
            zoom_in_factor: default_zoom_in_factor(),
            min_radius: default_min_radius(),
            max_radius: default_max_radius(),
            fov_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
        }
    }
}

fn default_sensitivity() -> f32 {
    0.008
}

fn default_drag_smoothing() -> f32 {
    0.1
}

fn default_zoom_out_factor() -> f32 {
    1.1
}

fn default_zoom_in_factor() -> f32 {
    0.9
}

fn default_min_radius() -> f32 {
    3.0
}

fn default_max_radius() -> f32 {
    50.0
}

fn default_fov() -> f32 {
    75.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Background colour, also used for the fog
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_fog_near")]
    pub fog_near: f32,
    #[serde(default = "default_fog_far")]
    pub fog_far: f32,
    /// Colour of the displayed geometry in every view mode
    #[serde(default = "default_accent")]
    pub accent: String,
    /// Edge length of the ground grid in world units
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
    #[serde(default = "default_grid_divisions")]
    pub grid_divisions: u32,
    #[serde(default = "default_grid_opacity")]
    pub grid_opacity: f32,
    #[serde(default = "default_axes_length")]
    pub axes_length: f32,
    /// Square shadow map resolution of the key light
    #[serde(default = "default_shadow_map_size")]
    pub shadow_map_size: u32,
    #[serde(default = "default_point_size")]
    pub point_size: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            fog_near: default_fog_near(),
            fog_far: default_fog_far(),
            accent: default_accent(),
            grid_size: default_grid_size(),
            grid_divisions: default_grid_divisions(),
            grid_opacity: default_grid_opacity(),
            axes_length: default_axes_length(),
            shadow_map_size: default_shadow_map_size(),
            point_size: default_point_size(),
        }
    }
}

fn default_background() -> String {
    "#1a1d23".to_string()
}

fn default_fog_near() -> f32 {
    10.0
}

fn default_fog_far() -> f32 {
    100.0
}

fn default_accent() -> String {
    "#4a90d9".to_string()
}

fn default_grid_size() -> f32 {
    20.0
}

fn default_grid_divisions() -> u32 {
    40
}

fn default_grid_opacity() -> f32 {
    0.6
}

fn default_axes_length() -> f32 {
    3.0
}

fn default_shadow_map_size() -> u32 {
    4096
}

fn default_point_size() -> f32 {
    0.05
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Yaw added to the displayed geometry on every frame (radians)
    #[serde(default = "default_idle_rotation_step")]
    pub idle_rotation_step: f32,
    #[serde(default = "default_max_pixel_ratio")]
    pub max_pixel_ratio: f32,
    #[serde(default = "default_export_file_name")]
    pub export_file_name: String,
    /// Keep the draw buffer after presenting; export reads the last frame
    #[serde(default = "default_true")]
    pub preserve_drawing_buffer: bool,
    #[serde(default = "default_true")]
    pub antialias: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            idle_rotation_step: default_idle_rotation_step(),
            max_pixel_ratio: default_max_pixel_ratio(),
            export_file_name: default_export_file_name(),
            preserve_drawing_buffer: true,
            antialias: true,
        }
    }
}

fn default_idle_rotation_step() -> f32 {
    0.005
}

fn default_max_pixel_ratio() -> f32 {
    2.0
}

fn default_export_file_name() -> String {
    "cad-model.png".to_string()
}

fn default_true() -> bool {
    true
}

impl ViewerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check colours and the numeric ranges the camera and surface rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        for color in [&self.scene.background, &self.scene.accent] {
            if parse_hex_color(color).is_none() {
                return Err(ConfigError::InvalidColor(color.clone()));
            }
        }

        let camera = &self.camera;
        positive("camera.min_radius", camera.min_radius)?;
        positive("camera.max_radius", camera.max_radius)?;
        if camera.min_radius > camera.max_radius {
            return Err(ConfigError::InvalidValue {
                field: "camera.min_radius",
                reason: format!(
                    "{} is larger than max_radius {}",
                    camera.min_radius, camera.max_radius
                ),
            });
        }
        positive("camera.zoom_in_factor", camera.zoom_in_factor)?;
        positive("camera.zoom_out_factor", camera.zoom_out_factor)?;
        positive("render.max_pixel_ratio", self.render.max_pixel_ratio)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected a finite value above zero, got {}", value),
        })
    }
}

/// Load configuration from a file, falling back to defaults when it does not exist
pub fn load_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(ViewerConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = ViewerConfig::from_toml_str(&content)?;
    debug!(path = %path.display(), "Loaded viewer config");
    Ok(config)
}

/// sRGB colour with components in 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Parse "#rrggbb" (leading '#' optional)
pub fn parse_hex_color(s: &str) -> Option<Rgb> {
    let digits = s.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(Rgb::from_hex)
}
