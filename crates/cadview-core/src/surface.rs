//! Seams to the host platform: the render surface and fullscreen control

use crate::camera::CameraView;
use crate::config::{Rgb, ViewerConfig};
use crate::error::Result;
use crate::scene::SceneGraph;

/// Container size as laid out by the host
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceSize {
    /// Logical width in CSS pixels
    pub width: f32,
    /// Logical height in CSS pixels
    pub height: f32,
    /// Device pixel ratio after capping
    pub pixel_ratio: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Zero-area (or nonsensical) containers cannot be rendered into
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    pub fn aspect(&self) -> Option<f32> {
        (!self.is_empty()).then(|| self.width / self.height)
    }

    /// Backing-store size in device pixels
    pub fn physical(&self) -> (u32, u32) {
        (
            (self.width * self.pixel_ratio).round() as u32,
            (self.height * self.pixel_ratio).round() as u32,
        )
    }
}

/// Options the render surface is created with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSettings {
    pub antialias: bool,
    /// Keep the last frame readable after presenting (required for export)
    pub preserve_drawing_buffer: bool,
    pub shadow_map_size: u32,
    pub clear_color: Rgb,
}

impl SurfaceSettings {
    pub fn from_config(config: &ViewerConfig, clear_color: Rgb) -> Self {
        Self {
            antialias: config.render.antialias,
            preserve_drawing_buffer: config.render.preserve_drawing_buffer,
            shadow_map_size: config.scene.shadow_map_size,
            clear_color,
        }
    }
}

/// Something that turns a scene and camera into pixels
pub trait RenderTarget {
    /// Acquire the rendering context. Failure leaves the viewport unmounted.
    fn initialize(&mut self, settings: &SurfaceSettings) -> Result<()>;
    fn set_size(&mut self, size: SurfaceSize);
    fn render(&mut self, scene: &SceneGraph, camera: &CameraView) -> Result<()>;
    /// Free every GPU-side resource owned by the target
    fn release(&mut self);
}

/// Platform fullscreen API
pub trait FullscreenHost {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self) -> Result<()>;
    fn exit_fullscreen(&mut self) -> Result<()>;
}
