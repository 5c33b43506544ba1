//! Orbit camera rig
//!
//! The camera circles a fixed target (the world origin) on a sphere
//! described by azimuth, elevation and radius. Y is up.
//!
//! Dragging moves the camera part of the way towards the new spherical
//! position on every update, which damps pointer noise. Zoom and reset snap
//! straight to their destination.

use glam::{Mat4, Vec2, Vec3};
use std::f32::consts::PI;
use tracing::debug;

use crate::config::CameraConfig;

/// Elevation is kept inside ±PI / 2.2 so the camera never flips over the pole
pub const ELEVATION_LIMIT: f32 = PI / 2.2;

/// Largest elevation actually reached; the limit itself is excluded
const MAX_ELEVATION: f32 = ELEVATION_LIMIT - f32::EPSILON;

/// Where the camera sits on mount and after a reset
pub const HOME_POSITION: Vec3 = Vec3::new(10.0, 10.0, 10.0);

/// Radius restored by a reset
pub const RESET_RADIUS: f32 = 10.0;

/// Wheel direction relative to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    /// Move away from the model (radius grows)
    Out,
    /// Move towards the model (radius shrinks)
    In,
}

impl ZoomDirection {
    /// Map a wheel delta in DOM convention (positive = scroll down) to a direction
    pub fn from_wheel_delta(delta: f32) -> Option<Self> {
        if delta > 0.0 {
            Some(ZoomDirection::Out)
        } else if delta < 0.0 {
            Some(ZoomDirection::In)
        } else {
            None
        }
    }
}

/// Orbit-style camera controller
#[derive(Debug, Clone)]
pub struct OrbitRig {
    azimuth: f32,
    elevation: f32,
    radius: f32,
    position: Vec3,
    target: Vec3,
    /// Last sampled pointer position while a drag is active
    drag_anchor: Option<Vec2>,
    sensitivity: f32,
    drag_smoothing: f32,
    zoom_out_factor: f32,
    zoom_in_factor: f32,
    min_radius: f32,
    max_radius: f32,
}

impl OrbitRig {
    pub fn new(config: &CameraConfig) -> Self {
        let mut rig = Self {
            azimuth: 0.0,
            elevation: 0.0,
            radius: RESET_RADIUS,
            position: HOME_POSITION,
            target: Vec3::ZERO,
            drag_anchor: None,
            sensitivity: config.sensitivity,
            drag_smoothing: config.drag_smoothing.clamp(0.0, 1.0),
            zoom_out_factor: config.zoom_out_factor,
            zoom_in_factor: config.zoom_in_factor,
            min_radius: config.min_radius,
            max_radius: config.max_radius.max(config.min_radius),
        };
        rig.set_spherical_from(HOME_POSITION);
        rig
    }

    /// Derive azimuth, elevation and radius from a position relative to the target
    fn set_spherical_from(&mut self, position: Vec3) {
        let offset = position - self.target;
        let radius = offset.length();
        self.radius = radius.clamp(self.min_radius, self.max_radius);
        self.elevation = if radius > 0.0 {
            (offset.y / radius).asin().clamp(-MAX_ELEVATION, MAX_ELEVATION)
        } else {
            0.0
        };
        self.azimuth = offset.x.atan2(offset.z);
    }

    /// Cartesian position for the current spherical coordinates
    pub fn spherical_position(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        self.target
            + Vec3::new(
                self.radius * cos_el * sin_az,
                self.radius * sin_el,
                self.radius * cos_el * cos_az,
            )
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.drag_anchor = Some(Vec2::new(x, y));
    }

    /// Orbit by the pointer travel since the last sample.
    ///
    /// Returns false (and does nothing) when no drag is active.
    pub fn update_drag(&mut self, x: f32, y: f32) -> bool {
        let Some(anchor) = self.drag_anchor else {
            return false;
        };
        let pointer = Vec2::new(x, y);
        let delta = pointer - anchor;

        self.azimuth += delta.x * self.sensitivity;
        self.elevation = (self.elevation + delta.y * self.sensitivity)
            .clamp(-MAX_ELEVATION, MAX_ELEVATION);

        let goal = self.spherical_position();
        self.position = self.position.lerp(goal, self.drag_smoothing);
        self.drag_anchor = Some(pointer);
        true
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Scale the radius by one wheel step and snap the camera
    pub fn zoom(&mut self, direction: ZoomDirection) {
        let factor = match direction {
            ZoomDirection::Out => self.zoom_out_factor,
            ZoomDirection::In => self.zoom_in_factor,
        };
        self.radius = (self.radius * factor).clamp(self.min_radius, self.max_radius);
        self.position = self.spherical_position();
        debug!(radius = self.radius, ?direction, "Camera zoom");
    }

    /// Return to the home view.
    ///
    /// The spherical state is zeroed while the position snaps to
    /// [`HOME_POSITION`]; the next drag or zoom continues from the zeroed
    /// angles.
    pub fn reset(&mut self) {
        self.azimuth = 0.0;
        self.elevation = 0.0;
        self.radius = RESET_RADIUS.clamp(self.min_radius, self.max_radius);
        self.position = HOME_POSITION;
        self.drag_anchor = None;
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// World-to-view transform, always aimed at the target
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveLens {
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveLens {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            fov_y_radians: config.fov_degrees.to_radians(),
            aspect: 1.0,
            near: config.near,
            far: config.far,
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.near, self.far)
    }
}

/// Camera state handed to a render target for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub target: Vec3,
    pub lens: PerspectiveLens,
}

impl CameraView {
    pub fn new(rig: &OrbitRig, lens: PerspectiveLens) -> Self {
        Self {
            position: rig.position(),
            target: rig.target(),
            lens,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.lens.projection_matrix() * Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> OrbitRig {
        OrbitRig::new(&CameraConfig::default())
    }

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn test_initial_state_matches_home() {
        let rig = rig();
        assert_vec_eq(rig.position(), HOME_POSITION);
        assert_vec_eq(rig.spherical_position(), HOME_POSITION);
        assert!((rig.radius() - 300.0f32.sqrt()).abs() < 1e-4);
        assert!((rig.azimuth() - PI / 4.0).abs() < 1e-5);
        assert!(!rig.is_dragging());
    }

    #[test]
    fn test_update_without_drag_is_ignored() {
        let mut rig = rig();
        let before = rig.position();
        assert!(!rig.update_drag(300.0, 300.0));
        assert_eq!(rig.position(), before);
    }

    #[test]
    fn test_drag_interpolates_towards_goal() {
        let mut rig = rig();
        let start = rig.position();
        rig.begin_drag(0.0, 0.0);
        assert!(rig.update_drag(50.0, 0.0));

        let goal = rig.spherical_position();
        let expected = start.lerp(goal, 0.1);
        assert_vec_eq(rig.position(), expected);
        assert!((rig.azimuth() - (PI / 4.0 + 50.0 * 0.008)).abs() < 1e-5);
    }

    #[test]
    fn test_drag_uses_delta_since_last_sample() {
        let mut rig = rig();
        let az0 = rig.azimuth();
        rig.begin_drag(10.0, 10.0);
        rig.update_drag(20.0, 10.0);
        rig.update_drag(25.0, 10.0);
        assert!((rig.azimuth() - (az0 + 15.0 * 0.008)).abs() < 1e-5);
    }

    #[test]
    fn test_elevation_stays_bounded() {
        let mut rig = rig();
        rig.begin_drag(0.0, 0.0);
        let mut y = 0.0;
        for step in 0..200 {
            y += if step < 100 { 37.0 } else { -91.0 };
            rig.update_drag(step as f32 * 3.0, y);
            assert!(rig.elevation().abs() < ELEVATION_LIMIT);
        }
        rig.end_drag();
        assert!(!rig.is_dragging());
    }

    #[test]
    fn test_hard_drag_stops_short_of_limit() {
        let mut rig = rig();
        rig.begin_drag(0.0, 0.0);
        rig.update_drag(0.0, 10000.0);
        assert!(rig.elevation() > 0.0);
        assert!(rig.elevation() < ELEVATION_LIMIT);

        rig.update_drag(0.0, -20000.0);
        assert!(rig.elevation() < 0.0);
        assert!(rig.elevation() > -ELEVATION_LIMIT);
    }

    #[test]
    fn test_zoom_bounds() {
        let mut rig = rig();
        for _ in 0..100 {
            rig.zoom(ZoomDirection::Out);
            assert!(rig.radius() <= 50.0);
        }
        assert_eq!(rig.radius(), 50.0);

        for _ in 0..100 {
            rig.zoom(ZoomDirection::In);
            assert!(rig.radius() >= 3.0);
        }
        assert_eq!(rig.radius(), 3.0);
    }

    #[test]
    fn test_five_zoom_steps_from_reset_radius() {
        let mut rig = rig();
        rig.reset();
        let mut expected = 10.0f32;
        for _ in 0..5 {
            rig.zoom(ZoomDirection::Out);
            expected = (expected * 1.1).min(50.0);
            assert!((rig.radius() - expected).abs() < 1e-4);
        }
        assert!(rig.radius() <= 50.0);
    }

    #[test]
    fn test_zoom_snaps_position() {
        let mut rig = rig();
        rig.zoom(ZoomDirection::In);
        assert_vec_eq(rig.position(), rig.spherical_position());
        assert!((rig.position().length() - rig.radius()).abs() < 1e-4);
    }

    #[test]
    fn test_reset_after_drag() {
        let mut rig = rig();
        rig.begin_drag(0.0, 0.0);
        rig.update_drag(100.0, 0.0);
        rig.end_drag();
        rig.reset();

        assert_eq!(rig.position(), HOME_POSITION);
        assert_eq!(rig.target(), Vec3::ZERO);
        assert_eq!(rig.azimuth(), 0.0);
        assert_eq!(rig.elevation(), 0.0);
        assert_eq!(rig.radius(), 10.0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut rig = rig();
        rig.zoom(ZoomDirection::Out);
        rig.begin_drag(0.0, 0.0);
        rig.update_drag(-40.0, 70.0);
        rig.reset();
        let first = (rig.position(), rig.azimuth(), rig.elevation(), rig.radius());
        rig.reset();
        let second = (rig.position(), rig.azimuth(), rig.elevation(), rig.radius());
        assert_eq!(first, second);
        assert!(!rig.is_dragging());
    }

    #[test]
    fn test_wheel_delta_mapping() {
        assert_eq!(ZoomDirection::from_wheel_delta(120.0), Some(ZoomDirection::Out));
        assert_eq!(ZoomDirection::from_wheel_delta(-3.0), Some(ZoomDirection::In));
        assert_eq!(ZoomDirection::from_wheel_delta(0.0), None);
    }

    #[test]
    fn test_view_matrix_looks_at_origin() {
        let rig = rig();
        let origin_in_view = rig.view_matrix().transform_point3(Vec3::ZERO);
        // Origin lies straight ahead on -Z in view space
        assert!(origin_in_view.x.abs() < 1e-4);
        assert!(origin_in_view.y.abs() < 1e-4);
        assert!(origin_in_view.z < 0.0);
    }
}
