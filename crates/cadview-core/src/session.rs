//! Viewport session - the complete live state of one mounted viewer
//!
//! All viewer state hangs off a single [`ViewportSession`]: camera, scene,
//! view flags and the render loop. Nothing is global, so two sessions on
//! the same page never interfere.

use tracing::{debug, error, info, warn};

use crate::camera::{CameraView, OrbitRig, PerspectiveLens, ZoomDirection};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewportError};
use crate::export::{encode_png, ExportedImage, FrameCapture, PNG_MIME_TYPE};
use crate::render_loop::{FrameScheduler, FrameToken, RenderLoop};
use crate::scene::{accent_color, names, GeometryResolver, GeometrySource, PlaceholderResolver, SceneGraph};
use crate::surface::{FullscreenHost, RenderTarget, SurfaceSettings, SurfaceSize};
use crate::view::{apply_view_mode, Palette, ViewMode, ViewState};

/// Lifecycle of a session, published to the host so it can show a fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Ready,
    Failed(String),
    Unmounted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Ready => "ready",
            SessionStatus::Failed(_) => "failed",
            SessionStatus::Unmounted => "unmounted",
        }
    }
}

/// What happened to a delivered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The token was stale or the session is not running
    Ignored,
    /// The container has no area yet; nothing was drawn
    Deferred,
    Rendered,
}

pub struct ViewportSession {
    config: ViewerConfig,
    status: SessionStatus,
    surface: SurfaceSize,
    camera: OrbitRig,
    lens: PerspectiveLens,
    scene: SceneGraph,
    view: ViewState,
    palette: Palette,
    render_loop: RenderLoop,
    resolver: Box<dyn GeometryResolver + Send + Sync>,
    model_ref: Option<String>,
}

impl ViewportSession {
    pub fn new(config: ViewerConfig) -> Self {
        Self::with_resolver(config, Box::new(PlaceholderResolver))
    }

    pub fn with_resolver(
        config: ViewerConfig,
        resolver: Box<dyn GeometryResolver + Send + Sync>,
    ) -> Self {
        let palette = Palette {
            accent: accent_color(&config.scene),
            point_size: config.scene.point_size,
        };
        Self {
            status: SessionStatus::Initializing,
            surface: SurfaceSize::default(),
            camera: OrbitRig::new(&config.camera),
            lens: PerspectiveLens::new(&config.camera),
            scene: SceneGraph::build(&config.scene),
            view: ViewState::default(),
            palette,
            render_loop: RenderLoop::new(config.render.idle_rotation_step),
            resolver,
            model_ref: None,
            config,
        }
    }

    /// Acquire the render target, size it and start the render loop.
    ///
    /// On failure the session is marked failed and the loop is not started.
    pub fn mount(
        &mut self,
        target: &mut dyn RenderTarget,
        scheduler: &mut dyn FrameScheduler,
        container: SurfaceSize,
    ) -> Result<()> {
        if self.status == SessionStatus::Ready {
            return Ok(());
        }

        let settings = SurfaceSettings::from_config(&self.config, self.scene.background);
        if let Err(e) = target.initialize(&settings) {
            error!("Viewport initialization failed: {}", e);
            self.status = SessionStatus::Failed(e.to_string());
            return Err(e);
        }

        if self.status == SessionStatus::Unmounted {
            self.rebuild_scene();
        }
        self.status = SessionStatus::Ready;
        self.resize_to_container(container, target);
        self.render_loop.start(scheduler);
        info!(
            width = container.width,
            height = container.height,
            "Viewport mounted"
        );
        Ok(())
    }

    /// Fresh scene after an unmount: lights, helpers and the current model
    fn rebuild_scene(&mut self) {
        self.scene = SceneGraph::build(&self.config.scene);
        self.view = ViewState {
            fullscreen: self.view.fullscreen,
            ..ViewState::default()
        };
        let model_ref = self.model_ref.take();
        self.set_model(model_ref.as_deref());
    }

    /// Stop the loop and release every render resource
    pub fn unmount(&mut self, target: &mut dyn RenderTarget, scheduler: &mut dyn FrameScheduler) {
        if self.status == SessionStatus::Unmounted {
            return;
        }
        self.render_loop.stop(scheduler);
        self.camera.end_drag();
        let released = self.scene.clear();
        target.release();
        self.status = SessionStatus::Unmounted;
        info!(released, frames = self.render_loop.frames(), "Viewport unmounted");
    }

    /// One render-loop tick: draw, spin the model, ask for the next frame
    pub fn on_frame(
        &mut self,
        token: FrameToken,
        scheduler: &mut dyn FrameScheduler,
        target: &mut dyn RenderTarget,
    ) -> Result<FrameOutcome> {
        if !self.render_loop.accept(token) || self.status != SessionStatus::Ready {
            return Ok(FrameOutcome::Ignored);
        }

        let rendered = if self.surface.is_empty() {
            Ok(FrameOutcome::Deferred)
        } else {
            let camera = self.camera_view();
            target.render(&self.scene, &camera).map(|_| FrameOutcome::Rendered)
        };

        if self.scene.displayed_geometry_count() > 0 {
            let angle = self.render_loop.advance_idle_rotation();
            self.scene.set_displayed_yaw(angle);
        }

        self.render_loop.reschedule(scheduler);
        rendered
    }

    /// Track a container resize. Zero-area sizes are ignored.
    pub fn resize_to_container(&mut self, container: SurfaceSize, target: &mut dyn RenderTarget) -> bool {
        if container.is_empty() {
            debug!(
                width = container.width,
                height = container.height,
                "Ignoring zero-area resize"
            );
            return false;
        }

        let pixel_ratio = if container.pixel_ratio.is_finite() && container.pixel_ratio > 0.0 {
            container.pixel_ratio.min(self.config.render.max_pixel_ratio)
        } else {
            1.0
        };
        self.surface = SurfaceSize::new(container.width, container.height, pixel_ratio);
        self.lens.aspect = container.width / container.height;

        if self.status == SessionStatus::Ready {
            target.set_size(self.surface);
        }
        debug!(
            width = self.surface.width,
            height = self.surface.height,
            pixel_ratio,
            "Viewport resized"
        );
        true
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.camera.begin_drag(x, y);
    }

    pub fn update_drag(&mut self, x: f32, y: f32) -> bool {
        self.camera.update_drag(x, y)
    }

    pub fn end_drag(&mut self) {
        self.camera.end_drag();
    }

    pub fn zoom(&mut self, direction: ZoomDirection) {
        self.camera.zoom(direction);
    }

    /// Zoom by one step for a wheel delta (DOM sign convention)
    pub fn zoom_wheel(&mut self, delta: f32) -> bool {
        match ZoomDirection::from_wheel_delta(delta) {
            Some(direction) => {
                self.camera.zoom(direction);
                true
            }
            None => false,
        }
    }

    /// Show the geometry for `model_ref`, or the placeholder
    pub fn set_model(&mut self, model_ref: Option<&str>) -> GeometrySource {
        self.model_ref = model_ref.map(str::to_string);
        let material = self.view.mode.material(&self.palette);
        let source = self
            .scene
            .replace_displayed_geometry(model_ref, self.resolver.as_ref(), material);
        info!(model_ref = ?self.model_ref, ?source, "Model set");
        source
    }

    /// Advance solid -> wireframe -> points and restyle the displayed meshes
    pub fn cycle_view_mode(&mut self) -> ViewMode {
        let mode = self.view.mode.next();
        let restyled = apply_view_mode(&mut self.scene, mode, &self.palette);
        self.view.mode = mode;
        debug!(mode = %mode, restyled, "View mode changed");
        mode
    }

    pub fn toggle_grid(&mut self) -> bool {
        if let Some(visible) = self.scene.toggle_visibility(names::GRID) {
            self.view.grid_visible = visible;
        }
        self.view.grid_visible
    }

    pub fn toggle_axes(&mut self) -> bool {
        if let Some(visible) = self.scene.toggle_visibility(names::AXES) {
            self.view.axes_visible = visible;
        }
        self.view.axes_visible
    }

    /// Ask the platform to enter or leave fullscreen.
    ///
    /// The flag follows the request optimistically; the platform's change
    /// notification is authoritative and arrives via [`Self::sync_fullscreen`].
    pub fn toggle_fullscreen(&mut self, host: &mut dyn FullscreenHost) -> bool {
        let want = !self.view.fullscreen;
        let result = if want {
            host.request_fullscreen()
        } else {
            host.exit_fullscreen()
        };

        match result {
            Ok(()) => self.view.fullscreen = want,
            Err(e) => {
                warn!("Fullscreen toggle failed: {}", e);
                self.view.fullscreen = host.is_fullscreen();
            }
        }
        self.view.fullscreen
    }

    /// Adopt the platform's actual fullscreen state. Returns true if it changed.
    pub fn sync_fullscreen(&mut self, active: bool) -> bool {
        let changed = self.view.fullscreen != active;
        self.view.fullscreen = active;
        changed
    }

    pub fn reset_view(&mut self) {
        self.camera.reset();
    }

    /// Read back the last rendered frame and encode it as PNG
    pub fn export_image(&mut self, capture: &mut dyn FrameCapture) -> Result<ExportedImage> {
        if self.status != SessionStatus::Ready {
            return Err(ViewportError::NotMounted);
        }
        if !self.config.render.preserve_drawing_buffer {
            warn!("Drawing buffer is not preserved, export may be blank");
        }

        let frame = capture.capture()?;
        if frame.is_blank() {
            warn!(
                width = frame.width,
                height = frame.height,
                "Exporting a blank frame"
            );
        }
        let bytes = encode_png(&frame)?;
        info!(bytes = bytes.len(), "Exported frame");
        Ok(ExportedImage {
            file_name: self.config.render.export_file_name.clone(),
            mime_type: PNG_MIME_TYPE,
            bytes,
        })
    }

    pub fn camera_view(&self) -> CameraView {
        CameraView::new(&self.camera, self.lens)
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }

    pub fn camera(&self) -> &OrbitRig {
        &self.camera
    }

    pub fn lens(&self) -> &PerspectiveLens {
        &self.lens
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn model_ref(&self) -> Option<&str> {
        self.model_ref.as_deref()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{ELEVATION_LIMIT, HOME_POSITION};
    use crate::export::RgbaFrame;
    use crate::render_loop::FrameQueue;
    use crate::scene::{Material, NodeKind};
    use glam::Vec3;

    #[derive(Default)]
    struct RecordingTarget {
        fail_init: bool,
        initialized: Option<SurfaceSettings>,
        sizes: Vec<SurfaceSize>,
        renders: usize,
        released: bool,
    }

    impl RenderTarget for RecordingTarget {
        fn initialize(&mut self, settings: &SurfaceSettings) -> Result<()> {
            if self.fail_init {
                return Err(ViewportError::ContextUnavailable("no webgl".to_string()));
            }
            self.initialized = Some(*settings);
            Ok(())
        }

        fn set_size(&mut self, size: SurfaceSize) {
            self.sizes.push(size);
        }

        fn render(&mut self, _scene: &SceneGraph, _camera: &CameraView) -> Result<()> {
            self.renders += 1;
            Ok(())
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    #[derive(Default)]
    struct FakeFullscreen {
        active: bool,
        deny: bool,
    }

    impl FullscreenHost for FakeFullscreen {
        fn is_fullscreen(&self) -> bool {
            self.active
        }

        fn request_fullscreen(&mut self) -> Result<()> {
            if self.deny {
                return Err(ViewportError::FullscreenDenied("not allowed".to_string()));
            }
            self.active = true;
            Ok(())
        }

        fn exit_fullscreen(&mut self) -> Result<()> {
            self.active = false;
            Ok(())
        }
    }

    struct StaticCapture(Option<RgbaFrame>);

    impl FrameCapture for StaticCapture {
        fn capture(&mut self) -> Result<RgbaFrame> {
            self.0
                .take()
                .ok_or_else(|| ViewportError::Capture("no frame".to_string()))
        }
    }

    fn mounted(size: SurfaceSize) -> (ViewportSession, RecordingTarget, FrameQueue) {
        let mut session = ViewportSession::new(ViewerConfig::default());
        let mut target = RecordingTarget::default();
        let mut queue = FrameQueue::new();
        session.mount(&mut target, &mut queue, size).unwrap();
        (session, target, queue)
    }

    fn run_frames(
        session: &mut ViewportSession,
        target: &mut RecordingTarget,
        queue: &mut FrameQueue,
        count: usize,
    ) {
        for _ in 0..count {
            let token = queue.take_due().expect("render loop stalled");
            session.on_frame(token, queue, target).unwrap();
        }
    }

    #[test]
    fn test_mount_starts_loop() {
        let (session, target, queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        assert!(session.is_ready());
        assert!(session.render_loop().is_running());
        assert!(queue.has_pending());
        let settings = target.initialized.unwrap();
        assert!(settings.preserve_drawing_buffer);
        assert_eq!(settings.shadow_map_size, 4096);
        assert_eq!(target.sizes.len(), 1);
    }

    #[test]
    fn test_failed_initialization() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        let mut target = RecordingTarget {
            fail_init: true,
            ..Default::default()
        };
        let mut queue = FrameQueue::new();
        let result = session.mount(&mut target, &mut queue, SurfaceSize::new(800.0, 600.0, 1.0));

        assert!(matches!(result, Err(ViewportError::ContextUnavailable(_))));
        assert!(matches!(session.status(), SessionStatus::Failed(_)));
        assert!(!session.render_loop().is_running());
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_zero_area_mount_defers_rendering() {
        let (mut session, mut target, mut queue) = mounted(SurfaceSize::new(0.0, 0.0, 1.0));
        assert!(target.sizes.is_empty());

        for _ in 0..3 {
            let token = queue.take_due().unwrap();
            let outcome = session.on_frame(token, &mut queue, &mut target).unwrap();
            assert_eq!(outcome, FrameOutcome::Deferred);
        }
        assert_eq!(target.renders, 0);

        assert!(session.resize_to_container(SurfaceSize::new(320.0, 200.0, 1.0), &mut target));
        let token = queue.take_due().unwrap();
        let outcome = session.on_frame(token, &mut queue, &mut target).unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered);
        assert_eq!(target.renders, 1);
    }

    #[test]
    fn test_resize_caps_pixel_ratio_and_updates_aspect() {
        let (mut session, mut target, _queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        assert!(session.resize_to_container(SurfaceSize::new(1000.0, 500.0, 3.0), &mut target));
        assert_eq!(session.surface().pixel_ratio, 2.0);
        assert_eq!(session.lens().aspect, 2.0);
        assert_eq!(target.sizes.last().unwrap().pixel_ratio, 2.0);

        let before = session.surface();
        assert!(!session.resize_to_container(SurfaceSize::new(0.0, 500.0, 1.0), &mut target));
        assert_eq!(session.surface(), before);
        assert_eq!(session.lens().aspect, 2.0);
    }

    #[test]
    fn test_resize_does_not_interrupt_loop() {
        let (mut session, mut target, mut queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        run_frames(&mut session, &mut target, &mut queue, 2);
        session.resize_to_container(SurfaceSize::new(640.0, 480.0, 1.0), &mut target);
        assert!(session.render_loop().is_running());
        run_frames(&mut session, &mut target, &mut queue, 2);
        assert_eq!(target.renders, 4);
    }

    #[test]
    fn test_idle_rotation_advances_per_frame() {
        let (mut session, mut target, mut queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        run_frames(&mut session, &mut target, &mut queue, 10);
        let yaw = session.scene().displayed_yaw().unwrap();
        assert!((yaw - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_drag_does_not_stop_idle_rotation() {
        let (mut session, mut target, mut queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        run_frames(&mut session, &mut target, &mut queue, 3);
        session.begin_drag(0.0, 0.0);
        session.update_drag(40.0, 10.0);
        run_frames(&mut session, &mut target, &mut queue, 3);
        session.end_drag();
        let yaw = session.scene().displayed_yaw().unwrap();
        assert!((yaw - 0.03).abs() < 1e-5);
    }

    #[test]
    fn test_unmount_releases_everything() {
        let (mut session, mut target, mut queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        run_frames(&mut session, &mut target, &mut queue, 1);
        assert!(queue.has_pending());

        session.unmount(&mut target, &mut queue);
        assert_eq!(session.status(), &SessionStatus::Unmounted);
        assert!(target.released);
        assert!(!queue.has_pending());
        assert_eq!(queue.cancelled(), 1);
        assert!(session.scene().nodes().is_empty());
    }

    #[test]
    fn test_remount_rebuilds_scene() {
        let (mut session, mut target, mut queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        session.set_model(Some("bracket.step"));
        session.cycle_view_mode();
        session.toggle_grid();
        session.unmount(&mut target, &mut queue);

        session
            .mount(&mut target, &mut queue, SurfaceSize::new(800.0, 600.0, 1.0))
            .unwrap();
        assert!(session.is_ready());
        assert_eq!(session.scene().displayed_geometry_count(), 1);
        assert!(session.scene().node(names::KEY_LIGHT).is_some());
        assert!(session.scene().node(names::GRID).is_some_and(|n| n.visible));
        assert_eq!(session.view().mode, ViewMode::Solid);
        assert_eq!(session.model_ref(), Some("bracket.step"));

        run_frames(&mut session, &mut target, &mut queue, 1);
        assert!(session.scene().displayed_yaw().is_some());
    }

    #[test]
    fn test_frames_after_unmount_are_ignored() {
        let (mut session, mut target, mut queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        let token = queue.take_due().unwrap();
        session.unmount(&mut target, &mut queue);
        let outcome = session.on_frame(token, &mut queue, &mut target).unwrap();
        assert_eq!(outcome, FrameOutcome::Ignored);
        assert_eq!(target.renders, 0);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_drag_then_reset_returns_home() {
        let (mut session, _target, _queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        session.begin_drag(200.0, 200.0);
        session.update_drag(300.0, 200.0);
        session.end_drag();
        assert_ne!(session.camera().position(), HOME_POSITION);

        session.reset_view();
        assert_eq!(session.camera().position(), HOME_POSITION);
        assert_eq!(session.camera_view().target, Vec3::ZERO);
        assert_eq!(session.camera().azimuth(), 0.0);
        assert_eq!(session.camera().elevation(), 0.0);
    }

    #[test]
    fn test_camera_bounds_under_mixed_input() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        session.begin_drag(0.0, 0.0);
        for i in 0..300 {
            let x = (i as f32 * 0.7).sin() * 900.0;
            let y = (i as f32 * 0.3).cos() * 900.0;
            session.update_drag(x, y);
            session.zoom_wheel(if i % 3 == 0 { -1.0 } else { 1.0 });
            let camera = session.camera();
            assert!(camera.elevation().abs() < ELEVATION_LIMIT);
            assert!((3.0..=50.0).contains(&camera.radius()));
        }
        assert!(!session.zoom_wheel(0.0));
    }

    #[test]
    fn test_cycle_view_mode() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        let grid = session.scene().node(names::GRID).cloned();
        let axes = session.scene().node(names::AXES).cloned();

        assert_eq!(session.cycle_view_mode(), ViewMode::Wireframe);
        assert!(session
            .scene()
            .meshes()
            .all(|m| matches!(m.material, Material::Wireframe { .. })));
        assert_eq!(session.scene().node(names::GRID).cloned(), grid);
        assert_eq!(session.scene().node(names::AXES).cloned(), axes);

        assert_eq!(session.cycle_view_mode(), ViewMode::Points);
        assert_eq!(session.cycle_view_mode(), ViewMode::Solid);
        assert_eq!(session.view().mode, ViewMode::Solid);
        assert!(session
            .scene()
            .meshes()
            .all(|m| matches!(m.material, Material::Standard { .. })));
    }

    #[test]
    fn test_set_model_keeps_mode_and_single_group() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        session.cycle_view_mode();
        for model_ref in [Some("part-1.step"), Some("part-1.step"), None, Some("x")] {
            let source = session.set_model(model_ref);
            assert_eq!(source, GeometrySource::Placeholder);
            assert_eq!(session.scene().displayed_geometry_count(), 1);
        }
        assert_eq!(session.model_ref(), Some("x"));
        assert!(session
            .scene()
            .meshes()
            .all(|m| matches!(m.material, Material::Wireframe { .. })));
    }

    #[test]
    fn test_toggle_grid_twice() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        let flag = session.view().grid_visible;
        let visible = session.scene().node(names::GRID).unwrap().visible;

        assert!(!session.toggle_grid());
        assert!(!session.scene().node(names::GRID).unwrap().visible);
        session.toggle_grid();

        assert_eq!(session.view().grid_visible, flag);
        assert_eq!(session.scene().node(names::GRID).unwrap().visible, visible);
    }

    #[test]
    fn test_toggle_axes_lock_step() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        assert!(!session.toggle_axes());
        let node = session.scene().node(names::AXES).unwrap();
        assert_eq!(node.visible, session.view().axes_visible);
        assert!(matches!(node.kind, NodeKind::Axes(_)));
    }

    #[test]
    fn test_fullscreen_toggle_and_denial() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        let mut host = FakeFullscreen::default();
        assert!(session.toggle_fullscreen(&mut host));
        assert!(host.active);
        assert!(!session.toggle_fullscreen(&mut host));
        assert!(!host.active);

        let mut denying = FakeFullscreen {
            deny: true,
            ..Default::default()
        };
        assert!(!session.toggle_fullscreen(&mut denying));
        assert!(!session.view().fullscreen);
    }

    #[test]
    fn test_fullscreen_sync_from_platform() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        let mut host = FakeFullscreen::default();
        session.toggle_fullscreen(&mut host);

        // User pressed Escape; the platform reports the exit
        assert!(session.sync_fullscreen(false));
        assert!(!session.view().fullscreen);
        assert!(!session.sync_fullscreen(false));
    }

    #[test]
    fn test_export_image() {
        let (mut session, _target, _queue) = mounted(SurfaceSize::new(800.0, 600.0, 1.0));
        let frame = RgbaFrame::new(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap();
        let image = session.export_image(&mut StaticCapture(Some(frame))).unwrap();
        assert_eq!(image.file_name, "cad-model.png");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(&image.bytes[1..4], b"PNG");

        let err = session.export_image(&mut StaticCapture(None)).unwrap_err();
        assert!(matches!(err, ViewportError::Capture(_)));
    }

    #[test]
    fn test_export_requires_mount() {
        let mut session = ViewportSession::new(ViewerConfig::default());
        let frame = RgbaFrame::new(1, 1, vec![0; 4]).unwrap();
        let err = session.export_image(&mut StaticCapture(Some(frame))).unwrap_err();
        assert!(matches!(err, ViewportError::NotMounted));
    }
}
