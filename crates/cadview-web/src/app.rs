//! Bevy application setup

use anyhow::Context;
use bevy::prelude::*;
use bevy::render::renderer::RenderDevice;
use bevy::window::PrimaryWindow;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use tracing::{debug, error, info, warn};

use cadview_core::{FrameQueue, SessionStatus, SurfaceSize, ViewerConfig, ViewportSession};

use crate::export::ExportPlugin;
use crate::fullscreen::FullscreenPlugin;
use crate::input::InputPlugin;
use crate::scene::{BevyTarget, ScenePlugin};
use crate::ui::UiPlugin;

/// Canvas the app renders into; the host page owns its container
pub const CANVAS_SELECTOR: &str = "#cadview-canvas";

const EMBEDDED_CONFIG: &str = include_str!("../cadview.toml");

/// The one mounted viewer: session state, its frame queue and render target
#[derive(Resource)]
pub struct Viewport {
    pub session: ViewportSession,
    pub frames: FrameQueue,
    pub target: BevyTarget,
    /// Last status written to the host page
    published_status: Option<&'static str>,
}

impl Viewport {
    fn new(session: ViewportSession, published_status: &'static str) -> Self {
        Self {
            session,
            frames: FrameQueue::new(),
            target: BevyTarget::default(),
            published_status: Some(published_status),
        }
    }
}

/// Per-frame ordering of the viewport systems
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewportSystems {
    Mount,
    Input,
    Frame,
    Sync,
}

/// Run the Bevy application
pub fn run() {
    let config = load_embedded_config().unwrap_or_else(|e| {
        warn!("Using default viewer config: {:#}", e);
        ViewerConfig::default()
    });

    let mut session = ViewportSession::new(config);
    if let Some(model_ref) = model_ref_from_url() {
        session.set_model(Some(&model_ref));
    }
    let background = session.scene().background;

    // Bevy panics while building the renderer when there is no GPU, so the
    // host gets its fallback signal before the app exists
    let status = startup_status(check_graphics_support());
    set_canvas_status(status.as_str());
    if let SessionStatus::Failed(reason) = &status {
        error!("3D preview unavailable: {}", reason);
        return;
    }

    let mut app = App::new();
    app
        .insert_resource(ClearColor(Color::srgb(background.r, background.g, background.b)))
        // Continuous updates: the idle rotation needs a tick on every refresh
        .insert_resource(WinitSettings::default())
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "CAD Preview".to_string(),
                canvas: Some(CANVAS_SELECTOR.to_string()),
                fit_canvas_to_parent: true,
                // Wheel zoom over the canvas must not scroll the page
                prevent_default_event_handling: true,
                ..default()
            }),
            ..default()
        }))
        // Picking must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(Viewport::new(session, status.as_str()))
        .add_plugins((ScenePlugin, InputPlugin, FullscreenPlugin, ExportPlugin, UiPlugin));
    add_lifecycle_systems(&mut app);
    app.run();
}

/// Set ordering plus mount, frame, unmount and status systems
fn add_lifecycle_systems(app: &mut App) {
    app.configure_sets(
        Update,
        (
            ViewportSystems::Mount,
            ViewportSystems::Input,
            ViewportSystems::Frame,
            ViewportSystems::Sync,
        )
            .chain(),
    )
    .add_systems(
        Update,
        (
            mount_viewport
                .run_if(viewport_initializing)
                .in_set(ViewportSystems::Mount),
            drive_render_loop.in_set(ViewportSystems::Frame),
            // Before Sync, so the entity release runs in the exit frame
            unmount_on_exit
                .after(ViewportSystems::Frame)
                .before(ViewportSystems::Sync),
            publish_status.after(ViewportSystems::Sync),
        ),
    );
}

/// Status to publish before the app is built
fn startup_status(support: std::result::Result<(), String>) -> SessionStatus {
    match support {
        Ok(()) => SessionStatus::Initializing,
        Err(reason) => SessionStatus::Failed(reason),
    }
}

fn load_embedded_config() -> anyhow::Result<ViewerConfig> {
    ViewerConfig::from_toml_str(EMBEDDED_CONFIG).context("failed to parse embedded cadview.toml")
}

fn viewport_initializing(viewport: Res<Viewport>) -> bool {
    *viewport.session.status() == SessionStatus::Initializing
}

/// Mount the session once the primary window and GPU device exist
fn mount_viewport(
    mut viewport: ResMut<Viewport>,
    windows: Query<&Window, With<PrimaryWindow>>,
    render_device: Option<Res<RenderDevice>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let container = SurfaceSize::new(window.width(), window.height(), window.scale_factor());

    let Viewport {
        session,
        frames,
        target,
        ..
    } = &mut *viewport;
    target.set_gpu_available(render_device.is_some());
    // Failure is logged by the session and published as the page status
    if session.mount(target, frames, container).is_ok() {
        info!(model_ref = ?session.model_ref(), "Preview pane ready");
    }
}

/// Hand the due frame token to the session
fn drive_render_loop(mut viewport: ResMut<Viewport>) {
    let Viewport {
        session,
        frames,
        target,
        ..
    } = &mut *viewport;
    let Some(token) = frames.take_due() else {
        return;
    };
    if let Err(e) = session.on_frame(token, frames, target) {
        warn!("Frame {} failed: {}", token.0, e);
    }
}

fn unmount_on_exit(mut exits: MessageReader<AppExit>, mut viewport: ResMut<Viewport>) {
    if exits.read().next().is_none() {
        return;
    }
    let Viewport {
        session,
        frames,
        target,
        ..
    } = &mut *viewport;
    session.unmount(target, frames);
}

/// Mirror the session status onto the canvas so the host can show a fallback
fn publish_status(mut viewport: ResMut<Viewport>) {
    let status = viewport.session.status().as_str();
    if viewport.published_status == Some(status) {
        return;
    }
    viewport.published_status = Some(status);
    set_canvas_status(status);
}

#[cfg(target_arch = "wasm32")]
fn set_canvas_status(status: &str) {
    debug!(status, "Viewport status changed");
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Ok(Some(canvas)) = document.query_selector(CANVAS_SELECTOR) {
        canvas.set_attribute("data-status", status).ok();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn set_canvas_status(status: &str) {
    debug!(status, "Viewport status changed");
}

/// Check for a graphics API the renderer can use
#[cfg(target_arch = "wasm32")]
fn check_graphics_support() -> std::result::Result<(), String> {
    use wasm_bindgen::{JsCast, JsValue};

    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    if document.query_selector(CANVAS_SELECTOR).ok().flatten().is_none() {
        return Err(format!("canvas {} not found", CANVAS_SELECTOR));
    }

    if cfg!(feature = "webgpu") {
        let gpu = js_sys::Reflect::get(&window.navigator(), &JsValue::from_str("gpu"))
            .unwrap_or(JsValue::UNDEFINED);
        if gpu.is_undefined() || gpu.is_null() {
            return Err("WebGPU is not available in this browser".to_string());
        }
        return Ok(());
    }

    let canvas = document
        .create_element("canvas")
        .map_err(|e| format!("canvas creation failed: {:?}", e))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| "created element is not a canvas".to_string())?;
    match canvas.get_context("webgl2") {
        Ok(Some(_)) => Ok(()),
        _ => Err("WebGL2 is not available in this browser".to_string()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn check_graphics_support() -> std::result::Result<(), String> {
    Ok(())
}

/// Read the `?model=` parameter of the hosting page
#[cfg(target_arch = "wasm32")]
fn model_ref_from_url() -> Option<String> {
    let href = web_sys::window()?.location().href().ok()?;
    let url = web_sys::Url::new(&href).ok()?;
    url.search_params().get("model").filter(|r| !r.is_empty())
}

#[cfg(not(target_arch = "wasm32"))]
fn model_ref_from_url() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Release state of the target as seen by the Sync set
    #[derive(Resource, Default)]
    struct SeenInSync(Vec<bool>);

    fn record_release(viewport: Res<Viewport>, mut seen: ResMut<SeenInSync>) {
        seen.0.push(viewport.target.is_released());
    }

    fn mounted_viewport() -> Viewport {
        let session = ViewportSession::new(ViewerConfig::default());
        let mut viewport = Viewport::new(session, "initializing");
        let Viewport {
            session,
            frames,
            target,
            ..
        } = &mut viewport;
        target.set_gpu_available(true);
        session
            .mount(target, frames, SurfaceSize::new(640.0, 480.0, 1.0))
            .unwrap();
        viewport
    }

    #[test]
    fn test_startup_status() {
        assert_eq!(startup_status(Ok(())), SessionStatus::Initializing);
        assert_eq!(
            startup_status(Err("WebGPU is not available".to_string())),
            SessionStatus::Failed("WebGPU is not available".to_string())
        );
        assert_eq!(startup_status(Err(String::new())).as_str(), "failed");
    }

    #[test]
    fn test_exit_releases_target_before_sync() {
        let mut app = App::new();
        app.add_message::<AppExit>()
            .insert_resource(mounted_viewport())
            .init_resource::<SeenInSync>()
            .add_systems(Update, record_release.in_set(ViewportSystems::Sync));
        add_lifecycle_systems(&mut app);

        app.update();
        assert_eq!(app.world().resource::<SeenInSync>().0, vec![false]);

        app.world_mut().write_message(AppExit::Success);
        app.update();

        assert_eq!(app.world().resource::<SeenInSync>().0, vec![false, true]);
        let viewport = app.world().resource::<Viewport>();
        assert_eq!(viewport.session.status(), &SessionStatus::Unmounted);
        assert_eq!(viewport.published_status, Some("unmounted"));
    }
}
