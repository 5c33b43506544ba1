//! Pointer, wheel, touch and resize input mapped onto the session

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResized};
use bevy_egui::EguiContexts;
use tracing::debug;

use cadview_core::{SurfaceSize, ZoomDirection};

use crate::app::{Viewport, ViewportSystems};

/// Pinch travel (in pixels) that counts as one wheel step
const PINCH_STEP_PIXELS: f32 = 24.0;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TouchState>().add_systems(
            Update,
            (handle_resize, handle_mouse, handle_touch)
                .chain()
                .in_set(ViewportSystems::Input),
        );
    }
}

/// Track touch state for single-finger orbit and pinch zoom
#[derive(Resource, Default)]
pub struct TouchState {
    /// Finger distance at the last pinch step
    pinch_distance: Option<f32>,
    /// Whether a single-finger drag is in progress
    dragging: bool,
}

fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false)
}

/// Keep the session's surface in step with the container
fn handle_resize(
    mut resized: MessageReader<WindowResized>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut viewport: ResMut<Viewport>,
) {
    // Only the latest size of this frame matters
    let Some(event) = resized.read().last() else {
        return;
    };
    let pixel_ratio = windows
        .get(event.window)
        .map(|w| w.resolution.base_scale_factor())
        .unwrap_or(1.0);

    let Viewport {
        session, target, ..
    } = &mut *viewport;
    session.resize_to_container(SurfaceSize::new(event.width, event.height, pixel_ratio), target);
}

/// Left-button drag orbits, the wheel zooms one step per notch
fn handle_mouse(
    mut viewport: ResMut<Viewport>,
    mut wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
    mut mouse_dragging: Local<bool>,
) {
    let egui_wants_pointer = egui_wants_pointer(&mut contexts);
    let session = &mut viewport.session;

    let cursor = windows.single().ok().and_then(|w| w.cursor_position());

    if mouse_button.just_pressed(MouseButton::Left) && !egui_wants_pointer {
        if let Some(pos) = cursor {
            session.begin_drag(pos.x, pos.y);
            *mouse_dragging = true;
        }
    }

    if *mouse_dragging {
        match cursor {
            Some(pos) if mouse_button.pressed(MouseButton::Left) => {
                session.update_drag(pos.x, pos.y);
            }
            // Released, or the pointer left the canvas
            _ => {
                session.end_drag();
                *mouse_dragging = false;
            }
        }
    }

    for event in wheel.read() {
        if egui_wants_pointer {
            continue;
        }
        // Bevy reports scroll-up as positive; the session expects DOM deltas
        session.zoom_wheel(-event.y);
    }
}

/// One finger orbits; two fingers pinch to zoom
fn handle_touch(
    mut viewport: ResMut<Viewport>,
    touches: Res<Touches>,
    mut touch_state: ResMut<TouchState>,
    mut contexts: EguiContexts,
) {
    let egui_wants_pointer = egui_wants_pointer(&mut contexts);
    let session = &mut viewport.session;
    let active: Vec<_> = touches.iter().collect();

    match active.as_slice() {
        [touch] => {
            touch_state.pinch_distance = None;
            let pos = touch.position();
            if !touch_state.dragging {
                if egui_wants_pointer {
                    return;
                }
                session.begin_drag(pos.x, pos.y);
                touch_state.dragging = true;
            } else {
                session.update_drag(pos.x, pos.y);
            }
        }
        [first, second] => {
            if touch_state.dragging {
                session.end_drag();
                touch_state.dragging = false;
            }
            let distance = first.position().distance(second.position());
            let Some(last) = touch_state.pinch_distance else {
                touch_state.pinch_distance = Some(distance);
                return;
            };
            let travel = distance - last;
            if travel.abs() >= PINCH_STEP_PIXELS {
                // Fingers apart brings the model closer
                let direction = if travel > 0.0 {
                    ZoomDirection::In
                } else {
                    ZoomDirection::Out
                };
                session.zoom(direction);
                touch_state.pinch_distance = Some(distance);
                debug!(?direction, distance, "Pinch zoom step");
            }
        }
        _ => {
            if touch_state.dragging {
                session.end_drag();
            }
            *touch_state = TouchState::default();
        }
    }
}
