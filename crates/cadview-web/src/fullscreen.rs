//! Fullscreen control through the browser Fullscreen API
//!
//! Requests go out through [`platform_fullscreen`]; the browser's
//! `fullscreenchange` / `fullscreenerror` notifications come back through a
//! queue that a system drains into the session.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use cadview_core::SessionStatus;

use crate::app::{Viewport, ViewportSystems};

pub use js_interop::{platform_fullscreen, FullscreenListener};

/// Fullscreen plugin
pub struct FullscreenPlugin;

impl Plugin for FullscreenPlugin {
    fn build(&self, app: &mut App) {
        let pending = PendingFullscreenChanges::default();
        match FullscreenListener::attach(pending.0.clone()) {
            Some(listener) => {
                app.insert_non_send_resource(listener);
            }
            None => warn!("Fullscreen notifications unavailable"),
        }
        app.insert_resource(pending).add_systems(
            Update,
            (
                apply_fullscreen_changes.in_set(ViewportSystems::Input),
                detach_on_unmount.after(ViewportSystems::Sync),
            ),
        );
    }
}

/// Actual fullscreen states reported by JavaScript callbacks
#[derive(Resource, Default)]
pub struct PendingFullscreenChanges(pub Arc<Mutex<VecDeque<bool>>>);

/// Adopt the platform's fullscreen state, which wins over the optimistic flag
fn apply_fullscreen_changes(
    pending: Res<PendingFullscreenChanges>,
    mut viewport: ResMut<Viewport>,
) {
    let Ok(mut changes) = pending.0.lock() else {
        return;
    };
    while let Some(active) = changes.pop_front() {
        if viewport.session.sync_fullscreen(active) {
            debug!(active, "Fullscreen state reconciled");
        }
    }
}

fn detach_on_unmount(viewport: Res<Viewport>, listener: Option<NonSendMut<FullscreenListener>>) {
    if *viewport.session.status() != SessionStatus::Unmounted {
        return;
    }
    if let Some(mut listener) = listener {
        listener.detach();
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use cadview_core::{FullscreenHost, Result, ViewportError};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Document, Element};

    use crate::app::CANVAS_SELECTOR;

    /// Fullscreen host targeting the canvas's container
    pub struct WebFullscreen {
        document: Document,
        element: Element,
    }

    impl FullscreenHost for WebFullscreen {
        fn is_fullscreen(&self) -> bool {
            self.document.fullscreen_element().is_some()
        }

        fn request_fullscreen(&mut self) -> Result<()> {
            self.element
                .request_fullscreen()
                .map_err(|e| ViewportError::FullscreenDenied(format!("{:?}", e)))
        }

        fn exit_fullscreen(&mut self) -> Result<()> {
            self.document.exit_fullscreen();
            Ok(())
        }
    }

    /// Host for the element wrapping the canvas (the canvas itself as a fallback)
    pub fn platform_fullscreen() -> Option<WebFullscreen> {
        let document = web_sys::window()?.document()?;
        let canvas = document.query_selector(CANVAS_SELECTOR).ok()??;
        let element = canvas.parent_element().unwrap_or(canvas);
        Some(WebFullscreen { document, element })
    }

    type EventClosure = Closure<dyn FnMut(web_sys::Event)>;

    /// Registered `fullscreenchange` / `fullscreenerror` listeners
    pub struct FullscreenListener {
        document: Document,
        listeners: Vec<(&'static str, EventClosure)>,
    }

    impl FullscreenListener {
        pub fn attach(pending: Arc<Mutex<VecDeque<bool>>>) -> Option<Self> {
            let document = web_sys::window()?.document()?;
            let mut listener = Self {
                document: document.clone(),
                listeners: Vec::new(),
            };

            // A denied request leaves the state unchanged; report it either way
            for event in ["fullscreenchange", "fullscreenerror"] {
                let doc = document.clone();
                let pending = pending.clone();
                let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
                    let active = doc.fullscreen_element().is_some();
                    if let Ok(mut changes) = pending.lock() {
                        changes.push_back(active);
                    }
                }) as Box<dyn FnMut(web_sys::Event)>);

                document
                    .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
                    .ok()?;
                listener.listeners.push((event, closure));
            }
            Some(listener)
        }

        pub fn detach(&mut self) {
            for (event, closure) in self.listeners.drain(..) {
                self.document
                    .remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
                    .ok();
            }
        }
    }

    impl Drop for FullscreenListener {
        fn drop(&mut self) {
            self.detach();
        }
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;
    use cadview_core::{FullscreenHost, Result, ViewportError};

    pub struct WebFullscreen;

    impl FullscreenHost for WebFullscreen {
        fn is_fullscreen(&self) -> bool {
            false
        }

        fn request_fullscreen(&mut self) -> Result<()> {
            Err(ViewportError::FullscreenDenied(
                "fullscreen not supported on this platform".to_string(),
            ))
        }

        fn exit_fullscreen(&mut self) -> Result<()> {
            Ok(())
        }
    }

    pub fn platform_fullscreen() -> Option<WebFullscreen> {
        Some(WebFullscreen)
    }

    pub struct FullscreenListener;

    impl FullscreenListener {
        pub fn attach(_pending: Arc<Mutex<VecDeque<bool>>>) -> Option<Self> {
            None
        }

        pub fn detach(&mut self) {}
    }
}
