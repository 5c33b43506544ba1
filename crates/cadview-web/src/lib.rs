//! Cadview Web - Interactive 3D preview pane for the image-to-CAD demo
//!
//! Mounts a [`cadview_core::ViewportSession`] inside a Bevy app rendering to
//! the `#cadview-canvas` element, and wires browser input, fullscreen and
//! downloads into it.

mod app;
mod download;
mod export;
mod fullscreen;
mod input;
mod scene;
mod ui;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    app::run();
}
