//! PNG export of the rendered frame
//!
//! Bevy reads the swapchain back asynchronously; the captured image is
//! handed to the session for encoding and then offered as a download.

use bevy::prelude::*;
use bevy::render::render_resource::TextureFormat;
use bevy::render::view::screenshot::{Screenshot, ScreenshotCaptured};
use tracing::{info, warn};

use cadview_core::{FrameCapture, Result, RgbaFrame, ViewportError};

use crate::app::Viewport;
use crate::download::{download_image, PendingDownloads};

pub struct ExportPlugin;

impl Plugin for ExportPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingDownloads>();
    }
}

/// Ask Bevy for a copy of the next presented frame
pub fn capture_frame(commands: &mut Commands) {
    commands
        .spawn(Screenshot::primary_window())
        .observe(on_frame_captured);
}

fn on_frame_captured(
    captured: On<ScreenshotCaptured>,
    mut viewport: ResMut<Viewport>,
    downloads: Res<PendingDownloads>,
) {
    let image: &Image = &captured;
    match viewport.session.export_image(&mut ScreenshotFrame(image)) {
        Ok(exported) => {
            info!(file_name = %exported.file_name, bytes = exported.bytes.len(), "Frame exported");
            download_image(&exported, &downloads);
        }
        Err(e) => warn!("Export failed: {}", e),
    }
}

/// Screenshot image viewed as a frame capture
struct ScreenshotFrame<'a>(&'a Image);

impl FrameCapture for ScreenshotFrame<'_> {
    fn capture(&mut self) -> Result<RgbaFrame> {
        let image = self.0;
        let pixels = image
            .data
            .clone()
            .ok_or_else(|| ViewportError::Capture("screenshot has no pixel data".to_string()))?;

        match image.texture_descriptor.format {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => {
                RgbaFrame::new(image.width(), image.height(), pixels)
            }
            TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => {
                RgbaFrame::from_bgra(image.width(), image.height(), pixels)
            }
            other => Err(ViewportError::Capture(format!(
                "unsupported surface format {:?}",
                other
            ))),
        }
    }
}
