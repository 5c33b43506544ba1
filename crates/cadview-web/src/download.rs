//! Browser downloads for exported files
//!
//! The browser offers the bytes as a file through a temporary anchor and
//! object URL. Outcomes are queued for the UI, since the save happens
//! outside of any Bevy system.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cadview_core::ExportedImage;

/// Result of one download attempt
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub file_name: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Pending download results from JavaScript
#[derive(Resource, Default)]
pub struct PendingDownloads(pub Arc<Mutex<VecDeque<DownloadResult>>>);

impl PendingDownloads {
    pub fn take(&self) -> Option<DownloadResult> {
        self.0.lock().ok().and_then(|mut results| results.pop_front())
    }
}

/// Offer an exported image to the user as a download
pub fn download_image(image: &ExportedImage, pending: &PendingDownloads) {
    js_interop::save_file(&image.file_name, &image.bytes, image.mime_type, pending.0.clone());
}

fn report(
    pending: &Arc<Mutex<VecDeque<DownloadResult>>>,
    file_name: &str,
    error: Option<String>,
) {
    if let Some(error) = &error {
        tracing::warn!("Download of {} failed: {}", file_name, error);
    }
    if let Ok(mut results) = pending.lock() {
        results.push_back(DownloadResult {
            file_name: file_name.to_string(),
            success: error.is_none(),
            error,
        });
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::{Blob, Url};

    /// Delay before the object URL is revoked, giving the download time to start
    const REVOKE_DELAY_MS: i32 = 1000;

    pub fn save_file(
        file_name: &str,
        content: &[u8],
        mime_type: &str,
        pending: Arc<Mutex<VecDeque<DownloadResult>>>,
    ) {
        let error = start_download(file_name, content, mime_type).err();
        report(&pending, file_name, error);
    }

    fn start_download(file_name: &str, content: &[u8], mime_type: &str) -> Result<(), String> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let uint8_array = js_sys::Uint8Array::from(content);
        let array = js_sys::Array::new();
        array.push(&uint8_array.buffer());

        let blob_options = web_sys::BlobPropertyBag::new();
        blob_options.set_type(mime_type);
        let blob = Blob::new_with_u8_array_sequence_and_options(&array, &blob_options)
            .map_err(|e| format!("blob creation failed: {:?}", e))?;

        let url = Url::create_object_url_with_blob(&blob)
            .map_err(|e| format!("object URL failed: {:?}", e))?;

        let anchor = document
            .create_element("a")
            .map_err(|e| format!("anchor creation failed: {:?}", e))?;
        anchor.set_attribute("href", &url).ok();
        anchor.set_attribute("download", file_name).ok();

        let body = document.body().ok_or("no document body")?;
        body.append_child(&anchor).ok();
        if let Some(html_el) = anchor.dyn_ref::<web_sys::HtmlElement>() {
            html_el.click();
        }
        body.remove_child(&anchor).ok();

        let revoke = Closure::once_into_js(move || {
            Url::revoke_object_url(&url).ok();
        });
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                revoke.unchecked_ref(),
                REVOKE_DELAY_MS,
            )
            .ok();
        Ok(())
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn save_file(
        file_name: &str,
        _content: &[u8],
        _mime_type: &str,
        pending: Arc<Mutex<VecDeque<DownloadResult>>>,
    ) {
        report(
            &pending,
            file_name,
            Some("File save not supported on this platform".to_string()),
        );
    }
}
