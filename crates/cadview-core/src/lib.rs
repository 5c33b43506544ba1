//! Cadview Core - Platform-independent state for the 3D preview pane
//!
//! This crate holds everything the viewer does that is not tied to a GPU
//! or a browser:
//! - Orbit camera rig with damped drag, clamped zoom and reset
//! - Scene graph with lights, helpers and the displayed geometry group
//! - Render loop bookkeeping with cancellable frame requests
//! - View modes, helper toggles, fullscreen state and PNG export
//!
//! The [`session::ViewportSession`] ties these together; hosts plug in a
//! [`surface::RenderTarget`], a [`render_loop::FrameScheduler`] and the
//! platform seams for fullscreen and frame capture.

pub mod camera;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod render_loop;
pub mod scene;
pub mod session;
pub mod surface;
pub mod view;

pub use camera::{CameraView, OrbitRig, PerspectiveLens, ZoomDirection};
pub use config::{load_config, ConfigError, Rgb, ViewerConfig};
pub use error::{Result, ViewportError};
pub use export::{encode_png, ExportedImage, FrameCapture, RgbaFrame};
pub use geometry::{placeholder_part, MeshData, PartMesh};
pub use render_loop::{FrameQueue, FrameScheduler, FrameToken, RenderLoop};
pub use scene::{GeometryResolver, GeometrySource, Material, NodeKind, SceneGraph, SceneNode};
pub use session::{FrameOutcome, SessionStatus, ViewportSession};
pub use surface::{FullscreenHost, RenderTarget, SurfaceSettings, SurfaceSize};
pub use view::{ViewMode, ViewState};
