//! Viewport toolbar using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use tracing::{info, warn};

use cadview_core::SessionStatus;

use crate::app::{Viewport, ViewportSystems};
use crate::download::PendingDownloads;
use crate::export::capture_frame;
use crate::fullscreen::platform_fullscreen;

/// How long a download notice stays on the toolbar (seconds)
const NOTICE_SECONDS: f32 = 4.0;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ViewportAction>()
            .init_resource::<ToolbarNotice>()
            .add_systems(
                Update,
                (keyboard_shortcuts, apply_actions)
                    .chain()
                    .in_set(ViewportSystems::Input),
            )
            .add_systems(Update, collect_download_results)
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, toolbar_system);
    }
}

/// View-state actions triggered from the toolbar or the keyboard
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportAction {
    CycleViewMode,
    ToggleGrid,
    ToggleAxes,
    ToggleFullscreen,
    ResetView,
    ExportImage,
}

/// Transient message shown after a download attempt
#[derive(Resource, Default)]
pub struct ToolbarNotice {
    text: Option<String>,
    error: bool,
    remaining: f32,
}

/// Grouped system parameters for the toolbar
#[derive(SystemParam)]
pub struct ToolbarParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub viewport: Res<'w, Viewport>,
    pub notice: ResMut<'w, ToolbarNotice>,
    pub actions: MessageWriter<'w, ViewportAction>,
    pub time: Res<'w, Time>,
}

fn keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut contexts: EguiContexts,
    mut actions: MessageWriter<ViewportAction>,
) {
    let egui_wants_keyboard = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_keyboard_input())
        .unwrap_or(false);
    if egui_wants_keyboard {
        return;
    }

    let bindings = [
        (KeyCode::KeyV, ViewportAction::CycleViewMode),
        (KeyCode::KeyG, ViewportAction::ToggleGrid),
        (KeyCode::KeyA, ViewportAction::ToggleAxes),
        (KeyCode::KeyF, ViewportAction::ToggleFullscreen),
        (KeyCode::KeyR, ViewportAction::ResetView),
        (KeyCode::KeyP, ViewportAction::ExportImage),
    ];
    for (key, action) in bindings {
        if keyboard.just_pressed(key) {
            actions.write(action);
        }
    }
}

fn apply_actions(
    mut commands: Commands,
    mut actions: MessageReader<ViewportAction>,
    mut viewport: ResMut<Viewport>,
) {
    for action in actions.read() {
        let session = &mut viewport.session;
        if !session.is_ready() {
            warn!(?action, "Ignoring action, viewport is not mounted");
            continue;
        }
        match action {
            ViewportAction::CycleViewMode => {
                let mode = session.cycle_view_mode();
                info!(mode = %mode, "View mode");
            }
            ViewportAction::ToggleGrid => {
                session.toggle_grid();
            }
            ViewportAction::ToggleAxes => {
                session.toggle_axes();
            }
            ViewportAction::ToggleFullscreen => match platform_fullscreen() {
                Some(mut host) => {
                    session.toggle_fullscreen(&mut host);
                }
                None => warn!("No element to show fullscreen"),
            },
            ViewportAction::ResetView => session.reset_view(),
            ViewportAction::ExportImage => capture_frame(&mut commands),
        }
    }
}

fn collect_download_results(
    downloads: Res<PendingDownloads>,
    mut notice: ResMut<ToolbarNotice>,
) {
    while let Some(result) = downloads.take() {
        notice.text = Some(match &result.error {
            None => format!("Saved {}", result.file_name),
            Some(e) => format!("Export failed: {}", e),
        });
        notice.error = !result.success;
        notice.remaining = NOTICE_SECONDS;
    }
}

fn toolbar_system(mut params: ToolbarParams) {
    let Ok(ctx) = params.contexts.ctx_mut() else {
        return;
    };

    let session = &params.viewport.session;
    if let SessionStatus::Failed(reason) = session.status() {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| {
                ui.colored_label(
                    egui::Color32::LIGHT_RED,
                    format!("3D preview unavailable: {}", reason),
                );
            });
        });
        return;
    }
    if !session.is_ready() {
        return;
    }

    let view = *session.view();
    let radius = session.camera().radius();
    let mut clicked = Vec::new();

    egui::TopBottomPanel::top("viewport_toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui
                .button(format!("View: {}", view.mode))
                .on_hover_text("Cycle solid / wireframe / points (V)")
                .clicked()
            {
                clicked.push(ViewportAction::CycleViewMode);
            }
            if ui
                .selectable_label(view.grid_visible, "Grid")
                .on_hover_text("Toggle grid (G)")
                .clicked()
            {
                clicked.push(ViewportAction::ToggleGrid);
            }
            if ui
                .selectable_label(view.axes_visible, "Axes")
                .on_hover_text("Toggle axes (A)")
                .clicked()
            {
                clicked.push(ViewportAction::ToggleAxes);
            }

            ui.separator();

            let fullscreen_text = if view.fullscreen {
                "Exit Fullscreen"
            } else {
                "Fullscreen"
            };
            if ui.button(fullscreen_text).on_hover_text("(F)").clicked() {
                clicked.push(ViewportAction::ToggleFullscreen);
            }
            if ui.button("Reset View").on_hover_text("(R)").clicked() {
                clicked.push(ViewportAction::ResetView);
            }
            if ui.button("Export PNG").on_hover_text("(P)").clicked() {
                clicked.push(ViewportAction::ExportImage);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("Distance {:.1}", radius));
                if let Some(text) = &params.notice.text {
                    let color = if params.notice.error {
                        egui::Color32::LIGHT_RED
                    } else {
                        egui::Color32::LIGHT_GREEN
                    };
                    ui.colored_label(color, text);
                }
            });
        });
    });

    for action in clicked {
        params.actions.write(action);
    }

    if params.notice.text.is_some() {
        params.notice.remaining -= params.time.delta_secs();
        if params.notice.remaining <= 0.0 {
            params.notice.text = None;
        }
    }
}
