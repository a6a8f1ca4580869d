use eframe::egui;
use egui::{Align2, Color32, RichText, Rounding, Sense, Stroke, Vec2};

use crate::input::PointerController;
use crate::notify::Notifier;
use crate::palette::Palette;
use crate::render::CanvasView;
use crate::session::{CanvasSession, CommitSummary};
use crate::settings::{AppSettings, GridlineMode};

/// Modal dialog system (at most one open at a time).
enum ActiveDialog {
    None,
    ConfirmSave(CommitSummary),
    ConfirmTopUp { plan_idx: usize },
}

pub struct PlaceFEApp {
    session: CanvasSession,
    view: CanvasView,
    pointer: PointerController,
    palette: Palette,
    /// Selected palette index (1..=255; 0 would paint "empty").
    selected_color: u8,
    notifier: Notifier,
    settings: AppSettings,
    active_dialog: ActiveDialog,
    show_settings: bool,
}

impl PlaceFEApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: AppSettings,
        mut session: CanvasSession,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        // Kick off the initial metadata + hydration pass immediately.
        session.refresh();
        Self {
            session,
            view: CanvasView::new(),
            pointer: PointerController::new(),
            palette: Palette::new(),
            selected_color: 1,
            notifier: Notifier::new(),
            settings,
            active_dialog: ActiveDialog::None,
            show_settings: false,
        }
    }

    // ---- top bar -----------------------------------------------------------

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("PlaceFE").strong());
                ui.separator();

                let save_enabled = !self.session.commit_state.is_busy();
                if ui
                    .add_enabled(save_enabled, egui::Button::new("Save pixels"))
                    .clicked()
                    && let Some(summary) = self.session.request_commit(&mut self.notifier)
                {
                    if self.settings.confirm_on_save {
                        self.active_dialog = ActiveDialog::ConfirmSave(summary);
                    } else {
                        self.session.commit();
                    }
                }

                let refresh_enabled = !self.session.fetch_state.is_busy();
                if ui
                    .add_enabled(refresh_enabled, egui::Button::new("Refresh"))
                    .clicked()
                {
                    self.session.refresh();
                }

                if self.session.is_network_busy() {
                    ui.spinner();
                }

                let staged = self.session.stager.len();
                if staged > 0 {
                    ui.label(
                        RichText::new(format!("{staged} staged"))
                            .color(Color32::from_rgb(240, 200, 90)),
                    );
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙").on_hover_text("Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    if self.session.account().is_some() {
                        ui.label(format!("{} credits", self.session.credits));
                    } else {
                        ui.label(RichText::new("browsing anonymously").weak());
                    }
                });
            });
        });
    }

    // ---- sidebar: color picker + credit plans ------------------------------

    fn show_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("palette_panel")
            .default_width(248.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);

                // Selected color preview
                ui.horizontal(|ui| {
                    let (rect, _) = ui.allocate_exact_size(Vec2::splat(34.0), Sense::hover());
                    ui.painter().rect_filled(
                        rect,
                        Rounding::same(3.0),
                        self.palette.color(self.selected_color),
                    );
                    ui.painter().rect_stroke(
                        rect,
                        Rounding::same(3.0),
                        Stroke::new(1.0, Color32::from_gray(90)),
                    );
                    ui.vertical(|ui| {
                        ui.label(RichText::new(format!("Index {}", self.selected_color)).strong());
                        ui.label(
                            RichText::new(self.palette.label(self.selected_color))
                                .weak()
                                .monospace(),
                        );
                    });
                });

                ui.label(
                    RichText::new("216 web-safe colors + 39 grayscale. Index 0 = transparent.")
                        .weak()
                        .small(),
                );
                ui.add_space(6.0);

                self.show_palette_grid(ui);

                ui.add_space(8.0);
                ui.separator();
                self.show_credit_plans(ui);

                ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                    ui.add_space(6.0);
                    ui.label(
                        RichText::new(
                            "Left-click: paint / drag to paint\n\
                             Middle-drag or Ctrl+drag: pan\n\
                             Wheel: zoom",
                        )
                        .weak()
                        .small(),
                    );
                });
            });
    }

    fn show_palette_grid(&mut self, ui: &mut egui::Ui) {
        const PER_ROW: usize = 16;
        let swatch = 13.0;
        let old_spacing = ui.spacing().item_spacing;
        ui.spacing_mut().item_spacing = Vec2::splat(1.0);

        for row in 0..(crate::palette::PALETTE_LEN / PER_ROW) {
            ui.horizontal(|ui| {
                for col in 0..PER_ROW {
                    let index = (row * PER_ROW + col) as u8;
                    let (rect, response) =
                        ui.allocate_exact_size(Vec2::splat(swatch), Sense::click());
                    let painter = ui.painter();
                    if index == 0 {
                        // Checkerboard marker for the transparent slot.
                        let half = rect.size() / 2.0;
                        painter.rect_filled(rect, Rounding::ZERO, Color32::from_gray(60));
                        painter.rect_filled(
                            egui::Rect::from_min_size(rect.min, half),
                            Rounding::ZERO,
                            Color32::from_gray(110),
                        );
                        painter.rect_filled(
                            egui::Rect::from_min_size(rect.center(), half),
                            Rounding::ZERO,
                            Color32::from_gray(110),
                        );
                    } else {
                        painter.rect_filled(rect, Rounding::ZERO, self.palette.color(index));
                    }
                    if index == self.selected_color {
                        painter.rect_stroke(rect, Rounding::ZERO, Stroke::new(2.0, Color32::WHITE));
                    } else if response.hovered() {
                        painter.rect_stroke(
                            rect,
                            Rounding::ZERO,
                            Stroke::new(1.0, Color32::from_gray(180)),
                        );
                    }
                    if response.clicked() {
                        self.selected_color = index;
                    }
                    response.on_hover_text(format!("{index} — {}", self.palette.label(index)));
                }
            });
        }
        ui.spacing_mut().item_spacing = old_spacing;
    }

    fn show_credit_plans(&mut self, ui: &mut egui::Ui) {
        let Some(meta) = self.session.meta.as_ref() else {
            return;
        };
        if meta.credit_plans.is_empty() {
            return;
        }
        ui.label(RichText::new("Credit plans").strong());
        let can_top_up =
            self.session.account().is_some() && !self.session.topup_state.is_busy();
        let plans = meta.credit_plans.clone();
        let linked = meta.linked_service.clone();
        for (i, plan) in plans.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(format!("{} credits", plan.credits));
                ui.label(
                    RichText::new(format!("{} via {}", plan.price, linked))
                        .weak()
                        .small(),
                );
                if ui
                    .add_enabled(can_top_up, egui::Button::new("Top up").small())
                    .clicked()
                {
                    self.active_dialog = ActiveDialog::ConfirmTopUp { plan_idx: i };
                }
            });
        }
    }

    // ---- canvas ------------------------------------------------------------

    fn show_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let size = ui.available_size();
                let sense = Sense::click_and_drag().union(Sense::hover());
                let (response, painter) = ui.allocate_painter(size, sense);
                let rect = response.rect;

                if let Some(request) = self.pointer.handle(ui, &response, rect, &mut self.view)
                    && self
                        .session
                        .paint(request.gx, request.gy, self.selected_color)
                {
                    self.view.last_paint = Some((request.gx as u32, request.gy as u32));
                }

                self.view.draw(
                    &painter,
                    rect,
                    &self.session.grid,
                    &self.palette,
                    self.settings.gridline_mode,
                );

                if self.session.meta.is_none() {
                    painter.text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        "Loading canvas metadata…",
                        egui::FontId::proportional(16.0),
                        Color32::from_gray(140),
                    );
                }
            });
    }

    // ---- status bar --------------------------------------------------------

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(meta) = self.session.meta.as_ref() {
                    ui.label(format!("{}×{}", meta.width, meta.height));
                    ui.separator();
                }
                ui.label(format!("{:.0}%", self.view.viewport.scale * 100.0));
                if let Some((hx, hy)) = self.view.hover
                    && self.session.grid.in_bounds(hx, hy)
                {
                    ui.separator();
                    ui.label(format!("({hx}, {hy})"));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.session.fetch_state.is_busy() {
                        ui.label(RichText::new("syncing canvas…").weak());
                    }
                });
            });
        });
    }

    // ---- dialogs -----------------------------------------------------------

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        match &self.active_dialog {
            ActiveDialog::None => {}
            ActiveDialog::ConfirmSave(summary) => {
                let summary = *summary;
                let mut confirmed = false;
                let mut cancelled = false;
                egui::Window::new("Confirm save?")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
                    .show(ctx, |ui| {
                        ui.label(RichText::new("You have").weak().small());
                        ui.label(
                            RichText::new(format!("{} pixel credits", summary.credits_before))
                                .monospace(),
                        );
                        ui.add_space(4.0);
                        ui.label(RichText::new("You are saving").weak().small());
                        ui.label(RichText::new(format!("{} pixels", summary.pixels)).monospace());
                        ui.separator();
                        ui.label(RichText::new("After saving, you will have").weak().small());
                        ui.label(
                            RichText::new(format!("{} pixel credits", summary.credits_after))
                                .monospace(),
                        );
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            if ui.button("Confirm save").clicked() {
                                confirmed = true;
                            }
                            if ui.button("Cancel").clicked() {
                                cancelled = true;
                            }
                        });
                    });
                if confirmed {
                    self.session.commit();
                    self.active_dialog = ActiveDialog::None;
                } else if cancelled {
                    self.active_dialog = ActiveDialog::None;
                }
            }
            ActiveDialog::ConfirmTopUp { plan_idx } => {
                let plan_idx = *plan_idx;
                let Some((plan, linked)) = self
                    .session
                    .meta
                    .as_ref()
                    .and_then(|m| {
                        m.credit_plans
                            .get(plan_idx)
                            .map(|p| (p.clone(), m.linked_service.clone()))
                    })
                else {
                    self.active_dialog = ActiveDialog::None;
                    return;
                };
                let mut confirmed = false;
                let mut cancelled = false;
                egui::Window::new("Confirm top-up?")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
                    .show(ctx, |ui| {
                        ui.label(RichText::new("Amount").weak().small());
                        ui.label(RichText::new(format!("{} credits", plan.credits)).monospace());
                        ui.add_space(4.0);
                        ui.label(RichText::new("Price").weak().small());
                        ui.label(RichText::new(format!("{} via {}", plan.price, linked)).monospace());
                        ui.add_space(4.0);
                        ui.label(
                            RichText::new(
                                "Approve the transfer with your linked payment service first; \
                                 the purchase settles against that approval.",
                            )
                            .weak()
                            .small(),
                        );
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            if ui.button("Confirm top-up").clicked() {
                                confirmed = true;
                            }
                            if ui.button("Cancel").clicked() {
                                cancelled = true;
                            }
                        });
                    });
                if confirmed {
                    self.session.top_up(plan_idx);
                    self.active_dialog = ActiveDialog::None;
                } else if cancelled {
                    self.active_dialog = ActiveDialog::None;
                }
            }
        }
    }

    fn show_settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut open = true;
        egui::Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Server URL");
                ui.text_edit_singleline(&mut self.settings.server_url);
                ui.label("Account");
                ui.text_edit_singleline(&mut self.settings.account);
                ui.label(
                    RichText::new("Server and account changes apply on next launch.")
                        .weak()
                        .small(),
                );
                ui.separator();
                ui.label("Gridlines");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.settings.gridline_mode, GridlineMode::Auto, "Auto");
                    ui.radio_value(&mut self.settings.gridline_mode, GridlineMode::AlwaysOn, "On");
                    ui.radio_value(
                        &mut self.settings.gridline_mode,
                        GridlineMode::AlwaysOff,
                        "Off",
                    );
                });
                ui.checkbox(&mut self.settings.confirm_on_save, "Confirm before saving");
                ui.add_space(6.0);
                if ui.button("Save settings").clicked() {
                    self.settings.save();
                }
            });
        if !open {
            self.show_settings = false;
        }
    }
}

impl eframe::App for PlaceFEApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Drain completed network work first so this frame renders the
        // freshest state; keep repainting while calls are in flight.
        let changed = self.session.poll_events(&mut self.notifier);
        if changed || self.session.is_network_busy() {
            ctx.request_repaint();
        }

        self.show_top_bar(ctx);
        self.show_status_bar(ctx);
        self.show_sidebar(ctx);
        self.show_canvas(ctx);
        self.show_dialogs(ctx);
        self.show_settings_window(ctx);
        self.notifier.draw(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}
