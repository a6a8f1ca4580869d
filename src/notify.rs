//! Toast notifications.
//!
//! Every network failure or commit outcome surfaces as exactly one notice;
//! the queue renders as a stack of timed toasts in the top-right corner.
//! Errors are mirrored into the session log.

use egui::{Align2, Color32, Id, Order, RichText};

use crate::{log_err, log_info};

/// How long a toast stays on screen, by severity.
const INFO_TOAST_SECS: f64 = 5.0;
const ERROR_TOAST_SECS: f64 = 9.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub detail: String,
    /// Frame time when first drawn; expiry counts from here so notices
    /// posted while the window was busy still get their full display time.
    shown_at: Option<f64>,
}

#[derive(Default)]
pub struct Notifier {
    notices: Vec<Notice>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, title: impl Into<String>, detail: impl Into<String>) {
        let (title, detail) = (title.into(), detail.into());
        log_info!("{}: {}", title, detail);
        self.push(NoticeKind::Success, title, detail);
    }

    pub fn error(&mut self, title: impl Into<String>, detail: impl Into<String>) {
        let (title, detail) = (title.into(), detail.into());
        log_err!("{}: {}", title, detail);
        self.push(NoticeKind::Error, title, detail);
    }

    pub fn info(&mut self, title: impl Into<String>, detail: impl Into<String>) {
        let (title, detail) = (title.into(), detail.into());
        log_info!("{}: {}", title, detail);
        self.push(NoticeKind::Info, title, detail);
    }

    fn push(&mut self, kind: NoticeKind, title: String, detail: String) {
        self.notices.push(Notice {
            kind,
            title,
            detail,
            shown_at: None,
        });
    }

    #[cfg(test)]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Draw the toast stack and drop expired entries.
    pub fn draw(&mut self, ctx: &egui::Context) {
        if self.notices.is_empty() {
            return;
        }
        let now = ctx.input(|i| i.time);
        for notice in &mut self.notices {
            notice.shown_at.get_or_insert(now);
        }
        self.notices.retain(|n| {
            let ttl = match n.kind {
                NoticeKind::Error => ERROR_TOAST_SECS,
                _ => INFO_TOAST_SECS,
            };
            now - n.shown_at.unwrap_or(now) < ttl
        });
        if self.notices.is_empty() {
            return;
        }

        egui::Area::new(Id::new("placefe_toasts"))
            .anchor(Align2::RIGHT_TOP, egui::vec2(-12.0, 36.0))
            .order(Order::Foreground)
            .interactable(false)
            .show(ctx, |ui| {
                ui.set_max_width(340.0);
                for notice in &self.notices {
                    let (accent, bg) = match notice.kind {
                        NoticeKind::Success => {
                            (Color32::from_rgb(94, 201, 136), Color32::from_rgb(20, 34, 26))
                        }
                        NoticeKind::Error => {
                            (Color32::from_rgb(240, 110, 110), Color32::from_rgb(40, 22, 22))
                        }
                        NoticeKind::Info => {
                            (Color32::from_rgb(120, 170, 240), Color32::from_rgb(22, 28, 40))
                        }
                    };
                    egui::Frame::none()
                        .fill(bg)
                        .stroke(egui::Stroke::new(1.0, accent))
                        .rounding(4.0)
                        .inner_margin(8.0)
                        .show(ui, |ui| {
                            ui.label(RichText::new(&notice.title).color(accent).strong());
                            if !notice.detail.is_empty() {
                                ui.label(
                                    RichText::new(&notice.detail)
                                        .color(Color32::from_gray(200))
                                        .small(),
                                );
                            }
                        });
                    ui.add_space(6.0);
                }
            });

        // Keep repainting so expiry fires without input events.
        ctx.request_repaint_after(std::time::Duration::from_millis(250));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_queue_in_order() {
        let mut n = Notifier::new();
        n.success("a", "");
        n.error("b", "cause");
        n.info("c", "");
        let kinds: Vec<_> = n.notices().iter().map(|x| x.kind).collect();
        assert_eq!(
            kinds,
            vec![NoticeKind::Success, NoticeKind::Error, NoticeKind::Info]
        );
    }
}
