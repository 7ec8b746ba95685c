use eframe::egui::{self, Id, Modal, RichText};

use crate::{alarm::Countdown, controller::Dialog};

/// show `dialog` on top of everything else, returns true once the user closes it
pub fn show_dialog(ctx: &egui::Context, dialog: &Dialog) -> bool {
    let mut acknowledged = false;
    let response = Modal::new(Id::new("roosty_alarm_dialog")).show(ctx, |ui| {
        ui.set_min_width(260.0);
        ui.heading(dialog.title());
        ui.label(dialog.to_string());
        ui.separator();
        ui.vertical_centered(|ui| {
            if ui.button("OK").clicked() {
                acknowledged = true;
            }
        });
    });
    acknowledged || response.should_close()
}

pub fn clock_label(ui: &mut egui::Ui, now: &str) {
    ui.label(RichText::new(now).size(50.0).strong().monospace());
}

pub fn countdown_label(ui: &mut egui::Ui, countdown: Countdown) {
    ui.label(RichText::new(format!("Time remaining: {countdown}")).monospace());
}
