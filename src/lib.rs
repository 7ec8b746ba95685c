#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::{path::PathBuf, time::Duration};

use controller::AlarmController;
use eframe::egui::{self, Button, CentralPanel, TextEdit};
use log::{debug, info, warn};

/// alarm times and the countdown
pub mod alarm;
pub mod communication;
pub mod config;
pub mod controller;
pub mod monitor;
/// speech and sound playback
pub mod notifier;
pub mod widgets;

use config::Config;

pub struct Clock {
    config: Config,
    config_path: Option<PathBuf>,
    controller: AlarmController,
    alarm_input: String,
}

impl Clock {
    #[must_use]
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        controller: AlarmController,
        alarm_input: String,
    ) -> Self {
        Self {
            config,
            config_path,
            controller,
            alarm_input,
        }
    }

    fn render_clock(&self, ui: &mut egui::Ui) {
        let now = self.controller.now().format(&self.config.time_format);
        ui.vertical_centered(|ui| {
            widgets::clock_label(ui, &now.to_string());
        });
    }

    fn render_alarm_entry(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.label("Set Alarm (HH:MM, 24-hour format)");
            let entry = ui.add(
                TextEdit::singleline(&mut self.alarm_input)
                    .hint_text("07:30")
                    .desired_width(120.0),
            );
            // enter in the field works like the set button
            if entry.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.set_alarm();
            }
            widgets::countdown_label(ui, self.controller.countdown(&self.alarm_input));
        });
    }

    fn render_buttons(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Set Alarm").clicked() {
                self.set_alarm();
            }
            if ui
                .add_enabled(self.controller.can_stop(), Button::new("Stop Alarm"))
                .clicked()
            {
                self.controller.stop();
            }
            if ui
                .button("🔔")
                .on_hover_text(format!("alarm sound: {}", self.config.sound.display()))
                .clicked()
            {
                self.pick_sound();
            }
        });
    }

    // the controller has already queued a dialog for the user
    fn set_alarm(&mut self) {
        if let Err(e) = self.controller.set(&self.alarm_input) {
            debug!("alarm not set from {:?}: {e}", self.alarm_input);
        }
    }

    fn pick_sound(&mut self) {
        let file_dialog = rfd::FileDialog::new()
            .set_title("Pick alarm sound")
            .add_filter("audio", &["mp3", "wav", "ogg", "flac"]);
        let file_dialog = match directories::UserDirs::new()
            .and_then(|u| u.audio_dir().map(std::path::Path::to_path_buf))
        {
            Some(audio_path) => file_dialog.set_directory(audio_path),
            None => file_dialog,
        };
        if let Some(path) = file_dialog.pick_file() {
            info!("alarm sound set to {}", path.display());
            self.config.sound.clone_from(&path);
            self.controller.notification_mut().sound = path;
            self.save();
        }
    }

    fn save(&self) {
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save(path) {
                warn!("{e}");
            }
        }
    }
}

impl eframe::App for Clock {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // the clock ticks once a second, the monitor and notifier wake us in between
        ctx.request_repaint_after(Duration::from_secs(1));
        self.controller.poll();

        if let Some(dialog) = self.controller.dialog() {
            if widgets::show_dialog(ctx, dialog) {
                self.controller.dismiss_dialog();
            }
        }

        CentralPanel::default().show(ctx, |ui| {
            self.render_clock(ui);
            ui.add_space(10.0);
            self.render_alarm_entry(ui);
            ui.add_space(10.0);
            ui.vertical_centered(|ui| self.render_buttons(ui));
        });
    }
}
