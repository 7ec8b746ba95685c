use std::{
    error::Error,
    path::PathBuf,
    sync::{mpsc, Arc},
};

use clap::{Parser, Subcommand};
use eframe::{egui::ViewportBuilder, run_native};
use log::{error, info};
use roosty_alarm::{
    alarm::{AlarmTarget, Countdown},
    config::Config,
    controller::{AlarmController, Notification},
    monitor::{LocalTime, Monitor, TimeSource},
    communication::UiSender,
    notifier, Clock,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// arm an alarm (HH:MM, 24-hour) as soon as the clock opens
    #[clap(long, short)]
    alarm: Option<String>,
    /// use this config file instead of the default one
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// print how long until HH:MM and exit
    Countdown { time: String },
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    if let Err(e) = simple_file_logger::init_logger!("roosty_alarm") {
        eprintln!("couldn't initialize logger: {e:?}");
    }

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => Some(path),
        None => Config::config_path()
            .inspect_err(|e| error!("{e}"))
            .ok(),
    };

    match args.command {
        Some(Command::Init { force }) => {
            let path = config_path.ok_or("no config path available")?;
            if force || !path.exists() {
                Config::new().save(&path)?;
                println!("wrote {}", path.display());
            } else {
                println!("{} already exists, use --force to overwrite", path.display());
            }
            Ok(())
        }
        Some(Command::Countdown { time }) => {
            AlarmTarget::parse(&time)?;
            println!(
                "Time remaining: {}",
                Countdown::from_input(LocalTime.now(), &time)
            );
            Ok(())
        }
        None => run_clock(config_path, args.alarm),
    }
}

fn run_clock(config_path: Option<PathBuf>, alarm: Option<String>) -> Result<(), Box<dyn Error>> {
    let config = config_path
        .as_deref()
        .map_or_else(Config::default, Config::load_or_default);

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([400.0, 320.0])
            .with_resizable(false),
        ..Default::default()
    };
    run_native(
        "Roosty Alarm",
        native_options,
        Box::new(move |cc| {
            // workers repaint the window themselves so a fired alarm shows up
            // even while egui is idling
            let ctx = cc.egui_ctx.clone();
            let (sender, receiver) = mpsc::channel();
            let sender = UiSender::new(sender).with_waker(move || ctx.request_repaint());
            let requests = notifier::spawn(config.speech.clone(), sender.clone())?;
            let monitor = Monitor::new(Arc::new(LocalTime), config.poll_interval(), sender);
            let mut controller =
                AlarmController::new(monitor, requests, receiver, Notification::from(&config));
            if let Some(alarm) = &alarm {
                match controller.set(alarm) {
                    Ok(target) => info!("alarm armed from the command line for {target}"),
                    Err(e) => error!("couldn't arm {alarm:?}: {e}"),
                }
            }
            Ok(Box::new(Clock::new(
                config,
                config_path,
                controller,
                alarm.unwrap_or_default(),
            )))
        }),
    )
    .map_err(|e| e.into())
}
