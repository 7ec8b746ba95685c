//! Speech and sound playback.
//!
//! Runs on its own thread, receiving [`Request`]s over a channel. Playback
//! failures are posted back to the ui as [`MessageType::PlaybackFailed`].
//! Speech is best effort: on Linux it shells out to `espeak`, elsewhere it
//! goes through the platform engine behind the `tts` crate.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use log::{debug, error, info, warn};
use rodio::{decoder::DecoderError, Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use thiserror::Error;

use crate::{
    communication::{Message, MessageType, Request, UiSender},
    config::Speech,
};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("couldn't open sound file {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("couldn't decode sound file {}: {source}", path.display())]
    Decode { path: PathBuf, source: DecoderError },
    #[error("no audio output available: {0}")]
    Output(#[from] rodio::StreamError),
}

pub trait Speaker {
    fn speak(&mut self, text: &str);
}

pub trait Player {
    /// start playing `path`, replacing whatever is playing
    ///
    /// # Errors
    /// the file is missing or can't be decoded, or there is no output device
    fn play(&mut self, path: &Path, volume: f32, repeat: bool) -> Result<(), PlaybackError>;

    fn stop(&mut self);
}

/// the platform's speech engine
pub struct SystemSpeaker {
    enabled: bool,
    #[cfg(target_os = "linux")]
    rate: u32,
    #[cfg(not(target_os = "linux"))]
    tts: Option<tts::Tts>,
}

impl SystemSpeaker {
    #[must_use]
    pub fn new(settings: &Speech) -> Self {
        #[cfg(not(target_os = "linux"))]
        let tts = if settings.enabled {
            match tts::Tts::default() {
                Ok(mut engine) => {
                    // words per minute relative to the engine's normal speed
                    let rate = (engine.normal_rate() * settings.rate as f32
                        / Speech::DEFAULT_RATE as f32)
                        .clamp(engine.min_rate(), engine.max_rate());
                    if let Err(e) = engine.set_rate(rate) {
                        debug!("couldn't set speech rate: {e}");
                    }
                    Some(engine)
                }
                Err(e) => {
                    warn!("speech unavailable: {e}");
                    None
                }
            }
        } else {
            None
        };
        Self {
            enabled: settings.enabled,
            #[cfg(target_os = "linux")]
            rate: settings.rate,
            #[cfg(not(target_os = "linux"))]
            tts,
        }
    }
}

impl Speaker for SystemSpeaker {
    #[cfg(target_os = "linux")]
    fn speak(&mut self, text: &str) {
        use std::process::Command;
        if !self.enabled {
            return;
        }
        match Command::new("espeak")
            .arg("-s")
            .arg(self.rate.to_string())
            .arg(text)
            .output()
        {
            Ok(output) if !output.status.success() => {
                warn!("espeak exited with {}", output.status);
            }
            Ok(_) => {}
            Err(e) => warn!("couldn't run espeak: {e}"),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn speak(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        if let Some(tts) = &mut self.tts {
            if let Err(e) = tts.speak(text, false) {
                warn!("couldn't speak: {e}");
            }
        }
    }
}

/// plays sounds through the default output device, opened on first use
#[derive(Default)]
pub struct RodioPlayer {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
}

impl Player for RodioPlayer {
    fn play(&mut self, path: &Path, volume: f32, repeat: bool) -> Result<(), PlaybackError> {
        self.stop();
        let file = File::open(path).map_err(|source| PlaybackError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|source| PlaybackError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => OutputStreamBuilder::open_default_stream()?,
        };
        let sink = Sink::connect_new(stream.mixer());
        sink.set_volume(volume.clamp(0.0, 100.0) / 100.0);
        if repeat {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        sink.play();
        self.stream = Some(stream);
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

/// handle requests until every sender is dropped
pub fn run(
    requests: &Receiver<Request>,
    messages: &UiSender,
    speaker: &mut impl Speaker,
    player: &mut impl Player,
) {
    for request in requests {
        match request {
            Request::Speak(text) => {
                debug!("speaking {text:?}");
                speaker.speak(&text);
            }
            Request::PlaySound {
                alarm_id,
                path,
                volume,
                repeat,
            } => {
                info!("playing {} for alarm {alarm_id}", path.display());
                if let Err(e) = player.play(&path, volume, repeat) {
                    error!("alarm {alarm_id}: {e}");
                    if !messages.send(Message::new(MessageType::PlaybackFailed(e), alarm_id)) {
                        debug!("ui is gone, dropping playback error");
                    }
                }
            }
            Request::StopSound => player.stop(),
        }
    }
    player.stop();
    debug!("notifier shutting down");
}

/// start the notifier thread. the speech engine and audio stream are created on
/// that thread since neither has to be `Send`
///
/// # Errors
/// the thread couldn't be spawned
pub fn spawn(speech: Speech, messages: UiSender) -> io::Result<Sender<Request>> {
    let (sender, requests) = mpsc::channel();
    thread::Builder::new()
        .name("notifier".to_string())
        .spawn(move || {
            let mut speaker = SystemSpeaker::new(&speech);
            let mut player = RodioPlayer::default();
            run(&requests, &messages, &mut speaker, &mut player);
        })?;
    Ok(sender)
}
