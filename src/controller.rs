//! The alarm's lifecycle, independent of the gui.
//!
//! ```text
//!          set(valid)            monitor fired
//!  Idle ─────────────► Armed ─────────────────► Firing
//!   ▲                    │                        │
//!   │       stop()       │    stop() / dismiss    │
//!   └────────────────────┴────────────────────────┘
//! ```
//!
//! Everything here runs on the ui thread. The monitor and the notifier talk
//! back through the [`Message`] queue which [`AlarmController::poll`] drains,
//! so dialogs are only ever raised from the thread that owns the window.

use std::{
    collections::VecDeque,
    fmt,
    io,
    path::PathBuf,
    sync::mpsc::{Receiver, Sender},
};

use chrono::NaiveTime;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    alarm::{AlarmTarget, Countdown, FormatError},
    communication::{Message, MessageType, Request},
    config::Config,
    monitor::{Handle, Monitor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmState {
    #[default]
    Idle,
    Armed(AlarmTarget),
    Firing(AlarmTarget),
}

/// why [`AlarmController::set`] didn't arm anything
#[derive(Debug, Error)]
pub enum SetError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("couldn't start the alarm monitor: {0}")]
    Arm(#[from] io::Error),
}

/// a message the user has to acknowledge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    AlarmSet(AlarmTarget),
    FormatError(FormatError),
    Fired(AlarmTarget),
    Stopped,
    PlaybackError(String),
    ArmFailed(String),
}

impl Dialog {
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::AlarmSet(_) => "Alarm Set",
            Self::FormatError(_) => "Format Error",
            Self::Fired(_) => "Alarm",
            Self::Stopped => "Stopped",
            Self::PlaybackError(_) | Self::ArmFailed(_) => "Error",
        }
    }
}

impl fmt::Display for Dialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlarmSet(target) => write!(f, "Alarm set for {target}"),
            Self::FormatError(e) => write!(f, "Please use HH:MM format (24-hour): {e}."),
            Self::Fired(_) => write!(f, "⏰ WAKE UP! It's time!"),
            Self::Stopped => write!(f, "Alarm has been stopped."),
            Self::PlaybackError(reason) => write!(f, "Could not play alarm sound.\n{reason}"),
            Self::ArmFailed(reason) => write!(f, "Could not start the alarm.\n{reason}"),
        }
    }
}

/// what happens when the alarm goes off
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub wake_message: String,
    pub sound: PathBuf,
    pub volume: f32,
    pub repeat: bool,
}

impl From<&Config> for Notification {
    fn from(config: &Config) -> Self {
        Self {
            wake_message: config.messages.wake.clone(),
            sound: config.sound.clone(),
            volume: config.volume(),
            repeat: config.repeat_sound,
        }
    }
}

pub struct AlarmController {
    monitor: Monitor,
    handle: Option<Handle>,
    state: AlarmState,
    notifier: Sender<Request>,
    messages: Receiver<Message>,
    notification: Notification,
    dialogs: VecDeque<Dialog>,
}

impl AlarmController {
    #[must_use]
    pub fn new(
        monitor: Monitor,
        notifier: Sender<Request>,
        messages: Receiver<Message>,
        notification: Notification,
    ) -> Self {
        Self {
            monitor,
            handle: None,
            state: AlarmState::Idle,
            notifier,
            messages,
            notification,
            dialogs: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> AlarmState {
        self.state
    }

    /// the stop button is only usable while there is something to stop
    #[must_use]
    pub const fn can_stop(&self) -> bool {
        !matches!(self.state, AlarmState::Idle)
    }

    #[must_use]
    pub fn now(&self) -> NaiveTime {
        self.monitor.now()
    }

    #[must_use]
    pub fn countdown(&self, input: &str) -> Countdown {
        Countdown::from_input(self.now(), input)
    }

    pub fn notification_mut(&mut self) -> &mut Notification {
        &mut self.notification
    }

    /// validate `input` and arm the alarm, replacing any alarm already set
    ///
    /// # Errors
    /// [`SetError::Format`] if `input` isn't a valid `HH:MM` time, the current
    /// alarm is left untouched. [`SetError::Arm`] if the monitor couldn't be
    /// started, the old alarm is gone and the state is idle
    pub fn set(&mut self, input: &str) -> Result<AlarmTarget, SetError> {
        let target = match AlarmTarget::parse(input) {
            Ok(target) => target,
            Err(e) => {
                info!("rejected alarm time {input:?}: {e}");
                self.dialogs.push_back(Dialog::FormatError(e.clone()));
                return Err(e.into());
            }
        };
        self.reset();
        let handle = match self.monitor.arm(target) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("couldn't arm alarm for {target}: {e}");
                self.dialogs.push_back(Dialog::ArmFailed(e.to_string()));
                return Err(e.into());
            }
        };
        self.handle = Some(handle);
        self.state = AlarmState::Armed(target);
        self.dialogs.push_back(Dialog::AlarmSet(target));
        self.request(Request::Speak(format!("Alarm set for {target}")));
        Ok(target)
    }

    pub fn stop(&mut self) {
        if !self.can_stop() {
            debug!("stop pressed with no alarm set");
            return;
        }
        info!("alarm stopped");
        self.reset();
        self.dialogs
            .retain(|dialog| !matches!(dialog, Dialog::Fired(_)));
        self.dialogs.push_back(Dialog::Stopped);
        self.request(Request::Speak("Alarm stopped.".to_string()));
    }

    /// handle everything the monitor and notifier have posted since the last call
    pub fn poll(&mut self) {
        while let Ok(Message { kind, alarm_id }) = self.messages.try_recv() {
            match kind {
                MessageType::AlarmFired(target) => self.fired(target, alarm_id),
                MessageType::PlaybackFailed(e) => {
                    warn!("alarm {alarm_id}: {e}");
                    self.dialogs.push_back(Dialog::PlaybackError(e.to_string()));
                }
            }
        }
    }

    #[must_use]
    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialogs.front()
    }

    /// the user closed the front dialog. closing the wake up dialog silences the alarm
    pub fn dismiss_dialog(&mut self) {
        if let Some(Dialog::Fired(target)) = self.dialogs.pop_front() {
            if self.state == AlarmState::Firing(target) {
                info!("alarm for {target} acknowledged");
                self.request(Request::StopSound);
                self.state = AlarmState::Idle;
            }
        }
    }

    fn fired(&mut self, target: AlarmTarget, alarm_id: u64) {
        let current = self.handle.as_ref().map(Handle::id);
        if current != Some(alarm_id) {
            debug!("ignoring alarm {alarm_id}, current alarm is {current:?}");
            return;
        }
        if let Some(handle) = self.handle.take() {
            handle.disarm();
        }
        self.state = AlarmState::Firing(target);
        self.request(Request::Speak(self.notification.wake_message.clone()));
        self.request(Request::PlaySound {
            alarm_id,
            path: self.notification.sound.clone(),
            volume: self.notification.volume,
            repeat: self.notification.repeat,
        });
        self.dialogs.push_back(Dialog::Fired(target));
    }

    // back to idle from any state
    fn reset(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.disarm();
        }
        if matches!(self.state, AlarmState::Firing(_)) {
            self.request(Request::StopSound);
        }
        self.state = AlarmState::Idle;
    }

    fn request(&self, request: Request) {
        if self.notifier.send(request).is_err() {
            warn!("notifier thread is gone");
        }
    }
}

impl Drop for AlarmController {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{mpsc, Arc},
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{communication::UiSender, monitor::tests::FakeTime};

    struct Harness {
        controller: AlarmController,
        time: Arc<FakeTime>,
        requests: Receiver<Request>,
        messages: Sender<Message>,
    }

    fn harness(hour: u32, minute: u32, second: u32) -> Harness {
        harness_with(hour, minute, second, |monitor| monitor)
    }

    fn harness_with(
        hour: u32,
        minute: u32,
        second: u32,
        adapt: impl FnOnce(Monitor) -> Monitor,
    ) -> Harness {
        let time = FakeTime::at(hour, minute, second);
        let (messages, messages_rx) = mpsc::channel();
        let (notifier, requests) = mpsc::channel();
        let monitor = adapt(Monitor::new(
            time.clone(),
            Duration::from_millis(5),
            UiSender::new(messages.clone()),
        ));
        let notification = Notification {
            wake_message: "Wake up!".to_string(),
            sound: PathBuf::from("alarm.mp3"),
            volume: 80.0,
            repeat: true,
        };
        Harness {
            controller: AlarmController::new(monitor, notifier, messages_rx, notification),
            time,
            requests,
            messages,
        }
    }

    impl Harness {
        fn requests(&self) -> Vec<Request> {
            self.requests.try_iter().collect()
        }

        // poll until the controller leaves the armed state
        fn wait_for_fire(&mut self) {
            let start = Instant::now();
            while matches!(self.controller.state(), AlarmState::Armed(_)) {
                assert!(start.elapsed() < Duration::from_secs(5), "alarm never fired");
                thread::sleep(Duration::from_millis(5));
                self.controller.poll();
            }
        }
    }

    #[test]
    fn invalid_input_stays_idle() {
        let mut h = harness(7, 0, 0);
        for input in ["", "7-30", "24:00", "12:60", "noon"] {
            assert!(h.controller.set(input).is_err());
            assert_eq!(h.controller.state(), AlarmState::Idle);
            assert!(!h.controller.can_stop());
            assert!(matches!(h.controller.dialog(), Some(Dialog::FormatError(_))));
            h.controller.dismiss_dialog();
        }
        assert!(h.requests().is_empty());
    }

    #[test]
    fn failed_arm_stays_idle() {
        let mut h = harness_with(7, 0, 0, |monitor| {
            monitor.with_spawner(|_, _| Err(io::Error::other("out of threads")))
        });
        let err = h.controller.set("07:30").unwrap_err();
        assert!(matches!(err, SetError::Arm(_)));
        assert_eq!(h.controller.state(), AlarmState::Idle);
        assert!(!h.controller.can_stop());
        assert!(matches!(
            h.controller.dialog(),
            Some(Dialog::ArmFailed(reason)) if reason.contains("out of threads")
        ));
        assert_eq!(h.controller.dialog().map(Dialog::title), Some("Error"));
        // nothing is announced for an alarm that isn't running
        assert!(h.requests().is_empty());
    }

    #[test]
    fn invalid_input_keeps_the_armed_alarm() {
        let mut h = harness(7, 0, 0);
        let target = h.controller.set("08:00").unwrap();
        assert!(matches!(
            h.controller.set("8"),
            Err(SetError::Format(FormatError::MissingSeparator))
        ));
        assert_eq!(h.controller.state(), AlarmState::Armed(target));
    }

    #[test]
    fn set_arms_and_confirms() {
        let mut h = harness(7, 0, 0);
        let target = h.controller.set("7:30").unwrap();
        assert_eq!(h.controller.state(), AlarmState::Armed(target));
        assert!(h.controller.can_stop());
        assert_eq!(h.controller.dialog(), Some(&Dialog::AlarmSet(target)));
        assert_eq!(
            h.requests(),
            vec![Request::Speak("Alarm set for 07:30".to_string())]
        );
        assert_eq!(
            h.controller.countdown("7:30"),
            Countdown::Remaining(Duration::from_secs(30 * 60))
        );
    }

    #[test]
    fn fires_once_then_goes_idle_on_acknowledge() {
        let mut h = harness(7, 59, 58);
        let target = h.controller.set("08:00").unwrap();
        h.controller.dismiss_dialog();
        h.requests();

        h.time.set(8, 0, 0);
        h.wait_for_fire();
        assert_eq!(h.controller.state(), AlarmState::Firing(target));
        assert!(h.controller.can_stop());
        assert_eq!(h.controller.dialog(), Some(&Dialog::Fired(target)));
        let requests = h.requests();
        assert_eq!(requests[0], Request::Speak("Wake up!".to_string()));
        assert!(matches!(
            &requests[1],
            Request::PlaySound { volume, repeat: true, .. } if (*volume - 80.0).abs() < f32::EPSILON
        ));

        // still inside the alarm minute, nothing more arrives
        thread::sleep(Duration::from_millis(50));
        h.controller.poll();
        assert!(h.requests().is_empty());

        h.controller.dismiss_dialog();
        assert_eq!(h.controller.state(), AlarmState::Idle);
        assert_eq!(h.requests(), vec![Request::StopSound]);
        assert!(h.controller.dialog().is_none());
    }

    #[test]
    fn stop_while_armed_prevents_firing() {
        let mut h = harness(7, 59, 0);
        h.controller.set("08:00").unwrap();
        h.controller.dismiss_dialog();
        h.requests();

        h.controller.stop();
        assert_eq!(h.controller.state(), AlarmState::Idle);
        assert_eq!(h.controller.dialog(), Some(&Dialog::Stopped));
        assert_eq!(h.requests(), vec![Request::Speak("Alarm stopped.".to_string())]);

        h.time.set(8, 0, 0);
        thread::sleep(Duration::from_millis(50));
        h.controller.poll();
        assert_eq!(h.controller.state(), AlarmState::Idle);
        assert!(h.requests().is_empty());
    }

    #[test]
    fn stop_while_firing_silences_the_alarm() {
        let mut h = harness(8, 0, 0);
        h.controller.set("08:00").unwrap();
        h.wait_for_fire();
        h.requests();

        h.controller.stop();
        assert_eq!(h.controller.state(), AlarmState::Idle);
        assert_eq!(
            h.requests(),
            vec![
                Request::StopSound,
                Request::Speak("Alarm stopped.".to_string())
            ]
        );
        // the wake up dialog goes away with the alarm
        let target = AlarmTarget::new(8, 0).unwrap();
        assert_eq!(h.controller.dialog(), Some(&Dialog::AlarmSet(target)));
        h.controller.dismiss_dialog();
        assert_eq!(h.controller.dialog(), Some(&Dialog::Stopped));
    }

    #[test]
    fn stop_when_idle_does_nothing() {
        let mut h = harness(8, 0, 0);
        h.controller.stop();
        assert!(h.controller.dialog().is_none());
        assert!(h.requests().is_empty());
    }

    #[test]
    fn stale_fire_is_ignored() {
        let mut h = harness(7, 0, 0);
        h.controller.set("09:00").unwrap();
        let stale = AlarmTarget::new(8, 0).unwrap();
        h.messages
            .send(Message::new(MessageType::AlarmFired(stale), u64::MAX))
            .unwrap();
        h.controller.poll();
        assert!(matches!(h.controller.state(), AlarmState::Armed(_)));
    }

    #[test]
    fn playback_failure_is_shown() {
        let mut h = harness(7, 0, 0);
        let error = crate::notifier::PlaybackError::Open {
            path: PathBuf::from("alarm.mp3"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        h.messages
            .send(Message::new(MessageType::PlaybackFailed(error), 1))
            .unwrap();
        h.controller.poll();
        assert!(matches!(
            h.controller.dialog(),
            Some(Dialog::PlaybackError(reason)) if reason.contains("alarm.mp3")
        ));
    }

    #[test]
    fn resetting_replaces_the_previous_alarm() {
        let mut h = harness(7, 0, 0);
        h.controller.set("07:01").unwrap();
        let second = h.controller.set("07:02").unwrap();
        assert_eq!(h.controller.state(), AlarmState::Armed(second));

        h.time.set(7, 1, 0);
        thread::sleep(Duration::from_millis(50));
        h.controller.poll();
        assert_eq!(h.controller.state(), AlarmState::Armed(second));
    }

    #[test]
    fn notification_volume_is_clamped() {
        let mut config = Config::new();
        config.volume = 250.0;
        assert!((Notification::from(&config).volume - 100.0).abs() < f32::EPSILON);
        config.volume = -1.0;
        assert!(Notification::from(&config).volume.abs() < f32::EPSILON);
    }

    #[test]
    fn countdown_is_unknown_for_bad_input() {
        let h = harness(7, 0, 0);
        assert_eq!(h.controller.countdown("later"), Countdown::Unknown);
    }
}
