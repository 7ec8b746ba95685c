use std::{
    fmt,
    path::PathBuf,
    sync::{mpsc::Sender, Arc},
};

use crate::{alarm::AlarmTarget, notifier::PlaybackError};

/// posted back to the ui thread by the alarm monitor and the notifier
#[derive(Debug)]
pub struct Message {
    pub kind: MessageType,
    /// which arm cycle this message belongs to, see [`crate::monitor::Handle::id`]
    pub alarm_id: u64,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: u64) -> Self {
        Self { kind, alarm_id }
    }
}

#[derive(Debug)]
pub enum MessageType {
    AlarmFired(AlarmTarget),
    PlaybackFailed(PlaybackError),
}

/// the worker side of the ui queue. every message also runs the waker so a
/// throttled or minimized window still gets to handle it right away
#[derive(Clone)]
pub struct UiSender {
    sender: Sender<Message>,
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl UiSender {
    #[must_use]
    pub const fn new(sender: Sender<Message>) -> Self {
        Self {
            sender,
            waker: None,
        }
    }

    /// in the gui this is `egui::Context::request_repaint`
    #[must_use]
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    /// returns false if the ui is gone
    pub fn send(&self, message: Message) -> bool {
        let sent = self.sender.send(message).is_ok();
        if sent {
            if let Some(waker) = &self.waker {
                waker();
            }
        }
        sent
    }
}

impl fmt::Debug for UiSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiSender")
            .field("waker", &self.waker.is_some())
            .finish_non_exhaustive()
    }
}

/// work for the notifier thread
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Speak(String),
    PlaySound {
        alarm_id: u64,
        path: PathBuf,
        volume: f32,
        repeat: bool,
    },
    // the alarm was acknowledged or stopped
    StopSound,
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc,
    };

    use super::*;

    #[test]
    fn send_wakes_the_ui() {
        let (sender, receiver) = mpsc::channel();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let sender = UiSender::new(sender).with_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let target = AlarmTarget::new(6, 30).unwrap();

        assert!(sender.send(Message::new(MessageType::AlarmFired(target), 4)));
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert_eq!(receiver.try_recv().unwrap().alarm_id, 4);

        // nobody to wake once the ui is gone
        drop(receiver);
        assert!(!sender.send(Message::new(MessageType::AlarmFired(target), 5)));
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }
}
