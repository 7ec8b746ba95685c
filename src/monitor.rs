//! Background alarm monitor.
//!
//! Every arm cycle gets its own worker thread which compares the local time
//! to the target once per poll interval. The worker posts a single
//! [`MessageType::AlarmFired`] and exits as soon as the target minute is
//! observed, so an alarm can't ring twice for the same arm. Disarming drops
//! the worker's cancel channel, which wakes it out of its sleep immediately.

use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::NaiveTime;
use log::{debug, error, info};

use crate::{
    alarm::AlarmTarget,
    communication::{Message, MessageType, UiSender},
};

/// where the monitor gets the current time of day from
pub trait TimeSource: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// the system's local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTime;

impl TimeSource for LocalTime {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().naive_local().time()
    }
}

static NEXT_ALARM_ID: AtomicU64 = AtomicU64::new(1);

fn next_alarm_id() -> u64 {
    NEXT_ALARM_ID.fetch_add(1, Ordering::Relaxed)
}

/// starts a named worker thread
pub type Spawner = fn(String, Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>;

fn spawn_thread(name: String, work: Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name).spawn(work)
}

pub struct Monitor {
    time: Arc<dyn TimeSource>,
    poll_interval: Duration,
    sender: UiSender,
    spawner: Spawner,
}

impl Monitor {
    #[must_use]
    pub fn new(time: Arc<dyn TimeSource>, poll_interval: Duration, sender: UiSender) -> Self {
        Self {
            time,
            poll_interval,
            sender,
            spawner: spawn_thread,
        }
    }

    /// use `spawner` instead of [`std::thread::Builder`] for the worker threads
    #[must_use]
    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = spawner;
        self
    }

    #[must_use]
    pub fn now(&self) -> NaiveTime {
        self.time.now()
    }

    /// start watching for `target` on a new worker thread
    ///
    /// # Errors
    /// the worker thread couldn't be started, nothing is watching the clock
    pub fn arm(&self, target: AlarmTarget) -> io::Result<Handle> {
        let id = next_alarm_id();
        let (cancel, cancelled) = mpsc::channel::<()>();
        let time = Arc::clone(&self.time);
        let sender = self.sender.clone();
        let poll_interval = self.poll_interval;
        info!("arming alarm {id} for {target}");
        let work = Box::new(move || loop {
            if target.matches(time.now()) {
                info!("alarm {id} fired at {target}");
                if !sender.send(Message::new(MessageType::AlarmFired(target), id)) {
                    debug!("alarm {id} fired after the ui went away");
                }
                break;
            }
            match cancelled.recv_timeout(poll_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("alarm {id} disarmed");
                    break;
                }
            }
        });
        let worker = (self.spawner)(format!("alarm-monitor-{id}"), work)
            .inspect_err(|e| error!("couldn't spawn monitor thread for alarm {id}: {e}"))?;
        Ok(Handle {
            id,
            target,
            cancel: Some(cancel),
            worker: Some(worker),
        })
    }
}

/// a running (or finished) monitor. dropping it disarms the alarm without
/// waiting for the worker
#[derive(Debug)]
pub struct Handle {
    id: u64,
    target: AlarmTarget,
    cancel: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Handle {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub const fn target(&self) -> AlarmTarget {
        self.target
    }

    /// true once the worker has exited, either by firing or by being disarmed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// stop monitoring and wait for the worker to exit
    pub fn disarm(mut self) {
        if let Some(cancel) = self.cancel.take() {
            // the worker is gone already if it fired
            let _ = cancel.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("monitor thread for alarm {} panicked", self.id);
            }
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        // disconnecting the channel wakes the worker
        self.cancel.take();
    }
}
