use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Expiry signal for one `QuestionTimer::start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    pub generation: u64,
}

#[derive(Debug, Default)]
struct TimerState {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Per-question countdown.
///
/// Each `start` gets a new generation. An expiry is sent only while its
/// generation is still current, and the check happens under the same lock
/// `cancel` takes, so once `cancel` returns the cancelled countdown can no
/// longer emit.
pub struct QuestionTimer {
    state: Arc<Mutex<TimerState>>,
    remaining: Arc<watch::Sender<u32>>,
    expired: mpsc::UnboundedSender<TimerExpired>,
}

/// Receiving side of a `QuestionTimer`'s expiry events.
pub struct TimerEvents {
    state: Arc<Mutex<TimerState>>,
    rx: mpsc::UnboundedReceiver<TimerExpired>,
}

impl QuestionTimer {
    #[must_use]
    pub fn new() -> (Self, TimerEvents) {
        let state = Arc::new(Mutex::new(TimerState::default()));
        let (remaining, _) = watch::channel(0);
        let (expired, rx) = mpsc::unbounded_channel();
        let timer = Self {
            state: Arc::clone(&state),
            remaining: Arc::new(remaining),
            expired,
        };
        (timer, TimerEvents { state, rx })
    }

    /// Start a countdown of `duration_secs`, replacing any running one.
    ///
    /// Must be called from within a tokio runtime. Returns the generation the
    /// eventual `TimerExpired` will carry.
    pub fn start(&self, duration_secs: u32) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        self.remaining.send_replace(duration_secs);

        let shared = Arc::clone(&self.state);
        let remaining = Arc::clone(&self.remaining);
        let expired = self.expired.clone();
        let started = Instant::now();
        state.task = Some(tokio::spawn(async move {
            for elapsed in 1..=duration_secs {
                sleep_until(started + Duration::from_secs(u64::from(elapsed))).await;
                if !is_generation(&shared, generation) {
                    return;
                }
                remaining.send_replace(duration_secs - elapsed);
            }

            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation == generation {
                state.task = None;
                let _ = expired.send(TimerExpired { generation });
            }
        }));
        generation
    }

    /// Stop the running countdown, if any. Safe to call in any state.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    /// True while `event` belongs to the most recent `start`.
    #[must_use]
    pub fn is_current(&self, event: TimerExpired) -> bool {
        is_generation(&self.state, event.generation)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .task
            .is_some()
    }

    /// Remaining seconds of the current countdown, for display only.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.subscribe()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        *self.remaining.borrow()
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl TimerEvents {
    /// Wait for the next expiry that is still current.
    ///
    /// Returns `None` once the timer has been dropped.
    pub async fn recv(&mut self) -> Option<TimerExpired> {
        loop {
            let event = self.rx.recv().await?;
            if is_generation(&self.state, event.generation) {
                return Some(event);
            }
        }
    }
}

fn is_generation(state: &Mutex<TimerState>, generation: u64) -> bool {
    state
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .generation
        == generation
}
