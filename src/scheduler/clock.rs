use chrono::{DateTime, Duration, Local};
use std::sync::{Arc, Mutex};

/// Source of "now" for the scheduler
pub trait Clock: Send {
    fn now(&self) -> DateTime<Local>;

    /// Read without side effects; simulated clocks do not step
    fn peek(&self) -> DateTime<Local> {
        self.now()
    }
}

/// Local wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Simulated clock for replays and tests
///
/// Cloned handles share the same time. With a non-zero `step`, every read
/// returns the current time and then advances it by `step`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
    step: Duration,
}

impl ManualClock {
    /// Clock frozen at `start` until advanced
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            step: Duration::zero(),
        }
    }

    /// Clock that moves forward by `step` on every read
    pub fn stepping(start: DateTime<Local>, step: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Local>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        let current = *now;
        *now += self.step;
        current
    }

    fn peek(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
