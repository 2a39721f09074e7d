use chrono::{DateTime, Duration as ChronoDuration, Local, Timelike};
use std::panic::{self, AssertUnwindSafe};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::clock::{Clock, SystemClock};
use crate::error::{TradeError, TradeResult};

/// Wall-clock polling cadence; a qualifying second is never missed by more than this
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Callback invoked on every aligned tick
pub trait TickHandler: Send {
    fn on_tick(&mut self, at: DateTime<Local>) -> anyhow::Result<()>;
}

impl<F> TickHandler for F
where
    F: FnMut(DateTime<Local>) -> anyhow::Result<()> + Send,
{
    fn on_tick(&mut self, at: DateTime<Local>) -> anyhow::Result<()> {
        self(at)
    }
}

/// Receives callback failures; the loop keeps polling afterwards
pub type ErrorSink = Box<dyn FnMut(DateTime<Local>, &anyhow::Error) + Send>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub polls: u64,
    pub ticks_fired: u64,
    pub failures: u64,
}

/// True when `at` falls on second zero of a minute divisible by `frequency_minutes`
pub fn is_aligned(at: DateTime<Local>, frequency_minutes: u32) -> bool {
    frequency_minutes > 0 && at.minute() % frequency_minutes == 0 && at.second() == 0
}

/// First aligned instant at or after `now`
///
/// Returns `now` itself only when it sits exactly on an aligned second.
pub fn next_boundary(now: DateTime<Local>, frequency_minutes: u32) -> Option<DateTime<Local>> {
    if frequency_minutes == 0 {
        return None;
    }
    if is_aligned(now, frequency_minutes) && now.nanosecond() == 0 {
        return Some(now);
    }

    let mut candidate = now.with_nanosecond(0)?.with_second(0)?;
    // Minute 0 of the next hour always qualifies
    for _ in 0..=60 {
        candidate += ChronoDuration::minutes(1);
        if candidate.minute() % frequency_minutes == 0 {
            return Some(candidate);
        }
    }
    None
}

/// Latest aligned instant at or before `now`
pub fn previous_boundary(now: DateTime<Local>, frequency_minutes: u32) -> Option<DateTime<Local>> {
    if frequency_minutes == 0 {
        return None;
    }

    let mut candidate = now.with_nanosecond(0)?.with_second(0)?;
    for _ in 0..=60 {
        if candidate.minute() % frequency_minutes == 0 {
            return Some(candidate);
        }
        candidate -= ChronoDuration::minutes(1);
    }
    None
}

/// Fires a handler every N minutes on the minute
///
/// Polls the clock once per `poll_interval` and calls the handler
/// synchronously, so there is never more than one callback in flight. A
/// slow callback delays the following polls rather than overlapping them.
///
/// A boundary fires when it falls between the previous poll (exclusive) and
/// the current one (inclusive), so poll jitter across a second boundary
/// cannot lose a tick. The handler receives the boundary itself, not the
/// poll time.
pub struct ClockAlignedScheduler<H, C = SystemClock> {
    frequency_minutes: u32,
    handler: H,
    clock: C,
    poll_interval: Duration,
    last_poll: Option<DateTime<Local>>,
    last_fired: Option<DateTime<Local>>,
    error_sink: Option<ErrorSink>,
    stats: SchedulerStats,
}

impl<H: TickHandler> ClockAlignedScheduler<H, SystemClock> {
    /// Create a scheduler on the local wall clock
    ///
    /// Frequencies that do not divide 60 are accepted but fire on an
    /// irregular pattern (e.g. 7 fires at :00, :07, ... :56 and then :00 again).
    pub fn new(frequency_minutes: u32, handler: H) -> TradeResult<Self> {
        if frequency_minutes == 0 {
            return Err(TradeError::InvalidConfig(
                "scheduler frequency must be a positive number of minutes".to_string(),
            ));
        }
        if 60 % frequency_minutes != 0 {
            tracing::warn!(
                frequency_minutes,
                "Frequency does not divide 60, firing pattern will not repeat every hour"
            );
        }

        Ok(Self {
            frequency_minutes,
            handler,
            clock: SystemClock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_poll: None,
            last_fired: None,
            error_sink: None,
            stats: SchedulerStats::default(),
        })
    }
}

impl<H: TickHandler, C: Clock> ClockAlignedScheduler<H, C> {
    /// Swap the time source
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ClockAlignedScheduler<H, C2> {
        ClockAlignedScheduler {
            frequency_minutes: self.frequency_minutes,
            handler: self.handler,
            clock,
            poll_interval: self.poll_interval,
            last_poll: self.last_poll,
            last_fired: self.last_fired,
            error_sink: self.error_sink,
            stats: self.stats,
        }
    }

    /// Must stay at or under one second to observe every qualifying second
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        // tokio::time::interval panics on a zero period
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_error_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(DateTime<Local>, &anyhow::Error) + Send + 'static,
    {
        self.error_sink = Some(Box::new(sink));
        self
    }

    pub fn frequency_minutes(&self) -> u32 {
        self.frequency_minutes
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Read the clock once and fire any boundary passed since the last read
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        self.poll_at(now)
    }

    /// One loop step at a given time; returns whether the handler ran
    ///
    /// When polls were delayed past several boundaries only the latest one
    /// fires, stamped with its nominal time.
    pub fn poll_at(&mut self, now: DateTime<Local>) -> bool {
        self.stats.polls += 1;

        let previous = self.last_poll.replace(now);
        let due = match previous {
            // The first poll only catches a boundary it lands inside
            None if is_aligned(now, self.frequency_minutes) => now.with_nanosecond(0),
            None => None,
            Some(previous) => {
                previous_boundary(now, self.frequency_minutes).filter(|b| *b > previous)
            }
        };
        let Some(tick) = due else {
            return false;
        };

        // Two polls inside the same second must not fire twice
        if self.last_fired == Some(tick) {
            return false;
        }
        self.last_fired = Some(tick);
        self.stats.ticks_fired += 1;

        tracing::debug!(
            tick = %tick.format("%H:%M:%S"),
            polled = %now.format("%H:%M:%S%.3f"),
            "Scheduler tick"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handler.on_tick(tick)));
        let error = match outcome {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => e,
            Err(payload) => anyhow::anyhow!("tick handler panicked: {}", panic_message(&*payload)),
        };

        self.stats.failures += 1;
        tracing::error!(
            tick = %tick.format("%H:%M:%S"),
            error = %error,
            "Tick handler failed, continuing"
        );
        if let Some(sink) = self.error_sink.as_mut() {
            sink(tick, &error);
        }

        true
    }

    /// Poll until `cancel` fires, then return the run statistics
    pub async fn run(&mut self, cancel: CancellationToken) -> SchedulerStats {
        let now = self.clock.peek();
        if let Some(next) = next_boundary(now, self.frequency_minutes) {
            tracing::info!(
                frequency_minutes = self.frequency_minutes,
                next_tick = %next.format("%H:%M:%S"),
                "Scheduler starting"
            );
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        ticks = self.stats.ticks_fired,
                        failures = self.stats.failures,
                        "Scheduler cancelled"
                    );
                    break;
                }
                _ = ticker.tick() => {
                    self.poll();
                }
            }
        }

        self.stats
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
