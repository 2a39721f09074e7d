// Clock-aligned periodic driver
pub mod clock;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timer::{
    is_aligned, next_boundary, previous_boundary, ClockAlignedScheduler, ErrorSink, SchedulerStats,
    TickHandler, DEFAULT_POLL_INTERVAL,
};
