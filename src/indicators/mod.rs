// Technical indicators module
// Streaming EMA plus batch SMA/EMA helpers

pub mod moving_average;

pub use moving_average::{calculate_ema, calculate_sma, Ema};
