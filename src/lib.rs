// Core modules
pub mod config;
pub mod error;
pub mod indicators;
pub mod models;
pub mod monitor;
pub mod risk;
pub mod scheduler;

// Re-export commonly used types
pub use error::{TradeError, TradeResult};
pub use indicators::Ema;
pub use models::*;
pub use risk::{CalculatorConfig, PositionCalculator};
pub use scheduler::{ClockAlignedScheduler, TickHandler};

// Application-level error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
