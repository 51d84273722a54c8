//! Common Infrastructure Module
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - The root error type
//! - The time source

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BridgeConfig, ConfigError, Network};
pub use error::{BridgeError, ErrorCategory, Result};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_bridge_event, log_rejection,
    parse_level, ErrorDetails, EventCategory, LogEvent, LoggingError,
};
