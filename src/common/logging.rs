//! Structured Logging for the Bridge Ledger
//!
//! Every domain event and every rejected operation is written as a JSON
//! `LogEvent` on a per-concern tracing target:
//!
//! - `bridge::deposit` - reveals
//! - `bridge::sweep` - accepted sweep proofs
//! - `bridge::minting` - optimistic minting and debt repayment
//! - `bridge::governance` - parameter updates, roles, pause state
//! - `bridge::security` - rejected operations
//!
//! # Usage
//!
//! ```no_run
//! use btc_bridge_ledger::common::logging::init_logging;
//!
//! init_logging(tracing::Level::INFO, true).expect("logging");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::error::BridgeError;
use crate::types::BridgeEvent;

/// Parse a configured level name; unknown names fall back to INFO
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Deposit reveals
    Deposit,
    /// Sweep proof acceptance
    Sweep,
    /// Optimistic minting and debt
    Minting,
    /// Parameter updates, roles, pause state
    Governance,
    /// Rejected operations
    Security,
    /// Startup and configuration
    System,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (ISO 8601)
    pub timestamp: String,
    /// Log level
    pub level: String,
    /// Event category
    pub category: EventCategory,
    /// Human-readable message
    pub message: String,
    /// Correlation ID for tracing one operation across log lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for rejected operations
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: Level, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.as_str().to_string(),
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            error: None,
        }
    }

    /// Add correlation ID
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add structured data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add error details
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    /// Log this event to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

// ============================================================================
// Domain Event Logging
// ============================================================================

/// Log an emitted domain event on its category target
pub fn log_bridge_event(event: &BridgeEvent) {
    let category = event.category();
    let data = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
    let entry = LogEvent::new(Level::INFO, category, event.name()).with_data(data);

    match category {
        EventCategory::Deposit => tracing::info!(target: "bridge::deposit", "{}", entry.to_json()),
        EventCategory::Sweep => tracing::info!(target: "bridge::sweep", "{}", entry.to_json()),
        EventCategory::Minting => tracing::info!(target: "bridge::minting", "{}", entry.to_json()),
        EventCategory::Governance => {
            tracing::info!(target: "bridge::governance", "{}", entry.to_json())
        }
        EventCategory::Security => tracing::info!(target: "bridge::security", "{}", entry.to_json()),
        EventCategory::System => tracing::info!(target: "bridge::system", "{}", entry.to_json()),
    }
}

/// Log a rejected operation
pub fn log_rejection(operation: &str, error: &BridgeError, correlation_id: Option<&str>) {
    let mut event = LogEvent::new(Level::WARN, EventCategory::Security, operation)
        .with_data(serde_json::json!({
            "operation": operation,
            "category": format!("{:?}", error.category()),
        }))
        .with_error(error.error_code(), error.to_string());

    if let Some(id) = correlation_id {
        event = event.with_correlation_id(id);
    }

    tracing::warn!(target: "bridge::security", "{}", event.to_json());
}

// ============================================================================
// Initialization
// ============================================================================

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level` when set. JSON output carries thread ids and
/// span close events; the pretty form is meant for local runs.
pub fn init_logging(level: Level, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_ascii_lowercase();
        EnvFilter::new(format!("bridge={level},btc_bridge_ledger={level}"))
    });
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().pretty().with_target(true).with_line_number(true))
            .try_init()
    };

    installed.map_err(|e| LoggingError::InitFailed(e.to_string()))
}

/// JSON on mainnet, pretty output elsewhere
pub fn init_from_config(config: &super::config::BridgeConfig) -> Result<(), LoggingError> {
    init_logging(
        parse_level(&config.log_level),
        config.network == super::config::Network::Mainnet,
    )
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Generate a unique correlation ID
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ============================================================================
// Tests
// ============================================================================
