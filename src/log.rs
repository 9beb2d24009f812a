//! Diagnostics sink.
//!
//! Leveled, structured and fire-and-forget: reporting never changes control
//! flow. Events are emitted through `tracing` with the tag of the component
//! currently handling work (or `Unknown`) attached as a field.

use std::fmt;

use crate::engine::current_component_tag;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name. Unknown names fall back to `Info`.
    pub fn parse(name: &str) -> Self {
        match name {
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Report a diagnostic with contextual data.
pub fn report(level: LogLevel, message: &str, data: impl fmt::Debug) {
    let tag = current_component_tag();
    let component = tag.as_deref().unwrap_or("Unknown");

    match level {
        LogLevel::Info => tracing::info!(component, data = ?data, "{message}"),
        LogLevel::Warn => tracing::warn!(component, data = ?data, "{message}"),
        LogLevel::Error => tracing::error!(component, data = ?data, "{message}"),
    }
}
