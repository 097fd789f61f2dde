//! Gated diagnostics.
//!
//! Every store diagnostic flows through [`emit`], which applies the
//! configured [`StoreOptions`] gate before handing the event to `tracing`:
//! production mode drops everything, development mode surfaces everything,
//! otherwise the severity is checked against the configured level.

use coalesce_core::{LogLevel, StoreOptions};

pub(crate) fn emit(options: &StoreOptions, level: LogLevel, message: &str) {
    if !options.enabled(level) {
        return;
    }
    match level {
        LogLevel::Error => tracing::error!(target: "coalesce", "{message}"),
        LogLevel::Warn => tracing::warn!(target: "coalesce", "{message}"),
        LogLevel::Info => tracing::info!(target: "coalesce", "{message}"),
        LogLevel::Debug => tracing::debug!(target: "coalesce", "{message}"),
    }
}
