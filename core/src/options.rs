//! Store configuration.

/// Severity of a store diagnostic, most severe first.
///
/// The configured level is the *most verbose* severity surfaced: with
/// [`LogLevel::Warn`] configured, errors and warnings are emitted and
/// info/debug events are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Unrecoverable-looking problems (none are fatal to the store).
    Error,
    /// Contained failures: ignored reducer errors, rejected calls.
    Warn,
    /// Coarse lifecycle events.
    Info,
    /// Verbose per-dispatch / per-refresh detail.
    Debug,
}

/// Configuration for a store, assembled builder-style.
///
/// # Example
///
/// ```
/// use coalesce_core::options::{LogLevel, StoreOptions};
///
/// let options = StoreOptions::new()
///     .with_log_level(LogLevel::Info)
///     .with_development(true);
/// assert!(options.enabled(LogLevel::Debug)); // development surfaces everything
/// assert!(!options.with_production(true).enabled(LogLevel::Error));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    development: bool,
    log_level: LogLevel,
    production: bool,
}

impl StoreOptions {
    /// Default options: warnings and errors surfaced, development and
    /// production modes off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            development: false,
            log_level: LogLevel::Warn,
            production: false,
        }
    }

    /// Toggle verbose diagnostics (surfaces every severity).
    #[must_use]
    pub const fn with_development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    /// Set the most verbose severity to surface.
    #[must_use]
    pub const fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Toggle production mode, which suppresses all diagnostics regardless
    /// of the other settings.
    #[must_use]
    pub const fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Whether verbose diagnostics are on.
    #[must_use]
    pub const fn development(&self) -> bool {
        self.development
    }

    /// The configured minimum-severity gate.
    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Whether all diagnostics are suppressed.
    #[must_use]
    pub const fn production(&self) -> bool {
        self.production
    }

    /// Whether a diagnostic at `level` should be surfaced.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        if self.production {
            return false;
        }
        if self.development {
            return true;
        }
        level <= self.log_level
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_gate_is_inclusive() {
        let options = StoreOptions::new().with_log_level(LogLevel::Warn);
        assert!(options.enabled(LogLevel::Error));
        assert!(options.enabled(LogLevel::Warn));
        assert!(!options.enabled(LogLevel::Info));
        assert!(!options.enabled(LogLevel::Debug));
    }

    #[test]
    fn production_wins_over_everything() {
        let options = StoreOptions::new()
            .with_development(true)
            .with_log_level(LogLevel::Debug)
            .with_production(true);
        assert!(!options.enabled(LogLevel::Error));
    }

    #[test]
    fn development_surfaces_debug() {
        let options = StoreOptions::new().with_development(true);
        assert!(options.enabled(LogLevel::Debug));
    }
}
