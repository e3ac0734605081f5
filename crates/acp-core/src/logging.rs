//! Logging facade for the codec.
//!
//! Built on the standard [`log`] facade; this crate never installs a log
//! implementation. Applications pick their own backend:
//!
//! ```ignore
//! env_logger::init();
//! ```
//!
//! # Log Levels
//!
//! - **warn**: recoverable decode anomalies (ignored protocol extensions)
//! - **debug**: decode/encode flow, catalog lookups
//! - **trace**: registry construction details
//!
//! # Log Targets
//!
//! Targets are hierarchical for filtering, e.g.
//! `RUST_LOG=acp::registry=trace,acp::codec=debug`.

// Re-export log macros for ergonomic use
pub use log::{debug, error, info, trace, warn};

// Re-export log level types for programmatic use
pub use log::{Level, LevelFilter};

/// Log targets used by codec components.
///
/// Use these constants with the `target:` argument to log macros
/// for consistent filtering.
pub mod targets {
    /// Root target for all codec logs.
    pub const ACP: &str = "acp";

    /// Schema and type registry construction.
    pub const REGISTRY: &str = "acp::registry";

    /// Schema validation.
    pub const VALIDATOR: &str = "acp::validator";

    /// Method-aware payload decoding.
    pub const DECODER: &str = "acp::decoder";

    /// Top-level encode/decode operations.
    pub const CODEC: &str = "acp::codec";
}

/// Returns whether logging is enabled at the given level for the given target.
#[inline]
#[must_use]
pub fn is_enabled(level: Level, target: &str) -> bool {
    log::log_enabled!(target: target, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_targets_are_hierarchical() {
        assert!(targets::REGISTRY.starts_with(targets::ACP));
        assert!(targets::VALIDATOR.starts_with(targets::ACP));
        assert!(targets::DECODER.starts_with(targets::ACP));
        assert!(targets::CODEC.starts_with(targets::ACP));
    }
}
