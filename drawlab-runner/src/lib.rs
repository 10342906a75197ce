//! Drawlab Runner: validation, sessions, run configuration, report export.
//!
//! This crate builds on `drawlab-core` to provide:
//! - Statistical validation by repeated sampling (sequential or chunked over
//!   a rayon pool with reproducible per-chunk seeds)
//! - A `Session` facade: draw, exact probabilities, validate, edit the table
//! - TOML run configuration with content-addressed run ids
//! - JSON/CSV report export
//! - Timing scopes reported through `tracing`

pub mod config;
pub mod export;
pub mod profiling;
pub mod runner;
pub mod session;
pub mod validator;

pub use config::{ConfigError, RngKind, RunConfig, RunId};
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use profiling::TimedScope;
pub use runner::{run, session_for, RunError, RunReport, SCHEMA_VERSION};
pub use session::Session;
pub use validator::{ValidationConfig, ValidationReport, ValidationRow, Validator};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<ValidationConfig>();
        assert_sync::<ValidationConfig>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
        assert_send::<ValidationReport>();
        assert_sync::<ValidationReport>();
    }

    #[test]
    fn validator_is_send_sync() {
        assert_send::<Validator>();
        assert_sync::<Validator>();
    }

    #[test]
    fn session_is_send() {
        assert_send::<Session>();
    }
}
