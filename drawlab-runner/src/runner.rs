//! Run orchestration: table file in, report out.
//!
//! `run()` loads the table named by a `RunConfig`, computes exact
//! probabilities, optionally validates them by sampling, and returns a
//! serializable `RunReport`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use drawlab_core::table::{load_table, RejectedLine, TableError};
use drawlab_core::{InclusionEngine, PickError, ProbabilityTable};

use crate::config::{ConfigError, RunConfig};
use crate::profiling::TimedScope;
use crate::session::Session;
use crate::validator::{ValidationConfig, ValidationReport, Validator};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("table error: {0}")]
    Table(#[from] TableError),
    #[error("pick error: {0}")]
    Pick(#[from] PickError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub config: RunConfig,
    pub repetitive: bool,
    pub inverted: bool,
    pub probabilities: ProbabilityTable,
    /// Absent when `trials == 0`.
    pub validation: Option<ValidationReport>,
    /// Table lines that failed to parse.
    pub rejected: Vec<RejectedLine>,
    pub calc_ms: f64,
    pub validate_ms: f64,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Build a session for `config` around an already loaded table.
pub fn session_for(config: &RunConfig, set: drawlab_core::WeightedSet) -> Session {
    let validation = ValidationConfig {
        source: config.rng_source(),
        parallel: config.parallel,
        threads: config.threads,
        ..ValidationConfig::default()
    };
    Session::new(set)
        .with_engine(InclusionEngine::new(config.engine_config()))
        .with_rng_source(config.rng_source())
        .with_validator(Validator::new(validation).with_run_id(config.run_id()))
}

/// Run the calculation and, if `trials > 0`, the validation for `config`.
pub fn run(config: &RunConfig) -> Result<RunReport, RunError> {
    config.validate()?;
    let run_id = config.run_id();
    let loaded = load_table(&config.table)?;
    if loaded.set.drawable_count() == 0 {
        warn!(table = %config.table.display(), "table has no drawable items");
    }
    let repetitive = loaded.set.repetitive;
    let inverted = loaded.set.inverted;
    let session = session_for(config, loaded.set);

    let scope = TimedScope::new("run.calc");
    let probabilities = session.exact_probabilities(config.amount)?;
    let calc_ms = scope.elapsed_ms();
    drop(scope);

    let scope = TimedScope::new("run.validate");
    let validation = if config.trials > 0 {
        let empirical = session.validate(config.amount, config.trials)?;
        Some(ValidationReport::compare(
            &probabilities,
            &empirical,
            config.amount,
            config.trials,
        ))
    } else {
        None
    };
    let validate_ms = scope.elapsed_ms();
    drop(scope);

    info!(
        run_id = %run_id,
        amount = config.amount,
        trials = config.trials,
        calc_ms,
        validate_ms,
        max_abs_error = validation.as_ref().map(|v| v.max_abs_error),
        "run finished"
    );

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        repetitive,
        inverted,
        probabilities,
        validation,
        rejected: loaded.rejected,
        calc_ms,
        validate_ms,
    })
}
