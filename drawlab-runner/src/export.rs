//! Report export: JSON and CSV artifacts.
//!
//! JSON carries a `schema_version` field; unknown future versions are
//! rejected on import.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use drawlab_core::ProbabilityTable;

use crate::runner::{RunReport, SCHEMA_VERSION};
use crate::validator::ValidationReport;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a probability table as CSV with `name,probability` columns.
pub fn export_probabilities_csv(table: &ProbabilityTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["name", "probability"])?;
    for (name, p) in table.iter() {
        wtr.write_record([name, format!("{p:.9}").as_str()])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a validation report as CSV.
///
/// Columns: name, exact, empirical, abs_error, rel_error
pub fn export_validation_csv(report: &ValidationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["name", "exact", "empirical", "abs_error", "rel_error"])?;
    for row in &report.rows {
        wtr.write_record([
            row.name.as_str(),
            format!("{:.9}", row.exact).as_str(),
            format!("{:.9}", row.empirical).as_str(),
            format!("{:.9}", row.abs_error).as_str(),
            format!("{:.9}", row.rel_error).as_str(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one run.
///
/// Creates `run_{id}/` under `output_dir` (first 12 hex digits of the run
/// id) containing:
/// - `report.json`: the full `RunReport`
/// - `probabilities.csv`: exact probabilities
/// - `validation.csv`: exact vs empirical, if the run validated
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = report.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("run_{short_id}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(
        run_dir.join("probabilities.csv"),
        export_probabilities_csv(&report.probabilities)?,
    )?;
    if let Some(validation) = &report.validation {
        std::fs::write(
            run_dir.join("validation.csv"),
            export_validation_csv(validation)?,
        )?;
    }
    Ok(run_dir)
}

/// Load a `RunReport` from an artifact directory's report.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<RunReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;

    fn sample_report() -> RunReport {
        let exact = ProbabilityTable::from_parts(["a", "b"], &[0.25, 0.75]);
        let empirical = ProbabilityTable::from_parts(["a", "b"], &[0.26, 0.74]);
        RunReport {
            schema_version: SCHEMA_VERSION,
            run_id: "0123456789abcdef".into(),
            config: RunConfig::default(),
            repetitive: false,
            inverted: false,
            validation: Some(ValidationReport::compare(&exact, &empirical, 1, 100)),
            probabilities: exact,
            rejected: vec![],
            calc_ms: 0.1,
            validate_ms: 2.0,
        }
    }

    #[test]
    fn json_survives_import() {
        let report = sample_report();
        let json = export_json(&report).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.config, report.config);
        assert_eq!(back.probabilities.get("b"), Some(0.75));
        assert_eq!(back.validation.map(|v| v.rows.len()), Some(2));
    }

    #[test]
    fn future_schema_is_rejected() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&report).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn probabilities_csv_layout() {
        let csv = export_probabilities_csv(&sample_report().probabilities).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,probability");
        assert_eq!(lines[1], "a,0.250000000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn validation_csv_layout() {
        let report = sample_report();
        let csv = export_validation_csv(report.validation.as_ref().unwrap()).unwrap();
        assert!(csv.starts_with("name,exact,empirical,abs_error,rel_error\n"));
        assert!(csv.contains("\nb,0.750000000,0.740000000,"));
    }
}
