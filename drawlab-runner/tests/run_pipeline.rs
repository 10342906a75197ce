//! End-to-end tests: table and config files on disk, run, export, reload.

use std::path::Path;

use drawlab_core::table::{load_table, save_table};
use drawlab_core::WeightedSet;
use drawlab_runner::{load_artifacts, run, RunConfig, RunError};
use tempfile::TempDir;

const TABLE: &str = "\
# crust composition
oxygen 47
silicon 28
aluminium 8
iron 5
calcium 4
bogus weight
magnesium 2
";

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn config_file_drives_a_full_run() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "crust.txt", TABLE);
    let config_path = write(
        dir.path(),
        "run.toml",
        r#"
table = "crust.txt"
amount = 3
trials = 200000
rng = "seeded"
seed = 11
"#,
    );

    let config = RunConfig::from_file(&config_path).unwrap();
    assert_eq!(config.table, dir.path().join("crust.txt"));

    let report = run(&config).unwrap();
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].line, 7);
    assert_eq!(report.probabilities.len(), 6);
    assert!((report.probabilities.total() - 3.0).abs() < 1e-9);

    let validation = report.validation.as_ref().unwrap();
    assert_eq!(validation.rows.len(), 6);
    assert!(validation.converged(0.01), "{validation:?}");

    // same config, same seed: identical sampled frequencies
    let again = run(&config).unwrap();
    let empirical = |r: &drawlab_runner::RunReport| -> Vec<f64> {
        r.validation.as_ref().unwrap().rows.iter().map(|row| row.empirical).collect()
    };
    assert_eq!(empirical(&again), empirical(&report));
    assert_eq!(again.run_id, report.run_id);
}

#[test]
fn artifacts_reload() {
    let dir = TempDir::new().unwrap();
    let table = write(dir.path(), "t.txt", "repetitive_picking\na 1\nb 3\n");
    let config = RunConfig {
        table,
        amount: 4,
        trials: 10_000,
        ..RunConfig::default()
    };
    let report = run(&config).unwrap();
    assert!(report.repetitive);
    assert!((report.probabilities.get("b").unwrap() - 0.75).abs() < 1e-12);

    let out = dir.path().join("out");
    let run_dir = drawlab_runner::save_artifacts(&report, &out).unwrap();
    assert!(run_dir.join("report.json").exists());
    assert!(run_dir.join("probabilities.csv").exists());
    assert!(run_dir.join("validation.csv").exists());

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.config, report.config);
}

#[test]
fn zero_trials_skips_validation() {
    let dir = TempDir::new().unwrap();
    let table = write(dir.path(), "t.txt", "a 1\nb 1\nc 2\n");
    let config = RunConfig {
        table,
        amount: 2,
        trials: 0,
        ..RunConfig::default()
    };
    let report = run(&config).unwrap();
    assert!(report.validation.is_none());
    assert!((report.probabilities.get("c").unwrap() - 5.0 / 6.0).abs() < 1e-12);
}

#[test]
fn too_large_amount_fails() {
    let dir = TempDir::new().unwrap();
    let table = write(dir.path(), "t.txt", "a 1\nb 0\n");
    let config = RunConfig {
        table,
        amount: 2,
        ..RunConfig::default()
    };
    assert!(matches!(run(&config), Err(RunError::Pick(_))));
}

#[test]
fn table_files_survive_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.txt");
    let mut set = WeightedSet::from_pairs([("x", 0.5), ("y", 2.0), ("z", 0.0)]).unwrap();
    set.inverted = true;
    save_table(&path, &set).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("power_inversed\n"));

    let report = load_table(&path).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.set, set);
}
