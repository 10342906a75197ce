//! Drawlab CLI: pick, calculate, test, and edit weighted tables.
//!
//! Commands:
//! - `pick`: draw items and print their names
//! - `calc`: exact probabilities in percent
//! - `test`: sampled frequencies in percent
//! - `validate`: exact vs sampled side by side
//! - `conf`: interactive table editor
//! - `show`: print a table
//! - `run`: calculation + validation from a TOML config, with artifacts

mod editor;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drawlab_core::table::{format_table, load_table, save_table};
use drawlab_core::{EngineConfig, InclusionEngine, Picker, ProbabilityTable, RngSource, WeightedSet};
use drawlab_runner::profiling::TimedScope;
use drawlab_runner::{run, save_artifacts, RunConfig, ValidationConfig, ValidationReport, Validator};

#[derive(Parser)]
#[command(
    name = "drawlab",
    about = "Drawlab CLI: weighted random picks and exact inclusion probabilities"
)]
struct Cli {
    /// Worker threads for calculation and sampling (0 = all cores).
    #[arg(long, global = true, default_value_t = 0)]
    threads: usize,

    /// Run everything on the calling thread.
    #[arg(long, global = true, default_value_t = false)]
    sequential: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw items and print their names.
    Pick {
        table: PathBuf,

        /// Items per pick.
        #[arg(default_value_t = 1)]
        amount: usize,

        /// Use a fast userspace generator instead of the OS random source.
        #[arg(long, default_value_t = false)]
        fast: bool,

        /// Use a seeded generator (reproducible picks).
        #[arg(long)]
        seed: Option<u64>,

        /// Do not print the warning for a nonuniform table.
        #[arg(long, default_value_t = false)]
        no_warn: bool,
    },
    /// Calculate and print probabilities of being picked.
    Calc {
        table: PathBuf,

        #[arg(default_value_t = 1)]
        amount: usize,

        /// In repetitive mode, print the at-least-once probability instead of
        /// the per-draw probability.
        #[arg(long, default_value_t = false)]
        appearance: bool,
    },
    /// Draw many picks and print the observed frequencies.
    Test {
        table: PathBuf,

        #[arg(default_value_t = 1)]
        amount: usize,

        /// Number of picks.
        #[arg(long, default_value_t = 5_000_000)]
        trials: usize,

        #[arg(long, default_value_t = false)]
        fast: bool,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print exact probabilities next to observed frequencies.
    Validate {
        table: PathBuf,

        #[arg(default_value_t = 1)]
        amount: usize,

        #[arg(long, default_value_t = 1_000_000)]
        trials: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Create or edit a table file interactively.
    Conf { table: PathBuf },
    /// Print a table.
    Show { table: PathBuf },
    /// Run calculation and validation from a TOML config file.
    Run {
        #[arg(long)]
        config: PathBuf,

        /// Write report.json and CSV files here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let engine_config = EngineConfig {
        parallel: !cli.sequential,
        threads: cli.threads,
    };

    match cli.command {
        Commands::Pick {
            table,
            amount,
            fast,
            seed,
            no_warn,
        } => run_pick(&table, amount, rng_source(fast, seed), no_warn),
        Commands::Calc {
            table,
            amount,
            appearance,
        } => run_calc(&table, amount, appearance, engine_config),
        Commands::Test {
            table,
            amount,
            trials,
            fast,
            seed,
        } => run_test(&table, amount, trials, rng_source(fast, seed), engine_config),
        Commands::Validate {
            table,
            amount,
            trials,
            seed,
        } => run_validate(&table, amount, trials, seed, engine_config),
        Commands::Conf { table } => run_conf(&table),
        Commands::Show { table } => run_show(&table),
        Commands::Run { config, output_dir } => {
            run_config_cmd(&config, output_dir.as_deref(), engine_config)
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `drawlab=info`.
fn init_tracing() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive("drawlab=info".parse()?)
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn rng_source(fast: bool, seed: Option<u64>) -> RngSource {
    match (seed, fast) {
        (Some(seed), _) => RngSource::Seeded(seed),
        (None, true) => RngSource::Fast,
        (None, false) => RngSource::Os,
    }
}

/// Load a table that must have at least one drawable item.
fn load_drawable(path: &Path) -> Result<WeightedSet> {
    let report = load_table(path)?;
    for rejected in &report.rejected {
        eprintln!(
            "{}:{}: ignored '{}': {}",
            path.display(),
            rejected.line,
            rejected.text,
            rejected.reason
        );
    }
    if report.set.drawable_count() == 0 {
        bail!("table {} has no drawable items", path.display());
    }
    Ok(report.set)
}

fn print_percent(table: &ProbabilityTable) -> Result<()> {
    let percent = table.scaled(100.0);
    let mut out = String::new();
    format_table(&mut out, percent.iter())?;
    print!("{out}");
    Ok(())
}

fn run_pick(path: &Path, amount: usize, source: RngSource, no_warn: bool) -> Result<()> {
    let set = load_drawable(path)?;
    let mut picker = Picker::from_source(&set, source);
    let names = picker.pick(amount)?;
    let mut line = names.join(" ");
    if !picker.is_fair() && !no_warn {
        line.push_str(" (nonuniform)");
    }
    println!("{line}");
    Ok(())
}

fn run_calc(path: &Path, amount: usize, appearance: bool, config: EngineConfig) -> Result<()> {
    let set = load_drawable(path)?;
    let engine = InclusionEngine::new(config);
    println!("Calculating, please wait...");
    let scope = TimedScope::new("cli.calc");
    let table = if appearance {
        engine.appearance_probabilities(&set, amount)?
    } else {
        engine.exact_probabilities(&set, amount)?
    };
    println!("Time passed: {:.0} ms", scope.elapsed_ms());
    print_percent(&table)
}

fn run_test(
    path: &Path,
    amount: usize,
    trials: usize,
    source: RngSource,
    config: EngineConfig,
) -> Result<()> {
    let set = load_drawable(path)?;
    let validator = Validator::new(ValidationConfig {
        source,
        parallel: config.parallel,
        threads: config.threads,
        ..ValidationConfig::default()
    });
    println!("Testing for {trials} times, please wait...");
    let scope = TimedScope::new("cli.test");
    let table = validator.empirical_frequencies(&set, amount, trials)?;
    println!("Time passed: {:.0} ms", scope.elapsed_ms());
    print_percent(&table)
}

fn run_validate(
    path: &Path,
    amount: usize,
    trials: usize,
    seed: u64,
    config: EngineConfig,
) -> Result<()> {
    let set = load_drawable(path)?;
    let exact = InclusionEngine::new(config).exact_probabilities(&set, amount)?;
    let validator = Validator::new(ValidationConfig {
        source: RngSource::Seeded(seed),
        parallel: config.parallel,
        threads: config.threads,
        ..ValidationConfig::default()
    });
    let empirical = validator.empirical_frequencies(&set, amount, trials)?;
    print_report(&ValidationReport::compare(&exact, &empirical, amount, trials));
    Ok(())
}

fn print_report(report: &ValidationReport) {
    let width = report.rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    println!(
        "{:>width$}  {:>10}  {:>10}  {:>9}",
        "name", "exact %", "sampled %", "abs err %"
    );
    for row in &report.rows {
        println!(
            "{:>width$}  {:>10.4}  {:>10.4}  {:>9.4}",
            row.name,
            row.exact * 100.0,
            row.empirical * 100.0,
            row.abs_error * 100.0
        );
    }
    println!(
        "\n{} picks of {}: max abs error {:.4}%, max rel error {:.2}%",
        report.trials,
        report.amount,
        report.max_abs_error * 100.0,
        report.max_rel_error * 100.0
    );
}

fn run_conf(path: &Path) -> Result<()> {
    let mut set = if path.exists() {
        load_table(path)?.set
    } else {
        WeightedSet::new()
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();
    editor::configure(&mut set, &mut input, &mut out)?;
    out.flush()?;

    if set.drawable_count() == 0 {
        bail!("table has no drawable items, not saved");
    }
    save_table(path, &set).with_context(|| format!("failed to save {}", path.display()))?;
    println!("Saved to {}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<()> {
    let report = load_table(path)?;
    print!("{}", report.set);
    for rejected in &report.rejected {
        println!("# line {} ignored: {}", rejected.line, rejected.reason);
    }
    Ok(())
}

fn run_config_cmd(path: &Path, output_dir: Option<&Path>, overrides: EngineConfig) -> Result<()> {
    let mut config = RunConfig::from_file(path)?;
    if overrides.threads > 0 {
        config.threads = overrides.threads;
    }
    if !overrides.parallel {
        config.parallel = false;
    }

    let report = run(&config)?;
    println!("Run {}", report.run_id);
    println!("Time passed: {:.0} ms (calc)", report.calc_ms);
    print_percent(&report.probabilities)?;
    if let Some(validation) = &report.validation {
        println!("Time passed: {:.0} ms (validate)", report.validate_ms);
        print_report(validation);
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}
