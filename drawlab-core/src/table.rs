//! Weighted table text format: load, save, and pretty printing.
//!
//! The format is line oriented; `;` also separates entries on one line.
//! Recognized entries:
//!
//! ```text
//! repetitive_picking        # legacy flag token, sets repetitive
//! power_inversed            # legacy flag token, sets inverted
//! repetitive = true         # key/value form of the flags
//! inversed = false
//! oxygen 47                 # <name> <weight>
//! silicon = 28.1            # <name> = <weight>
//! delete oxygen             # remove a previously read item
//! [items]                   # section headers are ignored
//! end                       # stop reading
//! ```
//!
//! The flag words only act as flags when followed by nothing (`end`, the
//! legacy tokens) or by `true`/`false` (the key/value form); `repetitive 3`
//! is an item. `delete` always removes, so no item can be named `delete`.
//!
//! Malformed entries are reported but do not abort the load: everything that
//! parsed is kept.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::WeightedSet;

const REPETITIVE_TOKEN: &str = "repetitive_picking";
const INVERTED_TOKEN: &str = "power_inversed";
const DELETE_TOKEN: &str = "delete";
const END_TOKEN: &str = "end";

/// Errors from table file I/O.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read table file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write table file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("refusing to save an empty table")]
    EmptyTable,
}

/// An entry that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedLine {
    /// 1-based line number in the input.
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Result of reading table text: the parsed set plus any rejected entries.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub set: WeightedSet,
    pub rejected: Vec<RejectedLine>,
}

impl LoadReport {
    /// True if every entry was applied.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parse table text into a new set.
pub fn parse_table(text: &str) -> LoadReport {
    let mut set = WeightedSet::new();
    let rejected = apply_table_text(&mut set, text);
    LoadReport { set, rejected }
}

/// Apply table text to an existing set: upsert items, delete items, set flags.
///
/// Returns the entries that were rejected. Reading stops at `end`.
pub fn apply_table_text(set: &mut WeightedSet, text: &str) -> Vec<RejectedLine> {
    let mut rejected = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        for entry in line.split(';') {
            match apply_entry(set, entry) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => return rejected,
                Err(reason) => rejected.push(RejectedLine {
                    line: lineno + 1,
                    text: entry.trim().to_string(),
                    reason,
                }),
            }
        }
    }
    rejected
}

enum Flow {
    Continue,
    Stop,
}

fn apply_entry(set: &mut WeightedSet, entry: &str) -> Result<Flow, String> {
    let tokens: Vec<&str> = entry
        .split(|c: char| c == '=' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    let Some(&head) = tokens.first() else {
        return Ok(Flow::Continue);
    };
    if head.starts_with('#') || head.starts_with('[') {
        return Ok(Flow::Continue);
    }

    match (head, &tokens[1..]) {
        (END_TOKEN, []) => return Ok(Flow::Stop),
        (REPETITIVE_TOKEN, []) => set.repetitive = true,
        (INVERTED_TOKEN, []) => set.inverted = true,
        ("repetitive", [value]) if is_bool(value) => set.repetitive = *value == "true",
        ("inversed" | "inverted", [value]) if is_bool(value) => set.inverted = *value == "true",
        (DELETE_TOKEN, [name]) => {
            if set.remove(name).is_none() {
                debug!(name, "delete of unknown item ignored");
            }
        }
        (DELETE_TOKEN, _) => return Err("expected `delete <name>`".into()),
        (name, [weight]) => {
            let weight: f64 = weight
                .parse()
                .map_err(|_| format!("weight '{weight}' is not a number"))?;
            set.upsert(name, weight).map_err(|e| e.to_string())?;
        }
        _ => return Err("expected `<name> <weight>`".into()),
    }
    Ok(Flow::Continue)
}

fn is_bool(value: &str) -> bool {
    matches!(value, "true" | "false")
}

/// Serialize a set in the legacy line format.
pub fn to_table_string(set: &WeightedSet) -> String {
    let mut out = String::new();
    if set.repetitive {
        out.push_str(REPETITIVE_TOKEN);
        out.push('\n');
    }
    if set.inverted {
        out.push_str(INVERTED_TOKEN);
        out.push('\n');
    }
    for item in set.items() {
        out.push_str(&format!("{}\t\t{}\n", item.name(), item.weight()));
    }
    out
}

/// Read and parse a table file.
pub fn load_table(path: &Path) -> Result<LoadReport, TableError> {
    let text = std::fs::read_to_string(path).map_err(|source| TableError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let report = parse_table(&text);
    if !report.is_complete() {
        warn!(
            path = %path.display(),
            rejected = report.rejected.len(),
            kept = report.set.len(),
            "table loaded with rejected entries"
        );
    }
    Ok(report)
}

/// Write a set to a file in the legacy line format.
pub fn save_table(path: &Path, set: &WeightedSet) -> Result<(), TableError> {
    if set.is_empty() {
        return Err(TableError::EmptyTable);
    }
    std::fs::write(path, to_table_string(set)).map_err(|source| TableError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `name = value` lines sorted by name, names right aligned.
pub fn format_table<'a>(
    f: &mut impl fmt::Write,
    entries: impl IntoIterator<Item = (&'a str, f64)>,
) -> fmt::Result {
    let mut rows: Vec<(&str, f64)> = entries.into_iter().collect();
    let Some(width) = rows.iter().map(|(n, _)| n.len()).max() else {
        return Ok(());
    };
    rows.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (name, value) in rows {
        writeln!(f, "{name:>width$} = {value:>9.6}")?;
    }
    Ok(())
}

impl fmt::Display for WeightedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.drawable_count() == 0 {
            writeln!(f, "# no drawable items")?;
        }
        writeln!(f, "[drawlab]")?;
        writeln!(f, "repetitive = {}", self.repetitive)?;
        writeln!(f, "inversed = {}\n", self.inverted)?;
        writeln!(f, "[items]")?;
        format_table(f, self.items().iter().map(|it| (it.name(), it.weight())))
    }
}
