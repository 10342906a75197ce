//! Interactive table editor behind `drawlab conf`.
//!
//! Generic over the input and output streams so it can be driven from
//! in-memory buffers.

use std::io::{self, BufRead, Write};

use drawlab_core::table::apply_table_text;
use drawlab_core::WeightedSet;

/// Ask for both flags, then read item lines until `end` or end of input.
pub fn configure<R: BufRead, W: Write>(
    set: &mut WeightedSet,
    input: &mut R,
    out: &mut W,
) -> io::Result<()> {
    if !set.is_empty() {
        writeln!(out, "Existing configuration:\n{set}")?;
    }
    if let Some(b) = ask_yes_no("Is it allowed to pick items repetitively?", input, out)? {
        set.repetitive = b;
    }
    if let Some(b) = ask_yes_no(
        "Should the weights be inverted (x -> 1/x)?",
        input,
        out,
    )? {
        set.inverted = b;
    }

    writeln!(out, "Input items by line (or use ';' separator): <name> [=] <weight>")?;
    writeln!(out, "(name: letters, digits or '_'; weight: non-negative number)")?;
    writeln!(out, "delete an item with `delete <name>`, enter `end` to finish:")?;
    out.flush()?;

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 || line.trim() == "end" {
            break;
        }
        for rejected in apply_table_text(set, &line) {
            writeln!(out, "Ignored '{}': {}", rejected.text, rejected.reason)?;
        }
    }
    write!(out, "\nNew configuration:\n{set}")?;
    out.flush()
}

/// `Some(true)` for y/Y, `Some(false)` for n/N, `None` otherwise.
fn ask_yes_no<R: BufRead, W: Write>(
    question: &str,
    input: &mut R,
    out: &mut W,
) -> io::Result<Option<bool>> {
    write!(out, "{question} (Y/n) ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(match answer.trim().chars().next() {
        Some('Y' | 'y') => Some(true),
        Some('N' | 'n') => Some(false),
        _ => None,
    })
}
