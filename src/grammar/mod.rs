//! Engine output grammar
//!
//! The engine answers in freeform text meant for a human at its REPL. This module
//! turns each output line into at most one [`Record`]; lines that match no known
//! shape (banners, prompts, blank lines, diagnostics) are skipped.
//!
//! Recognized shapes:
//! - `Inserted row with id=5` → [`Record::RowEcho`]
//! - `id=7, distance=0.1234, values=[Vector([..]), Text("hi")]` → [`Record::Row`]
//! - `id=7, values=[..]` → [`Record::Row`] without distance
//! - `docs (3 rows, dim=4)` → [`Record::Table`]
//! - `Updated 2 rows` / `Deleted 1 rows` → [`Record::Affected`]
//! - `Error: ...` → [`Record::EngineError`]

mod lexer;
mod parser;

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::value::Value;

pub use lexer::{tokenize, Token, TokenKind};

/// One structured line of engine output
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Insert acknowledgment carrying the new row id
    RowEcho { id: u64 },
    /// Search hit (with distance) or plain row (without)
    Row(DecodedRow),
    /// Table listing entry
    Table(TableInfo),
    /// Row count acknowledgment for UPDATE / DELETE
    Affected { count: usize },
    /// Failure reported by the engine itself
    EngineError(String),
}

/// A row before column names are attributed
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    pub id: u64,
    pub distance: Option<f32>,
    pub values: Vec<Value>,
}

/// Table listing entry from `SHOW TABLES`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub rows: usize,
    pub dimension: usize,
}

/// REPL prompt, possibly repeated when the engine skipped blank input
fn prompt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\s*pardusdb \[[^\]\n]*\]>\s?)+").expect("Invalid prompt regex")
    })
}

/// Decode a single output line
pub fn parse_line(line: &str) -> Option<Record> {
    let line = match prompt_regex().find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let tokens = tokenize(line);
    parser::parse_tokens(line, &tokens)
}

/// Decode every recognizable line of a response, in emitted order
pub fn parse_output(text: &str) -> Vec<Record> {
    text.lines().filter_map(parse_line).collect()
}
