//! In-process stand-in for the engine binary
//!
//! Interprets the command shapes the driver renders and answers in the engine's
//! REPL output format, so facade behavior can be tested without a real binary.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use pardus::{DriverError, Transport, Value};
use regex::Regex;

const PROMPT: &str = "pardusdb [memory]> ";

#[derive(Debug)]
struct FakeTable {
    name: String,
    dim: usize,
    columns: Vec<String>,
    rows: Vec<(u64, Vec<Value>)>,
    next_id: u64,
}

/// Engine fake with in-memory state
///
/// By default state survives across calls (a file-backed database). An
/// ephemeral engine forgets everything between calls, like a fresh process
/// without `.open`.
#[derive(Debug)]
pub struct FakeEngine {
    tables: RefCell<Vec<FakeTable>>,
    commands: RefCell<Vec<String>>,
    calls: Cell<usize>,
    ephemeral: bool,
    noise: bool,
    if_not_exists: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
            calls: Cell::new(0),
            ephemeral: false,
            noise: false,
            if_not_exists: true,
        }
    }

    pub fn ephemeral() -> Self {
        Self {
            ephemeral: true,
            ..Self::new()
        }
    }

    /// Surround every answer with the welcome banner and prompts
    pub fn noisy() -> Self {
        Self {
            noise: true,
            ..Self::new()
        }
    }

    /// Engine build whose CREATE parser reads `IF` as the table name
    pub fn without_if_not_exists() -> Self {
        Self {
            if_not_exists: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Every command buffer received, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn last_command(&self) -> Option<String> {
        self.commands.borrow().last().cloned()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .borrow()
            .iter()
            .find(|t| t.name == table)
            .map_or(0, |t| t.rows.len())
    }

    fn line(&self, line: &str) -> String {
        let line = line.trim().trim_end_matches(';');
        if line.is_empty() {
            return String::new();
        }
        if let Some(path) = line.strip_prefix(".open ") {
            return format!("Opened: {}\n", path);
        }
        if let Some(path) = line.strip_prefix(".create ") {
            return format!("Created and opened: {}\n", path);
        }
        if line == ".save" {
            return "Saved to: database\n".to_string();
        }
        match self.sql(line) {
            Ok(out) => out,
            Err(message) => format!("Error: {}\n", message),
        }
    }

    fn sql(&self, line: &str) -> Result<String, String> {
        let mut tables = self.tables.borrow_mut();

        if let Some(c) = re(r"^CREATE TABLE (IF NOT EXISTS )?(\w+) \((.*)\)$").captures(line) {
            if c.get(1).is_some() && !self.if_not_exists {
                return Err("Invalid format: Expected '(', got 'N'".to_string());
            }
            let name = c[2].to_string();
            if tables.iter().any(|t| t.name == name) {
                return if c.get(1).is_some() {
                    Ok(format!("Table '{}' created\n", name))
                } else {
                    Err(format!("Invalid configuration: Table '{}' already exists", name))
                };
            }
            let mut dim = 0;
            let mut columns = Vec::new();
            for def in split_top_level(&c[3]) {
                let (col, ty) = def.split_once(' ').ok_or("bad column definition")?;
                if let Some(d) = re(r"^VECTOR\((\d+)\)$").captures(ty) {
                    dim = d[1].parse().map_err(|_| "bad dimension")?;
                }
                columns.push(col.to_string());
            }
            tables.push(FakeTable {
                name: name.clone(),
                dim,
                columns,
                rows: Vec::new(),
                next_id: 1,
            });
            return Ok(format!("Table '{}' created\n", name));
        }

        if let Some(c) = re(r"^DROP TABLE (IF EXISTS )?(\w+)$").captures(line) {
            let before = tables.len();
            tables.retain(|t| t.name != c[2]);
            if before == tables.len() && c.get(1).is_none() {
                return Err(missing(&c[2]));
            }
            return Ok(format!("Table '{}' dropped\n", &c[2]));
        }

        if line == "SHOW TABLES" {
            let mut out = format!("Tables ({}):\n", tables.len());
            for t in tables.iter() {
                out.push_str(&format!("  {} ({} rows, dim={})\n", t.name, t.rows.len(), t.dim));
            }
            return Ok(out);
        }

        if let Some(c) = re(r"^INSERT INTO (\w+) \(([^)]*)\) VALUES \((.*)\)$").captures(line) {
            let table = find(&mut tables, &c[1])?;
            let columns: Vec<&str> = c[2].split(", ").collect();
            let literals = split_top_level(&c[3]);
            let mut values = vec![Value::Null; table.columns.len()];
            for (col, literal) in columns.iter().zip(&literals) {
                let value = parse_literal(literal);
                if let Value::Vector(v) = &value {
                    if v.len() != table.dim {
                        return Err(format!(
                            "Dimension mismatch: expected {}, got {}",
                            table.dim,
                            v.len()
                        ));
                    }
                }
                let idx = table
                    .columns
                    .iter()
                    .position(|c| c == col)
                    .ok_or_else(|| format!("Column '{}' not found", col))?;
                values[idx] = value;
            }
            let id = table.next_id;
            table.next_id += 1;
            table.rows.push((id, values));
            return Ok(format!("Inserted row with id={}\n", id));
        }

        if let Some(c) =
            re(r"^SELECT \* FROM (\w+) WHERE (\w+) SIMILARITY (\[.*\]) LIMIT (\d+)$").captures(line)
        {
            let table = find(&mut tables, &c[1])?;
            let query = match parse_literal(&c[3]) {
                Value::Vector(v) => v,
                _ => return Err("bad query vector".to_string()),
            };
            let limit: usize = c[4].parse().map_err(|_| "bad limit")?;
            let mut hits: Vec<(f32, &(u64, Vec<Value>))> = table
                .rows
                .iter()
                .filter_map(|row| {
                    row.1.iter().find_map(|v| match v {
                        Value::Vector(v) => Some((l2(v, &query), row)),
                        _ => None,
                    })
                })
                .collect();
            hits.sort_by(|a, b| a.0.total_cmp(&b.0));
            hits.truncate(limit);
            let mut out = format!("Found {} similar rows:\n", hits.len());
            for (distance, (id, values)) in hits {
                out.push_str(&format!(
                    "  id={}, distance={:.4}, values={:?}\n",
                    id, distance, values
                ));
            }
            return Ok(out);
        }

        if let Some(c) = re(r"^SELECT \* FROM (\w+) WHERE id = (\d+)$").captures(line) {
            let table = find(&mut tables, &c[1])?;
            let id: u64 = c[2].parse().map_err(|_| "bad id")?;
            let rows: Vec<_> = table.rows.iter().filter(|r| r.0 == id).collect();
            let mut out = format!("Found {} rows:\n", rows.len());
            for (id, values) in rows {
                out.push_str(&format!("  id={}, values={:?}\n", id, values));
            }
            return Ok(out);
        }

        if let Some(c) = re(r"^UPDATE (\w+) SET (.*) WHERE id = (\d+)$").captures(line) {
            let table = find(&mut tables, &c[1])?;
            let id: u64 = c[3].parse().map_err(|_| "bad id")?;
            let assignments: Vec<(usize, Value)> = split_top_level(&c[2])
                .iter()
                .map(|a| -> Result<(usize, Value), String> {
                    let (col, literal) = a.split_once(" = ").ok_or("bad assignment")?;
                    let idx = table
                        .columns
                        .iter()
                        .position(|c| c == col)
                        .ok_or_else(|| format!("Column '{}' not found", col))?;
                    Ok((idx, parse_literal(literal)))
                })
                .collect::<Result<_, String>>()?;
            let mut count = 0;
            for row in table.rows.iter_mut().filter(|r| r.0 == id) {
                for (idx, value) in &assignments {
                    row.1[*idx] = value.clone();
                }
                count += 1;
            }
            return Ok(format!("Updated {} rows\n", count));
        }

        if let Some(c) = re(r"^DELETE FROM (\w+)( WHERE id = (\d+))?$").captures(line) {
            let table = find(&mut tables, &c[1])?;
            let before = table.rows.len();
            match c.get(3) {
                Some(id) => {
                    let id: u64 = id.as_str().parse().map_err(|_| "bad id")?;
                    table.rows.retain(|r| r.0 != id);
                }
                None => table.rows.clear(),
            }
            return Ok(format!("Deleted {} rows\n", before - table.rows.len()));
        }

        Err(format!("Parse error: unexpected input: {}", line))
    }
}

impl Transport for FakeEngine {
    fn execute(&self, command: &str) -> pardus::Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.commands.borrow_mut().push(command.to_string());
        if self.ephemeral {
            self.tables.borrow_mut().clear();
        }

        let mut out = String::new();
        if self.noise {
            out.push_str("╔═══╗\n║ PardusDB REPL ║\n╚═══╝\n\nType 'help' for all commands, 'quit' to exit.\n\n");
        }
        for line in command.lines() {
            if self.noise {
                out.push_str(PROMPT);
            }
            out.push_str(&self.line(line));
        }
        if self.noise {
            out.push_str(PROMPT);
            out.push_str("Goodbye!\n");
        }
        Ok(out)
    }
}

/// Transport that always answers with the same text (or error)
pub struct Canned {
    output: Result<String, fn() -> DriverError>,
    commands: RefCell<Vec<String>>,
}

impl Canned {
    pub fn output(text: &str) -> Self {
        Self {
            output: Ok(text.to_string()),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(error: fn() -> DriverError) -> Self {
        Self {
            output: Err(error),
            commands: RefCell::new(Vec::new()),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl Transport for Canned {
    fn execute(&self, command: &str) -> pardus::Result<String> {
        self.commands.borrow_mut().push(command.to_string());
        match &self.output {
            Ok(text) => Ok(text.clone()),
            Err(make) => Err(make()),
        }
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

fn missing(table: &str) -> String {
    format!("Invalid format: Table '{}' does not exist", table)
}

fn find<'a>(tables: &'a mut [FakeTable], name: &str) -> Result<&'a mut FakeTable, String> {
    tables
        .iter_mut()
        .find(|t| t.name == name)
        .ok_or_else(|| missing(name))
}

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Split on commas outside brackets, parentheses and quotes
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if quoted => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            '\'' => quoted = !quoted,
            '[' | '(' if !quoted => depth += 1,
            ']' | ')' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn parse_literal(literal: &str) -> Value {
    let literal = literal.trim();
    if let Some(inner) = literal.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
        let vector = inner
            .split(',')
            .filter(|x| !x.trim().is_empty())
            .filter_map(|x| x.trim().parse::<f32>().ok())
            .collect();
        return Value::Vector(vector);
    }
    if let Some(inner) = literal.strip_prefix('\'').and_then(|l| l.strip_suffix('\'')) {
        return Value::Text(unescape(inner));
    }
    match literal {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "NULL" | "null" => Value::Null,
        _ => literal
            .parse::<i64>()
            .map(Value::Integer)
            .or_else(|_| literal.parse::<f64>().map(Value::Float))
            .unwrap_or_else(|_| Value::Text(literal.to_string())),
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}
