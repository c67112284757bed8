//! Command text builder
//!
//! Renders typed operations into the engine's SQL-like command language. One
//! command renders to exactly one line; the engine reads one statement per line.

use std::fmt::{LowerExp, Write as _};
use std::path::Path;

use crate::error::{DriverError, Result};
use crate::schema::{ColumnType, TableSchema, VECTOR_COLUMN};
use crate::value::{Metadata, Value};

/// A single operation against the engine
#[derive(Debug, Clone)]
pub enum Command<'a> {
    CreateTable {
        name: &'a str,
        vector_dim: usize,
        columns: &'a [(&'a str, &'a str)],
        if_not_exists: bool,
    },
    DropTable {
        name: &'a str,
        if_exists: bool,
    },
    ShowTables,
    Insert {
        table: &'a str,
        vector: &'a [f32],
        metadata: &'a Metadata,
    },
    Search {
        table: &'a str,
        vector: &'a [f32],
        k: usize,
    },
    Get {
        table: &'a str,
        id: u64,
    },
    Update {
        table: &'a str,
        id: u64,
        metadata: &'a Metadata,
    },
    Delete {
        table: &'a str,
        id: u64,
    },
    DeleteAll {
        table: &'a str,
    },
    /// Caller text sent unmodified. No escaping is applied: never build it from
    /// untrusted input.
    Raw(&'a str),
    Open(&'a Path),
    Create(&'a Path),
    Save,
}

impl<'a> Command<'a> {
    /// Validate against the cached schema (when known) and render
    ///
    /// Fails locally, producing no text, when the request cannot be expressed for
    /// this table: a wrong vector length, a NaN or infinity, or a second VECTOR
    /// column in a CREATE.
    pub fn build(&self, schema: Option<&TableSchema>) -> Result<String> {
        if let Command::CreateTable { columns, .. } = self {
            if let Some((col, ty)) = columns
                .iter()
                .find(|(_, ty)| ColumnType::from_declared(ty).is_vector())
            {
                return Err(DriverError::local(format!(
                    "column {} declared as {}: a table has exactly one vector column",
                    col, ty
                )));
            }
        }
        if let Some(vector) = self.vector() {
            if let Some(i) = vector.iter().position(|x| !x.is_finite()) {
                return Err(DriverError::local(format!(
                    "vector component {} is not a finite number",
                    i
                )));
            }
            if let Some(schema) = schema {
                schema.check_vector(vector)?;
            }
        }
        if let Some(metadata) = self.metadata() {
            if let Some((key, _)) = metadata.iter().find(|(_, value)| !is_finite(value)) {
                return Err(DriverError::local(format!(
                    "column {} holds a non-finite number",
                    key
                )));
            }
        }
        Ok(self.render(schema))
    }

    fn vector(&self) -> Option<&'a [f32]> {
        match self {
            Command::Insert { vector, .. } | Command::Search { vector, .. } => Some(*vector),
            _ => None,
        }
    }

    fn metadata(&self) -> Option<&'a Metadata> {
        match self {
            Command::Insert { metadata, .. } | Command::Update { metadata, .. } => Some(*metadata),
            _ => None,
        }
    }

    fn render(&self, schema: Option<&TableSchema>) -> String {
        let vector_column = schema
            .and_then(|s| s.vector_column())
            .map_or(VECTOR_COLUMN, |c| c.name.as_str());

        match self {
            Command::CreateTable {
                name,
                vector_dim,
                columns,
                if_not_exists,
            } => {
                let mut defs = vec![format!("{} VECTOR({})", VECTOR_COLUMN, vector_dim)];
                defs.extend(columns.iter().map(|(col, ty)| {
                    format!("{} {}", col, ColumnType::from_declared(ty).to_sql())
                }));
                format!(
                    "CREATE TABLE {}{} ({})",
                    if *if_not_exists { "IF NOT EXISTS " } else { "" },
                    name,
                    defs.join(", ")
                )
            }
            Command::DropTable { name, if_exists } => format!(
                "DROP TABLE {}{}",
                if *if_exists { "IF EXISTS " } else { "" },
                name
            ),
            Command::ShowTables => "SHOW TABLES".to_string(),
            Command::Insert {
                table,
                vector,
                metadata,
            } => {
                let mut columns = vec![vector_column.to_string()];
                let mut values = vec![vector_literal(vector)];
                for (key, value) in metadata.iter() {
                    columns.push(key.to_string());
                    values.push(value_literal(value));
                }
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    values.join(", ")
                )
            }
            Command::Search { table, vector, k } => format!(
                "SELECT * FROM {} WHERE {} SIMILARITY {} LIMIT {}",
                table,
                vector_column,
                vector_literal(vector),
                k
            ),
            Command::Get { table, id } => format!("SELECT * FROM {} WHERE id = {}", table, id),
            Command::Update {
                table,
                id,
                metadata,
            } => {
                let assignments: Vec<String> = metadata
                    .iter()
                    .map(|(key, value)| format!("{} = {}", key, value_literal(value)))
                    .collect();
                format!(
                    "UPDATE {} SET {} WHERE id = {}",
                    table,
                    assignments.join(", "),
                    id
                )
            }
            Command::Delete { table, id } => format!("DELETE FROM {} WHERE id = {}", table, id),
            Command::DeleteAll { table } => format!("DELETE FROM {}", table),
            Command::Raw(text) => text.to_string(),
            Command::Open(path) => format!(".open {}", path.display()),
            Command::Create(path) => format!(".create {}", path.display()),
            Command::Save => ".save".to_string(),
        }
    }
}

/// `[f, f, ...]` using the shortest decimal that round-trips each `f32`
pub fn vector_literal(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 8 + 2);
    out.push('[');
    for (i, x) in vector.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&decimal(x));
    }
    out.push(']');
    out
}

/// Plain positional decimal with a fractional part and no exponent
///
/// The engine's number reader takes only a sign, digits and one `.`, so the
/// shortest round-trip digits are re-laid out around the decimal point. Callers
/// reject non-finite values first.
pub fn decimal(x: impl LowerExp) -> String {
    let sci = format!("{:e}", x);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i64 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    // The mantissa is `d.ddd`, so the point sits after `exponent + 1` digits
    let point = exponent + 1;
    let mut out = String::with_capacity(digits.len() + 8);
    out.push_str(sign);
    if point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take(point.unsigned_abs() as usize));
        out.push_str(&digits);
    } else if point as usize >= digits.len() {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take(point as usize - digits.len()));
        out.push_str(".0");
    } else {
        let (int, frac) = digits.split_at(point as usize);
        let _ = write!(out, "{}.{}", int, frac);
    }
    out
}

fn is_finite(value: &Value) -> bool {
    match value {
        Value::Float(f) => f.is_finite(),
        Value::Vector(v) => v.iter().all(|x| x.is_finite()),
        _ => true,
    }
}

/// Render one metadata value as a literal of the command language
pub fn value_literal(value: &Value) -> String {
    match value {
        Value::Text(s) => quote(s),
        Value::Integer(n) => n.to_string(),
        // Always carries a decimal point ("1.0") so the engine types it as FLOAT
        Value::Float(f) => decimal(f),
        Value::Boolean(b) => b.to_string(),
        Value::Vector(v) => vector_literal(v),
        Value::Null => "NULL".to_string(),
        Value::Raw(raw) => raw.clone(),
    }
}

/// Single-quote a string for the engine
///
/// `'` is doubled; `\` is doubled because the engine treats it as an escape; line
/// breaks and tabs become escapes since a statement must fit on one line.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}
