//! Local mirror of table definitions
//!
//! The cache is an optimization for pre-flight validation. The engine stays the
//! source of truth for table existence, so a miss triggers a listing round trip
//! before a table is declared missing.

use std::collections::HashMap;

use crate::error::{DriverError, Result};
use crate::grammar::TableInfo;

/// Name of the vector column every table is created with
pub const VECTOR_COLUMN: &str = "embedding";

/// Declared column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Vector(usize),
    /// Engine-native type passed through verbatim (upper-cased)
    Native(String),
}

impl ColumnType {
    /// Map a caller-facing type name onto the engine's type names
    ///
    /// `str`/`string`/`text` → TEXT, `int`/`integer` → INTEGER, `float` → FLOAT,
    /// `bool` → BOOLEAN, `vector(n)` → VECTOR(n); anything else is upper-cased.
    pub fn from_declared(declared: &str) -> Self {
        let lower = declared.trim().to_ascii_lowercase();
        match lower.as_str() {
            "str" | "string" | "text" => ColumnType::Text,
            "int" | "integer" => ColumnType::Integer,
            "float" => ColumnType::Float,
            "bool" | "boolean" => ColumnType::Boolean,
            _ => lower
                .strip_prefix("vector(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|dim| dim.trim().parse().ok())
                .map(ColumnType::Vector)
                .unwrap_or_else(|| ColumnType::Native(declared.trim().to_uppercase())),
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Vector(dim) => format!("VECTOR({})", dim),
            ColumnType::Native(name) => name.clone(),
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, ColumnType::Vector(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Schema of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    /// Columns in engine order (vector column first)
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Schema as rendered by `create_table`: the vector column, then declared columns
    pub fn new(name: impl Into<String>, vector_dim: usize, declared: &[(&str, &str)]) -> Self {
        let mut columns = vec![Column::new(VECTOR_COLUMN, ColumnType::Vector(vector_dim))];
        columns.extend(
            declared
                .iter()
                .map(|(col, ty)| Column::new(*col, ColumnType::from_declared(ty))),
        );
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Partial schema learned from a table listing (vector column only)
    pub fn from_listing(info: &TableInfo) -> Self {
        Self::new(info.name.clone(), info.dimension, &[])
    }

    /// The single VECTOR column, if the table is search-eligible
    pub fn vector_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.column_type.is_vector())
    }

    pub fn vector_dimension(&self) -> Option<usize> {
        self.vector_column().and_then(|c| match c.column_type {
            ColumnType::Vector(dim) => Some(dim),
            _ => None,
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Reject vectors whose length differs from the declared dimension
    pub fn check_vector(&self, vector: &[f32]) -> Result<()> {
        match self.vector_dimension() {
            Some(expected) if expected != vector.len() => Err(DriverError::DimensionMismatch {
                expected,
                found: vector.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// Table name → schema, scoped to one session
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: HashMap<String, TableSchema>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a schema; returns false when an entry with a different dimension is kept
    ///
    /// An entry with the same dimension is replaced, which lets a declared schema
    /// supersede a vector-only schema learned from a listing.
    pub fn put(&mut self, schema: TableSchema) -> bool {
        if let Some(existing) = self.tables.get(&schema.name) {
            if existing.vector_dimension() != schema.vector_dimension() {
                tracing::warn!(
                    table = %schema.name,
                    cached = ?existing.vector_dimension(),
                    requested = ?schema.vector_dimension(),
                    "keeping cached vector dimension"
                );
                return false;
            }
        }
        self.tables.insert(schema.name.clone(), schema);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<TableSchema> {
        self.tables.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Cached table names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Add listed tables that are not cached yet; cached entries are never touched
    pub fn reconcile(&mut self, listing: &[TableInfo]) -> usize {
        let mut added = 0;
        for info in listing {
            if !self.tables.contains_key(&info.name) {
                self.tables
                    .insert(info.name.clone(), TableSchema::from_listing(info));
                added += 1;
            }
        }
        if added > 0 {
            tracing::debug!(added, "schema cache reconciled from table listing");
        }
        added
    }

    /// Look a table up, reconciling through `fetch` (a listing round trip) on a miss
    pub fn ensure_known<F>(&mut self, name: &str, fetch: F) -> Result<&TableSchema>
    where
        F: FnOnce() -> Result<Vec<TableInfo>>,
    {
        if !self.tables.contains_key(name) {
            let listing = fetch()?;
            self.reconcile(&listing);
        }
        self.tables
            .get(name)
            .ok_or_else(|| DriverError::TableNotFound(name.to_string()))
    }
}
