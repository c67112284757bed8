//! Client facade
//!
//! A [`Client`] owns one transport and one [`Session`]: the optional database
//! path, the schema cache and the current-table cursor. Every operation resolves
//! its table (explicit name, else the cursor), validates locally, renders a
//! command, runs it and interprets the engine's output.
//!
//! Sessions bound to a file re-open the artifact at the start of every command,
//! since each engine process starts empty. In-memory sessions are ephemeral per
//! call: data written by one operation is gone by the next.

mod internal;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::command::Command;
use crate::config::Config;
use crate::error::{DriverError, Result};
use crate::grammar::TableInfo;
use crate::schema::{SchemaCache, TableSchema};
use crate::transport::{ProcessTransport, Transport, DEFAULT_TIMEOUT};
use crate::value::{Metadata, Value};

/// One row returned by `search` or `get`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub id: u64,
    /// Present for similarity results only; smaller is closer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    /// Column name → value in schema order. Positional names (`_0`, `_1`, ...)
    /// are used when the value count does not match the cached schema.
    pub values: Metadata,
}

impl QueryResult {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

/// Per-client state
#[derive(Debug, Default)]
pub struct Session {
    path: Option<PathBuf>,
    schemas: SchemaCache,
    current_table: Option<String>,
}

impl Session {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    pub fn current_table(&self) -> Option<&str> {
        self.current_table.as_deref()
    }

    fn forget(&mut self, name: &str) {
        self.schemas.remove(name);
        if self.current_table.as_deref() == Some(name) {
            self.current_table = None;
        }
    }
}

/// Typed access to one engine database
#[derive(Debug)]
pub struct Client<T: Transport = ProcessTransport> {
    transport: T,
    session: Session,
}

impl Client<ProcessTransport> {
    /// Session over a database file, created (with parent directories) if absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder().database(path).build()
    }

    /// Session without persistence
    pub fn in_memory() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl<T: Transport> Client<T> {
    /// Wrap an existing transport
    ///
    /// With a path, the artifact is created when the file is missing, otherwise it
    /// is opened once to check that the engine accepts it.
    pub fn with_transport(transport: T, path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = &path {
            prepare_database(&transport, path)?;
        }
        Ok(Self {
            transport,
            session: Session::new(path),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn path(&self) -> Option<&Path> {
        self.session.path()
    }

    pub fn current_table(&self) -> Option<&str> {
        self.session.current_table()
    }

    pub fn schema(&self, table: &str) -> Option<&TableSchema> {
        self.session.schemas.get(table)
    }

    /// Create a table with a leading `embedding VECTOR(vector_dim)` column and
    /// select it
    ///
    /// With `if_not_exists`, an engine that rejects the clause is answered from a
    /// table listing: an existing table of the same dimension counts as success,
    /// a missing one is created with the plain statement.
    pub fn create_table(
        &mut self,
        name: &str,
        vector_dim: usize,
        columns: &[(&str, &str)],
        if_not_exists: bool,
    ) -> Result<()> {
        let command = Command::CreateTable {
            name,
            vector_dim,
            columns,
            if_not_exists,
        }
        .build(None)?;
        match self.records(&command) {
            Ok(_) => {}
            Err(rejected @ DriverError::QueryFailure { .. }) if if_not_exists => {
                self.settle_create(name, vector_dim, columns, rejected)?
            }
            Err(err) => return Err(err),
        }

        self.session
            .schemas
            .put(TableSchema::new(name, vector_dim, columns));
        self.session.current_table = Some(name.to_string());
        tracing::debug!(table = name, vector_dim, "table created");
        Ok(())
    }

    /// Select the default table for later operations
    pub fn use_table(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_table(name)?;
        self.session.current_table = Some(name.to_string());
        Ok(self)
    }

    pub fn drop_table(&mut self, name: &str, if_exists: bool) -> Result<()> {
        let command = Command::DropTable { name, if_exists }.build(None)?;
        self.records(&command)?;
        self.session.forget(name);
        Ok(())
    }

    /// Tables as reported by the engine, in engine order
    pub fn list_tables(&mut self) -> Result<Vec<TableInfo>> {
        let listing = internal::fetch_listing(&self.transport, self.session.path())?;
        self.session.schemas.reconcile(&listing);
        Ok(listing)
    }

    /// Insert one row and return the engine-assigned id
    pub fn insert(&mut self, vector: &[f32], metadata: &Metadata, table: Option<&str>) -> Result<u64> {
        let table = self.resolve_table(table)?;
        let command = {
            let schema = self.ensure_table(&table)?;
            Command::Insert {
                table: &table,
                vector,
                metadata,
            }
            .build(Some(schema))?
        };
        let records = self.records(&command)?;
        internal::row_echo(&records, &command)
    }

    /// Insert rows one at a time, returning ids in input order
    ///
    /// Dimensions are checked for the whole batch before anything is sent. A later
    /// engine failure leaves earlier rows committed.
    pub fn insert_batch(
        &mut self,
        vectors: &[Vec<f32>],
        metadata: Option<&[Metadata]>,
        table: Option<&str>,
    ) -> Result<Vec<u64>> {
        if let Some(metadata) = metadata {
            if metadata.len() != vectors.len() {
                return Err(DriverError::BatchLengthMismatch {
                    vectors: vectors.len(),
                    metadata: metadata.len(),
                });
            }
        }
        let table = self.resolve_table(table)?;
        {
            let schema = self.ensure_table(&table)?;
            for vector in vectors {
                schema.check_vector(vector)?;
            }
        }

        let empty = Metadata::new();
        let mut ids = Vec::with_capacity(vectors.len());
        for (i, vector) in vectors.iter().enumerate() {
            let row = metadata.map_or(&empty, |m| &m[i]);
            ids.push(self.insert(vector, row, Some(&table))?);
        }
        tracing::debug!(table = %table, rows = ids.len(), "batch inserted");
        Ok(ids)
    }

    /// Nearest rows to `query`, closest first, at most `k` of them
    pub fn search(&mut self, query: &[f32], k: usize, table: Option<&str>) -> Result<Vec<QueryResult>> {
        let table = self.resolve_table(table)?;
        let command = {
            let schema = self.ensure_table(&table)?;
            Command::Search {
                table: &table,
                vector: query,
                k,
            }
            .build(Some(schema))?
        };
        let records = self.records(&command)?;
        let schema = self.session.schemas.get(&table);
        Ok(internal::rows(records)
            .filter(|row| row.distance.is_some())
            .take(k)
            .map(|row| internal::attribute(row, schema))
            .collect())
    }

    pub fn get(&mut self, id: u64, table: Option<&str>) -> Result<Option<QueryResult>> {
        let table = self.resolve_table(table)?;
        self.ensure_table(&table)?;
        let command = Command::Get { table: &table, id }.build(None)?;
        let records = self.records(&command)?;
        let schema = self.session.schemas.get(&table);
        Ok(internal::rows(records)
            .find(|row| row.id == id)
            .map(|row| internal::attribute(row, schema)))
    }

    /// Overwrite the given columns of one row; true when the row existed
    pub fn update(&mut self, id: u64, metadata: &Metadata, table: Option<&str>) -> Result<bool> {
        let table = self.resolve_table(table)?;
        if metadata.is_empty() {
            return Err(DriverError::local("update requires at least one column"));
        }
        self.ensure_table(&table)?;
        let command = Command::Update {
            table: &table,
            id,
            metadata,
        }
        .build(None)?;
        let records = self.records(&command)?;
        Ok(internal::affected(&records, &command)? > 0)
    }

    /// Delete one row; true when the row existed
    pub fn delete(&mut self, id: u64, table: Option<&str>) -> Result<bool> {
        let table = self.resolve_table(table)?;
        self.ensure_table(&table)?;
        let command = Command::Delete { table: &table, id }.build(None)?;
        let records = self.records(&command)?;
        Ok(internal::affected(&records, &command)? > 0)
    }

    /// Delete every row, returning how many were removed
    pub fn delete_all(&mut self, table: Option<&str>) -> Result<usize> {
        let table = self.resolve_table(table)?;
        self.ensure_table(&table)?;
        let command = Command::DeleteAll { table: &table }.build(None)?;
        let records = self.records(&command)?;
        internal::affected(&records, &command)
    }

    /// Send text verbatim and return the engine's output uninterpreted
    ///
    /// Nothing is escaped: never build `text` from untrusted input.
    pub fn raw(&self, text: &str) -> Result<String> {
        let command = Command::Raw(text).build(None)?;
        internal::execute(&self.transport, self.session.path(), &command)
    }

    /// End the session, flushing the artifact for file-backed sessions
    pub fn close(self) -> Result<()> {
        if let Some(path) = self.session.path() {
            let command = Command::Save.build(None)?;
            internal::execute_records(&self.transport, Some(path), &command)?;
            tracing::debug!(path = %path.display(), "database saved");
        }
        Ok(())
    }

    fn settle_create(
        &mut self,
        name: &str,
        vector_dim: usize,
        columns: &[(&str, &str)],
        rejected: DriverError,
    ) -> Result<()> {
        let listing = self.list_tables()?;
        match listing.iter().find(|t| t.name == name) {
            Some(info) if info.dimension == vector_dim => {
                tracing::debug!(table = name, "table already exists");
                Ok(())
            }
            Some(_) => Err(rejected),
            None => {
                let command = Command::CreateTable {
                    name,
                    vector_dim,
                    columns,
                    if_not_exists: false,
                }
                .build(None)?;
                self.records(&command).map(|_| ())
            }
        }
    }

    fn records(&self, command: &str) -> Result<Vec<crate::grammar::Record>> {
        internal::execute_records(&self.transport, self.session.path(), command)
    }

    fn resolve_table(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .or(self.session.current_table.as_deref())
            .map(str::to_string)
            .ok_or(DriverError::NoTableSelected)
    }

    fn ensure_table(&mut self, name: &str) -> Result<&TableSchema> {
        let Self { transport, session } = self;
        let Session { path, schemas, .. } = session;
        schemas.ensure_known(name, || internal::fetch_listing(&*transport, path.as_deref()))
    }
}

fn prepare_database<T: Transport>(transport: &T, path: &Path) -> Result<()> {
    let command = if path.exists() {
        Command::Open(path).build(None)?
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DriverError::ConnectionFailure(format!(
                    "cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Command::Create(path).build(None)?
    };

    let output = transport.execute(&command)?;
    let records = crate::grammar::parse_output(&output);
    internal::check_engine_error(&records, &command).map_err(|e| {
        DriverError::ConnectionFailure(format!("cannot open database {}: {}", path.display(), e))
    })
}

/// Builder for process-backed clients
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    binary: Option<PathBuf>,
    database: Option<PathBuf>,
    timeout: Duration,
    args: Vec<String>,
    scratch_dir: Option<PathBuf>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            binary: None,
            database: None,
            timeout: DEFAULT_TIMEOUT,
            args: Vec::new(),
            scratch_dir: None,
        }
    }
}

impl ClientBuilder {
    /// Start from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.binary.clone(),
            database: config.database.clone(),
            timeout: config.timeout(),
            args: config.args.clone(),
            scratch_dir: None,
        }
    }

    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    /// Drop any configured database and use an in-memory session
    pub fn memory(mut self) -> Self {
        self.database = None;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Client<ProcessTransport>> {
        let mut transport = ProcessTransport::new(self.binary.as_deref())?
            .with_timeout(self.timeout)
            .with_args(self.args);
        if let Some(dir) = self.scratch_dir {
            transport = transport.with_scratch_dir(dir);
        }
        Client::with_transport(transport, self.database)
    }
}
