//! Typed client for the PardusDB vector store, driven through its REPL binary

pub mod client;
pub mod command;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod grammar;
pub mod schema;
pub mod transport;
pub mod value;

// Re-export commonly used types
pub use client::{Client, ClientBuilder, QueryResult, Session};
pub use config::Config;
pub use error::{DriverError, Result};
pub use grammar::TableInfo;
pub use schema::{ColumnType, TableSchema};
pub use transport::{ProcessTransport, Transport};
pub use value::{Metadata, Value};
