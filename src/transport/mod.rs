//! Transport to the engine
//!
//! A transport runs exactly one command per call and hands back whatever the
//! engine printed. It has no notion of tables, rows or success beyond "the
//! process finished in time".

mod process;

pub use process::{ProcessTransport, DEFAULT_BINARY, DEFAULT_TIMEOUT, TERMINATOR};

use crate::error::Result;

/// Executes command text against an engine
pub trait Transport {
    /// Run one command and return stdout followed by stderr
    fn execute(&self, command: &str) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, command: &str) -> Result<String> {
        (**self).execute(command)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, command: &str) -> Result<String> {
        (**self).execute(command)
    }
}
