//! Error types for Planum operations.
//!
//! [`PlanumError`] wraps every failure the façade can surface, from reading
//! the document to writing the exported image.

use std::io;

use thiserror::Error;

use planum_core::error::{CommandError, GraphError};
use planum_parser::ParseError;

use crate::{import::ImportError, modeling::ModelingError};

/// The main error type for Planum operations.
///
/// The `Parse` variant keeps the document text next to the diagnostics so
/// that callers can render source snippets.
#[derive(Debug, Error)]
pub enum PlanumError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Modeling error: {0}")]
    Modeling(#[from] ModelingError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Export error: {0}")]
    Export(Box<dyn std::error::Error>),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<crate::export::Error> for PlanumError {
    fn from(error: crate::export::Error) -> Self {
        Self::Export(Box::new(error))
    }
}

impl PlanumError {
    /// Create a new `Parse` error with the associated document text.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}
