//! Serialization of the element graph into visual documents.

pub mod svg;

use std::{fs, path::Path};

use log::{error, info};

use planum_core::Diagram;

pub use self::svg::SvgExporter;

/// Renders the current element graph of a session.
///
/// Exporters read the graph only; overlays and the semantic tree are never
/// part of the output except for label text.
pub trait Exporter {
    /// Renders `diagram` into a complete document.
    fn export(&self, diagram: &Diagram) -> Result<String, Error>;

    /// Renders `diagram` and writes the document to `path`.
    fn export_to_file(&self, diagram: &Diagram, path: &Path) -> Result<(), Error> {
        let content = self.export(diagram)?;
        info!(path:? = path, bytes = content.len(); "Writing exported diagram");
        fs::write(path, content).map_err(|err| {
            error!(path:? = path, err:err; "Failed to write exported diagram");
            Error::Io(err)
        })
    }
}

#[derive(Debug)]
pub enum Error {
    Render(String),
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(msg) => write!(f, "Render error: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(_) => None,
            Self::Io(err) => Some(err),
        }
    }
}
