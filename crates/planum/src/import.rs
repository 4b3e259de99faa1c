//! Reconciliation of a parsed document with its diagram-interchange plane.
//!
//! The [`Importer`] reads the semantic tree of a [`Diagram`] session and
//! populates the session's element graph from it:
//!
//! 1. The first diagram plane is located and every interchange record is
//!    linked to the semantic node it describes.
//! 2. The plane's root element (a process or a collaboration) becomes the
//!    graph root. A plane without a root reference is corrected to the
//!    document's only collaboration or process.
//! 3. The semantic tree is walked depth first in document order. Containers
//!    are drawn before their content; connections wait until both of their
//!    ends are drawn.
//!
//! Everything that does not stop the import is reported as a [`Warning`].
//! Import is not undoable and does not go through the command stack; a
//! failed import leaves already created elements in place.
//!
//! [`Diagram`]: planum_core::Diagram

mod walker;

use std::fmt;

use thiserror::Error;

use planum_core::error::GraphError;

pub use walker::Importer;

/// A non-fatal problem found during import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    message: String,
    element: Option<String>,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            element: None,
        }
    }

    /// Attaches the id of the offending element.
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Fatal import failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("no diagram to display")]
    NoDiagram,

    #[error("no process or collaboration to display for {0}")]
    UnresolvableDi(String),

    #[error("no elements could be imported")]
    EmptyDiagram,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Progress of an [`Importer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning() {
        let warning = Warning::new("missing DI").with_element("Task_1");
        assert_eq!(warning.message(), "missing DI");
        assert_eq!(warning.element(), Some("Task_1"));
        assert_eq!(warning.to_string(), "missing DI");
        assert_eq!(Warning::new("x").element(), None);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ImportError::NoDiagram.to_string(), "no diagram to display");
        assert_eq!(
            ImportError::UnresolvableDi(r#"<bpmndi:BPMNPlane id="BPMNPlane_1" />"#.into()).to_string(),
            r#"no process or collaboration to display for <bpmndi:BPMNPlane id="BPMNPlane_1" />"#
        );
    }
}
