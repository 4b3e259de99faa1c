//! # Planum Parser
//!
//! Reads BPMN 2.0 XML documents into the semantic and diagram-interchange
//! tree of [`planum_core::semantic`].
//!
//! ## Usage
//!
//! ```
//! # use planum_parser::{parse, ParseError};
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"<?xml version="1.0" encoding="UTF-8"?>
//!     <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" id="Definitions_1">
//!       <bpmn:process id="Process_1">
//!         <bpmn:startEvent id="StartEvent_1" />
//!       </bpmn:process>
//!     </bpmn:definitions>"#;
//!
//!     let document = parse(source)?;
//!     assert!(document.tree().by_id("StartEvent_1").is_some());
//!     assert!(document.warnings().is_empty());
//!     Ok(())
//! }
//! ```

pub mod error;
mod reader;
mod schema;
mod span;

pub use error::{Diagnostic, ParseError};
pub use span::{Location, Span};

use log::info;

use planum_core::semantic::ModelTree;

/// A successfully read document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    tree: ModelTree,
    warnings: Vec<Diagnostic>,
}

impl ParsedDocument {
    /// The semantic tree, rooted at `bpmn:Definitions`.
    pub fn tree(&self) -> &ModelTree {
        &self.tree
    }

    /// Non-fatal findings, in document order.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn into_parts(self) -> (ModelTree, Vec<Diagnostic>) {
        (self.tree, self.warnings)
    }
}

/// Parse a BPMN 2.0 XML document.
///
/// Reading stops at the first fatal problem: malformed XML, a root other
/// than `bpmn:definitions`, an element outside the known vocabulary or a
/// broken diagram-interchange number. Unresolved references and duplicate
/// ids only produce warnings.
///
/// # Errors
///
/// Returns a [`ParseError`] whose display names the offending element, its
/// line and column and the underlying failure.
pub fn parse(source: &str) -> Result<ParsedDocument, ParseError> {
    info!(bytes = source.len(); "Parsing document");
    reader::read(source)
}
