//! Error and diagnostic system for the Planum document reader.
//!
//! Reading a document produces [`Diagnostic`]s. Errors abort the read and
//! are returned wrapped in a [`ParseError`]; warnings are collected and
//! handed back alongside the parsed tree.
//!
//! # Example
//!
//! ```
//! # use planum_parser::error::{Diagnostic, ErrorCode};
//! # use planum_parser::Span;
//!
//! let diag = Diagnostic::warning("unresolved reference <Task_9>")
//!     .with_code(ErrorCode::E200)
//!     .with_label(Span::new(120..140), "no element with this id")
//!     .with_help("check the id of the referenced element");
//! assert_eq!(diag.to_string(), "warning[E200]: unresolved reference <Task_9>");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;
pub(crate) use parse_error::Result;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
