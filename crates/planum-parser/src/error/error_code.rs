//! Error codes for the Planum reader diagnostics.
//!
//! Error codes are organized by phase:
//! - `E0xx` - XML syntax errors
//! - `E1xx` - Schema errors (fatal)
//! - `E2xx` - Reference and identity warnings

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // XML Errors (E0xx)
    // =========================================================================
    /// Malformed XML.
    ///
    /// The input is not well-formed XML, or is not XML at all.
    E001,

    // =========================================================================
    // Schema Errors (E1xx)
    // =========================================================================
    /// Unrecognized element.
    ///
    /// An element outside the known BPMN 2.0 vocabulary was found where
    /// only schema elements are allowed. Foreign elements are accepted
    /// inside `extensionElements` only.
    E100,

    /// Invalid root element.
    ///
    /// The document root must be `bpmn:definitions`.
    E101,

    /// Invalid number.
    ///
    /// A coordinate or size attribute does not hold a number.
    E102,

    /// Missing attribute.
    ///
    /// A diagram-interchange element lacks a required attribute.
    E103,

    // =========================================================================
    // Reference Warnings (E2xx)
    // =========================================================================
    /// Unresolved reference.
    ///
    /// An id reference points to no element of the document. The reference
    /// is dropped.
    E200,

    /// Duplicate id.
    ///
    /// Two elements share an id. Lookups resolve to the first one.
    E201,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "malformed xml",
            ErrorCode::E100 => "unrecognized element",
            ErrorCode::E101 => "invalid root element",
            ErrorCode::E102 => "invalid number",
            ErrorCode::E103 => "missing attribute",
            ErrorCode::E200 => "unresolved reference",
            ErrorCode::E201 => "duplicate id",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
