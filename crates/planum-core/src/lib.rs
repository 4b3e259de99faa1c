//! Planum Core
//!
//! The structural heart of a process-diagram viewer and editor:
//!
//! - **Identifiers**: interned element ids ([`identifier::Id`])
//! - **Geometry**: points, sizes and bounds ([`geometry`] module)
//! - **Semantic model**: the parsed business document and its
//!   diagram-interchange records ([`semantic`] module)
//! - **Element graph**: shapes, connections and labels with their
//!   ownership tree ([`graph`] module)
//! - **Event bus**: synchronous, prioritised, cancellable events ([`events`])
//! - **Command stack**: undoable, composable edits ([`command`])
//! - **Overlays**: decorations keyed to graph elements ([`overlays`])
//!
//! [`Diagram`] ties them into one editing session.

pub mod command;
mod diagram;
pub mod error;
pub mod events;
pub mod geometry;
pub mod graph;
pub mod identifier;
pub mod overlays;
pub mod semantic;

pub use diagram::Diagram;
