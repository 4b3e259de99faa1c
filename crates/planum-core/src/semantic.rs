//! Semantic document model.
//!
//! The parser hands over one [`ModelTree`] holding both the business model
//! (definitions, processes, flow elements) and the diagram-interchange
//! records (planes, shapes, edges). Graph elements point into it through
//! [`ModelRef`] handles; the tree itself never points back at the graph.
//!
//! Structural questions about a type name (is it a container, does it carry
//! an external label, what are its attribute defaults) are answered by the
//! registry functions re-exported from [`kind`].

pub mod kind;
mod tree;

pub use kind::{
    Family, default_attr, default_size, family, has_external_label, label_attr, local_name,
};
pub use tree::{Detached, ModelNode, ModelRef, ModelTree};
