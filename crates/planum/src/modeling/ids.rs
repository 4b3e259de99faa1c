//! Ids for elements created by modeling commands.

use planum_core::{Diagram, identifier::Id, semantic::local_name};

/// Returns `<LocalTypeName>_<n>` with the lowest `n` not used by the graph
/// or the semantic tree.
pub fn next_id(diagram: &Diagram, type_name: &str) -> Id {
    let prefix = local_name(type_name);
    let mut n = 1;
    loop {
        let id = Id::numbered(prefix, n);
        if !diagram.graph().contains(id) && diagram.model().by_id(&id.to_string()).is_none() {
            return id;
        }
        n += 1;
    }
}
