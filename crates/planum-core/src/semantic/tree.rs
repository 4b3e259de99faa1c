//! Arena storage for the semantic document.

use std::fmt::Write as _;

use indexmap::IndexMap;

use super::kind;
use crate::geometry::{Bounds, Point};

/// Handle of a node inside a [`ModelTree`].
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelRef(usize);

impl ModelRef {
    /// Returns the arena index of the handle.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the semantic or diagram-interchange document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelNode {
    type_name: String,
    id: Option<String>,
    attrs: IndexMap<String, String>,
    parent: Option<ModelRef>,
    collections: IndexMap<String, Vec<ModelRef>>,
    references: IndexMap<String, ModelRef>,
    reference_lists: IndexMap<String, Vec<ModelRef>>,
    di: Option<ModelRef>,
    bounds: Option<Bounds>,
    waypoints: Vec<Point>,
    label_bounds: Option<Bounds>,
}

impl ModelNode {
    /// Creates a detached node of the given qualified type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = waypoints;
        self
    }

    pub fn with_label_bounds(mut self, bounds: Bounds) -> Self {
        self.label_bounds = Some(bounds);
        self
    }

    /// Returns the qualified type name, e.g. `bpmn:Task`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the owning node ($parent), if attached.
    pub fn parent(&self) -> Option<ModelRef> {
        self.parent
    }

    /// Returns the explicitly set attributes in document order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the diagram-interchange record associated with this node.
    pub fn di(&self) -> Option<ModelRef> {
        self.di
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn label_bounds(&self) -> Option<Bounds> {
        self.label_bounds
    }

    /// Returns the names of the non-empty child collections.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(name, _)| name.as_str())
    }
}

/// Position a node occupied in its parent before being detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    pub parent: ModelRef,
    pub collection: String,
    pub index: usize,
}

/// Arena of semantic nodes with an id index.
///
/// Nodes are never freed; detaching only clears ownership so that undo can
/// re-attach the very same node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTree {
    nodes: Vec<ModelNode>,
    ids: IndexMap<String, ModelRef>,
    root: Option<ModelRef>,
}

impl ModelTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a detached node and returns its handle.
    ///
    /// The id index keeps the first node registered for an id, so a later
    /// duplicate is reachable only through its handle.
    pub fn add_node(&mut self, node: ModelNode) -> ModelRef {
        let handle = ModelRef(self.nodes.len());
        if let Some(id) = &node.id {
            self.ids.entry(id.clone()).or_insert(handle);
        }
        self.nodes.push(node);
        handle
    }

    /// Returns the node behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was issued by another tree.
    pub fn node(&self, handle: ModelRef) -> &ModelNode {
        &self.nodes[handle.0]
    }

    pub fn get(&self, handle: ModelRef) -> Option<&ModelNode> {
        self.nodes.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<ModelRef> {
        self.root
    }

    pub fn set_root(&mut self, root: ModelRef) {
        self.root = Some(root);
    }

    /// Looks a node up by its document id.
    pub fn by_id(&self, id: &str) -> Option<ModelRef> {
        self.ids.get(id).copied()
    }

    /// Iterates over every node handle in creation order.
    pub fn handles(&self) -> impl Iterator<Item = ModelRef> + use<> {
        (0..self.nodes.len()).map(ModelRef)
    }

    pub fn type_name(&self, handle: ModelRef) -> &str {
        &self.node(handle).type_name
    }

    /// Returns true if the node has exactly the given qualified type.
    pub fn is_a(&self, handle: ModelRef, type_name: &str) -> bool {
        self.node(handle).type_name == type_name
    }

    pub fn parent(&self, handle: ModelRef) -> Option<ModelRef> {
        self.node(handle).parent
    }

    /// Returns an attribute value, falling back to the type's implicit
    /// default when the document left it out.
    pub fn attr(&self, handle: ModelRef, name: &str) -> Option<&str> {
        let node = self.node(handle);
        node.attrs
            .get(name)
            .map(String::as_str)
            .or_else(|| kind::default_attr(&node.type_name, name))
    }

    /// Sets or clears an attribute, returning the previous explicit value.
    pub fn set_attr(&mut self, handle: ModelRef, name: &str, value: Option<String>) -> Option<String> {
        let attrs = &mut self.nodes[handle.0].attrs;
        match value {
            Some(value) => attrs.insert(name.to_string(), value),
            None => attrs.shift_remove(name),
        }
    }

    /// Returns the members of a named child collection.
    pub fn collection(&self, handle: ModelRef, name: &str) -> &[ModelRef] {
        self.node(handle)
            .collections
            .get(name)
            .map_or(&[], Vec::as_slice)
    }

    /// Attaches `child` to `parent` in the named collection.
    ///
    /// Returns the index the child was inserted at. `index` values past the
    /// end append.
    pub fn attach(
        &mut self,
        parent: ModelRef,
        collection: &str,
        child: ModelRef,
        index: Option<usize>,
    ) -> usize {
        let members = self.nodes[parent.0]
            .collections
            .entry(collection.to_string())
            .or_default();
        let index = index.map_or(members.len(), |i| i.min(members.len()));
        members.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        index
    }

    /// Removes `child` from its parent's collection.
    ///
    /// Returns where it was attached, or `None` if the node had no parent.
    pub fn detach(&mut self, child: ModelRef) -> Option<Detached> {
        let parent = self.nodes[child.0].parent.take()?;
        let collections = &mut self.nodes[parent.0].collections;
        collections.iter_mut().find_map(|(name, members)| {
            let index = members.iter().position(|m| *m == child)?;
            members.remove(index);
            Some(Detached {
                parent,
                collection: name.clone(),
                index,
            })
        })
    }

    /// Returns a single-valued reference such as `sourceRef`.
    pub fn reference(&self, handle: ModelRef, name: &str) -> Option<ModelRef> {
        self.node(handle).references.get(name).copied()
    }

    /// Sets or clears a single-valued reference, returning the previous one.
    pub fn set_reference(
        &mut self,
        handle: ModelRef,
        name: &str,
        target: Option<ModelRef>,
    ) -> Option<ModelRef> {
        let references = &mut self.nodes[handle.0].references;
        match target {
            Some(target) => references.insert(name.to_string(), target),
            None => references.shift_remove(name),
        }
    }

    /// Returns a multi-valued reference such as `incoming` or `flowNodeRef`.
    pub fn reference_list(&self, handle: ModelRef, name: &str) -> &[ModelRef] {
        self.node(handle)
            .reference_lists
            .get(name)
            .map_or(&[], Vec::as_slice)
    }

    /// Inserts a target into a reference list, returning its index.
    pub fn insert_reference(
        &mut self,
        handle: ModelRef,
        name: &str,
        target: ModelRef,
        index: Option<usize>,
    ) -> usize {
        let list = self.nodes[handle.0]
            .reference_lists
            .entry(name.to_string())
            .or_default();
        let index = index.map_or(list.len(), |i| i.min(list.len()));
        list.insert(index, target);
        index
    }

    /// Removes the first occurrence of `target`, returning its former index.
    pub fn remove_reference(&mut self, handle: ModelRef, name: &str, target: ModelRef) -> Option<usize> {
        let list = self.nodes[handle.0].reference_lists.get_mut(name)?;
        let index = list.iter().position(|r| *r == target)?;
        list.remove(index);
        if list.is_empty() {
            self.nodes[handle.0].reference_lists.shift_remove(name);
        }
        Some(index)
    }

    pub fn di(&self, handle: ModelRef) -> Option<ModelRef> {
        self.node(handle).di
    }

    /// Associates a diagram-interchange record, returning the previous one.
    pub fn set_di(&mut self, handle: ModelRef, di: Option<ModelRef>) -> Option<ModelRef> {
        std::mem::replace(&mut self.nodes[handle.0].di, di)
    }

    pub fn set_bounds(&mut self, handle: ModelRef, bounds: Option<Bounds>) -> Option<Bounds> {
        std::mem::replace(&mut self.nodes[handle.0].bounds, bounds)
    }

    pub fn set_waypoints(&mut self, handle: ModelRef, waypoints: Vec<Point>) -> Vec<Point> {
        std::mem::replace(&mut self.nodes[handle.0].waypoints, waypoints)
    }

    pub fn set_label_bounds(&mut self, handle: ModelRef, bounds: Option<Bounds>) -> Option<Bounds> {
        std::mem::replace(&mut self.nodes[handle.0].label_bounds, bounds)
    }

    /// Walks `$parent` links upward, starting with the node itself.
    pub fn ancestors(&self, handle: ModelRef) -> impl Iterator<Item = ModelRef> + '_ {
        std::iter::successors(Some(handle), |current| self.parent(*current))
    }

    /// Renders a node the way warnings quote it.
    ///
    /// # Examples
    ///
    /// ```
    /// use planum_core::semantic::{ModelNode, ModelTree};
    ///
    /// let mut tree = ModelTree::new();
    /// let task = tree.add_node(ModelNode::new("bpmn:Task").with_id("Task_1"));
    /// assert_eq!(tree.describe(task), r#"<bpmn:Task id="Task_1" />"#);
    /// ```
    pub fn describe(&self, handle: ModelRef) -> String {
        let node = self.node(handle);
        let mut out = format!("<{}", node.type_name);
        if let Some(id) = &node.id {
            // Writing into a String cannot fail.
            let _ = write!(out, " id=\"{id}\"");
        }
        out.push_str(" />");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_with_task() -> (ModelTree, ModelRef, ModelRef) {
        let mut tree = ModelTree::new();
        let process = tree.add_node(ModelNode::new("bpmn:Process").with_id("Process_1"));
        let task = tree.add_node(
            ModelNode::new("bpmn:Task")
                .with_id("Task_1")
                .with_attr("name", "Check"),
        );
        tree.attach(process, "flowElements", task, None);
        (tree, process, task)
    }

    #[test]
    fn test_attach_and_detach() {
        let (mut tree, process, task) = process_with_task();
        assert_eq!(tree.collection(process, "flowElements"), &[task]);
        assert_eq!(tree.parent(task), Some(process));

        let detached = tree.detach(task).expect("task is attached");
        assert_eq!(detached.parent, process);
        assert_eq!(detached.collection, "flowElements");
        assert_eq!(detached.index, 0);
        assert!(tree.collection(process, "flowElements").is_empty());
        assert_eq!(tree.parent(task), None);

        assert_eq!(tree.detach(task), None);
    }

    #[test]
    fn test_attach_at_index() {
        let (mut tree, process, task) = process_with_task();
        let first = tree.add_node(ModelNode::new("bpmn:StartEvent").with_id("StartEvent_1"));

        let index = tree.attach(process, "flowElements", first, Some(0));
        assert_eq!(index, 0);
        assert_eq!(tree.collection(process, "flowElements"), &[first, task]);
    }

    #[test]
    fn test_by_id_keeps_first() {
        let (mut tree, _, task) = process_with_task();
        let duplicate = tree.add_node(ModelNode::new("bpmn:Task").with_id("Task_1"));

        assert_ne!(duplicate, task);
        assert_eq!(tree.by_id("Task_1"), Some(task));
        assert_eq!(tree.by_id("Task_9"), None);
    }

    #[test]
    fn test_attr_defaults() {
        let mut tree = ModelTree::new();
        let gateway = tree.add_node(ModelNode::new("bpmn:EventBasedGateway").with_id("GATEWAY_1"));

        assert_eq!(tree.attr(gateway, "eventGatewayType"), Some("Exclusive"));

        let previous = tree.set_attr(gateway, "eventGatewayType", Some("Parallel".to_string()));
        assert_eq!(previous, None);
        assert_eq!(tree.attr(gateway, "eventGatewayType"), Some("Parallel"));

        let previous = tree.set_attr(gateway, "eventGatewayType", None);
        assert_eq!(previous.as_deref(), Some("Parallel"));
        assert_eq!(tree.attr(gateway, "eventGatewayType"), Some("Exclusive"));
    }

    #[test]
    fn test_references() {
        let (mut tree, _, task) = process_with_task();
        let flow = tree.add_node(ModelNode::new("bpmn:SequenceFlow").with_id("Flow_1"));

        assert_eq!(tree.set_reference(flow, "targetRef", Some(task)), None);
        assert_eq!(tree.reference(flow, "targetRef"), Some(task));
        assert_eq!(tree.set_reference(flow, "targetRef", None), Some(task));
        assert_eq!(tree.reference(flow, "targetRef"), None);

        tree.insert_reference(task, "incoming", flow, None);
        assert_eq!(tree.reference_list(task, "incoming"), &[flow]);
        assert_eq!(tree.remove_reference(task, "incoming", flow), Some(0));
        assert!(tree.reference_list(task, "incoming").is_empty());
    }

    #[test]
    fn test_ancestors() {
        let (tree, process, task) = process_with_task();
        let chain: Vec<_> = tree.ancestors(task).collect();
        assert_eq!(chain, vec![task, process]);
    }

    #[test]
    fn test_describe_without_id() {
        let mut tree = ModelTree::new();
        let node = tree.add_node(ModelNode::new("bpmn:LaneSet"));
        assert_eq!(tree.describe(node), "<bpmn:LaneSet />");
    }
}
