//! The diagram element graph.
//!
//! [`ElementGraph`] owns every root, shape, connection and label of one
//! diagram. Ownership flows only through `parent`/`children`; the other
//! links (`incoming`, `outgoing`, `label`, connection ends, label target) are
//! associations stored as ids, so removing an element never leaves a dangling
//! pointer, only an id the graph can check.
//!
//! The graph enforces its invariants on insertion:
//!
//! - ids are unique,
//! - the parent is a root or shape already in the graph,
//! - connection ends and label targets are already in the graph.
//!
//! It does not fire events. The [`Diagram`](crate::Diagram) session wraps
//! these primitives and announces every change on its event bus.

use indexmap::IndexMap;
use log::trace;

use crate::{
    error::GraphError,
    geometry::{Bounds, Point},
    identifier::Id,
    semantic::ModelRef,
};

/// Structural variant of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Root,
    Shape,
    Connection,
    Label,
}

impl ElementKind {
    /// Returns the name used as event prefix (`shape.added`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Root => "root",
            ElementKind::Shape => "shape",
            ElementKind::Connection => "connection",
            ElementKind::Label => "label",
        }
    }
}

/// Variant-specific element data.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementBody {
    Root,
    Shape {
        bounds: Bounds,
    },
    Connection {
        source: Option<Id>,
        target: Option<Id>,
        waypoints: Vec<Point>,
    },
    Label {
        bounds: Bounds,
        target: Option<Id>,
    },
}

/// A node of the element graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: Id,
    type_name: String,
    business_object: Option<ModelRef>,
    parent: Option<Id>,
    children: Vec<Id>,
    incoming: Vec<Id>,
    outgoing: Vec<Id>,
    label: Option<Id>,
    body: ElementBody,
}

impl Element {
    fn new(id: Id, type_name: impl Into<String>, body: ElementBody) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            business_object: None,
            parent: None,
            children: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            label: None,
            body,
        }
    }

    /// Creates a root element.
    pub fn root(id: Id, type_name: impl Into<String>) -> Self {
        Self::new(id, type_name, ElementBody::Root)
    }

    /// Creates a shape with the given bounds.
    pub fn shape(id: Id, type_name: impl Into<String>, bounds: Bounds) -> Self {
        Self::new(id, type_name, ElementBody::Shape { bounds })
    }

    /// Creates a connection between two elements.
    pub fn connection(
        id: Id,
        type_name: impl Into<String>,
        source: Id,
        target: Id,
        waypoints: Vec<Point>,
    ) -> Self {
        Self::new(
            id,
            type_name,
            ElementBody::Connection {
                source: Some(source),
                target: Some(target),
                waypoints,
            },
        )
    }

    /// Creates a label annotating `target`.
    pub fn label(id: Id, type_name: impl Into<String>, bounds: Bounds, target: Id) -> Self {
        Self::new(
            id,
            type_name,
            ElementBody::Label {
                bounds,
                target: Some(target),
            },
        )
    }

    /// Associates the semantic node this element represents.
    pub fn with_business_object(mut self, business_object: ModelRef) -> Self {
        self.business_object = Some(business_object);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn business_object(&self) -> Option<ModelRef> {
        self.business_object
    }

    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    pub fn children(&self) -> &[Id] {
        &self.children
    }

    /// Connections ending at this element.
    pub fn incoming(&self) -> &[Id] {
        &self.incoming
    }

    /// Connections starting at this element.
    pub fn outgoing(&self) -> &[Id] {
        &self.outgoing
    }

    /// The external label of this element, if any.
    pub fn label_id(&self) -> Option<Id> {
        self.label
    }

    pub fn body(&self) -> &ElementBody {
        &self.body
    }

    pub fn kind(&self) -> ElementKind {
        match self.body {
            ElementBody::Root => ElementKind::Root,
            ElementBody::Shape { .. } => ElementKind::Shape,
            ElementBody::Connection { .. } => ElementKind::Connection,
            ElementBody::Label { .. } => ElementKind::Label,
        }
    }

    /// Returns the bounds of shapes and labels.
    pub fn bounds(&self) -> Option<Bounds> {
        match &self.body {
            ElementBody::Shape { bounds } | ElementBody::Label { bounds, .. } => Some(*bounds),
            _ => None,
        }
    }

    /// Returns the waypoints of connections, empty for other variants.
    pub fn waypoints(&self) -> &[Point] {
        match &self.body {
            ElementBody::Connection { waypoints, .. } => waypoints,
            _ => &[],
        }
    }

    pub fn source(&self) -> Option<Id> {
        match &self.body {
            ElementBody::Connection { source, .. } => *source,
            _ => None,
        }
    }

    pub fn target(&self) -> Option<Id> {
        match &self.body {
            ElementBody::Connection { target, .. } => *target,
            _ => None,
        }
    }

    /// The element this label annotates.
    pub fn label_target(&self) -> Option<Id> {
        match &self.body {
            ElementBody::Label { target, .. } => *target,
            _ => None,
        }
    }

    fn is_container(&self) -> bool {
        matches!(self.body, ElementBody::Root | ElementBody::Shape { .. })
    }
}

/// Which end of a connection was detached from a removed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Source,
    Target,
}

/// Everything needed to put a removed element back where it was.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedElement {
    element: Element,
    position: usize,
    child_index: usize,
    source_index: Option<usize>,
    target_index: Option<usize>,
    detached: Vec<(Id, End)>,
}

impl RemovedElement {
    pub fn element(&self) -> &Element {
        &self.element
    }
}

/// Ownership graph of diagram elements with O(1) lookup by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementGraph {
    elements: IndexMap<Id, Element>,
    root: Option<Id>,
}

impl ElementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Element> {
        self.root.and_then(|id| self.elements.get(&id))
    }

    pub fn root_id(&self) -> Option<Id> {
        self.root
    }

    pub fn get(&self, id: Id) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates over elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Returns all elements matching `predicate`, in insertion order.
    pub fn filter<'a>(&'a self, predicate: impl Fn(&Element) -> bool + 'a) -> impl Iterator<Item = &'a Element> {
        self.elements.values().filter(move |e| predicate(e))
    }

    fn element(&self, id: Id) -> Result<&Element, GraphError> {
        self.elements.get(&id).ok_or(GraphError::UnknownElement(id))
    }

    fn element_mut(&mut self, id: Id) -> Result<&mut Element, GraphError> {
        self.elements.get_mut(&id).ok_or(GraphError::UnknownElement(id))
    }

    /// Installs `root` as the root element.
    ///
    /// Children of a previous root are moved over to the new one and the
    /// previous root is returned.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NotARoot`] if `root` is not a root element.
    /// - [`GraphError::DuplicateId`] if another element uses its id.
    pub fn set_root(&mut self, mut root: Element) -> Result<Option<Element>, GraphError> {
        if root.kind() != ElementKind::Root {
            return Err(GraphError::NotARoot(root.id));
        }
        if self.elements.contains_key(&root.id) && self.root != Some(root.id) {
            return Err(GraphError::DuplicateId(root.id));
        }

        let previous = match self.root.take() {
            Some(old) => self.elements.shift_remove(&old),
            None => None,
        };
        if let Some(previous) = &previous {
            for child in &previous.children {
                if let Some(element) = self.elements.get_mut(child) {
                    element.parent = Some(root.id);
                }
            }
            root.children.extend(previous.children.iter().copied());
        }

        trace!(root:% = root.id; "Root element set");
        self.root = Some(root.id);
        self.elements.insert(root.id, root);
        Ok(previous)
    }

    /// Inserts `element` as a child of `parent`.
    ///
    /// `index` positions the element among the parent's children; `None` or
    /// an index past the end appends. Connection ends are wired into the
    /// `outgoing`/`incoming` lists of their endpoints and labels into their
    /// target's `label` slot.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateId`] if the id is taken.
    /// - [`GraphError::InvalidParent`] if `parent` is missing or not a container.
    /// - [`GraphError::UnknownEndpoint`] if a connection end or label target is missing.
    /// - [`GraphError::RootElement`] if `element` is a root.
    pub fn add(&mut self, mut element: Element, parent: Id, index: Option<usize>) -> Result<Id, GraphError> {
        let id = element.id;
        if self.elements.contains_key(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        if element.kind() == ElementKind::Root {
            return Err(GraphError::RootElement(id));
        }
        match self.elements.get(&parent) {
            Some(candidate) if candidate.is_container() => {}
            _ => return Err(GraphError::InvalidParent(parent)),
        }
        for endpoint in [element.source(), element.target(), element.label_target()]
            .into_iter()
            .flatten()
        {
            if !self.elements.contains_key(&endpoint) {
                return Err(GraphError::UnknownEndpoint {
                    element: id,
                    endpoint,
                });
            }
        }

        if let Some(source) = element.source() {
            self.element_mut(source)?.outgoing.push(id);
        }
        if let Some(target) = element.target() {
            self.element_mut(target)?.incoming.push(id);
        }
        if let Some(target) = element.label_target() {
            self.element_mut(target)?.label = Some(id);
        }

        let siblings = &mut self.element_mut(parent)?.children;
        let index = index.map_or(siblings.len(), |i| i.min(siblings.len()));
        siblings.insert(index, id);

        element.parent = Some(parent);
        self.elements.insert(id, element);
        Ok(id)
    }

    /// Removes an element and, for labelled elements, its label.
    ///
    /// Connections attached to the removed element are disconnected, not
    /// deleted: their matching end is cleared. The returned records are in
    /// removal order (label first) and can be handed to
    /// [`ElementGraph::restore`] to undo the removal exactly.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownElement`] if `id` is not in the graph.
    /// - [`GraphError::RootElement`] for the root.
    /// - [`GraphError::NotEmpty`] if the element still owns children.
    pub fn remove(&mut self, id: Id) -> Result<Vec<RemovedElement>, GraphError> {
        let element = self.element(id)?;
        if element.kind() == ElementKind::Root {
            return Err(GraphError::RootElement(id));
        }
        if !element.children.is_empty() {
            return Err(GraphError::NotEmpty(id));
        }

        let mut removed = Vec::new();
        if let Some(label) = element.label {
            removed.push(self.remove_single(label)?);
        }
        removed.push(self.remove_single(id)?);
        Ok(removed)
    }

    fn remove_single(&mut self, id: Id) -> Result<RemovedElement, GraphError> {
        let element = self.element(id)?;
        let parent = element.parent.ok_or(GraphError::MissingField(id, "parent"))?;
        let incoming = element.incoming.clone();
        let outgoing = element.outgoing.clone();
        let (source, target, label_target) =
            (element.source(), element.target(), element.label_target());

        let siblings = &mut self.element_mut(parent)?.children;
        let child_index = siblings
            .iter()
            .position(|c| *c == id)
            .ok_or(GraphError::MissingField(id, "parent"))?;
        siblings.remove(child_index);

        let source_index = match source {
            Some(source) => take_link(&mut self.element_mut(source)?.outgoing, id),
            None => None,
        };
        let target_index = match target {
            Some(target) => take_link(&mut self.element_mut(target)?.incoming, id),
            None => None,
        };
        if let Some(target) = label_target {
            self.element_mut(target)?.label = None;
        }

        let mut detached = Vec::new();
        for connection in outgoing {
            if let Some(ElementBody::Connection { source, .. }) =
                self.elements.get_mut(&connection).map(|c| &mut c.body)
            {
                *source = None;
                detached.push((connection, End::Source));
            }
        }
        for connection in incoming {
            if let Some(ElementBody::Connection { target, .. }) =
                self.elements.get_mut(&connection).map(|c| &mut c.body)
            {
                *target = None;
                detached.push((connection, End::Target));
            }
        }

        let (position, _, element) = self
            .elements
            .shift_remove_full(&id)
            .ok_or(GraphError::UnknownElement(id))?;
        Ok(RemovedElement {
            element,
            position,
            child_index,
            source_index,
            target_index,
            detached,
        })
    }

    /// Puts back elements returned by [`ElementGraph::remove`].
    ///
    /// Returns the ids of the restored elements in restoration order.
    pub fn restore(&mut self, removed: Vec<RemovedElement>) -> Result<Vec<Id>, GraphError> {
        let mut restored = Vec::with_capacity(removed.len());
        for record in removed.into_iter().rev() {
            restored.push(self.restore_single(record)?);
        }
        Ok(restored)
    }

    fn restore_single(&mut self, record: RemovedElement) -> Result<Id, GraphError> {
        let RemovedElement {
            element,
            position,
            child_index,
            source_index,
            target_index,
            detached,
        } = record;
        let id = element.id;
        if self.elements.contains_key(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        let parent = element.parent.ok_or(GraphError::MissingField(id, "parent"))?;

        let siblings = &mut self.element_mut(parent)?.children;
        siblings.insert(child_index.min(siblings.len()), id);

        if let (Some(source), Some(index)) = (element.source(), source_index) {
            let outgoing = &mut self.element_mut(source)?.outgoing;
            outgoing.insert(index.min(outgoing.len()), id);
        }
        if let (Some(target), Some(index)) = (element.target(), target_index) {
            let incoming = &mut self.element_mut(target)?.incoming;
            incoming.insert(index.min(incoming.len()), id);
        }
        if let Some(target) = element.label_target() {
            self.element_mut(target)?.label = Some(id);
        }
        for (connection, end) in detached {
            if let ElementBody::Connection { source, target, .. } = &mut self.element_mut(connection)?.body {
                match end {
                    End::Source => *source = Some(id),
                    End::Target => *target = Some(id),
                }
            }
        }

        let position = position.min(self.elements.len());
        self.elements.shift_insert(position, id, element);
        Ok(id)
    }

    /// Moves an element under a new parent.
    ///
    /// Returns the previous parent and the index the element held there.
    pub fn reparent(&mut self, id: Id, new_parent: Id, index: Option<usize>) -> Result<(Id, usize), GraphError> {
        match self.elements.get(&new_parent) {
            Some(candidate) if candidate.is_container() && new_parent != id => {}
            _ => return Err(GraphError::InvalidParent(new_parent)),
        }
        let old_parent = self
            .element(id)?
            .parent
            .ok_or(GraphError::RootElement(id))?;

        let siblings = &mut self.element_mut(old_parent)?.children;
        let old_index = siblings
            .iter()
            .position(|c| *c == id)
            .ok_or(GraphError::MissingField(id, "parent"))?;
        siblings.remove(old_index);

        let siblings = &mut self.element_mut(new_parent)?.children;
        let index = index.map_or(siblings.len(), |i| i.min(siblings.len()));
        siblings.insert(index, id);

        self.element_mut(id)?.parent = Some(new_parent);
        Ok((old_parent, old_index))
    }

    /// Replaces the bounds of a shape or label, returning the old bounds.
    pub fn update_bounds(&mut self, id: Id, new_bounds: Bounds) -> Result<Bounds, GraphError> {
        match &mut self.element_mut(id)?.body {
            ElementBody::Shape { bounds } | ElementBody::Label { bounds, .. } => {
                Ok(std::mem::replace(bounds, new_bounds))
            }
            _ => Err(GraphError::MissingField(id, "bounds")),
        }
    }

    /// Replaces the waypoints of a connection, returning the old ones.
    pub fn update_waypoints(&mut self, id: Id, new_waypoints: Vec<Point>) -> Result<Vec<Point>, GraphError> {
        match &mut self.element_mut(id)?.body {
            ElementBody::Connection { waypoints, .. } => Ok(std::mem::replace(waypoints, new_waypoints)),
            _ => Err(GraphError::MissingField(id, "waypoints")),
        }
    }

    /// Drops every element, including the root.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.root = None;
    }
}

fn take_link(links: &mut Vec<Id>, id: Id) -> Option<usize> {
    let index = links.iter().position(|l| *l == id)?;
    links.remove(index);
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    fn bounds(x: f32, y: f32) -> Bounds {
        Bounds::new_from_top_left(Point::new(x, y), Size::new(100.0, 80.0))
    }

    fn sample_graph() -> ElementGraph {
        let mut graph = ElementGraph::new();
        graph
            .set_root(Element::root(Id::new("Process_1"), "bpmn:Process"))
            .unwrap();
        let root = Id::new("Process_1");
        graph
            .add(Element::shape(Id::new("Task_A"), "bpmn:Task", bounds(0.0, 0.0)), root, None)
            .unwrap();
        graph
            .add(Element::shape(Id::new("Task_B"), "bpmn:Task", bounds(200.0, 0.0)), root, None)
            .unwrap();
        graph
            .add(
                Element::connection(
                    Id::new("Flow_AB"),
                    "bpmn:SequenceFlow",
                    Id::new("Task_A"),
                    Id::new("Task_B"),
                    vec![Point::new(100.0, 40.0), Point::new(200.0, 40.0)],
                ),
                root,
                None,
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_add_wires_parent_and_connections() {
        let graph = sample_graph();
        let root = graph.root().unwrap();

        assert_eq!(root.children(), &[Id::new("Task_A"), Id::new("Task_B"), Id::new("Flow_AB")]);
        assert_eq!(graph.get(Id::new("Task_A")).unwrap().parent(), Some(root.id()));
        assert_eq!(graph.get(Id::new("Task_A")).unwrap().outgoing(), &[Id::new("Flow_AB")]);
        assert_eq!(graph.get(Id::new("Task_B")).unwrap().incoming(), &[Id::new("Flow_AB")]);
    }

    #[test]
    fn test_add_duplicate_id() {
        let mut graph = sample_graph();
        let result = graph.add(
            Element::shape(Id::new("Task_A"), "bpmn:Task", bounds(0.0, 0.0)),
            Id::new("Process_1"),
            None,
        );
        assert_eq!(result, Err(GraphError::DuplicateId(Id::new("Task_A"))));
    }

    #[test]
    fn test_add_invalid_parent() {
        let mut graph = sample_graph();

        let missing = graph.add(
            Element::shape(Id::new("Task_C"), "bpmn:Task", bounds(0.0, 0.0)),
            Id::new("Nowhere"),
            None,
        );
        assert_eq!(missing, Err(GraphError::InvalidParent(Id::new("Nowhere"))));

        let connection_parent = graph.add(
            Element::shape(Id::new("Task_C"), "bpmn:Task", bounds(0.0, 0.0)),
            Id::new("Flow_AB"),
            None,
        );
        assert_eq!(connection_parent, Err(GraphError::InvalidParent(Id::new("Flow_AB"))));
        assert!(!graph.contains(Id::new("Task_C")));
    }

    #[test]
    fn test_add_unknown_endpoint() {
        let mut graph = sample_graph();
        let result = graph.add(
            Element::connection(
                Id::new("Flow_X"),
                "bpmn:SequenceFlow",
                Id::new("Task_A"),
                Id::new("Ghost"),
                vec![],
            ),
            Id::new("Process_1"),
            None,
        );
        assert!(matches!(result, Err(GraphError::UnknownEndpoint { .. })));
        assert!(graph.get(Id::new("Task_A")).unwrap().outgoing().len() == 1);
    }

    #[test]
    fn test_add_at_index() {
        let mut graph = sample_graph();
        graph
            .add(
                Element::shape(Id::new("Task_0"), "bpmn:Task", bounds(0.0, 0.0)),
                Id::new("Process_1"),
                Some(0),
            )
            .unwrap();
        assert_eq!(graph.root().unwrap().children()[0], Id::new("Task_0"));
    }

    #[test]
    fn test_remove_disconnects_and_restores() {
        let mut graph = sample_graph();
        let before = graph.clone();

        let removed = graph.remove(Id::new("Task_B")).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!graph.contains(Id::new("Task_B")));
        let flow = graph.get(Id::new("Flow_AB")).unwrap();
        assert_eq!(flow.source(), Some(Id::new("Task_A")));
        assert_eq!(flow.target(), None);

        graph.restore(removed).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_remove_takes_label() {
        let mut graph = sample_graph();
        let label = Element::label(
            Id::new("Task_A_label"),
            "label",
            bounds(0.0, 90.0),
            Id::new("Task_A"),
        );
        graph.add(label, Id::new("Process_1"), None).unwrap();
        graph.remove(Id::new("Flow_AB")).unwrap();
        assert_eq!(graph.get(Id::new("Task_A")).unwrap().label_id(), Some(Id::new("Task_A_label")));

        let removed = graph.remove(Id::new("Task_A")).unwrap();
        let ids: Vec<_> = removed.iter().map(|r| r.element().id()).collect();
        assert_eq!(ids, vec![Id::new("Task_A_label"), Id::new("Task_A")]);
        assert!(!graph.contains(Id::new("Task_A_label")));
    }

    #[test]
    fn test_remove_non_empty() {
        let mut graph = sample_graph();
        graph
            .add(
                Element::shape(Id::new("Inner"), "bpmn:Task", bounds(10.0, 10.0)),
                Id::new("Task_A"),
                None,
            )
            .unwrap();
        assert_eq!(graph.remove(Id::new("Task_A")), Err(GraphError::NotEmpty(Id::new("Task_A"))));
        assert_eq!(
            graph.remove(Id::new("Process_1")),
            Err(GraphError::RootElement(Id::new("Process_1")))
        );
    }

    #[test]
    fn test_set_root_moves_children() {
        let mut graph = sample_graph();
        let previous = graph
            .set_root(Element::root(Id::new("Collaboration_1"), "bpmn:Collaboration"))
            .unwrap()
            .unwrap();

        assert_eq!(previous.id(), Id::new("Process_1"));
        assert_eq!(graph.root_id(), Some(Id::new("Collaboration_1")));
        assert_eq!(graph.root().unwrap().children().len(), 3);
        assert_eq!(
            graph.get(Id::new("Task_A")).unwrap().parent(),
            Some(Id::new("Collaboration_1"))
        );

        let shape = Element::shape(Id::new("Shape"), "bpmn:Task", bounds(0.0, 0.0));
        assert_eq!(graph.set_root(shape), Err(GraphError::NotARoot(Id::new("Shape"))));
    }

    #[test]
    fn test_reparent_and_updates() {
        let mut graph = sample_graph();
        let (old_parent, old_index) = graph
            .reparent(Id::new("Task_B"), Id::new("Task_A"), None)
            .unwrap();
        assert_eq!(old_parent, Id::new("Process_1"));
        assert_eq!(old_index, 1);
        assert_eq!(graph.get(Id::new("Task_A")).unwrap().children(), &[Id::new("Task_B")]);

        let old = graph
            .update_bounds(Id::new("Task_A"), bounds(50.0, 50.0))
            .unwrap();
        assert_eq!(old, bounds(0.0, 0.0));

        let old = graph.update_waypoints(Id::new("Flow_AB"), vec![]).unwrap();
        assert_eq!(old.len(), 2);
        assert!(graph.update_waypoints(Id::new("Task_A"), vec![]).is_err());
    }
}
