//! Decorations attached to graph elements.
//!
//! Overlays are not part of the graph: they carry opaque content an
//! external renderer positions relative to an element. The registry keys
//! each overlay to its element and drops it when the element is removed,
//! announcing every removal with an `overlay.removed` event.

use std::fmt;

use indexmap::IndexMap;
use log::debug;

use crate::{
    diagram::Diagram,
    error::GraphError,
    events::{DEFAULT_PRIORITY, EventBus, Payload},
    identifier::Id,
};

/// Opaque overlay handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(usize);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ov-{}", self.0)
    }
}

/// Offsets from the element's edges; unset sides are left to the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlayPosition {
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
}

/// What to show and where.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayDescriptor {
    pub position: OverlayPosition,
    pub html: String,
}

/// A registered overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    id: OverlayId,
    element: Id,
    kind: String,
    descriptor: OverlayDescriptor,
}

impl Overlay {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn element(&self) -> Id {
        self.element
    }

    /// Caller-chosen category, e.g. `badge`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn descriptor(&self) -> &OverlayDescriptor {
        &self.descriptor
    }
}

/// Overlay query; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFilter {
    element: Option<Id>,
    kind: Option<String>,
}

impl OverlayFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, element: Id) -> Self {
        self.element = Some(element);
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    fn matches(&self, overlay: &Overlay) -> bool {
        self.element.is_none_or(|e| e == overlay.element)
            && self.kind.as_deref().is_none_or(|k| k == overlay.kind)
    }
}

/// Selects overlays to remove, by handle or by filter.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlaySelector {
    Id(OverlayId),
    Filter(OverlayFilter),
}

impl From<OverlayId> for OverlaySelector {
    fn from(id: OverlayId) -> Self {
        Self::Id(id)
    }
}

impl From<OverlayFilter> for OverlaySelector {
    fn from(filter: OverlayFilter) -> Self {
        Self::Filter(filter)
    }
}

/// Overlay storage of one diagram session.
#[derive(Debug, Default)]
pub struct Overlays {
    overlays: IndexMap<OverlayId, Overlay>,
    next_id: usize,
}

impl Overlays {
    /// Returns overlays matching `filter` in registration order.
    pub fn get(&self, filter: &OverlayFilter) -> Vec<&Overlay> {
        self.overlays.values().filter(|o| filter.matches(o)).collect()
    }

    pub fn by_id(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    fn insert(&mut self, element: Id, kind: &str, descriptor: OverlayDescriptor) -> OverlayId {
        let id = OverlayId(self.next_id);
        self.next_id += 1;
        self.overlays.insert(
            id,
            Overlay {
                id,
                element,
                kind: kind.to_string(),
                descriptor,
            },
        );
        id
    }

    fn take(&mut self, selector: &OverlaySelector) -> Vec<Overlay> {
        match selector {
            OverlaySelector::Id(id) => self.overlays.shift_remove(id).into_iter().collect(),
            OverlaySelector::Filter(filter) => {
                let ids: Vec<OverlayId> = self
                    .overlays
                    .values()
                    .filter(|o| filter.matches(o))
                    .map(|o| o.id)
                    .collect();
                ids.iter()
                    .filter_map(|id| self.overlays.shift_remove(id))
                    .collect()
            }
        }
    }
}

/// Wires automatic overlay cleanup into a session's event bus.
pub(crate) fn install(events: &mut EventBus<Diagram>) {
    events.on("element.removed", DEFAULT_PRIORITY, |diagram, event| {
        if let Some(element) = event.element() {
            diagram.remove_overlays(OverlayFilter::new().element(element));
        }
    });
}

impl Diagram {
    /// Attaches an overlay to `element` and fires `overlay.added`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownElement`] if the element is not in the graph.
    pub fn add_overlay(
        &mut self,
        element: Id,
        kind: &str,
        descriptor: OverlayDescriptor,
    ) -> Result<OverlayId, GraphError> {
        if !self.graph().contains(element) {
            return Err(GraphError::UnknownElement(element));
        }
        let id = self.overlays.insert(element, kind, descriptor);
        debug!(overlay:% = id, element:% = element, kind; "Overlay added");
        self.fire(
            "overlay.added",
            Payload::Overlay {
                id,
                element,
                kind: kind.to_string(),
            },
        );
        Ok(id)
    }

    /// Removes the selected overlays, firing `overlay.removed` for each.
    ///
    /// Returns the number of overlays removed.
    pub fn remove_overlays(&mut self, selector: impl Into<OverlaySelector>) -> usize {
        let removed = self.overlays.take(&selector.into());
        for overlay in &removed {
            debug!(overlay:% = overlay.id, element:% = overlay.element; "Overlay removed");
            self.fire(
                "overlay.removed",
                Payload::Overlay {
                    id: overlay.id,
                    element: overlay.element,
                    kind: overlay.kind.clone(),
                },
            );
        }
        removed.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        geometry::{Bounds, Point, Size},
        graph::Element,
    };

    fn diagram() -> Diagram {
        let mut diagram = Diagram::new();
        diagram
            .set_root(Element::root(Id::new("Process_1"), "bpmn:Process"))
            .unwrap();
        let bounds = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(36.0, 36.0));
        diagram
            .add_element(
                Element::shape(Id::new("StartEvent_1"), "bpmn:StartEvent", bounds),
                Id::new("Process_1"),
                None,
            )
            .unwrap();
        diagram
            .add_element(
                Element::shape(Id::new("Task_1"), "bpmn:Task", bounds),
                Id::new("Process_1"),
                None,
            )
            .unwrap();
        diagram
    }

    #[test]
    fn test_add_unknown_element() {
        let mut diagram = diagram();
        let result = diagram.add_overlay(Id::new("Nope"), "badge", OverlayDescriptor::default());
        assert_eq!(result, Err(GraphError::UnknownElement(Id::new("Nope"))));
    }

    #[test]
    fn test_get_by_filter() {
        let mut diagram = diagram();
        let start = Id::new("StartEvent_1");
        let task = Id::new("Task_1");
        let a = diagram.add_overlay(start, "badge", OverlayDescriptor::default()).unwrap();
        let b = diagram.add_overlay(start, "note", OverlayDescriptor::default()).unwrap();
        let c = diagram.add_overlay(task, "badge", OverlayDescriptor::default()).unwrap();

        let ids = |filter: OverlayFilter| -> Vec<OverlayId> {
            diagram.overlays().get(&filter).iter().map(|o| o.id()).collect()
        };
        assert_eq!(ids(OverlayFilter::new()), vec![a, b, c]);
        assert_eq!(ids(OverlayFilter::new().element(start)), vec![a, b]);
        assert_eq!(ids(OverlayFilter::new().kind("badge")), vec![a, c]);
        assert_eq!(ids(OverlayFilter::new().element(task).kind("note")), vec![]);
    }

    #[test]
    fn test_remove_by_id_and_filter() {
        let mut diagram = diagram();
        let start = Id::new("StartEvent_1");
        let a = diagram.add_overlay(start, "badge", OverlayDescriptor::default()).unwrap();
        diagram.add_overlay(start, "note", OverlayDescriptor::default()).unwrap();
        diagram.add_overlay(start, "note", OverlayDescriptor::default()).unwrap();

        assert_eq!(diagram.remove_overlays(a), 1);
        assert_eq!(diagram.remove_overlays(a), 0);
        assert_eq!(diagram.remove_overlays(OverlayFilter::new().kind("note")), 2);
        assert!(diagram.overlays().is_empty());
    }

    #[test]
    fn test_element_removal_drops_overlays() {
        let mut diagram = diagram();
        let start = Id::new("StartEvent_1");
        diagram.add_overlay(start, "badge", OverlayDescriptor::default()).unwrap();
        diagram.add_overlay(start, "note", OverlayDescriptor::default()).unwrap();
        diagram
            .add_overlay(Id::new("Task_1"), "badge", OverlayDescriptor::default())
            .unwrap();

        let removed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&removed);
        diagram.on("overlay.removed", DEFAULT_PRIORITY, move |_, e| {
            sink.borrow_mut().push(e.element())
        });

        diagram.remove_element(start).unwrap();

        assert_eq!(*removed.borrow(), vec![Some(start), Some(start)]);
        assert_eq!(diagram.overlays().len(), 1);
    }

    #[test]
    fn test_labelled_removal_drops_overlays() {
        let mut diagram = diagram();
        let task = Id::new("Task_1");
        let label = Id::new("Task_1_label");
        let bounds = Bounds::new_from_top_left(Point::new(0.0, 90.0), Size::new(90.0, 20.0));
        diagram
            .add_element(Element::label(label, "label", bounds, task), Id::new("Process_1"), None)
            .unwrap();
        diagram.add_overlay(task, "badge", OverlayDescriptor::default()).unwrap();
        diagram.add_overlay(task, "note", OverlayDescriptor::default()).unwrap();
        diagram.add_overlay(label, "badge", OverlayDescriptor::default()).unwrap();

        let removed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&removed);
        diagram.on("overlay.removed", DEFAULT_PRIORITY, move |_, e| {
            sink.borrow_mut().push(e.element())
        });

        diagram.remove_element(task).unwrap();

        assert!(!diagram.graph().contains(label));
        assert_eq!(*removed.borrow(), vec![Some(label), Some(task), Some(task)]);
        assert!(diagram.overlays().is_empty());
    }

    #[test]
    fn test_clear_announces_overlays() {
        let mut diagram = diagram();
        diagram
            .add_overlay(Id::new("StartEvent_1"), "badge", OverlayDescriptor::default())
            .unwrap();
        diagram
            .add_overlay(Id::new("Task_1"), "badge", OverlayDescriptor::default())
            .unwrap();

        let removed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&removed);
        diagram.on("overlay.removed", DEFAULT_PRIORITY, move |diagram, e| {
            let present = e.element().is_some_and(|id| diagram.graph().contains(id));
            sink.borrow_mut().push((e.element(), present))
        });

        diagram.clear();

        assert_eq!(
            *removed.borrow(),
            vec![
                (Some(Id::new("StartEvent_1")), true),
                (Some(Id::new("Task_1")), true),
            ]
        );
        assert!(diagram.overlays().is_empty());
        assert!(diagram.graph().is_empty());
    }
}
