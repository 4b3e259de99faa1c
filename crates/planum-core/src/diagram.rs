//! The diagram session.
//!
//! A [`Diagram`] owns exactly one element graph, event bus, command stack,
//! overlay registry and semantic tree. All graph mutations that should be
//! observable go through its methods, which fire the lifecycle events:
//!
//! - `<kind>.add` before and `<kind>.added`, `element.added` after an insertion,
//! - `<kind>.remove` before and `<kind>.removed`, `element.removed` after a
//!   removal (a removed element's label is announced first),
//! - `root.set` after the root changed,
//! - `diagram.clear` before the session is emptied.
//!
//! `<kind>` is one of `root`, `shape`, `connection` or `label`.

use std::any::Any;

use crate::{
    command::{self, CommandStack},
    error::{CommandError, GraphError},
    events::{Event, EventBus, EventSource, ListenerId, Payload},
    geometry::{Bounds, Point},
    graph::{Element, ElementGraph, RemovedElement},
    identifier::Id,
    overlays::{self, OverlayFilter, Overlays},
    semantic::ModelTree,
};

/// One diagram editing session.
#[derive(Debug)]
pub struct Diagram {
    graph: ElementGraph,
    events: EventBus<Diagram>,
    pub(crate) commands: CommandStack,
    pub(crate) overlays: Overlays,
    model: ModelTree,
}

impl EventSource for Diagram {
    fn events(&self) -> &EventBus<Self> {
        &self.events
    }
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    /// Creates an empty session with unlimited undo history.
    pub fn new() -> Self {
        Self::with_history_limit(0)
    }

    /// Creates an empty session keeping at most `max_entries` undo entries.
    pub fn with_history_limit(max_entries: usize) -> Self {
        let mut events = EventBus::new();
        overlays::install(&mut events);
        Self {
            graph: ElementGraph::new(),
            events,
            commands: CommandStack::with_max_entries(max_entries),
            overlays: Overlays::default(),
            model: ModelTree::new(),
        }
    }

    pub fn graph(&self) -> &ElementGraph {
        &self.graph
    }

    pub fn element(&self, id: Id) -> Option<&Element> {
        self.graph.get(id)
    }

    pub fn model(&self) -> &ModelTree {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ModelTree {
        &mut self.model
    }

    /// Replaces the semantic tree, returning the previous one.
    pub fn set_model(&mut self, model: ModelTree) -> ModelTree {
        std::mem::replace(&mut self.model, model)
    }

    pub fn commands(&self) -> &CommandStack {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandStack {
        &mut self.commands
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn events_mut(&mut self) -> &mut EventBus<Diagram> {
        &mut self.events
    }

    /// Subscribes to `event`. See [`EventBus::on`].
    pub fn on(
        &mut self,
        event: &str,
        priority: i32,
        callback: impl Fn(&mut Diagram, &mut Event) + 'static,
    ) -> ListenerId {
        self.events.on(event, priority, callback)
    }

    pub fn off(&mut self, listener: ListenerId) -> bool {
        self.events.off(listener)
    }

    /// Fires `name` with `payload`; returns false if a listener prevented
    /// the default action.
    pub fn fire(&mut self, name: &str, payload: Payload) -> bool {
        EventBus::fire(self, name, &mut Event::new(payload))
    }

    /// Installs the root element and fires `root.set`.
    pub fn set_root(&mut self, root: Element) -> Result<(), GraphError> {
        let id = root.id();
        self.graph.set_root(root)?;
        self.fire("root.set", Payload::Element(id));
        Ok(())
    }

    /// Inserts `element` under `parent`, announcing it on the event bus.
    ///
    /// # Errors
    ///
    /// Propagates the [`ElementGraph::add`] errors; nothing is inserted and
    /// no `added` event is fired in that case.
    pub fn add_element(
        &mut self,
        element: Element,
        parent: Id,
        index: Option<usize>,
    ) -> Result<Id, GraphError> {
        let id = element.id();
        let kind = element.kind().as_str();
        self.fire(&format!("{kind}.add"), Payload::Element(id));
        self.graph.add(element, parent, index)?;
        self.fire_added(kind, id);
        Ok(id)
    }

    /// Removes an element (and its label), announcing both.
    ///
    /// The returned records restore the removal through
    /// [`Diagram::restore_elements`].
    pub fn remove_element(&mut self, id: Id) -> Result<Vec<RemovedElement>, GraphError> {
        let element = self.graph.get(id).ok_or(GraphError::UnknownElement(id))?;
        let mut announced = Vec::new();
        if let Some(label) = element.label_id().and_then(|l| self.graph.get(l)) {
            announced.push((label.kind().as_str(), label.id()));
        }
        announced.push((element.kind().as_str(), id));

        for (kind, target) in &announced {
            self.fire(&format!("{kind}.remove"), Payload::Element(*target));
        }
        let removed = self.graph.remove(id)?;
        for record in &removed {
            let element = record.element();
            let kind = element.kind().as_str();
            self.fire(&format!("{kind}.removed"), Payload::Element(element.id()));
            self.fire("element.removed", Payload::Element(element.id()));
        }
        Ok(removed)
    }

    /// Undoes a [`Diagram::remove_element`], re-announcing the elements.
    pub fn restore_elements(&mut self, removed: Vec<RemovedElement>) -> Result<Vec<Id>, GraphError> {
        let restored = self.graph.restore(removed)?;
        for id in &restored {
            if let Some(kind) = self.graph.get(*id).map(|e| e.kind().as_str()) {
                self.fire_added(kind, *id);
            }
        }
        Ok(restored)
    }

    fn fire_added(&mut self, kind: &str, id: Id) {
        self.fire(&format!("{kind}.added"), Payload::Element(id));
        self.fire("element.added", Payload::Element(id));
    }

    /// See [`ElementGraph::update_bounds`].
    pub fn update_bounds(&mut self, id: Id, bounds: Bounds) -> Result<Bounds, GraphError> {
        self.graph.update_bounds(id, bounds)
    }

    /// See [`ElementGraph::update_waypoints`].
    pub fn update_waypoints(&mut self, id: Id, waypoints: Vec<Point>) -> Result<Vec<Point>, GraphError> {
        self.graph.update_waypoints(id, waypoints)
    }

    /// See [`ElementGraph::reparent`].
    pub fn reparent(&mut self, id: Id, parent: Id, index: Option<usize>) -> Result<(Id, usize), GraphError> {
        self.graph.reparent(id, parent, index)
    }

    /// Executes a registered command.
    ///
    /// Returns `Ok(false)` if a top-level command was refused by its
    /// `canExecute` check.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NoHandler`] for unknown commands.
    /// - [`CommandError::NotAllowed`] if a nested command was refused.
    /// - Any error raised by the handlers; the execution is rolled back first.
    pub fn execute<T: Any>(&mut self, command: &str, context: T) -> Result<bool, CommandError> {
        command::execute(self, command, Box::new(context))
    }

    /// Reverts the most recent entry. Returns `Ok(false)` at the bottom of
    /// the stack.
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        command::undo(self)
    }

    /// Re-applies the next entry. Returns `Ok(false)` at the top of the stack.
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        command::redo(self)
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    /// Empties graph, overlays and history after firing `diagram.clear`.
    ///
    /// Overlays go first, each announced with `overlay.removed` while its
    /// element is still in the graph.
    pub fn clear(&mut self) {
        self.fire("diagram.clear", Payload::Empty);
        self.remove_overlays(OverlayFilter::new());
        self.graph.clear();
        self.commands.clear();
    }
}
