//! Undoable structural edits.
//!
//! Every edit is a command registered on the session's command stack:
//!
//! | command               | context                     | effect                                      |
//! |-----------------------|-----------------------------|---------------------------------------------|
//! | `shape.create`        | [`CreateShapeContext`]      | new shape plus semantic node                |
//! | `connection.create`   | [`CreateConnectionContext`] | new connection wired into both models       |
//! | `shape.append`        | [`AppendShapeContext`]      | new shape next to a source, connected to it |
//! | `shape.move`          | [`MoveShapeContext`]        | moves a shape with its content, may reparent |
//! | `shape.resize`        | [`ResizeShapeContext`]      | replaces a shape's bounds                   |
//! | `element.updateLabel` | [`UpdateLabelContext`]      | changes label text, adds or drops the label |
//!
//! [`Modeling`] wraps them in typed calls. Semantic ownership of new nodes
//! is decided by a [`ContainmentStrategy`]; allowed connections by
//! [`rules::connection_type`].

mod append_shape;
pub mod containment;
mod create_connection;
mod create_shape;
pub mod ids;
mod move_shape;
mod resize_shape;
pub mod rules;
mod update_label;

use std::{any::Any, rc::Rc};

use thiserror::Error;

use planum_core::{
    Diagram,
    command::CommandStack,
    error::CommandError,
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

pub use append_shape::{AppendShapeContext, AppendShapeHandler};
pub use containment::{ContainmentStrategy, ProcessContainment};
pub use create_connection::{CreateConnectionContext, CreateConnectionHandler};
pub use create_shape::{CreateShapeContext, CreateShapeHandler};
pub use move_shape::{MoveShapeContext, MoveShapeHandler};
pub use resize_shape::{ResizeShapeContext, ResizeShapeHandler};
pub use update_label::{UpdateLabelContext, UpdateLabelHandler};

pub const CREATE_SHAPE: &str = "shape.create";
pub const CREATE_CONNECTION: &str = "connection.create";
pub const APPEND_SHAPE: &str = "shape.append";
pub const MOVE_SHAPE: &str = "shape.move";
pub const RESIZE_SHAPE: &str = "shape.resize";
pub const UPDATE_LABEL: &str = "element.updateLabel";

/// Errors surfaced by [`Modeling`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelingError {
    #[error("command <{0}> was refused")]
    Refused(&'static str),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Partial description of a shape to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDescriptor {
    type_name: String,
    id: Option<Id>,
    size: Option<Size>,
}

impl ShapeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            size: None,
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn id(&self) -> Option<Id> {
        self.id
    }

    pub fn size(&self) -> Option<Size> {
        self.size
    }
}

/// Registers the modeling commands on `commands`.
///
/// # Errors
///
/// Returns [`CommandError::DuplicateHandler`] if one of the names is taken.
pub fn register(
    commands: &mut CommandStack,
    containment: Rc<dyn ContainmentStrategy>,
    label_size: Size,
) -> Result<(), CommandError> {
    commands.register_handler(CREATE_SHAPE, CreateShapeHandler::new(Rc::clone(&containment)))?;
    commands.register_handler(
        CREATE_CONNECTION,
        CreateConnectionHandler::new(Rc::clone(&containment)),
    )?;
    commands.register_handler(APPEND_SHAPE, AppendShapeHandler)?;
    commands.register_handler(MOVE_SHAPE, MoveShapeHandler::new(containment))?;
    commands.register_handler(RESIZE_SHAPE, ResizeShapeHandler)?;
    commands.register_handler(UPDATE_LABEL, UpdateLabelHandler::new(label_size))?;
    Ok(())
}

/// Typed entry points for the modeling commands of one session.
///
/// The commands must have been [`register`]ed on the session first.
pub struct Modeling<'a> {
    diagram: &'a mut Diagram,
}

impl<'a> Modeling<'a> {
    pub fn new(diagram: &'a mut Diagram) -> Self {
        Self { diagram }
    }

    fn run<T: Any>(&mut self, command: &'static str, context: T) -> Result<(), ModelingError> {
        if self.diagram.execute(command, context)? {
            Ok(())
        } else {
            Err(ModelingError::Refused(command))
        }
    }

    fn shape_id(&self, shape: &ShapeDescriptor) -> Id {
        shape
            .id()
            .unwrap_or_else(|| ids::next_id(self.diagram, shape.type_name()))
    }

    /// Creates a shape centred on `position` inside `parent`.
    pub fn create_shape(
        &mut self,
        shape: ShapeDescriptor,
        position: Point,
        parent: Id,
    ) -> Result<Id, ModelingError> {
        let id = self.shape_id(&shape);
        self.run(
            CREATE_SHAPE,
            CreateShapeContext::new(shape.with_id(id), position, parent),
        )?;
        Ok(id)
    }

    /// Creates a shape next to `source` and connects the two.
    ///
    /// Without an explicit `parent` the shape joins the source's parent.
    pub fn append_shape(
        &mut self,
        source: Id,
        shape: ShapeDescriptor,
        parent: Option<Id>,
    ) -> Result<Id, ModelingError> {
        let id = self.shape_id(&shape);
        let mut context = AppendShapeContext::new(source, shape.with_id(id));
        if let Some(parent) = parent {
            context = context.with_parent(parent);
        }
        self.run(APPEND_SHAPE, context)?;
        Ok(id)
    }

    /// Connects two elements with the connection type the rules allow.
    pub fn connect(&mut self, source: Id, target: Id) -> Result<Id, ModelingError> {
        let type_name = rules::connection_type(self.diagram, source, target)
            .ok_or(ModelingError::Refused(CREATE_CONNECTION))?;
        let id = ids::next_id(self.diagram, type_name);
        self.run(
            CREATE_CONNECTION,
            CreateConnectionContext::new(source, target)
                .with_type(type_name)
                .with_id(id),
        )?;
        Ok(id)
    }

    /// Moves `shape` by `delta`, optionally into `new_parent`.
    pub fn move_shape(
        &mut self,
        shape: Id,
        delta: Point,
        new_parent: Option<Id>,
    ) -> Result<(), ModelingError> {
        let mut context = MoveShapeContext::new(shape, delta);
        if let Some(parent) = new_parent {
            context = context.with_new_parent(parent);
        }
        self.run(MOVE_SHAPE, context)
    }

    pub fn resize_shape(&mut self, shape: Id, bounds: Bounds) -> Result<(), ModelingError> {
        self.run(RESIZE_SHAPE, ResizeShapeContext::new(shape, bounds))
    }

    /// Sets the label text of `element`; `None` or blank text clears it.
    pub fn update_label(&mut self, element: Id, text: Option<&str>) -> Result<(), ModelingError> {
        self.run(
            UPDATE_LABEL,
            UpdateLabelContext::new(element, text.map(str::to_string)),
        )
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::rc::Rc;

    use planum_core::{Diagram, geometry::Size, identifier::Id};

    use super::{ProcessContainment, register};
    use crate::{config::ImportConfig, import::Importer};

    pub(crate) const PROCESS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
    xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI"
    xmlns:dc="http://www.omg.org/spec/DD/20100524/DC"
    xmlns:di="http://www.omg.org/spec/DD/20100524/DI" id="Definitions_1">
  <bpmn:process id="Process_1">
    <bpmn:startEvent id="StartEvent_1" name="Start" />
    <bpmn:task id="Task_1" name="Review" />
    <bpmn:endEvent id="EndEvent_1" />
    <bpmn:sequenceFlow id="SequenceFlow_1" sourceRef="StartEvent_1" targetRef="Task_1" />
  </bpmn:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1">
      <bpmndi:BPMNShape id="StartEvent_1_di" bpmnElement="StartEvent_1">
        <dc:Bounds x="100" y="100" width="36" height="36" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Task_1_di" bpmnElement="Task_1">
        <dc:Bounds x="200" y="78" width="100" height="80" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="EndEvent_1_di" bpmnElement="EndEvent_1">
        <dc:Bounds x="400" y="100" width="36" height="36" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNEdge id="SequenceFlow_1_di" bpmnElement="SequenceFlow_1">
        <di:waypoint x="136" y="118" />
        <di:waypoint x="200" y="118" />
      </bpmndi:BPMNEdge>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>"#;

    pub(crate) fn id(name: &str) -> Id {
        Id::new(name)
    }

    /// Imports [`PROCESS`] into a session with the modeling commands registered.
    pub(crate) fn diagram() -> Diagram {
        let mut diagram = Diagram::new();
        diagram.set_model(planum_parser::parse(PROCESS).unwrap().into_parts().0);
        let config = ImportConfig::default();
        Importer::new(&mut diagram, &config).run().unwrap();
        register(
            diagram.commands_mut(),
            Rc::new(ProcessContainment),
            Size::new(90.0, 20.0),
        )
        .unwrap();
        diagram
    }
}
