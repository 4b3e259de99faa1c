use std::any::Any;

use log::debug;

use planum_core::{
    Diagram,
    command::{CommandHandler, context, context_mut},
    error::{CommandError, GraphError},
    geometry::{Bounds, Point, Size},
    graph::ElementKind,
    identifier::Id,
    semantic::{Family, default_size, family},
};

use super::{
    CREATE_CONNECTION, CREATE_SHAPE, CreateConnectionContext, CreateShapeContext,
    ShapeDescriptor, ids, rules,
};

/// Horizontal gap between a flow node and the one appended after it.
const FLOW_GAP: f32 = 80.0;
/// Vertical gap between a shape and an annotation placed above it.
const ANNOTATION_GAP: f32 = 50.0;
/// Vertical gap between a shape and a data reference placed below it.
const DATA_GAP: f32 = 40.0;

/// Context of `shape.append`.
#[derive(Debug, Clone)]
pub struct AppendShapeContext {
    source: Id,
    shape: ShapeDescriptor,
    parent: Option<Id>,
    position: Option<Point>,
    connection: Option<Id>,
}

impl AppendShapeContext {
    /// Appends `shape` to `source`. The descriptor must carry an id.
    pub fn new(source: Id, shape: ShapeDescriptor) -> Self {
        Self {
            source,
            shape,
            parent: None,
            position: None,
            connection: None,
        }
    }

    pub fn with_parent(mut self, parent: Id) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Overrides the computed centre of the new shape.
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn shape(&self) -> &ShapeDescriptor {
        &self.shape
    }

    /// The connection created to the new shape, if the rules allowed one.
    pub fn connection(&self) -> Option<Id> {
        self.connection
    }
}

/// Creates a shape next to an existing one and connects the two.
///
/// The work happens in nested `shape.create` and `connection.create`
/// commands, so one undo reverts both.
pub struct AppendShapeHandler;

/// Centre of a shape of `type_name` and `size` appended to `source`.
fn append_position(source: Bounds, type_name: &str, size: Size) -> Point {
    let (w, h) = (size.width(), size.height());
    match family(type_name) {
        Family::Artifact => Point::new(
            source.max_x() + w / 2.0,
            source.min_y() - ANNOTATION_GAP - h / 2.0,
        ),
        Family::DataReference => Point::new(
            source.max_x() - 10.0 + w / 2.0,
            source.max_y() + DATA_GAP + h / 2.0,
        ),
        _ => Point::new(source.max_x() + FLOW_GAP + w / 2.0, source.center().y()),
    }
}

impl CommandHandler for AppendShapeHandler {
    fn can_execute(&self, diagram: &Diagram, ctx: &dyn Any) -> bool {
        let Ok(ctx) = context::<AppendShapeContext>(ctx) else {
            return false;
        };
        ctx.shape.id().is_some()
            && diagram
                .element(ctx.source)
                .is_some_and(|source| source.kind() == ElementKind::Shape)
    }

    fn pre_execute(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<(), CommandError> {
        let ctx = context_mut::<AppendShapeContext>(ctx)?;
        let source = diagram
            .element(ctx.source)
            .ok_or(GraphError::UnknownElement(ctx.source))?;
        let source_bounds = source
            .bounds()
            .ok_or(GraphError::MissingField(ctx.source, "bounds"))?;
        let parent = match ctx.parent {
            Some(parent) => parent,
            None => source
                .parent()
                .ok_or(GraphError::MissingField(ctx.source, "parent"))?,
        };

        let type_name = ctx.shape.type_name();
        let size = ctx.shape.size().unwrap_or_else(|| default_size(type_name));
        let position = ctx
            .position
            .unwrap_or_else(|| append_position(source_bounds, type_name, size));
        ctx.parent = Some(parent);
        ctx.position = Some(position);

        diagram.execute(
            CREATE_SHAPE,
            CreateShapeContext::new(ctx.shape.clone().with_size(size), position, parent),
        )?;
        Ok(())
    }

    fn execute(&self, _diagram: &mut Diagram, _ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        Ok(Vec::new())
    }

    fn post_execute(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<(), CommandError> {
        let ctx = context_mut::<AppendShapeContext>(ctx)?;
        let Some(target) = ctx.shape.id() else {
            return Ok(());
        };

        let connected = diagram.element(ctx.source).is_some_and(|source| {
            source
                .outgoing()
                .iter()
                .any(|c| diagram.element(*c).and_then(|c| c.target()) == Some(target))
        });
        if connected {
            return Ok(());
        }
        let Some(type_name) = rules::connection_type(diagram, ctx.source, target) else {
            debug!(source:% = ctx.source, target:% = target; "Appended shape left unconnected");
            return Ok(());
        };

        let id = ids::next_id(diagram, type_name);
        ctx.connection = Some(id);
        diagram.execute(
            CREATE_CONNECTION,
            CreateConnectionContext::new(ctx.source, target)
                .with_type(type_name)
                .with_id(id),
        )?;
        Ok(())
    }

    fn revert(&self, _diagram: &mut Diagram, _ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::modeling::{APPEND_SHAPE, test_support::{diagram, id}};

    fn append(diagram: &mut Diagram, source: &str, type_name: &str, new_id: &str) -> AppendShapeContext {
        let context = AppendShapeContext::new(
            id(source),
            ShapeDescriptor::new(type_name).with_id(id(new_id)),
        );
        assert!(diagram.execute(APPEND_SHAPE, context.clone()).unwrap());
        context
    }

    #[test]
    fn test_append_task() {
        let mut diagram = diagram();
        append(&mut diagram, "Task_1", "bpmn:Task", "Task_2");

        let bounds = diagram.element(id("Task_2")).unwrap().bounds().unwrap();
        assert_approx_eq!(f32, bounds.center().x(), 430.0);
        assert_approx_eq!(f32, bounds.center().y(), 118.0);

        let flow = diagram.element(id("SequenceFlow_2")).unwrap();
        assert_eq!(flow.source(), Some(id("Task_1")));
        assert_eq!(flow.target(), Some(id("Task_2")));

        let entry = diagram.commands().entry_commands(0).unwrap();
        assert_eq!(entry, vec![CREATE_SHAPE, APPEND_SHAPE, CREATE_CONNECTION]);

        diagram.undo().unwrap();
        assert!(diagram.element(id("Task_2")).is_none());
        assert!(diagram.element(id("SequenceFlow_2")).is_none());

        diagram.redo().unwrap();
        assert!(diagram.element(id("Task_2")).is_some());
        assert!(diagram.element(id("SequenceFlow_2")).is_some());
    }

    #[test]
    fn test_append_annotation() {
        let mut diagram = diagram();
        append(&mut diagram, "Task_1", "bpmn:TextAnnotation", "TextAnnotation_1");

        let bounds = diagram.element(id("TextAnnotation_1")).unwrap().bounds().unwrap();
        assert_approx_eq!(f32, bounds.min_x(), 300.0);
        assert_approx_eq!(f32, bounds.max_y(), 28.0);

        let association = diagram.element(id("Association_1")).unwrap();
        assert_eq!(association.type_name(), "bpmn:Association");
        let model = diagram.model();
        let process = model.by_id("Process_1").unwrap();
        let node = model.by_id("Association_1").unwrap();
        assert!(model.collection(process, "artifacts").contains(&node));
    }

    #[test]
    fn test_append_to_end_event_stays_unconnected() {
        let mut diagram = diagram();
        append(&mut diagram, "EndEvent_1", "bpmn:Task", "Task_2");
        assert!(diagram.element(id("Task_2")).is_some());
        assert!(diagram.element(id("EndEvent_1")).unwrap().outgoing().is_empty());
    }

    #[test]
    fn test_refused_create_rolls_back() {
        let mut diagram = diagram();
        let context = AppendShapeContext::new(
            id("Task_1"),
            ShapeDescriptor::new("bpmn:Lane").with_id(id("Lane_1")),
        );
        let err = diagram.execute(APPEND_SHAPE, context).unwrap_err();
        assert_eq!(err, CommandError::NotAllowed(CREATE_SHAPE.to_string()));
        assert!(diagram.element(id("Lane_1")).is_none());
        assert!(!diagram.can_undo());
    }
}
