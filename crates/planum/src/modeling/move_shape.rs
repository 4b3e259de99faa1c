use std::{any::Any, rc::Rc};

use indexmap::IndexSet;
use log::debug;

use planum_core::{
    Diagram,
    command::{CommandHandler, context, context_mut},
    error::{CommandError, GraphError},
    geometry::{Bounds, Point},
    graph::{Element, ElementKind},
    identifier::Id,
    semantic::{Detached, ModelRef},
};

use super::ContainmentStrategy;

/// Context of `shape.move`.
#[derive(Debug, Clone)]
pub struct MoveShapeContext {
    shape: Id,
    delta: Point,
    new_parent: Option<Id>,
    old_bounds: Vec<(Id, Bounds)>,
    old_waypoints: Vec<(Id, Vec<Point>)>,
    old_parents: Vec<(Id, Id, usize)>,
    old_owner: Option<(ModelRef, Detached)>,
}

impl MoveShapeContext {
    pub fn new(shape: Id, delta: Point) -> Self {
        Self {
            shape,
            delta,
            new_parent: None,
            old_bounds: Vec::new(),
            old_waypoints: Vec::new(),
            old_parents: Vec::new(),
            old_owner: None,
        }
    }

    pub fn with_new_parent(mut self, parent: Id) -> Self {
        self.new_parent = Some(parent);
        self
    }

    pub fn shape(&self) -> Id {
        self.shape
    }

    pub fn delta(&self) -> Point {
        self.delta
    }

    fn clear_records(&mut self) {
        self.old_bounds.clear();
        self.old_waypoints.clear();
        self.old_parents.clear();
        self.old_owner = None;
    }
}

/// Moves a shape with everything drawn inside it.
///
/// Labels travel with their targets. Connections between two moved
/// elements are translated as a whole; connections leaving the moved set
/// only have their attached end shifted. With a new parent the shape is
/// reparented in the graph and its semantic node handed to the owner the
/// containment strategy picks.
pub struct MoveShapeHandler {
    containment: Rc<dyn ContainmentStrategy>,
}

impl MoveShapeHandler {
    pub fn new(containment: Rc<dyn ContainmentStrategy>) -> Self {
        Self { containment }
    }

    fn new_owner(
        &self,
        diagram: &Diagram,
        shape: &Element,
        parent: Id,
    ) -> Option<Option<(ModelRef, &'static str)>> {
        let Some(business_object) = shape.business_object() else {
            return Some(None);
        };
        let parent = diagram.element(parent)?.business_object()?;
        self.containment
            .semantic_parent(diagram.model(), parent, diagram.model().type_name(business_object))
            .map(Some)
    }
}

/// Returns true if `candidate` is `ancestor` or lies inside it.
fn is_within(diagram: &Diagram, candidate: Id, ancestor: Id) -> bool {
    std::iter::successors(Some(candidate), |id| diagram.element(*id).and_then(Element::parent))
        .any(|id| id == ancestor)
}

/// The shape, everything below it and the labels of all of them.
fn moved_set(diagram: &Diagram, shape: Id) -> IndexSet<Id> {
    let mut moved = IndexSet::new();
    let mut pending = vec![shape];
    while let Some(id) = pending.pop() {
        let Some(element) = diagram.element(id) else {
            continue;
        };
        moved.insert(id);
        if let Some(label) = element.label_id() {
            moved.insert(label);
        }
        pending.extend(element.children().iter().rev().copied());
    }
    moved
}

impl CommandHandler for MoveShapeHandler {
    fn can_execute(&self, diagram: &Diagram, ctx: &dyn Any) -> bool {
        let Ok(ctx) = context::<MoveShapeContext>(ctx) else {
            return false;
        };
        let Some(shape) = diagram.element(ctx.shape) else {
            return false;
        };
        if shape.kind() != ElementKind::Shape {
            return false;
        }
        match ctx.new_parent {
            Some(parent) if shape.parent() != Some(parent) => {
                diagram.element(parent).is_some_and(|p| {
                    matches!(p.kind(), ElementKind::Root | ElementKind::Shape)
                }) && !is_within(diagram, parent, ctx.shape)
                    && self.new_owner(diagram, shape, parent).is_some()
            }
            _ => true,
        }
    }

    fn execute(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context_mut::<MoveShapeContext>(ctx)?;
        ctx.clear_records();
        let delta = ctx.delta;

        let moved = moved_set(diagram, ctx.shape);
        let mut connections = IndexSet::new();
        for id in &moved {
            let element = diagram.element(*id).ok_or(GraphError::UnknownElement(*id))?;
            connections.extend(
                element
                    .incoming()
                    .iter()
                    .chain(element.outgoing())
                    .filter(|c| !moved.contains(*c))
                    .copied(),
            );
        }

        for id in &moved {
            let element = diagram.element(*id).ok_or(GraphError::UnknownElement(*id))?;
            if let Some(bounds) = element.bounds() {
                let old = diagram.update_bounds(*id, bounds.translate(delta))?;
                ctx.old_bounds.push((*id, old));
            } else if element.kind() == ElementKind::Connection {
                let waypoints = element.waypoints().iter().map(|p| p.add_point(delta)).collect();
                let old = diagram.update_waypoints(*id, waypoints)?;
                ctx.old_waypoints.push((*id, old));
            }
        }

        let mut changed: Vec<Id> = moved.iter().copied().collect();
        for id in connections {
            let connection = diagram.element(id).ok_or(GraphError::UnknownElement(id))?;
            let source_moved = connection.source().is_some_and(|s| moved.contains(&s));
            let target_moved = connection.target().is_some_and(|t| moved.contains(&t));
            let mut waypoints = connection.waypoints().to_vec();
            let label = connection.label_id();
            if source_moved && target_moved {
                waypoints.iter_mut().for_each(|p| *p = p.add_point(delta));
                if let Some(label) = label {
                    let bounds = diagram
                        .element(label)
                        .and_then(Element::bounds)
                        .ok_or(GraphError::MissingField(label, "bounds"))?;
                    let old = diagram.update_bounds(label, bounds.translate(delta))?;
                    ctx.old_bounds.push((label, old));
                }
            } else {
                if let (true, Some(first)) = (source_moved, waypoints.first_mut()) {
                    *first = first.add_point(delta);
                }
                if let (true, Some(last)) = (target_moved, waypoints.last_mut()) {
                    *last = last.add_point(delta);
                }
            }
            let old = diagram.update_waypoints(id, waypoints)?;
            ctx.old_waypoints.push((id, old));
            changed.push(id);
        }

        let shape = diagram.element(ctx.shape).ok_or(GraphError::UnknownElement(ctx.shape))?;
        if let Some(parent) = ctx.new_parent.filter(|p| shape.parent() != Some(*p)) {
            let owner = self
                .new_owner(diagram, shape, parent)
                .ok_or_else(|| CommandError::NotAllowed(super::MOVE_SHAPE.to_string()))?;
            let business_object = shape.business_object();
            let label = shape.label_id();

            let (old_parent, old_index) = diagram.reparent(ctx.shape, parent, None)?;
            ctx.old_parents.push((ctx.shape, old_parent, old_index));
            if let Some(label) = label {
                let (old_parent, old_index) = diagram.reparent(label, parent, None)?;
                ctx.old_parents.push((label, old_parent, old_index));
            }
            if let (Some(node), Some((owner, collection))) = (business_object, owner) {
                let model = diagram.model_mut();
                if let Some(detached) = model.detach(node) {
                    ctx.old_owner = Some((node, detached));
                }
                model.attach(owner, collection, node, None);
            }
            changed.extend([old_parent, parent]);
        }

        debug!(
            shape:% = ctx.shape,
            dx = delta.x(),
            dy = delta.y(),
            elements = changed.len();
            "Moved shape"
        );
        Ok(changed)
    }

    fn revert(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context::<MoveShapeContext>(ctx)?;
        let mut changed = Vec::new();

        if let Some((node, detached)) = &ctx.old_owner {
            let model = diagram.model_mut();
            model.detach(*node);
            model.attach(detached.parent, &detached.collection, *node, Some(detached.index));
        }
        for (id, parent, index) in ctx.old_parents.iter().rev() {
            diagram.reparent(*id, *parent, Some(*index))?;
            changed.push(*parent);
        }
        for (id, waypoints) in ctx.old_waypoints.iter().rev() {
            diagram.update_waypoints(*id, waypoints.clone())?;
            changed.push(*id);
        }
        for (id, bounds) in ctx.old_bounds.iter().rev() {
            diagram.update_bounds(*id, *bounds)?;
            changed.push(*id);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::modeling::{
        CREATE_SHAPE, CreateShapeContext, MOVE_SHAPE, ShapeDescriptor,
        test_support::{diagram, id},
    };

    fn bounds(diagram: &Diagram, element: &str) -> Bounds {
        diagram.element(id(element)).unwrap().bounds().unwrap()
    }

    #[test]
    fn test_move_shifts_attached_ends() {
        let mut diagram = diagram();
        let moved = diagram
            .execute(MOVE_SHAPE, MoveShapeContext::new(id("Task_1"), Point::new(0.0, 100.0)))
            .unwrap();
        assert!(moved);

        assert_approx_eq!(f32, bounds(&diagram, "Task_1").min_y(), 178.0);
        let flow = diagram.element(id("SequenceFlow_1")).unwrap();
        assert_eq!(
            flow.waypoints(),
            &[Point::new(136.0, 118.0), Point::new(200.0, 218.0)]
        );

        diagram.undo().unwrap();
        assert_approx_eq!(f32, bounds(&diagram, "Task_1").min_y(), 78.0);
        let flow = diagram.element(id("SequenceFlow_1")).unwrap();
        assert_eq!(
            flow.waypoints(),
            &[Point::new(136.0, 118.0), Point::new(200.0, 118.0)]
        );
    }

    #[test]
    fn test_label_travels_with_shape() {
        let mut diagram = diagram();
        let before = bounds(&diagram, "StartEvent_1_label");
        diagram
            .execute(
                MOVE_SHAPE,
                MoveShapeContext::new(id("StartEvent_1"), Point::new(-20.0, 10.0)),
            )
            .unwrap();

        let after = bounds(&diagram, "StartEvent_1_label");
        assert_approx_eq!(f32, after.min_x(), before.min_x() - 20.0);
        assert_approx_eq!(f32, after.min_y(), before.min_y() + 10.0);
    }

    #[test]
    fn test_move_into_sub_process() {
        let mut diagram = diagram();
        diagram
            .execute(
                CREATE_SHAPE,
                CreateShapeContext::new(
                    ShapeDescriptor::new("bpmn:SubProcess").with_id(id("SubProcess_1")),
                    Point::new(600.0, 400.0),
                    id("Process_1"),
                ),
            )
            .unwrap();

        diagram
            .execute(
                MOVE_SHAPE,
                MoveShapeContext::new(id("EndEvent_1"), Point::new(200.0, 300.0))
                    .with_new_parent(id("SubProcess_1")),
            )
            .unwrap();

        let end = diagram.element(id("EndEvent_1")).unwrap();
        assert_eq!(end.parent(), Some(id("SubProcess_1")));
        let model = diagram.model();
        let node = model.by_id("EndEvent_1").unwrap();
        let sub_process = model.by_id("SubProcess_1").unwrap();
        let process = model.by_id("Process_1").unwrap();
        assert_eq!(model.parent(node), Some(sub_process));
        assert_eq!(model.collection(sub_process, "flowElements"), &[node]);

        diagram.undo().unwrap();
        let model = diagram.model();
        assert_eq!(model.parent(node), Some(process));
        assert_eq!(model.collection(process, "flowElements")[2], node);
        assert_eq!(
            diagram.element(id("EndEvent_1")).unwrap().parent(),
            Some(id("Process_1"))
        );
        assert_approx_eq!(f32, bounds(&diagram, "EndEvent_1").min_x(), 400.0);
    }

    #[test]
    fn test_refuses_cycles_and_non_shapes() {
        let mut diagram = diagram();
        let into_self = MoveShapeContext::new(id("Task_1"), Point::new(1.0, 1.0))
            .with_new_parent(id("Task_1"));
        assert!(!diagram.execute(MOVE_SHAPE, into_self).unwrap());

        let connection = MoveShapeContext::new(id("SequenceFlow_1"), Point::new(1.0, 1.0));
        assert!(!diagram.execute(MOVE_SHAPE, connection).unwrap());

        let root = MoveShapeContext::new(id("Process_1"), Point::new(1.0, 1.0));
        assert!(!diagram.execute(MOVE_SHAPE, root).unwrap());
    }
}
