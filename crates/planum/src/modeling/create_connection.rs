use std::{any::Any, rc::Rc};

use log::debug;

use planum_core::{
    Diagram,
    command::{CommandHandler, context, context_mut},
    error::{CommandError, GraphError},
    geometry::Point,
    graph::Element,
    identifier::Id,
    semantic::{ModelNode, ModelRef, kind::is_sequence_flow},
};

use super::{CREATE_CONNECTION, ContainmentStrategy, rules};

/// Context of `connection.create`.
#[derive(Debug, Clone)]
pub struct CreateConnectionContext {
    source: Id,
    target: Id,
    connection_type: Option<&'static str>,
    id: Option<Id>,
    parent: Option<Id>,
    waypoints: Option<Vec<Point>>,
    business_object: Option<ModelRef>,
}

impl CreateConnectionContext {
    pub fn new(source: Id, target: Id) -> Self {
        Self {
            source,
            target,
            connection_type: None,
            id: None,
            parent: None,
            waypoints: None,
            business_object: None,
        }
    }

    /// Forces the connection type; it must still be one the rules allow.
    pub fn with_type(mut self, type_name: &'static str) -> Self {
        self.connection_type = Some(type_name);
        self
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_parent(mut self, parent: Id) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>) -> Self {
        self.waypoints = Some(waypoints);
        self
    }

    pub fn source(&self) -> Id {
        self.source
    }

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn id(&self) -> Option<Id> {
        self.id
    }

    pub fn business_object(&self) -> Option<ModelRef> {
        self.business_object
    }
}

/// Creates a connection and wires it into both models.
pub struct CreateConnectionHandler {
    containment: Rc<dyn ContainmentStrategy>,
}

impl CreateConnectionHandler {
    pub fn new(containment: Rc<dyn ContainmentStrategy>) -> Self {
        Self { containment }
    }

    fn connection_type(diagram: &Diagram, ctx: &CreateConnectionContext) -> Option<&'static str> {
        let allowed = rules::connection_type(diagram, ctx.source, ctx.target)?;
        match ctx.connection_type {
            Some(requested) if requested != allowed => None,
            _ => Some(allowed),
        }
    }

    fn parent(diagram: &Diagram, ctx: &CreateConnectionContext, type_name: &str) -> Option<Id> {
        if let Some(parent) = ctx.parent {
            return Some(parent);
        }
        if type_name == "bpmn:MessageFlow" {
            return diagram.graph().root_id();
        }
        diagram.element(ctx.source)?.parent()
    }

    fn owner(
        &self,
        diagram: &Diagram,
        ctx: &CreateConnectionContext,
    ) -> Option<(&'static str, Id, ModelRef, &'static str)> {
        let type_name = Self::connection_type(diagram, ctx)?;
        let parent = Self::parent(diagram, ctx, type_name)?;
        let parent_object = diagram.element(parent)?.business_object()?;
        let (owner, collection) =
            self.containment
                .semantic_parent(diagram.model(), parent_object, type_name)?;
        Some((type_name, parent, owner, collection))
    }
}

fn ends(diagram: &Diagram, ctx: &CreateConnectionContext) -> Result<(ModelRef, ModelRef), GraphError> {
    let end = |id: Id| -> Result<ModelRef, GraphError> {
        diagram
            .element(id)
            .ok_or(GraphError::UnknownElement(id))?
            .business_object()
            .ok_or(GraphError::MissingField(id, "business object"))
    };
    Ok((end(ctx.source)?, end(ctx.target)?))
}

fn center(diagram: &Diagram, id: Id) -> Result<Point, GraphError> {
    diagram
        .element(id)
        .and_then(Element::bounds)
        .map(|bounds| bounds.center())
        .ok_or(GraphError::MissingField(id, "bounds"))
}

impl CommandHandler for CreateConnectionHandler {
    fn can_execute(&self, diagram: &Diagram, ctx: &dyn Any) -> bool {
        let Ok(ctx) = context::<CreateConnectionContext>(ctx) else {
            return false;
        };
        ctx.id.is_some() && ends(diagram, ctx).is_ok() && self.owner(diagram, ctx).is_some()
    }

    fn execute(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context_mut::<CreateConnectionContext>(ctx)?;
        let id = ctx
            .id
            .ok_or_else(|| CommandError::Model("connection without id".to_string()))?;
        let (type_name, parent, owner, collection) = self
            .owner(diagram, ctx)
            .ok_or_else(|| CommandError::NotAllowed(CREATE_CONNECTION.to_string()))?;
        let (source_object, target_object) = ends(diagram, ctx)?;

        let waypoints = match &ctx.waypoints {
            Some(waypoints) => waypoints.clone(),
            None => {
                let waypoints = vec![center(diagram, ctx.source)?, center(diagram, ctx.target)?];
                ctx.waypoints = Some(waypoints.clone());
                waypoints
            }
        };
        let business_object = match ctx.business_object {
            Some(node) => node,
            None => {
                let node = diagram
                    .model_mut()
                    .add_node(ModelNode::new(type_name).with_id(id.to_string()));
                ctx.business_object = Some(node);
                node
            }
        };
        ctx.parent = Some(parent);

        diagram.add_element(
            Element::connection(id, type_name, ctx.source, ctx.target, waypoints)
                .with_business_object(business_object),
            parent,
            None,
        )?;

        let model = diagram.model_mut();
        model.set_reference(business_object, "sourceRef", Some(source_object));
        model.set_reference(business_object, "targetRef", Some(target_object));
        if is_sequence_flow(type_name) {
            model.insert_reference(source_object, "outgoing", business_object, None);
            model.insert_reference(target_object, "incoming", business_object, None);
        }
        model.attach(owner, collection, business_object, None);

        debug!(id:% = id, source:% = ctx.source, target:% = ctx.target; "Created connection");
        Ok(vec![id, ctx.source, ctx.target])
    }

    fn revert(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context::<CreateConnectionContext>(ctx)?;
        let id = ctx
            .id
            .ok_or_else(|| CommandError::Model("connection without id".to_string()))?;
        let business_object = ctx
            .business_object
            .ok_or(GraphError::MissingField(id, "business object"))?;
        let (source_object, target_object) = ends(diagram, ctx)?;

        diagram.remove_element(id)?;

        let model = diagram.model_mut();
        model.detach(business_object);
        model.remove_reference(source_object, "outgoing", business_object);
        model.remove_reference(target_object, "incoming", business_object);
        model.set_reference(business_object, "sourceRef", None);
        model.set_reference(business_object, "targetRef", None);
        Ok(vec![id, ctx.source, ctx.target])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::test_support::{diagram, id};

    fn connect(diagram: &mut Diagram, source: &str, target: &str, flow: &str) -> bool {
        diagram
            .execute(
                CREATE_CONNECTION,
                CreateConnectionContext::new(id(source), id(target)).with_id(id(flow)),
            )
            .unwrap()
    }

    #[test]
    fn test_sequence_flow_wiring() {
        let mut diagram = diagram();
        assert!(connect(&mut diagram, "Task_1", "EndEvent_1", "SequenceFlow_2"));

        let flow = diagram.element(id("SequenceFlow_2")).unwrap();
        assert_eq!(flow.type_name(), "bpmn:SequenceFlow");
        assert_eq!(flow.parent(), Some(id("Process_1")));
        assert_eq!(flow.waypoints(), &[Point::new(250.0, 118.0), Point::new(418.0, 118.0)]);
        assert!(diagram.element(id("Task_1")).unwrap().outgoing().contains(&id("SequenceFlow_2")));

        let model = diagram.model();
        let node = model.by_id("SequenceFlow_2").unwrap();
        let task = model.by_id("Task_1").unwrap();
        let end = model.by_id("EndEvent_1").unwrap();
        assert_eq!(model.reference(node, "sourceRef"), Some(task));
        assert_eq!(model.reference(node, "targetRef"), Some(end));
        assert_eq!(model.reference_list(task, "outgoing"), &[node]);
        assert_eq!(model.reference_list(end, "incoming"), &[node]);
        assert_eq!(model.parent(node), model.by_id("Process_1"));

        diagram.undo().unwrap();
        let model = diagram.model();
        assert!(diagram.element(id("SequenceFlow_2")).is_none());
        assert!(model.reference_list(task, "outgoing").is_empty());
        assert!(model.reference_list(end, "incoming").is_empty());
        assert_eq!(model.parent(node), None);
        assert!(diagram.element(id("Task_1")).unwrap().outgoing().is_empty());
    }

    #[test]
    fn test_refused_connections() {
        let mut diagram = diagram();
        assert!(!connect(&mut diagram, "EndEvent_1", "Task_1", "SequenceFlow_2"));
        assert!(!connect(&mut diagram, "Task_1", "StartEvent_1", "SequenceFlow_2"));

        let forced_type = diagram
            .execute(
                CREATE_CONNECTION,
                CreateConnectionContext::new(id("Task_1"), id("EndEvent_1"))
                    .with_type("bpmn:MessageFlow")
                    .with_id(id("MessageFlow_1")),
            )
            .unwrap();
        assert!(!forced_type);
        assert!(!diagram.can_undo());
    }
}
