use std::{any::Any, rc::Rc};

use log::debug;

use planum_core::{
    Diagram,
    command::{CommandHandler, context, context_mut},
    error::{CommandError, GraphError},
    geometry::{Bounds, Point},
    graph::Element,
    identifier::Id,
    semantic::{ModelNode, ModelRef, default_size, family},
};

use super::{CREATE_SHAPE, ContainmentStrategy, ShapeDescriptor};

/// Context of `shape.create`.
#[derive(Debug, Clone)]
pub struct CreateShapeContext {
    shape: ShapeDescriptor,
    position: Point,
    parent: Id,
    parent_index: Option<usize>,
    business_object: Option<ModelRef>,
}

impl CreateShapeContext {
    /// Creates a context placing `shape` centred on `position` inside
    /// `parent`. The descriptor must carry an id.
    pub fn new(shape: ShapeDescriptor, position: Point, parent: Id) -> Self {
        Self {
            shape,
            position,
            parent,
            parent_index: None,
            business_object: None,
        }
    }

    pub fn with_parent_index(mut self, index: usize) -> Self {
        self.parent_index = Some(index);
        self
    }

    pub fn shape(&self) -> &ShapeDescriptor {
        &self.shape
    }

    pub fn parent(&self) -> Id {
        self.parent
    }

    /// The semantic node created by the first execution.
    pub fn business_object(&self) -> Option<ModelRef> {
        self.business_object
    }
}

/// Creates a shape together with its semantic node.
pub struct CreateShapeHandler {
    containment: Rc<dyn ContainmentStrategy>,
}

impl CreateShapeHandler {
    pub fn new(containment: Rc<dyn ContainmentStrategy>) -> Self {
        Self { containment }
    }

    fn owner(&self, diagram: &Diagram, ctx: &CreateShapeContext) -> Option<(ModelRef, &'static str)> {
        let parent = diagram.element(ctx.parent)?.business_object()?;
        self.containment
            .semantic_parent(diagram.model(), parent, ctx.shape.type_name())
    }
}

impl CommandHandler for CreateShapeHandler {
    fn can_execute(&self, diagram: &Diagram, ctx: &dyn Any) -> bool {
        let Ok(ctx) = context::<CreateShapeContext>(ctx) else {
            return false;
        };
        ctx.shape.id().is_some()
            && family(ctx.shape.type_name()).is_shape()
            && self.owner(diagram, ctx).is_some()
    }

    fn execute(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context_mut::<CreateShapeContext>(ctx)?;
        let id = ctx
            .shape
            .id()
            .ok_or_else(|| CommandError::Model("shape descriptor without id".to_string()))?;
        let (owner, collection) = self
            .owner(diagram, ctx)
            .ok_or_else(|| CommandError::NotAllowed(CREATE_SHAPE.to_string()))?;

        let type_name = ctx.shape.type_name().to_string();
        let business_object = match ctx.business_object {
            Some(node) => node,
            None => {
                let node = diagram
                    .model_mut()
                    .add_node(ModelNode::new(type_name.as_str()).with_id(id.to_string()));
                ctx.business_object = Some(node);
                node
            }
        };

        let size = ctx.shape.size().unwrap_or_else(|| default_size(&type_name));
        let bounds = Bounds::new_from_center(ctx.position, size);
        diagram.add_element(
            Element::shape(id, type_name, bounds).with_business_object(business_object),
            ctx.parent,
            ctx.parent_index,
        )?;
        diagram
            .model_mut()
            .attach(owner, collection, business_object, None);

        debug!(id:% = id, parent:% = ctx.parent; "Created shape");
        Ok(vec![id, ctx.parent])
    }

    fn revert(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context::<CreateShapeContext>(ctx)?;
        let id = ctx
            .shape
            .id()
            .ok_or_else(|| CommandError::Model("shape descriptor without id".to_string()))?;
        diagram.remove_element(id)?;
        let business_object = ctx
            .business_object
            .ok_or(GraphError::MissingField(id, "business object"))?;
        diagram.model_mut().detach(business_object);
        Ok(vec![id, ctx.parent])
    }
}
