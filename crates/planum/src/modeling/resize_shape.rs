use std::any::Any;

use log::debug;

use planum_core::{
    Diagram,
    command::{CommandHandler, context, context_mut},
    error::{CommandError, GraphError},
    geometry::Bounds,
    graph::ElementKind,
    identifier::Id,
};

/// Context of `shape.resize`.
#[derive(Debug, Clone)]
pub struct ResizeShapeContext {
    shape: Id,
    bounds: Bounds,
    old_bounds: Option<Bounds>,
}

impl ResizeShapeContext {
    pub fn new(shape: Id, bounds: Bounds) -> Self {
        Self {
            shape,
            bounds,
            old_bounds: None,
        }
    }

    pub fn shape(&self) -> Id {
        self.shape
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// Replaces the bounds of a shape. Attached connections are left as they are.
pub struct ResizeShapeHandler;

impl CommandHandler for ResizeShapeHandler {
    fn can_execute(&self, diagram: &Diagram, ctx: &dyn Any) -> bool {
        let Ok(ctx) = context::<ResizeShapeContext>(ctx) else {
            return false;
        };
        ctx.bounds.width() > 0.0
            && ctx.bounds.height() > 0.0
            && diagram
                .element(ctx.shape)
                .is_some_and(|e| e.kind() == ElementKind::Shape)
    }

    fn execute(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context_mut::<ResizeShapeContext>(ctx)?;
        let old = diagram.update_bounds(ctx.shape, ctx.bounds)?;
        ctx.old_bounds = Some(old);
        debug!(shape:% = ctx.shape, width = ctx.bounds.width(), height = ctx.bounds.height(); "Resized shape");
        Ok(vec![ctx.shape])
    }

    fn revert(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context::<ResizeShapeContext>(ctx)?;
        let old = ctx
            .old_bounds
            .ok_or(GraphError::MissingField(ctx.shape, "bounds"))?;
        diagram.update_bounds(ctx.shape, old)?;
        Ok(vec![ctx.shape])
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::modeling::{
        RESIZE_SHAPE,
        test_support::{diagram, id},
    };
    use planum_core::geometry::{Point, Size};

    #[test]
    fn test_resize_and_undo() {
        let mut diagram = diagram();
        let bounds = Bounds::new_from_top_left(Point::new(200.0, 78.0), Size::new(160.0, 120.0));
        assert!(diagram
            .execute(RESIZE_SHAPE, ResizeShapeContext::new(id("Task_1"), bounds))
            .unwrap());
        let resized = diagram.element(id("Task_1")).unwrap().bounds().unwrap();
        assert_approx_eq!(f32, resized.width(), 160.0);

        diagram.undo().unwrap();
        let restored = diagram.element(id("Task_1")).unwrap().bounds().unwrap();
        assert_approx_eq!(f32, restored.width(), 100.0);
        assert_approx_eq!(f32, restored.height(), 80.0);
    }

    #[test]
    fn test_rejects_empty_bounds() {
        let mut diagram = diagram();
        let flat = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 0.0));
        assert!(!diagram
            .execute(RESIZE_SHAPE, ResizeShapeContext::new(id("Task_1"), flat))
            .unwrap());
        let label = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(10.0, 10.0));
        assert!(!diagram
            .execute(RESIZE_SHAPE, ResizeShapeContext::new(id("StartEvent_1_label"), label))
            .unwrap());
    }
}
