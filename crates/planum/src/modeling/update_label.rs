use std::any::Any;

use log::debug;

use planum_core::{
    Diagram,
    command::{CommandHandler, context, context_mut},
    error::{CommandError, GraphError},
    geometry::Size,
    graph::{Element, RemovedElement},
    identifier::Id,
    semantic::{ModelRef, has_external_label, label_attr},
};

use crate::label::{external_label_bounds, label_owner};

/// Context of `element.updateLabel`.
#[derive(Debug, Clone)]
pub struct UpdateLabelContext {
    element: Id,
    text: Option<String>,
    owner: Option<(Id, ModelRef)>,
    old_text: Option<Option<String>>,
    created_label: Option<Id>,
    removed_label: Vec<RemovedElement>,
}

impl UpdateLabelContext {
    /// Sets the label of `element` (or of the target of a label element).
    /// Blank text clears it.
    pub fn new(element: Id, text: Option<String>) -> Self {
        let text = text.filter(|t| !t.trim().is_empty());
        Self {
            element,
            text,
            owner: None,
            old_text: None,
            created_label: None,
            removed_label: Vec::new(),
        }
    }

    pub fn element(&self) -> Id {
        self.element
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Writes label text to the semantic node and keeps the external label
/// element in step: it appears with the first text and goes away when the
/// text is cleared.
pub struct UpdateLabelHandler {
    label_size: Size,
}

impl UpdateLabelHandler {
    pub fn new(label_size: Size) -> Self {
        Self { label_size }
    }
}

fn resolve_owner(diagram: &Diagram, element: Id) -> Result<(Id, ModelRef), GraphError> {
    let owner = label_owner(diagram, element);
    let business_object = diagram
        .element(owner)
        .ok_or(GraphError::UnknownElement(owner))?
        .business_object()
        .ok_or(GraphError::MissingField(owner, "business object"))?;
    Ok((owner, business_object))
}

impl CommandHandler for UpdateLabelHandler {
    fn can_execute(&self, diagram: &Diagram, ctx: &dyn Any) -> bool {
        context::<UpdateLabelContext>(ctx).is_ok_and(|ctx| resolve_owner(diagram, ctx.element).is_ok())
    }

    fn execute(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context_mut::<UpdateLabelContext>(ctx)?;
        let (owner, business_object) = resolve_owner(diagram, ctx.element)?;
        let type_name = diagram.model().type_name(business_object).to_string();
        ctx.owner = Some((owner, business_object));
        ctx.created_label = None;
        ctx.removed_label.clear();

        let mut changed = vec![owner];
        let element = diagram.element(owner).ok_or(GraphError::UnknownElement(owner))?;
        if has_external_label(&type_name) {
            match (ctx.text.is_some(), element.label_id()) {
                (true, None) => {
                    let parent = element
                        .parent()
                        .ok_or(GraphError::MissingField(owner, "parent"))?;
                    if let Some(bounds) = external_label_bounds(element, self.label_size) {
                        let label = Element::label(owner.with_suffix("_label"), "label", bounds, owner)
                            .with_business_object(business_object);
                        let id = diagram.add_element(label, parent, None)?;
                        ctx.created_label = Some(id);
                        changed.push(id);
                    }
                }
                (false, Some(label)) => {
                    ctx.removed_label = diagram.remove_element(label)?;
                    changed.push(label);
                }
                _ => {}
            }
        }

        let old = diagram
            .model_mut()
            .set_attr(business_object, label_attr(&type_name), ctx.text.clone());
        ctx.old_text = Some(old);

        debug!(element:% = owner, cleared = ctx.text.is_none(); "Updated label");
        Ok(changed)
    }

    fn revert(&self, diagram: &mut Diagram, ctx: &mut dyn Any) -> Result<Vec<Id>, CommandError> {
        let ctx = context_mut::<UpdateLabelContext>(ctx)?;
        let (owner, business_object) = ctx
            .owner
            .ok_or(GraphError::MissingField(ctx.element, "label owner"))?;
        let type_name = diagram.model().type_name(business_object).to_string();

        let old = ctx
            .old_text
            .clone()
            .ok_or(GraphError::MissingField(owner, "label"))?;
        diagram
            .model_mut()
            .set_attr(business_object, label_attr(&type_name), old);

        let mut changed = vec![owner];
        if let Some(label) = ctx.created_label {
            diagram.remove_element(label)?;
            changed.push(label);
        }
        if !ctx.removed_label.is_empty() {
            let removed = std::mem::take(&mut ctx.removed_label);
            changed.extend(diagram.restore_elements(removed)?);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        label::get_label,
        modeling::{
            UPDATE_LABEL,
            test_support::{diagram, id},
        },
    };

    fn update(diagram: &mut Diagram, element: &str, text: Option<&str>) {
        let context = UpdateLabelContext::new(id(element), text.map(str::to_string));
        assert!(diagram.execute(UPDATE_LABEL, context).unwrap());
    }

    #[test]
    fn test_rename_task() {
        let mut diagram = diagram();
        update(&mut diagram, "Task_1", Some("Approve"));
        assert_eq!(get_label(&diagram, id("Task_1")), Some("Approve"));
        assert!(diagram.element(id("Task_1_label")).is_none());

        diagram.undo().unwrap();
        assert_eq!(get_label(&diagram, id("Task_1")), Some("Review"));
    }

    #[test]
    fn test_first_text_creates_label() {
        let mut diagram = diagram();
        update(&mut diagram, "EndEvent_1", Some("Done"));

        let label = diagram.element(id("EndEvent_1_label")).unwrap();
        assert_eq!(label.label_target(), Some(id("EndEvent_1")));
        assert_eq!(label.parent(), Some(id("Process_1")));
        assert_eq!(get_label(&diagram, id("EndEvent_1_label")), Some("Done"));

        diagram.undo().unwrap();
        assert!(diagram.element(id("EndEvent_1_label")).is_none());
        assert_eq!(diagram.element(id("EndEvent_1")).unwrap().label_id(), None);

        diagram.redo().unwrap();
        assert!(diagram.element(id("EndEvent_1_label")).is_some());
    }

    #[test]
    fn test_clearing_through_label_removes_it() {
        let mut diagram = diagram();
        update(&mut diagram, "StartEvent_1_label", Some("   "));

        assert!(diagram.element(id("StartEvent_1_label")).is_none());
        assert_eq!(get_label(&diagram, id("StartEvent_1")), None);

        diagram.undo().unwrap();
        assert_eq!(get_label(&diagram, id("StartEvent_1_label")), Some("Start"));
        assert_eq!(
            diagram.element(id("StartEvent_1")).unwrap().label_id(),
            Some(id("StartEvent_1_label"))
        );
    }
}
