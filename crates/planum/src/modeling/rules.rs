//! Which connections the modeling commands may create.

use planum_core::{
    Diagram,
    graph::{Element, ElementKind},
    identifier::Id,
    semantic::{Family, family},
};

/// Returns the connection type joining `source` to `target`, or `None` if
/// the two elements cannot be connected.
///
/// - an association when exactly one end is an artifact,
/// - a message flow between elements of different participants,
/// - a sequence flow between flow nodes of the same container.
pub fn connection_type(diagram: &Diagram, source: Id, target: Id) -> Option<&'static str> {
    if source == target {
        return None;
    }
    let source_element = diagram.element(source)?;
    let target_element = diagram.element(target)?;
    if source_element.kind() != ElementKind::Shape || target_element.kind() != ElementKind::Shape {
        return None;
    }

    let source_type = source_element.type_name();
    let target_type = target_element.type_name();
    let (source_family, target_family) = (family(source_type), family(target_type));

    match (source_family == Family::Artifact, target_family == Family::Artifact) {
        (true, true) => return None,
        (true, false) | (false, true) => {
            let annotated = source_type == "bpmn:TextAnnotation" || target_type == "bpmn:TextAnnotation";
            return annotated.then_some("bpmn:Association");
        }
        (false, false) => {}
    }

    let source_pool = participant_of(diagram, source_element);
    let target_pool = participant_of(diagram, target_element);
    if source_pool.is_some() && target_pool.is_some() && source_pool != target_pool {
        let message_end = |f: Family| matches!(f, Family::Participant | Family::FlowNode | Family::SubProcess);
        return (message_end(source_family) && message_end(target_family)).then_some("bpmn:MessageFlow");
    }

    let flow_node = |f: Family| matches!(f, Family::FlowNode | Family::SubProcess);
    let allowed = flow_node(source_family)
        && flow_node(target_family)
        && source_element.parent() == target_element.parent()
        && source_type != "bpmn:EndEvent"
        && target_type != "bpmn:StartEvent"
        && target_type != "bpmn:BoundaryEvent";
    allowed.then_some("bpmn:SequenceFlow")
}

/// Returns the participant an element is drawn in, including itself.
fn participant_of(diagram: &Diagram, element: &Element) -> Option<Id> {
    std::iter::successors(Some(element), |e| e.parent().and_then(|p| diagram.element(p)))
        .find(|e| e.type_name() == "bpmn:Participant")
        .map(Element::id)
}
