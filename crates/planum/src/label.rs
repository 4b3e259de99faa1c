//! Label text and placement.
//!
//! Label text always lives on the semantic node (`name`, or `text` for text
//! annotations), never on the graph element. These helpers resolve it for
//! shapes, connections and their external label elements alike.

use planum_core::{
    Diagram,
    geometry::{Bounds, Point, Size},
    graph::Element,
    identifier::Id,
    semantic::label_attr,
};

/// Returns the label text shown for `element`.
///
/// External label elements resolve to the text of their target.
pub fn get_label(diagram: &Diagram, element: Id) -> Option<&str> {
    let element = diagram.element(element)?;
    let business_object = element.business_object().or_else(|| {
        element
            .label_target()
            .and_then(|target| diagram.element(target))
            .and_then(Element::business_object)
    })?;
    let model = diagram.model();
    model.attr(business_object, label_attr(model.type_name(business_object)))
}

/// Returns the element a label edit applies to: the target of an external
/// label, otherwise the element itself.
pub fn label_owner(diagram: &Diagram, element: Id) -> Id {
    diagram
        .element(element)
        .and_then(Element::label_target)
        .unwrap_or(element)
}

/// Centre of the external label of `element`.
///
/// Shapes carry it just below their bottom edge; connections at the middle
/// of their middle segment.
pub fn external_label_mid(element: &Element, label_size: Size) -> Option<Point> {
    if let Some(bounds) = element.bounds() {
        return Some(Point::new(
            bounds.center().x(),
            bounds.max_y() + label_size.height() / 2.0,
        ));
    }

    let waypoints = element.waypoints();
    if waypoints.len() < 2 {
        return None;
    }
    let mid = waypoints.len() / 2 - 1;
    Some(waypoints[mid].midpoint(waypoints[mid + 1]))
}

/// Default bounds of the external label of `element`.
///
/// # Examples
///
/// ```
/// use planum::label::external_label_bounds;
/// use planum_core::{geometry::{Bounds, Point, Size}, graph::Element, identifier::Id};
///
/// let event = Element::shape(
///     Id::new("StartEvent_1"),
///     "bpmn:StartEvent",
///     Bounds::new_from_top_left(Point::new(100.0, 100.0), Size::new(36.0, 36.0)),
/// );
/// let label = external_label_bounds(&event, Size::new(90.0, 20.0)).unwrap();
/// assert_eq!(label.min_x(), 73.0);
/// assert_eq!(label.min_y(), 136.0);
/// ```
pub fn external_label_bounds(element: &Element, label_size: Size) -> Option<Bounds> {
    external_label_mid(element, label_size).map(|mid| Bounds::new_from_center(mid, label_size))
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use planum_core::semantic::{ModelNode, ModelTree};

    fn label_size() -> Size {
        Size::new(90.0, 20.0)
    }

    #[test]
    fn test_connection_label_mid() {
        let flow = Element::connection(
            Id::new("SequenceFlow_1"),
            "bpmn:SequenceFlow",
            Id::new("Task_1"),
            Id::new("Task_2"),
            vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 50.0),
                Point::new(200.0, 50.0),
            ],
        );
        let mid = external_label_mid(&flow, label_size()).unwrap();
        assert_approx_eq!(f32, mid.x(), 100.0);
        assert_approx_eq!(f32, mid.y(), 25.0);
    }

    #[test]
    fn test_degenerate_connection_has_no_label_mid() {
        let flow = Element::connection(
            Id::new("SequenceFlow_1"),
            "bpmn:SequenceFlow",
            Id::new("Task_1"),
            Id::new("Task_2"),
            vec![Point::new(0.0, 0.0)],
        );
        assert_eq!(external_label_mid(&flow, label_size()), None);
    }

    #[test]
    fn test_get_label_through_label_element() {
        let mut model = ModelTree::new();
        let gateway = model.add_node(
            ModelNode::new("bpmn:ExclusiveGateway")
                .with_id("Gateway_1")
                .with_attr("name", "Approved?"),
        );
        let annotation = model.add_node(
            ModelNode::new("bpmn:TextAnnotation")
                .with_id("TextAnnotation_1")
                .with_attr("text", "Check twice"),
        );

        let mut diagram = Diagram::new();
        diagram.set_model(model);
        diagram
            .set_root(Element::root(Id::new("Process_1"), "bpmn:Process"))
            .unwrap();
        let bounds = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(50.0, 50.0));
        let gateway_id = Id::new("Gateway_1");
        diagram
            .add_element(
                Element::shape(gateway_id, "bpmn:ExclusiveGateway", bounds)
                    .with_business_object(gateway),
                Id::new("Process_1"),
                None,
            )
            .unwrap();
        diagram
            .add_element(
                Element::label(gateway_id.with_suffix("_label"), "label", bounds, gateway_id),
                Id::new("Process_1"),
                None,
            )
            .unwrap();
        diagram
            .add_element(
                Element::shape(Id::new("TextAnnotation_1"), "bpmn:TextAnnotation", bounds)
                    .with_business_object(annotation),
                Id::new("Process_1"),
                None,
            )
            .unwrap();

        assert_eq!(get_label(&diagram, gateway_id), Some("Approved?"));
        assert_eq!(get_label(&diagram, Id::new("Gateway_1_label")), Some("Approved?"));
        assert_eq!(get_label(&diagram, Id::new("TextAnnotation_1")), Some("Check twice"));
        assert_eq!(get_label(&diagram, Id::new("Process_1")), None);

        assert_eq!(label_owner(&diagram, Id::new("Gateway_1_label")), gateway_id);
        assert_eq!(label_owner(&diagram, gateway_id), gateway_id);
    }
}
