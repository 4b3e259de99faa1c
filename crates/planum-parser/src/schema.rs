//! The BPMN 2.0 vocabulary understood by the reader.
//!
//! Every element of the document is classified by a [`Rule`]: it either
//! becomes a semantic or diagram-interchange node attached to a named
//! collection of its parent, or it folds into its parent (text content,
//! id references, bounds, waypoints), or it is skipped wholesale.

pub(crate) const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
pub(crate) const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub(crate) const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
pub(crate) const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";

/// How an element is folded into the model tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    /// A node of its own, attached to the parent's `collection`.
    Node { collection: &'static str },
    /// Text content holding the id of another element.
    Reference { name: &'static str, many: bool },
    /// Text content stored as an attribute of the parent.
    Text { attr: &'static str },
    /// `dc:Bounds` of a shape.
    Bounds,
    /// `di:waypoint` of an edge.
    Waypoint,
    /// `bpmndi:BPMNLabel`; its bounds become the parent's label bounds.
    Label,
    /// Known content without meaning for the diagram.
    Skip,
}

/// Canonical prefix of a supported namespace.
pub(crate) fn prefix(namespace: &str) -> Option<&'static str> {
    match namespace {
        BPMN_NS => Some("bpmn"),
        BPMNDI_NS => Some("bpmndi"),
        DC_NS => Some("dc"),
        DI_NS => Some("di"),
        _ => None,
    }
}

/// Classifies an element by namespace prefix and local name.
pub(crate) fn rule(prefix: &str, local: &str) -> Option<Rule> {
    match prefix {
        "bpmn" => bpmn_rule(local),
        "bpmndi" => match local {
            "BPMNDiagram" => Some(Rule::Node {
                collection: "diagrams",
            }),
            "BPMNPlane" => Some(Rule::Node { collection: "plane" }),
            "BPMNShape" | "BPMNEdge" => Some(Rule::Node {
                collection: "planeElement",
            }),
            "BPMNLabel" => Some(Rule::Label),
            "BPMNLabelStyle" => Some(Rule::Skip),
            _ => None,
        },
        "dc" => match local {
            "Bounds" => Some(Rule::Bounds),
            "Font" => Some(Rule::Skip),
            _ => None,
        },
        "di" => match local {
            "waypoint" => Some(Rule::Waypoint),
            "extension" => Some(Rule::Skip),
            _ => None,
        },
        _ => None,
    }
}

fn bpmn_rule(local: &str) -> Option<Rule> {
    let collection = match local {
        "process" | "collaboration" | "message" | "signal" | "error" | "escalation"
        | "dataStore" | "itemDefinition" | "category" | "interface" => "rootElements",
        "task" | "userTask" | "serviceTask" | "scriptTask" | "manualTask" | "businessRuleTask"
        | "sendTask" | "receiveTask" | "callActivity" | "subProcess" | "transaction"
        | "adHocSubProcess" | "startEvent" | "endEvent" | "intermediateCatchEvent"
        | "intermediateThrowEvent" | "boundaryEvent" | "exclusiveGateway" | "inclusiveGateway"
        | "parallelGateway" | "complexGateway" | "eventBasedGateway" | "sequenceFlow"
        | "dataObject" | "dataObjectReference" | "dataStoreReference" | "choreographyTask"
        | "callChoreography" | "subChoreography" => "flowElements",
        "textAnnotation" | "association" | "group" => "artifacts",
        "laneSet" => "laneSets",
        "childLaneSet" => "childLaneSet",
        "lane" => "lanes",
        "participant" => "participants",
        "messageFlow" => "messageFlows",
        "conversation" | "subConversation" | "callConversation" => "conversations",
        "categoryValue" => "categoryValue",
        "property" => "properties",
        "ioSpecification" => "ioSpecification",
        "dataInput" => "dataInputs",
        "dataOutput" => "dataOutputs",
        "inputSet" => "inputSets",
        "outputSet" => "outputSets",
        "dataInputAssociation" => "dataInputAssociations",
        "dataOutputAssociation" => "dataOutputAssociations",
        "messageEventDefinition" | "timerEventDefinition" | "signalEventDefinition"
        | "errorEventDefinition" | "escalationEventDefinition" | "conditionalEventDefinition"
        | "compensateEventDefinition" | "linkEventDefinition" | "terminateEventDefinition"
        | "cancelEventDefinition" => "eventDefinitions",
        "incoming" => return Some(reference_list("incoming")),
        "outgoing" => return Some(reference_list("outgoing")),
        "flowNodeRef" => return Some(reference_list("flowNodeRef")),
        "sourceRef" => return Some(reference_list("sourceRef")),
        "dataInputRefs" => return Some(reference_list("dataInputRefs")),
        "dataOutputRefs" => return Some(reference_list("dataOutputRefs")),
        "targetRef" => {
            return Some(Rule::Reference {
                name: "targetRef",
                many: false,
            });
        }
        "text" => return Some(Rule::Text { attr: "text" }),
        "documentation" => return Some(Rule::Text { attr: "documentation" }),
        "conditionExpression" => return Some(Rule::Text { attr: "conditionExpression" }),
        "condition" => return Some(Rule::Text { attr: "condition" }),
        "timeDate" => return Some(Rule::Text { attr: "timeDate" }),
        "timeDuration" => return Some(Rule::Text { attr: "timeDuration" }),
        "timeCycle" => return Some(Rule::Text { attr: "timeCycle" }),
        "completionCondition" => return Some(Rule::Text { attr: "completionCondition" }),
        "script" => return Some(Rule::Text { attr: "script" }),
        "extensionElements" | "operation" | "participantMultiplicity"
        | "standardLoopCharacteristics" | "multiInstanceLoopCharacteristics"
        | "correlationKey" | "assignment" | "transformation" | "dataState" => {
            return Some(Rule::Skip);
        }
        _ => return None,
    };
    Some(Rule::Node { collection })
}

fn reference_list(name: &'static str) -> Rule {
    Rule::Reference { name, many: true }
}

/// Qualified model type of a [`Rule::Node`] element.
///
/// BPMN elements are named after the property they fill, in lower camel
/// case; the type is the capitalized name except where the property name
/// differs from its type.
pub(crate) fn type_name(prefix: &str, local: &str) -> String {
    let local = match local {
        "childLaneSet" => "laneSet",
        other => other,
    };
    let mut chars = local.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{prefix}:{capitalized}")
}

/// Returns the reference name of an attribute holding the id of another
/// element, or `None` for plain attributes.
pub(crate) fn reference_attr(name: &str) -> Option<&'static str> {
    let name = match name {
        "sourceRef" => "sourceRef",
        "targetRef" => "targetRef",
        "processRef" => "processRef",
        "bpmnElement" => "bpmnElement",
        "attachedToRef" => "attachedToRef",
        "default" => "default",
        "dataObjectRef" => "dataObjectRef",
        "dataStoreRef" => "dataStoreRef",
        "categoryValueRef" => "categoryValueRef",
        "messageRef" => "messageRef",
        "sourceElement" => "sourceElement",
        "targetElement" => "targetElement",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(prefix(BPMN_NS), Some("bpmn"));
        assert_eq!(prefix(DI_NS), Some("di"));
        assert_eq!(prefix("http://camunda.org/schema/1.0/bpmn"), None);
    }

    #[test]
    fn test_node_rules() {
        assert_eq!(
            rule("bpmn", "task"),
            Some(Rule::Node {
                collection: "flowElements"
            })
        );
        assert_eq!(
            rule("bpmn", "textAnnotation"),
            Some(Rule::Node {
                collection: "artifacts"
            })
        );
        assert_eq!(
            rule("bpmndi", "BPMNShape"),
            Some(Rule::Node {
                collection: "planeElement"
            })
        );
    }

    #[test]
    fn test_folded_rules() {
        assert_eq!(
            rule("bpmn", "incoming"),
            Some(Rule::Reference {
                name: "incoming",
                many: true
            })
        );
        assert_eq!(rule("bpmn", "text"), Some(Rule::Text { attr: "text" }));
        assert_eq!(rule("dc", "Bounds"), Some(Rule::Bounds));
        assert_eq!(rule("bpmn", "extensionElements"), Some(Rule::Skip));
    }

    #[test]
    fn test_unknown_elements() {
        assert_eq!(rule("bpmn", "collaborationX"), None);
        assert_eq!(rule("bpmndi", "task"), None);
        assert_eq!(rule("foo", "task"), None);
    }

    #[test]
    fn test_reference_attr() {
        assert_eq!(reference_attr("bpmnElement"), Some("bpmnElement"));
        assert_eq!(reference_attr("name"), None);
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name("bpmn", "startEvent"), "bpmn:StartEvent");
        assert_eq!(type_name("bpmn", "childLaneSet"), "bpmn:LaneSet");
        assert_eq!(type_name("bpmndi", "BPMNPlane"), "bpmndi:BPMNPlane");
    }
}
