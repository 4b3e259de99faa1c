//! Structural type registry for semantic nodes.
//!
//! The importer and the modeling commands never look at concrete task or
//! gateway flavours. They only need to know which structural role a node
//! plays (container, flow node, connection, ...), which attributes carry
//! implicit defaults, and whether the element shows its name in an external
//! label. All of that is answered here from the qualified type name.

use crate::geometry::Size;

/// Structural role of a semantic node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// The document root (`bpmn:Definitions`).
    Definitions,
    /// A collaboration holding participants and message flows.
    Collaboration,
    /// A process holding flow elements, lane sets and artifacts.
    Process,
    /// A pool; its content lives in the referenced process.
    Participant,
    /// Grouping of lanes.
    LaneSet,
    /// A lane; may hold a child lane set.
    Lane,
    /// Sub-process and transaction containers.
    SubProcess,
    /// Tasks, events and gateways.
    FlowNode,
    /// Sequence flows, message flows, associations and data associations.
    Connection,
    /// Text annotations and groups.
    Artifact,
    /// Data object and data store references drawn as shapes.
    DataReference,
    /// Semantic content without a visual representation.
    NonVisual,
    /// `bpmndi:BPMNDiagram`.
    Diagram,
    /// `bpmndi:BPMNPlane`.
    Plane,
    /// `bpmndi:BPMNShape`.
    DiShape,
    /// `bpmndi:BPMNEdge`.
    DiEdge,
    /// Known by the reader but not drawable by this library.
    Unsupported,
}

impl Family {
    /// Returns true for families that live on the diagram-interchange side.
    pub fn is_di(self) -> bool {
        matches!(
            self,
            Family::Diagram | Family::Plane | Family::DiShape | Family::DiEdge
        )
    }

    /// Returns true for families the graph draws as shapes.
    pub fn is_shape(self) -> bool {
        matches!(
            self,
            Family::Participant
                | Family::Lane
                | Family::SubProcess
                | Family::FlowNode
                | Family::Artifact
                | Family::DataReference
        )
    }

    /// Returns true if the node may become a diagram root.
    pub fn is_root_candidate(self) -> bool {
        matches!(self, Family::Process | Family::Collaboration)
    }
}

/// Returns the structural family of a qualified type name.
///
/// Unknown names map to [`Family::Unsupported`].
///
/// # Examples
///
/// ```
/// use planum_core::semantic::{Family, family};
///
/// assert_eq!(family("bpmn:UserTask"), Family::FlowNode);
/// assert_eq!(family("bpmn:Association"), Family::Connection);
/// assert_eq!(family("bpmn:ChoreographyTask"), Family::Unsupported);
/// ```
pub fn family(type_name: &str) -> Family {
    match type_name {
        "bpmn:Definitions" => Family::Definitions,
        "bpmn:Collaboration" => Family::Collaboration,
        "bpmn:Process" => Family::Process,
        "bpmn:Participant" => Family::Participant,
        "bpmn:LaneSet" => Family::LaneSet,
        "bpmn:Lane" => Family::Lane,
        "bpmn:SubProcess" | "bpmn:Transaction" | "bpmn:AdHocSubProcess" => Family::SubProcess,
        "bpmn:Task"
        | "bpmn:UserTask"
        | "bpmn:ServiceTask"
        | "bpmn:ScriptTask"
        | "bpmn:ManualTask"
        | "bpmn:BusinessRuleTask"
        | "bpmn:SendTask"
        | "bpmn:ReceiveTask"
        | "bpmn:CallActivity"
        | "bpmn:StartEvent"
        | "bpmn:EndEvent"
        | "bpmn:IntermediateCatchEvent"
        | "bpmn:IntermediateThrowEvent"
        | "bpmn:BoundaryEvent"
        | "bpmn:ExclusiveGateway"
        | "bpmn:InclusiveGateway"
        | "bpmn:ParallelGateway"
        | "bpmn:ComplexGateway"
        | "bpmn:EventBasedGateway" => Family::FlowNode,
        "bpmn:SequenceFlow"
        | "bpmn:MessageFlow"
        | "bpmn:Association"
        | "bpmn:DataInputAssociation"
        | "bpmn:DataOutputAssociation" => Family::Connection,
        "bpmn:TextAnnotation" | "bpmn:Group" => Family::Artifact,
        "bpmn:DataObjectReference" | "bpmn:DataStoreReference" => Family::DataReference,
        "bpmn:DataObject"
        | "bpmn:DataStore"
        | "bpmn:Message"
        | "bpmn:Signal"
        | "bpmn:Error"
        | "bpmn:Escalation"
        | "bpmn:Category"
        | "bpmn:CategoryValue"
        | "bpmn:ItemDefinition"
        | "bpmn:Property"
        | "bpmn:IoSpecification"
        | "bpmn:DataInput"
        | "bpmn:DataOutput"
        | "bpmn:InputSet"
        | "bpmn:OutputSet"
        | "bpmn:FormalExpression"
        | "bpmn:MessageEventDefinition"
        | "bpmn:TimerEventDefinition"
        | "bpmn:SignalEventDefinition"
        | "bpmn:ErrorEventDefinition"
        | "bpmn:EscalationEventDefinition"
        | "bpmn:ConditionalEventDefinition"
        | "bpmn:CompensateEventDefinition"
        | "bpmn:LinkEventDefinition"
        | "bpmn:TerminateEventDefinition"
        | "bpmn:CancelEventDefinition"
        | "bpmn:ExtensionElements" => Family::NonVisual,
        "bpmndi:BPMNDiagram" => Family::Diagram,
        "bpmndi:BPMNPlane" => Family::Plane,
        "bpmndi:BPMNShape" => Family::DiShape,
        "bpmndi:BPMNEdge" => Family::DiEdge,
        _ => Family::Unsupported,
    }
}

/// Returns true if `type_name` is a connection whose ends are semantic
/// flow nodes of one process.
pub fn is_sequence_flow(type_name: &str) -> bool {
    type_name == "bpmn:SequenceFlow"
}

/// Returns true for the data association types, which are owned by the
/// activity they connect to rather than by a process.
pub fn is_data_association(type_name: &str) -> bool {
    matches!(
        type_name,
        "bpmn:DataInputAssociation" | "bpmn:DataOutputAssociation"
    )
}

/// Returns the implicit value of an attribute the document left out.
///
/// # Examples
///
/// ```
/// use planum_core::semantic::default_attr;
///
/// assert_eq!(default_attr("bpmn:EventBasedGateway", "eventGatewayType"), Some("Exclusive"));
/// assert_eq!(default_attr("bpmn:Task", "eventGatewayType"), None);
/// ```
pub fn default_attr(type_name: &str, attr: &str) -> Option<&'static str> {
    match (type_name, attr) {
        ("bpmn:EventBasedGateway", "eventGatewayType") => Some("Exclusive"),
        ("bpmn:EventBasedGateway", "instantiate") => Some("false"),
        ("bpmn:StartEvent", "isInterrupting") => Some("true"),
        ("bpmn:StartEvent", "parallelMultiple") => Some("false"),
        ("bpmn:BoundaryEvent", "cancelActivity") => Some("true"),
        (_, "isExpanded") if family(type_name) == Family::SubProcess => Some("false"),
        ("bpmn:SubProcess" | "bpmn:Transaction", "triggeredByEvent") => Some("false"),
        ("bpmn:Process", "isExecutable") => Some("false"),
        ("bpmn:Association", "associationDirection") => Some("None"),
        ("bpmn:SequenceFlow", "isImmediate") => Some("false"),
        ("bpmn:TextAnnotation", "textFormat") => Some("text/plain"),
        _ => None,
    }
}

/// Returns true if elements of this type render their name in a separate
/// label element placed outside their own bounds.
pub fn has_external_label(type_name: &str) -> bool {
    matches!(
        type_name,
        "bpmn:StartEvent"
            | "bpmn:EndEvent"
            | "bpmn:IntermediateCatchEvent"
            | "bpmn:IntermediateThrowEvent"
            | "bpmn:BoundaryEvent"
            | "bpmn:ExclusiveGateway"
            | "bpmn:InclusiveGateway"
            | "bpmn:ParallelGateway"
            | "bpmn:ComplexGateway"
            | "bpmn:EventBasedGateway"
            | "bpmn:DataObjectReference"
            | "bpmn:DataStoreReference"
            | "bpmn:SequenceFlow"
            | "bpmn:MessageFlow"
    )
}

/// Returns the attribute an element's label text is stored in.
pub fn label_attr(type_name: &str) -> &'static str {
    if type_name == "bpmn:TextAnnotation" {
        "text"
    } else {
        "name"
    }
}

/// Returns the built-in size of a shape type.
pub fn default_size(type_name: &str) -> Size {
    match type_name {
        "bpmn:Participant" => Size::new(600.0, 250.0),
        "bpmn:Lane" => Size::new(570.0, 120.0),
        "bpmn:TextAnnotation" => Size::new(100.0, 30.0),
        "bpmn:DataObjectReference" => Size::new(36.0, 50.0),
        "bpmn:DataStoreReference" => Size::new(50.0, 50.0),
        "bpmn:Group" => Size::new(300.0, 300.0),
        name if name.ends_with("Gateway") => Size::new(50.0, 50.0),
        name if name.ends_with("Event") => Size::new(36.0, 36.0),
        name if family(name) == Family::SubProcess => Size::new(350.0, 200.0),
        _ => Size::new(100.0, 80.0),
    }
}

/// Strips the namespace prefix of a qualified type name.
///
/// # Examples
///
/// ```
/// use planum_core::semantic::local_name;
///
/// assert_eq!(local_name("bpmn:TextAnnotation"), "TextAnnotation");
/// assert_eq!(local_name("Task"), "Task");
/// ```
pub fn local_name(type_name: &str) -> &str {
    type_name
        .split_once(':')
        .map_or(type_name, |(_, local)| local)
}
