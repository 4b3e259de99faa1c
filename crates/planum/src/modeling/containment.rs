//! Semantic ownership of newly created nodes.
//!
//! The graph parent of a new element is not necessarily the semantic node
//! that owns it: a task drawn into a pool belongs to the pool's process, a
//! task drawn into a lane belongs to the process the lane partitions.

use planum_core::semantic::{Family, ModelRef, ModelTree, family, kind::is_sequence_flow};

/// Decides where a new semantic node is attached.
pub trait ContainmentStrategy {
    /// Returns the owning node and collection for a new node of
    /// `type_name` whose graph parent has the business object `parent`.
    ///
    /// `None` means the node cannot be placed there.
    fn semantic_parent(
        &self,
        model: &ModelTree,
        parent: ModelRef,
        type_name: &str,
    ) -> Option<(ModelRef, &'static str)>;
}

/// Default ownership rules of process diagrams.
///
/// - lanes resolve to the process they partition,
/// - participants resolve to their `processRef`,
/// - processes and sub-processes own their content,
/// - message flows belong to the collaboration,
/// - artifacts may also belong to a collaboration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessContainment;

impl ContainmentStrategy for ProcessContainment {
    fn semantic_parent(
        &self,
        model: &ModelTree,
        parent: ModelRef,
        type_name: &str,
    ) -> Option<(ModelRef, &'static str)> {
        if type_name == "bpmn:MessageFlow" {
            let collaboration = model
                .ancestors(parent)
                .find(|node| family(model.type_name(*node)) == Family::Collaboration)?;
            return Some((collaboration, "messageFlows"));
        }

        match family(type_name) {
            Family::FlowNode | Family::SubProcess | Family::DataReference => {
                flow_container(model, parent, false).map(|c| (c, "flowElements"))
            }
            Family::Connection if is_sequence_flow(type_name) => {
                flow_container(model, parent, false).map(|c| (c, "flowElements"))
            }
            Family::Artifact => flow_container(model, parent, true).map(|c| (c, "artifacts")),
            Family::Connection if type_name == "bpmn:Association" => {
                flow_container(model, parent, true).map(|c| (c, "artifacts"))
            }
            _ => None,
        }
    }
}

fn flow_container(model: &ModelTree, start: ModelRef, allow_collaboration: bool) -> Option<ModelRef> {
    for node in model.ancestors(start) {
        match family(model.type_name(node)) {
            Family::Process | Family::SubProcess => return Some(node),
            Family::Participant => return model.reference(node, "processRef"),
            Family::Collaboration if allow_collaboration => return Some(node),
            Family::Collaboration => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use planum_core::semantic::ModelNode;

    struct Fixture {
        model: ModelTree,
        collaboration: ModelRef,
        participant: ModelRef,
        process: ModelRef,
        lane: ModelRef,
        task: ModelRef,
        sub_process: ModelRef,
        empty_pool: ModelRef,
    }

    fn fixture() -> Fixture {
        let mut model = ModelTree::new();
        let definitions = model.add_node(ModelNode::new("bpmn:Definitions"));
        let collaboration = model.add_node(ModelNode::new("bpmn:Collaboration").with_id("Collaboration_1"));
        let process = model.add_node(ModelNode::new("bpmn:Process").with_id("Process_1"));
        model.attach(definitions, "rootElements", collaboration, None);
        model.attach(definitions, "rootElements", process, None);

        let participant = model.add_node(ModelNode::new("bpmn:Participant").with_id("Participant_1"));
        model.attach(collaboration, "participants", participant, None);
        model.set_reference(participant, "processRef", Some(process));
        let empty_pool = model.add_node(ModelNode::new("bpmn:Participant").with_id("Participant_2"));
        model.attach(collaboration, "participants", empty_pool, None);

        let lane_set = model.add_node(ModelNode::new("bpmn:LaneSet"));
        model.attach(process, "laneSets", lane_set, None);
        let lane = model.add_node(ModelNode::new("bpmn:Lane").with_id("Lane_1"));
        model.attach(lane_set, "lanes", lane, None);

        let task = model.add_node(ModelNode::new("bpmn:Task").with_id("Task_1"));
        model.attach(process, "flowElements", task, None);
        let sub_process = model.add_node(ModelNode::new("bpmn:Transaction").with_id("Transaction_1"));
        model.attach(process, "flowElements", sub_process, None);

        Fixture {
            model,
            collaboration,
            participant,
            process,
            lane,
            task,
            sub_process,
            empty_pool,
        }
    }

    #[test]
    fn test_flow_nodes() {
        let f = fixture();
        let strategy = ProcessContainment;
        let parent = |p| strategy.semantic_parent(&f.model, p, "bpmn:Task");

        assert_eq!(parent(f.participant), Some((f.process, "flowElements")));
        assert_eq!(parent(f.lane), Some((f.process, "flowElements")));
        assert_eq!(parent(f.process), Some((f.process, "flowElements")));
        assert_eq!(parent(f.sub_process), Some((f.sub_process, "flowElements")));
        assert_eq!(parent(f.collaboration), None);
        assert_eq!(parent(f.empty_pool), None);
    }

    #[test]
    fn test_artifacts() {
        let f = fixture();
        let strategy = ProcessContainment;

        assert_eq!(
            strategy.semantic_parent(&f.model, f.participant, "bpmn:TextAnnotation"),
            Some((f.process, "artifacts"))
        );
        assert_eq!(
            strategy.semantic_parent(&f.model, f.sub_process, "bpmn:Association"),
            Some((f.sub_process, "artifacts"))
        );
        assert_eq!(
            strategy.semantic_parent(&f.model, f.collaboration, "bpmn:TextAnnotation"),
            Some((f.collaboration, "artifacts"))
        );
    }

    #[test]
    fn test_flows() {
        let f = fixture();
        let strategy = ProcessContainment;

        assert_eq!(
            strategy.semantic_parent(&f.model, f.task, "bpmn:SequenceFlow"),
            Some((f.process, "flowElements"))
        );
        assert_eq!(
            strategy.semantic_parent(&f.model, f.participant, "bpmn:MessageFlow"),
            Some((f.collaboration, "messageFlows"))
        );
        assert_eq!(
            strategy.semantic_parent(&f.model, f.process, "bpmn:DataInputAssociation"),
            None
        );
    }
}
