use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};

use planum_core::{
    Diagram,
    events::Payload,
    geometry::{Bounds, Point},
    graph::Element,
    identifier::Id,
    semantic::{Family, ModelRef, ModelTree, family, has_external_label, label_attr, local_name},
};

use super::{ImportError, ImportState, Warning};
use crate::{config::ImportConfig, label};

const SYNTHETIC_ORIGIN: f32 = 50.0;
const SYNTHETIC_SPACING: f32 = 150.0;

/// Work that has to wait until the rest of its container is drawn.
#[derive(Debug, Clone, Copy)]
enum Deferred {
    Node { node: ModelRef, parent: Id },
    Connection { node: ModelRef, parent: Id },
}

/// Builds the element graph of a session from its semantic tree.
///
/// # Examples
///
/// ```
/// use planum::{config::ImportConfig, import::{ImportState, Importer}};
/// use planum_core::Diagram;
///
/// let xml = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
///     xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" id="Definitions_1">
///   <bpmn:process id="Process_1" />
///   <bpmndi:BPMNDiagram id="BPMNDiagram_1">
///     <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1" />
///   </bpmndi:BPMNDiagram>
/// </bpmn:definitions>"#;
///
/// let mut diagram = Diagram::new();
/// diagram.set_model(planum_parser::parse(xml).unwrap().into_parts().0);
///
/// let config = ImportConfig::default();
/// let mut importer = Importer::new(&mut diagram, &config);
/// importer.run().unwrap();
/// assert_eq!(importer.state(), ImportState::Completed);
/// assert!(importer.warnings().is_empty());
/// ```
pub struct Importer<'a> {
    diagram: &'a mut Diagram,
    config: &'a ImportConfig,
    state: ImportState,
    warnings: Vec<Warning>,
    rendered: IndexMap<ModelRef, Id>,
    handled: IndexSet<ModelRef>,
    deferred: VecDeque<Deferred>,
    synthetic: usize,
}

impl<'a> Importer<'a> {
    pub fn new(diagram: &'a mut Diagram, config: &'a ImportConfig) -> Self {
        Self {
            diagram,
            config,
            state: ImportState::NotStarted,
            warnings: Vec::new(),
            rendered: IndexMap::new(),
            handled: IndexSet::new(),
            deferred: VecDeque::new(),
            synthetic: 0,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    /// Number of graph elements created so far, labels excluded.
    pub fn created(&self) -> usize {
        self.rendered.len()
    }

    /// Runs the import.
    ///
    /// # Errors
    ///
    /// - [`ImportError::NoDiagram`] if the document has no diagram plane.
    /// - [`ImportError::UnresolvableDi`] if the plane names no root and no
    ///   unambiguous substitute exists.
    /// - [`ImportError::EmptyDiagram`] if the root cannot be drawn.
    /// - [`ImportError::Graph`] if the root cannot be installed.
    pub fn run(&mut self) -> Result<(), ImportError> {
        self.state = ImportState::InProgress;
        info!(alias = self.config.element_alias(); "Import started");

        let result = self.import_document();
        match &result {
            Ok(()) => {
                self.state = ImportState::Completed;
                info!(
                    elements = self.rendered.len(),
                    warnings = self.warnings.len();
                    "Import completed"
                );
            }
            Err(err) => {
                self.state = ImportState::Failed;
                info!(err:% = err, warnings = self.warnings.len(); "Import failed");
            }
        }
        result
    }

    fn import_document(&mut self) -> Result<(), ImportError> {
        let (definitions, plane) = self.find_plane()?;
        self.register_di(plane);
        let root = self.resolve_root(definitions, plane)?;
        let root_id = self.create_root(root)?;

        if family(self.model().type_name(root)) == Family::Collaboration {
            self.import_collaboration(root, root_id);
        } else {
            self.import_process(root, root_id);
        }
        self.drain_deferred();
        Ok(())
    }

    fn model(&self) -> &ModelTree {
        self.diagram.model()
    }

    fn warn(&mut self, message: String, element: Option<String>) {
        warn!(element:? = element; "{message}");
        let warning = Warning::new(message);
        self.warnings.push(match element {
            Some(element) => warning.with_element(element),
            None => warning,
        });
    }

    fn node_id(&self, node: ModelRef) -> Option<String> {
        self.model().node(node).id().map(str::to_string)
    }

    fn find_plane(&self) -> Result<(ModelRef, ModelRef), ImportError> {
        let model = self.model();
        let definitions = model.root().ok_or(ImportError::NoDiagram)?;
        model
            .collection(definitions, "diagrams")
            .iter()
            .find_map(|d| model.collection(*d, "plane").first().copied())
            .map(|plane| (definitions, plane))
            .ok_or(ImportError::NoDiagram)
    }

    /// Links interchange records to the nodes they describe. The first
    /// record of a node wins.
    fn register_di(&mut self, plane: ModelRef) {
        let records: Vec<ModelRef> = std::iter::once(plane)
            .chain(self.model().collection(plane, "planeElement").iter().copied())
            .collect();

        for record in records {
            let model = self.model();
            match model.reference(record, "bpmnElement") {
                // The plane is corrected separately.
                None if record == plane => {}
                None => {
                    let message = format!("no bpmnElement referenced in {}", model.describe(record));
                    let element = self.node_id(record);
                    self.warn(message, element);
                }
                Some(target) if model.di(target).is_some() => {
                    let message = format!("multiple DI elements defined for {}", model.describe(target));
                    let element = self.node_id(target);
                    self.warn(message, element);
                }
                Some(target) => {
                    self.diagram.model_mut().set_di(target, Some(record));
                }
            }
        }
    }

    fn resolve_root(&mut self, definitions: ModelRef, plane: ModelRef) -> Result<ModelRef, ImportError> {
        let model = self.model();
        if let Some(root) = model.reference(plane, "bpmnElement") {
            return Ok(root);
        }

        let plane_desc = model.describe(plane);
        let roots = model.collection(definitions, "rootElements");
        let of_family = |wanted: Family| -> Vec<ModelRef> {
            roots
                .iter()
                .copied()
                .filter(|r| family(model.type_name(*r)) == wanted)
                .collect()
        };
        let collaborations = of_family(Family::Collaboration);
        let processes = of_family(Family::Process);
        let substitute = match (collaborations.as_slice(), processes.as_slice()) {
            ([single], _) | ([], [single]) => Some(*single),
            _ => None,
        };
        let substitute_desc = substitute.map(|root| model.describe(root));

        let plane_id = self.node_id(plane);
        self.warn(format!("no bpmnElement referenced in {plane_desc}"), plane_id.clone());
        let (Some(root), Some(root_desc)) = (substitute, substitute_desc) else {
            return Err(ImportError::UnresolvableDi(plane_desc));
        };
        self.warn(
            format!("correcting missing bpmnElement on {plane_desc} to {root_desc}"),
            plane_id,
        );

        let model = self.diagram.model_mut();
        model.set_reference(plane, "bpmnElement", Some(root));
        if model.di(root).is_none() {
            model.set_di(root, Some(plane));
        }
        debug!(root = root_desc; "Corrected plane root");
        Ok(root)
    }

    fn create_root(&mut self, root: ModelRef) -> Result<Id, ImportError> {
        let model = self.model();
        let type_name = model.type_name(root).to_string();
        if !family(&type_name).is_root_candidate() {
            let message = format!("unsupported root element {}", model.describe(root));
            let element = self.node_id(root);
            self.warn(message, element);
            return Err(ImportError::EmptyDiagram);
        }

        let id = element_id(model, root);
        self.diagram
            .set_root(Element::root(id, type_name).with_business_object(root))?;
        self.rendered.insert(root, id);
        self.announce(id);
        Ok(id)
    }

    fn announce(&mut self, id: Id) {
        let event = format!("{}.added", self.config.element_alias());
        self.diagram.fire(&event, Payload::Element(id));
    }

    fn import_collaboration(&mut self, collaboration: ModelRef, context: Id) {
        let model = self.model();
        let participants = model.collection(collaboration, "participants").to_vec();
        let message_flows = model.collection(collaboration, "messageFlows").to_vec();
        let conversations = model.collection(collaboration, "conversations").to_vec();

        for participant in participants {
            self.import_participant(participant, context);
        }
        self.import_artifacts(collaboration, context);
        for node in message_flows {
            self.deferred.push_back(Deferred::Connection { node, parent: context });
        }
        for conversation in conversations {
            self.unsupported(conversation, collaboration);
        }
    }

    fn import_participant(&mut self, participant: ModelRef, context: Id) {
        let shape = self.visit(participant, context);
        if let Some(process) = self.model().reference(participant, "processRef") {
            self.import_process(process, shape.unwrap_or(context));
        }
    }

    fn import_process(&mut self, process: ModelRef, context: Id) {
        if !self.handled.insert(process) {
            debug!(process = self.model().describe(process); "Process already imported");
            return;
        }
        let lane_sets = self.model().collection(process, "laneSets").to_vec();
        for lane_set in lane_sets {
            self.import_lane_set(lane_set, context);
        }
        self.import_flow_elements(process, context);
        self.import_artifacts(process, context);
    }

    fn import_lane_set(&mut self, lane_set: ModelRef, context: Id) {
        let lanes = self.model().collection(lane_set, "lanes").to_vec();
        for lane in lanes {
            let shape = self.visit(lane, context);
            let children = self.model().collection(lane, "childLaneSet").to_vec();
            for child in children {
                self.import_lane_set(child, shape.unwrap_or(context));
            }
        }
    }

    fn import_flow_elements(&mut self, container: ModelRef, context: Id) {
        let elements = self.model().collection(container, "flowElements").to_vec();
        for node in elements {
            let type_name = self.model().type_name(node);
            match family(type_name) {
                Family::Connection => {
                    self.deferred.push_back(Deferred::Connection { node, parent: context });
                }
                Family::FlowNode if type_name == "bpmn:BoundaryEvent" => {
                    self.deferred.push_front(Deferred::Node { node, parent: context });
                }
                Family::FlowNode => {
                    self.visit(node, context);
                    self.defer_data_associations(node, context);
                }
                Family::SubProcess => {
                    let inner = self.visit(node, context).unwrap_or(context);
                    self.import_flow_elements(node, inner);
                    self.import_artifacts(node, inner);
                    self.defer_data_associations(node, context);
                }
                Family::DataReference => {
                    self.visit(node, context);
                }
                Family::NonVisual => {}
                _ => self.unsupported(node, container),
            }
        }
    }

    fn import_artifacts(&mut self, container: ModelRef, context: Id) {
        let artifacts = self.model().collection(container, "artifacts").to_vec();
        for node in artifacts {
            match family(self.model().type_name(node)) {
                Family::Connection => {
                    self.deferred.push_back(Deferred::Connection { node, parent: context });
                }
                Family::Artifact => {
                    self.visit(node, context);
                }
                _ => self.unsupported(node, container),
            }
        }
    }

    fn defer_data_associations(&mut self, node: ModelRef, context: Id) {
        for collection in ["dataInputAssociations", "dataOutputAssociations"] {
            let associations = self.model().collection(node, collection).to_vec();
            for association in associations {
                self.deferred.push_back(Deferred::Connection {
                    node: association,
                    parent: context,
                });
            }
        }
    }

    fn unsupported(&mut self, node: ModelRef, context: ModelRef) {
        let model = self.model();
        let message = format!(
            "unrecognized flowElement {} in context {}",
            model.describe(node),
            model.describe(context)
        );
        let element = self.node_id(node);
        self.warn(message, element);
    }

    /// Retries deferred work until no more of it can be drawn.
    fn drain_deferred(&mut self) {
        let mut pending = std::mem::take(&mut self.deferred);
        while !pending.is_empty() {
            let mut progressed = false;
            let mut waiting = VecDeque::new();
            while let Some(item) = pending.pop_front() {
                match item {
                    Deferred::Node { node, parent } => {
                        self.visit(node, parent);
                        progressed = true;
                    }
                    Deferred::Connection { node, parent } if self.ends_drawn(node) => {
                        self.visit(node, parent);
                        progressed = true;
                    }
                    Deferred::Connection { .. } => waiting.push_back(item),
                }
            }
            waiting.append(&mut self.deferred);

            if !progressed {
                for item in waiting {
                    if let Deferred::Connection { node, .. } = item {
                        self.report_unconnected(node);
                    }
                }
                return;
            }
            debug!(waiting = waiting.len(); "Retrying deferred connections");
            pending = waiting;
        }
    }

    fn ends_drawn(&self, node: ModelRef) -> bool {
        let (source, target) = semantic_ends(self.model(), node);
        [source, target]
            .into_iter()
            .all(|end| end.is_some_and(|end| self.rendered.contains_key(&end)))
    }

    fn report_unconnected(&mut self, node: ModelRef) {
        let (source, target) = semantic_ends(self.model(), node);
        for (end, property) in [(source, "sourceRef"), (target, "targetRef")] {
            let model = self.model();
            let message = match end {
                Some(end) if self.rendered.contains_key(&end) => continue,
                Some(end) => format!(
                    "element {} referenced by {}#{property} not yet drawn",
                    model.describe(end),
                    model.describe(node)
                ),
                None => format!("missing {property} on {}", model.describe(node)),
            };
            let element = self.node_id(node);
            self.warn(message, element);
        }
    }

    /// Creates the graph element of `node` under `parent`.
    fn visit(&mut self, node: ModelRef, parent: Id) -> Option<Id> {
        if self.rendered.contains_key(&node) {
            let message = format!("already rendered {}", self.model().describe(node));
            let element = self.node_id(node);
            self.warn(message, element);
            return None;
        }

        let type_name = self.model().type_name(node).to_string();
        let element = if family(&type_name) == Family::Connection {
            self.connection_element(node, &type_name)?
        } else {
            self.shape_element(node, &type_name)?
        };

        let id = element.id();
        if let Err(err) = self.diagram.add_element(element, parent, None) {
            let message = format!("failed to import {}: {err}", self.model().describe(node));
            let element = self.node_id(node);
            self.warn(message, element);
            return None;
        }
        self.rendered.insert(node, id);
        self.announce(id);
        self.add_external_label(node, id, parent);
        Some(id)
    }

    fn shape_element(&mut self, node: ModelRef, type_name: &str) -> Option<Element> {
        let model = self.model();
        let id = element_id(model, node);
        let bounds = match model.di(node).and_then(|di| model.node(di).bounds()) {
            Some(bounds) => bounds,
            None => self.synthetic_bounds(node, type_name)?,
        };
        Some(Element::shape(id, type_name, bounds).with_business_object(node))
    }

    fn connection_element(&mut self, node: ModelRef, type_name: &str) -> Option<Element> {
        let model = self.model();
        let id = element_id(model, node);
        let (source, target) = semantic_ends(model, node);
        let source = source.and_then(|s| self.rendered.get(&s).copied());
        let target = target.and_then(|t| self.rendered.get(&t).copied());
        let (Some(source), Some(target)) = (source, target) else {
            self.report_unconnected(node);
            return None;
        };

        let waypoints = model
            .di(node)
            .map(|di| model.node(di).waypoints().to_vec())
            .filter(|waypoints| waypoints.len() >= 2);
        let waypoints = match waypoints {
            Some(waypoints) => waypoints,
            None => {
                if !self.missing_di(node) {
                    return None;
                }
                vec![self.anchor(source)?, self.anchor(target)?]
            }
        };

        Some(
            Element::connection(id, type_name, source, target, waypoints)
                .with_business_object(node),
        )
    }

    /// Reports a node without interchange record; returns true if it should
    /// still be drawn.
    fn missing_di(&mut self, node: ModelRef) -> bool {
        let desc = self.model().describe(node);
        let element = self.node_id(node);
        if self.config.synthesize_missing_di() {
            self.warn(format!("missing DI for {desc}; using synthetic placement"), element);
            true
        } else {
            self.warn(format!("missing DI for {desc}; element skipped"), element);
            false
        }
    }

    fn synthetic_bounds(&mut self, node: ModelRef, type_name: &str) -> Option<Bounds> {
        if !self.missing_di(node) {
            return None;
        }
        let origin = Point::new(
            SYNTHETIC_ORIGIN + self.synthetic as f32 * SYNTHETIC_SPACING,
            SYNTHETIC_ORIGIN,
        );
        self.synthetic += 1;
        Some(Bounds::new_from_top_left(origin, self.config.default_size(type_name)))
    }

    /// Point a synthetic connection attaches to on an element.
    fn anchor(&self, id: Id) -> Option<Point> {
        let element = self.diagram.element(id)?;
        match element.bounds() {
            Some(bounds) => Some(bounds.center()),
            None => match element.waypoints() {
                [first, .., last] => Some(first.midpoint(*last)),
                _ => None,
            },
        }
    }

    fn add_external_label(&mut self, node: ModelRef, target: Id, parent: Id) {
        let model = self.model();
        let type_name = model.type_name(node);
        if !has_external_label(type_name)
            || model.attr(node, label_attr(type_name)).is_none_or(str::is_empty)
        {
            return;
        }

        let bounds = match model.di(node).and_then(|di| model.node(di).label_bounds()) {
            Some(bounds) => bounds,
            None => match self
                .diagram
                .element(target)
                .and_then(|e| label::external_label_bounds(e, self.config.label_size()))
            {
                Some(bounds) => bounds,
                None => return,
            },
        };

        let label = Element::label(target.with_suffix("_label"), "label", bounds, target)
            .with_business_object(node);
        if let Err(err) = self.diagram.add_element(label, parent, None) {
            let message = format!("failed to add label of {}: {err}", self.model().describe(node));
            let element = self.node_id(node);
            self.warn(message, element);
        }
    }
}

/// Graph id of a semantic node; anonymous nodes get a positional id.
fn element_id(model: &ModelTree, node: ModelRef) -> Id {
    let record = model.node(node);
    match record.id() {
        Some(id) => Id::new(id),
        None => Id::numbered(local_name(record.type_name()), node.index()),
    }
}

/// Semantic source and target of a connection node.
///
/// Data associations only name their outer end; the inner end is the
/// activity that owns them.
fn semantic_ends(model: &ModelTree, node: ModelRef) -> (Option<ModelRef>, Option<ModelRef>) {
    let end = |name: &str| {
        model
            .reference(node, name)
            .or_else(|| model.reference_list(node, name).first().copied())
    };
    match model.type_name(node) {
        "bpmn:DataInputAssociation" => (end("sourceRef"), model.parent(node)),
        "bpmn:DataOutputAssociation" => (model.parent(node), end("targetRef")),
        _ => (end("sourceRef"), end("targetRef")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planum_core::semantic::ModelNode;

    #[test]
    fn test_semantic_ends() {
        let mut model = ModelTree::new();
        let task = model.add_node(ModelNode::new("bpmn:Task").with_id("Task_1"));
        let store = model.add_node(ModelNode::new("bpmn:DataStoreReference").with_id("Store_1"));
        let input = model.add_node(ModelNode::new("bpmn:DataInputAssociation"));
        model.attach(task, "dataInputAssociations", input, None);
        model.insert_reference(input, "sourceRef", store, None);
        let output = model.add_node(ModelNode::new("bpmn:DataOutputAssociation"));
        model.attach(task, "dataOutputAssociations", output, None);
        model.set_reference(output, "targetRef", Some(store));

        assert_eq!(semantic_ends(&model, input), (Some(store), Some(task)));
        assert_eq!(semantic_ends(&model, output), (Some(task), Some(store)));
    }

    #[test]
    fn test_element_id() {
        let mut model = ModelTree::new();
        let named = model.add_node(ModelNode::new("bpmn:Task").with_id("Task_1"));
        let anonymous = model.add_node(ModelNode::new("bpmn:Association"));

        assert_eq!(element_id(&model, named), Id::new("Task_1"));
        assert_eq!(element_id(&model, anonymous), Id::numbered("Association", 1));
    }
}
