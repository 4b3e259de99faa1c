//! Planum - import, edit and export BPMN process diagrams.
//!
//! A [`Viewer`] parses a document, reconciles it with its diagram-interchange
//! plane and exposes the resulting element graph. A [`Modeler`] adds the
//! undoable editing commands of the [`modeling`] catalog on top.

pub mod color;
pub mod config;
pub mod export;
pub mod import;
pub mod label;
pub mod modeling;

mod error;

pub use planum_core::{Diagram, events, geometry, graph, identifier, overlays, semantic};

pub use error::PlanumError;
pub use import::Warning;

use std::{path::Path, rc::Rc};

use log::{debug, info, warn};

use planum_core::events::Payload;

use config::AppConfig;
use export::{Exporter, SvgExporter};
use import::Importer;
use modeling::{ContainmentStrategy, Modeling, ProcessContainment};

/// The document [`Modeler::create_diagram`] starts from.
const INITIAL_DIAGRAM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
    xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI"
    xmlns:dc="http://www.omg.org/spec/DD/20100524/DC"
    id="Definitions_1" targetNamespace="http://bpmn.io/schema/bpmn">
  <bpmn:process id="Process_1" isExecutable="false">
    <bpmn:startEvent id="StartEvent_1" />
  </bpmn:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1">
      <bpmndi:BPMNShape id="StartEvent_1_di" bpmnElement="StartEvent_1">
        <dc:Bounds x="173" y="102" width="36" height="36" />
      </bpmndi:BPMNShape>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>"#;

/// Read-only diagram session.
///
/// # Examples
///
/// ```
/// use planum::{Viewer, config::AppConfig};
///
/// let xml = r#"<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
///     xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" id="Definitions_1">
///   <bpmn:process id="Process_1" />
///   <bpmndi:BPMNDiagram id="BPMNDiagram_1">
///     <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1" />
///   </bpmndi:BPMNDiagram>
/// </bpmn:definitions>"#;
///
/// let mut viewer = Viewer::new(AppConfig::default());
/// let warnings = viewer.import_xml(xml).unwrap();
/// assert!(warnings.is_empty());
/// assert!(viewer.save_svg().unwrap().contains("<svg"));
/// ```
#[derive(Debug)]
pub struct Viewer {
    config: AppConfig,
    diagram: Diagram,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl Viewer {
    pub fn new(config: AppConfig) -> Self {
        let diagram = Diagram::with_history_limit(config.history().max_entries());
        Self { config, diagram }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn diagram_mut(&mut self) -> &mut Diagram {
        &mut self.diagram
    }

    /// Imports `xml`, replacing whatever the session showed before.
    ///
    /// Fires `import.start`, then `import.success` or `import.error`.
    /// Parser warnings come before importer warnings.
    ///
    /// # Errors
    ///
    /// - [`PlanumError::Parse`] if the document cannot be read.
    /// - [`PlanumError::Import`] if no diagram can be drawn from it.
    pub fn import_xml(&mut self, xml: &str) -> Result<Vec<Warning>, PlanumError> {
        let (result, warnings) = self.import(xml);
        result.map(|()| warnings)
    }

    /// Callback form of [`Viewer::import_xml`]: `done` receives the error, if
    /// any, and every warning collected up to that point.
    pub fn import_xml_with<F>(&mut self, xml: &str, done: F)
    where
        F: FnOnce(Option<&PlanumError>, &[Warning]),
    {
        let (result, warnings) = self.import(xml);
        done(result.as_ref().err(), &warnings);
    }

    fn import(&mut self, xml: &str) -> (Result<(), PlanumError>, Vec<Warning>) {
        info!(bytes = xml.len(); "Importing document");
        self.diagram.fire("import.start", Payload::Empty);

        let parsed = match planum_parser::parse(xml) {
            Ok(parsed) => parsed,
            Err(err) => {
                info!(err:% = err; "Document could not be parsed");
                self.diagram
                    .fire("import.error", Payload::Import { warnings: 0 });
                return (Err(PlanumError::new_parse_error(err, xml)), Vec::new());
            }
        };

        let (model, diagnostics) = parsed.into_parts();
        let mut warnings: Vec<Warning> = diagnostics
            .iter()
            .map(|diagnostic| {
                warn!(code:? = diagnostic.code(); "{}", diagnostic.message());
                let warning = Warning::new(diagnostic.message());
                match diagnostic.element() {
                    Some(element) => warning.with_element(element),
                    None => warning,
                }
            })
            .collect();

        self.diagram.clear();
        self.diagram.set_model(model);
        let mut importer = Importer::new(&mut self.diagram, self.config.import());
        let result = importer.run();
        warnings.extend(importer.into_warnings());

        let payload = Payload::Import {
            warnings: warnings.len(),
        };
        match result {
            Ok(()) => {
                self.diagram.fire("import.success", payload);
                (Ok(()), warnings)
            }
            Err(err) => {
                self.diagram.fire("import.error", payload);
                (Err(err.into()), warnings)
            }
        }
    }

    /// Renders the current graph as SVG.
    pub fn save_svg(&self) -> Result<String, PlanumError> {
        let exporter = SvgExporter::new(self.config.style())?;
        Ok(exporter.export(&self.diagram)?)
    }

    /// Renders the current graph as SVG into `path`.
    pub fn save_svg_to(&self, path: &Path) -> Result<(), PlanumError> {
        let exporter = SvgExporter::new(self.config.style())?;
        exporter.export_to_file(&self.diagram, path)?;
        Ok(())
    }
}

/// Editable diagram session: a [`Viewer`] with the modeling commands
/// registered on its command stack.
#[derive(Debug)]
pub struct Modeler {
    viewer: Viewer,
}

impl Modeler {
    /// Creates a modeler with the default [`ProcessContainment`] rules.
    pub fn new(config: AppConfig) -> Result<Self, PlanumError> {
        Self::with_containment(config, Rc::new(ProcessContainment))
    }

    /// Creates a modeler resolving semantic parents through `containment`.
    pub fn with_containment(
        config: AppConfig,
        containment: Rc<dyn ContainmentStrategy>,
    ) -> Result<Self, PlanumError> {
        let mut viewer = Viewer::new(config);
        let label_size = viewer.config().import().label_size();
        modeling::register(viewer.diagram.commands_mut(), containment, label_size)?;
        debug!("Modeling commands registered");
        Ok(Self { viewer })
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn diagram(&self) -> &Diagram {
        self.viewer.diagram()
    }

    pub fn diagram_mut(&mut self) -> &mut Diagram {
        self.viewer.diagram_mut()
    }

    /// See [`Viewer::import_xml`].
    pub fn import_xml(&mut self, xml: &str) -> Result<Vec<Warning>, PlanumError> {
        self.viewer.import_xml(xml)
    }

    /// Starts from an empty process holding one start event.
    pub fn create_diagram(&mut self) -> Result<Vec<Warning>, PlanumError> {
        self.viewer.import_xml(INITIAL_DIAGRAM)
    }

    pub fn modeling(&mut self) -> Modeling<'_> {
        Modeling::new(self.viewer.diagram_mut())
    }

    pub fn undo(&mut self) -> Result<bool, PlanumError> {
        Ok(self.viewer.diagram_mut().undo()?)
    }

    pub fn redo(&mut self) -> Result<bool, PlanumError> {
        Ok(self.viewer.diagram_mut().redo()?)
    }

    /// See [`Viewer::save_svg`].
    pub fn save_svg(&self) -> Result<String, PlanumError> {
        self.viewer.save_svg()
    }
}
