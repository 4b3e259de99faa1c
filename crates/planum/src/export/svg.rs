//! SVG rendering of the element graph.

use log::{debug, info};
use svg::{
    Document,
    node::element::{Circle, Group, Path, Polygon, Polyline, Rectangle, Text},
};

use planum_core::{
    Diagram,
    geometry::{Bounds, Insets, Point},
    graph::{Element, ElementKind},
    identifier::Id,
    semantic::{Family, family, has_external_label},
};

use super::{Error, Exporter};
use crate::{color::Color, config::StyleConfig, label::get_label};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const TRANSIENT_PREFIX: &str = "marker:";
const FONT_SIZE: f32 = 12.0;
const TASK_CORNER_RADIUS: f32 = 10.0;

/// Exports the element graph as a standalone SVG document.
///
/// The document is framed once: an XML declaration followed by a single
/// `<svg>` element whose `viewBox` covers the drawn content plus padding.
#[derive(Debug, Clone)]
pub struct SvgExporter {
    background: Option<Color>,
    stroke: Color,
    fill: Color,
    padding: f32,
}

impl Default for SvgExporter {
    fn default() -> Self {
        Self {
            background: None,
            stroke: Color::default(),
            fill: Color::new("white").unwrap_or_default(),
            padding: StyleConfig::default().padding(),
        }
    }
}

impl SvgExporter {
    /// Creates an exporter styled by `style`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] if a configured colour does not parse.
    pub fn new(style: &StyleConfig) -> Result<Self, Error> {
        let defaults = Self::default();
        Ok(Self {
            background: style.background_color().map_err(Error::Render)?,
            stroke: style.stroke_color().map_err(Error::Render)?.unwrap_or(defaults.stroke),
            fill: style.fill_color().map_err(Error::Render)?.unwrap_or(defaults.fill),
            padding: style.padding(),
        })
    }

    fn render_document(&self, diagram: &Diagram, root: &Element) -> Document {
        let frame = content_bounds(diagram).add_padding(Insets::uniform(self.padding));
        debug!(
            min_x = frame.min_x(),
            min_y = frame.min_y(),
            width = frame.width(),
            height = frame.height();
            "Computed SVG frame"
        );

        let mut doc = Document::new()
            .set(
                "viewBox",
                format!(
                    "{} {} {} {}",
                    frame.min_x(),
                    frame.min_y(),
                    frame.width(),
                    frame.height()
                ),
            )
            .set("width", frame.width())
            .set("height", frame.height());

        if let Some(background) = &self.background {
            doc = doc.add(
                Rectangle::new()
                    .set("x", frame.min_x())
                    .set("y", frame.min_y())
                    .set("width", frame.width())
                    .set("height", frame.height())
                    .set("fill", background),
            );
        }

        let mut group = Group::new().set("data-element-id", root.id().to_string());
        for child in root.children() {
            if let Some(rendered) = self.render_element(diagram, *child) {
                group = group.add(rendered);
            }
        }
        doc.add(group)
    }

    fn render_element(&self, diagram: &Diagram, id: Id) -> Option<Group> {
        let element = diagram.element(id)?;
        if element.type_name().starts_with(TRANSIENT_PREFIX) {
            return None;
        }

        let mut group = Group::new().set("data-element-id", id.to_string());
        match element.kind() {
            ElementKind::Shape => {
                let bounds = element.bounds()?;
                group = self.render_shape(group, element.type_name(), bounds);
                if !has_external_label(element.type_name()) {
                    if let Some(text) = get_label(diagram, id) {
                        group = group.add(label_text(text, bounds.center()));
                    }
                }
            }
            ElementKind::Connection => {
                group = group.add(self.render_connection(element));
            }
            ElementKind::Label => {
                let bounds = element.bounds()?;
                if let Some(text) = get_label(diagram, id) {
                    group = group.add(label_text(text, bounds.center()));
                }
            }
            ElementKind::Root => {}
        }

        for child in element.children() {
            if let Some(rendered) = self.render_element(diagram, *child) {
                group = group.add(rendered);
            }
        }
        Some(group)
    }

    fn render_shape(&self, group: Group, type_name: &str, bounds: Bounds) -> Group {
        let center = bounds.center();
        if type_name.ends_with("Event") {
            let circle = Circle::new()
                .set("cx", center.x())
                .set("cy", center.y())
                .set("r", bounds.width().min(bounds.height()) / 2.0)
                .set("fill", &self.fill)
                .set("stroke", &self.stroke)
                .set("stroke-width", if type_name == "bpmn:EndEvent" { 4 } else { 2 });
            return group.add(circle);
        }
        if type_name.ends_with("Gateway") {
            let points = format!(
                "{},{} {},{} {},{} {},{}",
                center.x(),
                bounds.min_y(),
                bounds.max_x(),
                center.y(),
                center.x(),
                bounds.max_y(),
                bounds.min_x(),
                center.y()
            );
            let diamond = Polygon::new()
                .set("points", points)
                .set("fill", &self.fill)
                .set("stroke", &self.stroke)
                .set("stroke-width", 2);
            return group.add(diamond);
        }

        match family(type_name) {
            Family::Artifact if type_name == "bpmn:TextAnnotation" => {
                let bracket = format!(
                    "M {} {} L {} {} L {} {} L {} {}",
                    bounds.min_x() + 15.0,
                    bounds.min_y(),
                    bounds.min_x(),
                    bounds.min_y(),
                    bounds.min_x(),
                    bounds.max_y(),
                    bounds.min_x() + 15.0,
                    bounds.max_y()
                );
                group.add(
                    Path::new()
                        .set("d", bracket)
                        .set("fill", "none")
                        .set("stroke", &self.stroke),
                )
            }
            Family::Artifact => group.add(
                self.rectangle(bounds, 0.0)
                    .set("fill", "none")
                    .set("stroke-dasharray", "8, 5, 1, 5"),
            ),
            Family::FlowNode | Family::SubProcess => {
                group.add(self.rectangle(bounds, TASK_CORNER_RADIUS))
            }
            _ => group.add(self.rectangle(bounds, 0.0)),
        }
    }

    fn rectangle(&self, bounds: Bounds, radius: f32) -> Rectangle {
        Rectangle::new()
            .set("x", bounds.min_x())
            .set("y", bounds.min_y())
            .set("width", bounds.width())
            .set("height", bounds.height())
            .set("rx", radius)
            .set("fill", &self.fill)
            .set("stroke", &self.stroke)
            .set("stroke-width", 2)
    }

    fn render_connection(&self, element: &Element) -> Polyline {
        let points = element
            .waypoints()
            .iter()
            .map(|p| format!("{},{}", p.x(), p.y()))
            .collect::<Vec<_>>()
            .join(" ");
        let line = Polyline::new()
            .set("points", points)
            .set("fill", "none")
            .set("stroke", &self.stroke)
            .set("stroke-width", 2);
        match element.type_name() {
            "bpmn:MessageFlow" => line.set("stroke-dasharray", "10, 12"),
            "bpmn:Association" => line.set("stroke-dasharray", "0.5, 5").set("stroke-linecap", "round"),
            _ => line,
        }
    }
}

fn label_text(text: &str, center: Point) -> Text {
    Text::new(text)
        .set("x", center.x())
        .set("y", center.y())
        .set("text-anchor", "middle")
        .set("dominant-baseline", "middle")
        .set("font-family", "Arial")
        .set("font-size", FONT_SIZE)
}

/// Smallest bounds around every drawn element, root and transient
/// elements excluded.
fn content_bounds(diagram: &Diagram) -> Bounds {
    diagram
        .graph()
        .filter(|e| e.kind() != ElementKind::Root && !e.type_name().starts_with(TRANSIENT_PREFIX))
        .filter_map(element_bounds)
        .reduce(|acc, bounds| acc.merge(&bounds))
        .unwrap_or_default()
}

fn element_bounds(element: &Element) -> Option<Bounds> {
    if let Some(bounds) = element.bounds() {
        return Some(bounds);
    }
    element
        .waypoints()
        .iter()
        .map(|p| Bounds::new_from_center(*p, Default::default()))
        .reduce(|acc, point| acc.merge(&point))
}

impl Exporter for SvgExporter {
    fn export(&self, diagram: &Diagram) -> Result<String, Error> {
        let root = diagram
            .graph()
            .root()
            .ok_or_else(|| Error::Render("diagram has no root element".to_string()))?;
        info!(elements = diagram.graph().len(); "Exporting SVG");

        let doc = self.render_document(diagram, root);
        debug!("SVG document rendered");
        Ok(format!("{XML_DECLARATION}\n{doc}"))
    }
}
