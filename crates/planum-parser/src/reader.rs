//! Two-pass document reader.
//!
//! The first pass walks the XML tree and builds the [`ModelTree`], folding
//! text content, bounds and waypoints into their owners and queueing every
//! id reference. The second pass resolves the queued references once all
//! ids are known, since documents freely reference elements defined later.

use indexmap::IndexMap;
use log::{debug, trace};
use roxmltree::{Document, Node};

use planum_core::{
    geometry::{Bounds, Point, Size},
    semantic::{ModelNode, ModelRef, ModelTree},
};

use crate::{
    ParsedDocument,
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError, Result},
    schema::{self, Rule},
    span::{Location, Span},
};

struct PendingReference {
    owner: ModelRef,
    name: &'static str,
    target: String,
    many: bool,
    span: Span,
}

pub(crate) struct Reader<'a, 'input> {
    source: &'input str,
    doc: &'a Document<'input>,
    tree: ModelTree,
    collector: DiagnosticCollector,
    pending: Vec<PendingReference>,
    /// Start tag of the first element declaring each id.
    definitions: IndexMap<String, Span>,
}

/// Reads `source` into a model tree.
pub(crate) fn read(source: &str) -> std::result::Result<ParsedDocument, ParseError> {
    let doc = Document::parse(source).map_err(|err| {
        Diagnostic::error(err.to_string())
            .with_code(ErrorCode::E001)
            .with_location(err.pos().into())
            .with_help("the input must be a well-formed XML document")
    })?;

    let mut reader = Reader::new(source, &doc);
    match reader.read_document() {
        Ok(()) => reader.resolve_references(),
        Err(diagnostic) => reader.collector.emit(diagnostic),
    }

    let Reader {
        tree, collector, ..
    } = reader;
    let warnings = collector.finish()?;
    debug!(nodes = tree.len(), warnings = warnings.len(); "Document read");
    Ok(ParsedDocument { tree, warnings })
}

impl<'a, 'input> Reader<'a, 'input> {
    fn new(source: &'input str, doc: &'a Document<'input>) -> Self {
        Self {
            source,
            doc,
            tree: ModelTree::new(),
            collector: DiagnosticCollector::new(),
            pending: Vec::new(),
            definitions: IndexMap::new(),
        }
    }

    fn read_document(&mut self) -> Result<()> {
        let root = self.doc.root_element();
        let is_definitions = root.tag_name().namespace().and_then(schema::prefix) == Some("bpmn")
            && root.tag_name().name() == "definitions";
        if !is_definitions {
            let raw = self.raw_name(root);
            return Err(Diagnostic::error(format!(
                "expected <bpmn:definitions> as document root, found <{raw}>"
            ))
            .with_code(ErrorCode::E101)
            .with_element(raw)
            .with_location(self.location(root))
            .with_label(self.tag_span(root), "document root"));
        }

        let handle = self.add_element(root, "bpmn:Definitions");
        self.tree.set_root(handle);
        self.read_children(root, handle)
    }

    fn read_children(&mut self, xml: Node<'a, 'input>, parent: ModelRef) -> Result<()> {
        let mut waypoints = Vec::new();

        for child in xml.children().filter(Node::is_element) {
            let (prefix, rule) = self.classify(child)?;
            match rule {
                Rule::Node { collection } => {
                    let type_name = schema::type_name(prefix, child.tag_name().name());
                    let handle = self.add_element(child, &type_name);
                    self.tree.attach(parent, collection, handle, None);
                    self.read_children(child, handle)?;
                }
                Rule::Reference { name, many } => {
                    let target = text_content(child);
                    let target = target.trim();
                    if !target.is_empty() {
                        self.pending.push(PendingReference {
                            owner: parent,
                            name,
                            target: target.to_string(),
                            many,
                            span: self.tag_span(child),
                        });
                    }
                }
                Rule::Text { attr } => {
                    self.tree.set_attr(parent, attr, Some(text_content(child)));
                }
                Rule::Bounds => {
                    let bounds = self.bounds(child)?;
                    self.tree.set_bounds(parent, Some(bounds));
                }
                Rule::Waypoint => {
                    waypoints.push(Point::new(
                        self.number(child, "x")?,
                        self.number(child, "y")?,
                    ));
                }
                Rule::Label => self.read_label(child, parent)?,
                Rule::Skip => trace!(element = child.tag_name().name(); "Skipping element"),
            }
        }

        if !waypoints.is_empty() {
            self.tree.set_waypoints(parent, waypoints);
        }
        Ok(())
    }

    fn read_label(&mut self, xml: Node<'a, 'input>, owner: ModelRef) -> Result<()> {
        for child in xml.children().filter(Node::is_element) {
            match self.classify(child)?.1 {
                Rule::Bounds => {
                    let bounds = self.bounds(child)?;
                    self.tree.set_label_bounds(owner, Some(bounds));
                }
                Rule::Skip => {}
                _ => return Err(self.unknown_element(child)),
            }
        }
        Ok(())
    }

    /// Creates a detached node for `xml` and queues its reference attributes.
    fn add_element(&mut self, xml: Node<'a, 'input>, type_name: &str) -> ModelRef {
        let mut node = ModelNode::new(type_name);
        let mut references = Vec::new();

        for attr in xml.attributes() {
            // Vendor and xsi attributes carry nothing the diagram needs.
            if attr.namespace().is_some() {
                continue;
            }
            match attr.name() {
                "id" => node = node.with_id(attr.value()),
                name => match schema::reference_attr(name) {
                    Some(reference) => {
                        references.push((reference, attr.value().trim().to_string()));
                    }
                    None => node = node.with_attr(name, attr.value()),
                },
            }
        }

        let id = node.id().map(str::to_string);
        let handle = self.tree.add_node(node);
        let span = self.tag_span(xml);

        if let Some(id) = id {
            match self.definitions.get(&id).copied() {
                Some(first) => {
                    let warning = Diagnostic::warning(format!("duplicate id <{id}>"))
                        .with_code(ErrorCode::E201)
                        .with_location(self.location(xml))
                        .with_label(span, "redefined here")
                        .with_secondary_label(first, "first defined here")
                        .with_help("references to this id resolve to the first definition");
                    self.collector.emit(warning);
                }
                None => {
                    self.definitions.insert(id, span);
                }
            }
        }

        for (name, target) in references {
            if target.is_empty() {
                continue;
            }
            self.pending.push(PendingReference {
                owner: handle,
                name,
                target,
                many: false,
                span,
            });
        }
        handle
    }

    fn resolve_references(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        trace!(references = pending.len(); "Resolving references");

        for reference in pending {
            match self.tree.by_id(&reference.target) {
                Some(target) if reference.many => {
                    self.tree
                        .insert_reference(reference.owner, reference.name, target, None);
                }
                Some(target) => {
                    self.tree
                        .set_reference(reference.owner, reference.name, Some(target));
                }
                // The importer corrects an unresolvable plane root and reports it.
                None if self.is_plane_root(&reference) => {
                    trace!(reference:% = reference.target; "Leaving plane root unresolved");
                }
                None => {
                    let owner = self.tree.describe(reference.owner);
                    let warning =
                        Diagnostic::warning(format!("unresolved reference <{}>", reference.target))
                            .with_code(ErrorCode::E200)
                            .with_location(self.doc.text_pos_at(reference.span.start()).into())
                            .with_label(reference.span, format!("`{}` of {owner}", reference.name));
                    self.collector.emit(warning);
                }
            }
        }
    }

    fn is_plane_root(&self, reference: &PendingReference) -> bool {
        reference.name == "bpmnElement"
            && self.tree.type_name(reference.owner) == "bpmndi:BPMNPlane"
    }

    fn classify(&self, xml: Node<'a, 'input>) -> Result<(&'static str, Rule)> {
        let tag = xml.tag_name();
        tag.namespace()
            .and_then(schema::prefix)
            .and_then(|prefix| schema::rule(prefix, tag.name()).map(|rule| (prefix, rule)))
            .ok_or_else(|| self.unknown_element(xml))
    }

    fn unknown_element(&self, xml: Node<'a, 'input>) -> Diagnostic {
        let raw = self.raw_name(xml);
        let help = if xml.tag_name().namespace().is_none() {
            "declare the BPMN model namespace for this element"
        } else {
            "vendor content belongs inside <extensionElements>"
        };
        Diagnostic::error(format!("unrecognized element <{raw}>"))
            .with_code(ErrorCode::E100)
            .with_element(raw)
            .with_location(self.location(xml))
            .with_label(self.tag_span(xml), "not part of the BPMN 2.0 vocabulary")
            .with_help(help)
    }

    fn bounds(&self, xml: Node<'a, 'input>) -> Result<Bounds> {
        let origin = Point::new(self.number(xml, "x")?, self.number(xml, "y")?);
        let size = Size::new(self.number(xml, "width")?, self.number(xml, "height")?);
        Ok(Bounds::new_from_top_left(origin, size))
    }

    fn number(&self, xml: Node<'a, 'input>, attr: &str) -> Result<f32> {
        let raw = self.raw_name(xml);
        let Some(value) = xml.attribute(attr) else {
            return Err(Diagnostic::error(format!(
                "missing attribute `{attr}` on <{raw}>"
            ))
            .with_code(ErrorCode::E103)
            .with_location(self.location(xml))
            .with_label(self.tag_span(xml), "declared here"));
        };
        value.trim().parse::<f32>().map_err(|_| {
            Diagnostic::error(format!(
                "invalid number `{value}` for attribute `{attr}` of <{raw}>"
            ))
            .with_code(ErrorCode::E102)
            .with_location(self.location(xml))
            .with_label(self.tag_span(xml), "expected a number")
        })
    }

    fn location(&self, xml: Node<'a, 'input>) -> Location {
        self.doc.text_pos_at(xml.range().start).into()
    }

    /// Tag name as written in the source, prefix included.
    fn raw_name(&self, xml: Node<'a, 'input>) -> &'input str {
        let rest = self.source.get(xml.range().start + 1..).unwrap_or_default();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        &rest[..end]
    }

    /// Span of `<` plus the tag name.
    fn tag_span(&self, xml: Node<'a, 'input>) -> Span {
        let start = xml.range().start;
        Span::new(start..start + 1 + self.raw_name(xml).len())
    }
}

fn text_content(xml: Node<'_, '_>) -> String {
    xml.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}
