//! CLI logic for the Planum diagram tool.
//!
//! Reads a BPMN 2.0 XML document, imports it, optionally applies an edit
//! through the modeling commands and writes the diagram as SVG.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{fs, path::Path};

use log::{info, warn};

use planum::{Modeler, PlanumError, identifier::Id, modeling::ShapeDescriptor};

/// Run the Planum CLI application
///
/// # Errors
///
/// Returns `PlanumError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Parsing and import errors
/// - A refused `--append-annotation` edit
/// - Rendering errors
pub fn run(args: &Args) -> Result<(), PlanumError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing diagram"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let source = fs::read_to_string(&args.input)?;

    let mut modeler = Modeler::new(app_config)?;
    let warnings = modeler.import_xml(&source)?;
    if !warnings.is_empty() {
        warn!(count = warnings.len(); "Document imported with warnings");
    }

    if let Some(target) = &args.append_annotation {
        let annotation = modeler.modeling().append_shape(
            Id::new(target),
            ShapeDescriptor::new("bpmn:TextAnnotation"),
            None,
        )?;
        info!(annotation:% = annotation, target = target; "Appended text annotation");
    }

    modeler.viewer().save_svg_to(Path::new(&args.output))?;

    info!(output_file = args.output; "SVG exported successfully");

    Ok(())
}
