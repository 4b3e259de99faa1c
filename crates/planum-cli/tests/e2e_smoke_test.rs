use std::fs;

use tempfile::tempdir;

use planum::PlanumError;
use planum_cli::{Args, run};

const PROCESS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
    xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI"
    xmlns:dc="http://www.omg.org/spec/DD/20100524/DC"
    xmlns:di="http://www.omg.org/spec/DD/20100524/DI" id="Definitions_1">
  <bpmn:process id="Process_1">
    <bpmn:startEvent id="StartEvent_1" name="Order received" />
    <bpmn:task id="Task_1" name="Check stock" />
    <bpmn:sequenceFlow id="SequenceFlow_1" sourceRef="StartEvent_1" targetRef="Task_1" />
  </bpmn:process>
  <bpmndi:BPMNDiagram id="BPMNDiagram_1">
    <bpmndi:BPMNPlane id="BPMNPlane_1" bpmnElement="Process_1">
      <bpmndi:BPMNShape id="StartEvent_1_di" bpmnElement="StartEvent_1">
        <dc:Bounds x="100" y="100" width="36" height="36" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="Task_1_di" bpmnElement="Task_1">
        <dc:Bounds x="200" y="78" width="100" height="80" />
      </bpmndi:BPMNShape>
      <bpmndi:BPMNEdge id="SequenceFlow_1_di" bpmnElement="SequenceFlow_1">
        <di:waypoint x="136" y="118" />
        <di:waypoint x="200" y="118" />
      </bpmndi:BPMNEdge>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>"#;

fn args(input: &std::path::Path, output: &std::path::Path) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        output: output.to_string_lossy().to_string(),
        config: None,
        log_level: "off".to_string(),
        append_annotation: None,
    }
}

#[test]
fn e2e_export_process() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("order.bpmn");
    let output = temp_dir.path().join("order.svg");
    fs::write(&input, PROCESS).unwrap();

    run(&args(&input, &output)).expect("Export should succeed");

    let svg = fs::read_to_string(&output).unwrap();
    assert!(svg.starts_with("<?xml"));
    assert_eq!(svg.matches("<svg").count(), 1);
    assert!(svg.contains("\nCheck stock\n"));
    assert!(svg.contains("\nOrder received\n"));
}

#[test]
fn e2e_append_annotation() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("order.bpmn");
    let output = temp_dir.path().join("order.svg");
    fs::write(&input, PROCESS).unwrap();

    let mut args = args(&input, &output);
    args.append_annotation = Some("Task_1".to_string());
    run(&args).expect("Export should succeed");

    let svg = fs::read_to_string(&output).unwrap();
    assert!(svg.contains(r#"data-element-id="TextAnnotation_1""#));
    assert!(svg.contains(r#"data-element-id="Association_1""#));
}

#[test]
fn e2e_append_annotation_unknown_element() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("order.bpmn");
    let output = temp_dir.path().join("order.svg");
    fs::write(&input, PROCESS).unwrap();

    let mut args = args(&input, &output);
    args.append_annotation = Some("Task_404".to_string());
    assert!(run(&args).is_err());
    assert!(!output.exists());
}

#[test]
fn e2e_explicit_config() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("order.bpmn");
    let output = temp_dir.path().join("order.svg");
    let config = temp_dir.path().join("config.toml");
    fs::write(&input, PROCESS).unwrap();
    fs::write(&config, "[style]\nbackground_color = \"#fafafa\"\n").unwrap();

    let mut args = args(&input, &output);
    args.config = Some(config.to_string_lossy().to_string());
    run(&args).expect("Export should succeed");

    let svg = fs::read_to_string(&output).unwrap();
    assert_eq!(svg.matches("<rect").count(), 2, "background plus task");
}

#[test]
fn e2e_invalid_document() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let input = temp_dir.path().join("broken.bpmn");
    let output = temp_dir.path().join("broken.svg");
    fs::write(&input, "<bpmn:definitions").unwrap();

    let err = run(&args(&input, &output)).unwrap_err();
    assert!(matches!(err, PlanumError::Parse { .. }));
    assert!(!output.exists());
}

#[test]
fn e2e_missing_input() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let err = run(&args(
        &temp_dir.path().join("absent.bpmn"),
        &temp_dir.path().join("absent.svg"),
    ))
    .unwrap_err();
    assert!(matches!(err, PlanumError::Io(_)));
}
