//! Integration tests for the DiagramBuilder API
//!
//! These tests verify that the public API works and is usable.

use tracery::{
    DiagramBuilder, GraphmlContext, TraceryError,
    config::{AppConfig, OutputConfig, StyleConfig},
    metadata,
    model::DiagramKind,
};

#[test]
fn test_parse_every_family() {
    let source = "@startuml\nAlice -> Bob : hello\n@enduml\n\
                  @startuml\nrobust WB\n@0\nWB is Idle\n@enduml\n\
                  @startebnf\ndigit = \"0\" | \"1\" ;\n@endebnf\n\
                  @startuml\nclass Car\n@enduml\n\
                  @startuml\n[comp1]\n@enduml\n";

    let builder = DiagramBuilder::default();
    let diagrams = builder.parse(source).expect("Failed to parse diagrams");
    let kinds: Vec<_> = diagrams.iter().map(|d| d.diagram().kind()).collect();
    assert_eq!(
        kinds,
        [
            DiagramKind::Sequence,
            DiagramKind::Timing,
            DiagramKind::Ebnf,
            DiagramKind::Class,
            DiagramKind::Component
        ]
    );

    for diagram in &diagrams {
        let svg = builder
            .render_svg(diagram)
            .unwrap_or_else(|err| panic!("Failed to render {:?}: {err}", diagram.diagram().kind()));
        assert!(svg.starts_with("<svg"), "Output should start with the SVG tag");
        assert!(svg.trim_end().ends_with("</svg>"), "Output should be complete SVG");
    }
}

#[test]
fn test_svg_carries_source_signature() {
    let source = "@startuml\nAlice -> Bob : hello\n@enduml";
    let builder = DiagramBuilder::default();
    let diagrams = builder.parse(source).unwrap();
    let svg = builder.render_svg(&diagrams[0]).unwrap();

    assert_eq!(
        metadata::extract_signature(&svg),
        Some(metadata::signature(source).as_str())
    );
    assert!(svg.contains(&format!("<!--Generated by tracery {}-->", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_rendering_is_deterministic() {
    let source = "@startuml\ntitle Flow\nA -> B ++ : call\nreturn done\nnote over A, B : shared\n@enduml";
    let first = DiagramBuilder::default();
    let second = DiagramBuilder::default();
    let render = |builder: &DiagramBuilder| {
        let diagrams = builder.parse(source).unwrap();
        builder.render_svg(&diagrams[0]).unwrap()
    };
    assert_eq!(render(&first), render(&second));
}

#[test]
fn test_background_from_config() {
    let config = AppConfig::new(
        StyleConfig::new(Some("#123456".to_string()), None, None),
        OutputConfig::default(),
    );
    let builder = DiagramBuilder::new(config);
    let diagrams = builder.parse("@startuml\nA -> B\n@enduml").unwrap();
    let svg = builder.render_svg(&diagrams[0]).unwrap();
    assert!(svg.contains("<rect"));
}

#[test]
fn test_parse_error_keeps_source() {
    let source = "@startuml\nA -> B\nthis is nonsense\n@enduml";
    let err = DiagramBuilder::default().parse(source).unwrap_err();
    match err {
        TraceryError::Parse { err, src } => {
            assert_eq!(src, source);
            assert_eq!(err.diagnostics().len(), 1);
        }
        other => panic!("Expected a parse error, got {other}"),
    }
}

#[test]
fn test_export_graphml() {
    let builder = DiagramBuilder::default();
    let diagrams = builder
        .parse("@startuml\ninterface List\nclass ArrayList\nArrayList --|> List\n@enduml")
        .unwrap();
    let context = GraphmlContext::new("demos/class.puml", 0);
    let graphml = builder
        .export_graphml(diagrams[0].diagram(), &context)
        .unwrap();

    assert!(graphml.contains("<data key=\"d0\">class.puml</data>"));
    assert!(graphml.contains("<data key=\"d18\">CLASS</data>"));
    assert!(graphml.contains("<data key=\"d13\">LINK</data>"));
    assert!(graphml.contains("<data key=\"d5\">EXTENDS</data>"));
    assert!(graphml.ends_with("</graphml>\n"));
}

#[test]
fn test_builder_reusability() {
    let builder = DiagramBuilder::default();

    let first = builder.parse("@startuml\n[app1]\n@enduml").unwrap();
    let second = builder.parse("@startebnf\nrule = \"x\" ;\n@endebnf").unwrap();

    assert!(builder.render_svg(&first[0]).unwrap().contains("app1"));
    assert!(builder.render_svg(&second[0]).unwrap().contains("rule"));
}
