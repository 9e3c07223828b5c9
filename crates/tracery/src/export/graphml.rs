//! GraphML export of the diagram model.
//!
//! The document lists the diagram itself as node `1`, one `Leaf` node per
//! element (entity, participant, player or rule) and a `DIAGRAM_CONTAINS`
//! edge from the diagram to each of them. Links, messages and rule
//! references follow as further edges. Every element sits on its own line
//! and data keys are always written in the same order, so the output can
//! be compared byte for byte.

use std::{borrow::Cow, fmt::Write};

use log::debug;

use tracery_core::{
    identifier::Id,
    label::Label,
    model::{
        Diagram, DiagramMeta, EbnfDiagram, EntityDiagram, EntityKind, LineStyle, SequenceDiagram,
        TimingDiagram, sequence::Event,
    },
};

use super::Error;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?><graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">"#;

/// `(attr.name, attr.type, for)` of keys `d0`, `d1`, ...
const KEYS: [(&str, &str, &str); 22] = [
    ("label", "string", "node"),
    ("type", "string", "node"),
    ("entityType", "string", "node"),
    ("style", "string", "node"),
    ("sourceDecor", "string", "node"),
    ("targetDecor", "string", "node"),
    ("middleDecor", "string", "node"),
    ("sourceLabel", "string", "node"),
    ("targetLabel", "string", "node"),
    ("direction", "string", "node"),
    ("static", "boolean", "node"),
    ("abstract", "boolean", "node"),
    ("visibility", "string", "node"),
    ("edgeType", "string", "edge"),
    ("title", "string", "node"),
    ("header", "string", "node"),
    ("footer", "string", "node"),
    ("caption", "string", "node"),
    ("diagramType", "string", "node"),
    ("sourceFile", "string", "node"),
    ("pumlId", "string", "node"),
    ("pumlPath", "string", "node"),
];

const LABEL: usize = 0;
const TYPE: usize = 1;
const ENTITY_TYPE: usize = 2;
const STYLE: usize = 3;
const SOURCE_DECOR: usize = 4;
const TARGET_DECOR: usize = 5;
const ABSTRACT: usize = 11;
const EDGE_TYPE: usize = 13;
const TITLE: usize = 14;
const HEADER_KEY: usize = 15;
const FOOTER: usize = 16;
const CAPTION: usize = 17;
const DIAGRAM_TYPE: usize = 18;
const SOURCE_FILE: usize = 19;
const PUML_ID: usize = 20;
const PUML_PATH: usize = 21;

const DIAGRAM_NODE: usize = 1;

/// Where the exported diagram comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphmlContext {
    source_file: String,
    block_index: usize,
}

impl GraphmlContext {
    /// `source_file` is written as given, so callers decide whether it is
    /// relative. Both `/` and `\` separate its components.
    pub fn new(source_file: impl Into<String>, block_index: usize) -> Self {
        Self {
            source_file: source_file.into(),
            block_index,
        }
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn block_index(&self) -> usize {
        self.block_index
    }

    /// The file name without its directories.
    fn file_name(&self) -> &str {
        self.source_file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_file)
    }

    /// `<source without extension>/<block>/<id>`.
    fn path_of(&self, id: &str) -> String {
        let name_start = self.source_file.len() - self.file_name().len();
        let base = match self.source_file[name_start..].rfind('.') {
            Some(dot) if dot > 0 => &self.source_file[..name_start + dot],
            _ => self.source_file.as_str(),
        };
        format!("{base}/{}/{id}", self.block_index)
    }
}

/// Escapes the XML special characters of `text`.
fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn line_style_name(style: LineStyle) -> &'static str {
    match style {
        LineStyle::Solid => "SOLID",
        LineStyle::Dotted => "DOTTED",
    }
}

/// One edge before it is numbered.
struct PendingEdge {
    source: usize,
    target: usize,
    data: Vec<(usize, String)>,
}

/// Accumulates nodes and edges in output order.
struct GraphWriter<'c> {
    context: &'c GraphmlContext,
    out: String,
    next_node: usize,
    edges: Vec<PendingEdge>,
}

impl<'c> GraphWriter<'c> {
    fn new(context: &'c GraphmlContext) -> Self {
        Self {
            context,
            out: String::new(),
            next_node: DIAGRAM_NODE,
            edges: Vec::new(),
        }
    }

    fn data(&mut self, key: usize, value: &str) -> Result<(), Error> {
        writeln!(self.out, "<data key=\"d{key}\">{}</data>", escape(value))?;
        Ok(())
    }

    fn header(&mut self) -> Result<(), Error> {
        writeln!(self.out, "{HEADER}")?;
        for (index, (name, kind, target)) in KEYS.iter().enumerate() {
            writeln!(
                self.out,
                "<key attr.name=\"{name}\" attr.type=\"{kind}\" for=\"{target}\" id=\"d{index}\"/>"
            )?;
        }
        writeln!(self.out, "<graph edgedefault=\"undirected\">")?;
        Ok(())
    }

    fn diagram_node(&mut self, diagram: &Diagram) -> Result<(), Error> {
        let context = self.context;
        let id = format!("diag{}", context.block_index);
        writeln!(self.out, "<node id=\"{DIAGRAM_NODE}\">")?;
        self.data(TYPE, "Diagram")?;
        self.data(ENTITY_TYPE, "DIAGRAM")?;
        self.data(LABEL, context.file_name())?;
        self.data(PUML_ID, &id)?;
        self.data(PUML_PATH, &context.path_of(&id))?;
        self.meta(diagram.meta())?;
        self.data(DIAGRAM_TYPE, diagram.kind().graphml_name())?;
        self.data(SOURCE_FILE, &context.source_file)?;
        writeln!(self.out, "</node>")?;
        self.next_node = DIAGRAM_NODE + 1;
        Ok(())
    }

    fn meta(&mut self, meta: &DiagramMeta) -> Result<(), Error> {
        let decorations = [
            (TITLE, &meta.title),
            (HEADER_KEY, &meta.header),
            (FOOTER, &meta.footer),
            (CAPTION, &meta.caption),
        ];
        for (key, label) in decorations {
            if let Some(label) = label.as_ref().filter(|label| !label.is_empty()) {
                self.data(key, &label.to_string())?;
            }
        }
        Ok(())
    }

    /// Writes a `Leaf` node contained in the diagram and returns its id.
    ///
    /// `uid` defaults to `clNNNN` built from the node id.
    fn leaf(
        &mut self,
        entity_type: &str,
        label: &Label,
        uid: Option<&str>,
        extra: &[(usize, &str)],
    ) -> Result<usize, Error> {
        let node = self.next_node;
        self.next_node += 1;
        let uid = uid.map_or_else(|| format!("cl{node:04}"), str::to_string);

        writeln!(self.out, "<node id=\"{node}\">")?;
        self.data(TYPE, "Leaf")?;
        self.data(ENTITY_TYPE, entity_type)?;
        self.data(LABEL, &label.to_string())?;
        self.data(PUML_ID, &uid)?;
        let path = self.context.path_of(&uid);
        self.data(PUML_PATH, &path)?;
        for (key, value) in extra {
            self.data(*key, value)?;
        }
        writeln!(self.out, "</node>")?;

        self.edge(
            DIAGRAM_NODE,
            node,
            vec![(EDGE_TYPE, "DIAGRAM_CONTAINS".to_string())],
        );
        Ok(node)
    }

    fn edge(&mut self, source: usize, target: usize, data: Vec<(usize, String)>) {
        self.edges.push(PendingEdge {
            source,
            target,
            data,
        });
    }

    fn finish(mut self) -> Result<String, Error> {
        let edges = std::mem::take(&mut self.edges);
        for (index, edge) in edges.iter().enumerate() {
            writeln!(
                self.out,
                "<edge id=\"{}\" source=\"{}\" target=\"{}\">",
                index + 1,
                edge.source,
                edge.target
            )?;
            for (key, value) in &edge.data {
                self.data(*key, value)?;
            }
            writeln!(self.out, "</edge>")?;
        }
        writeln!(self.out, "</graph>")?;
        writeln!(self.out, "</graphml>")?;
        Ok(self.out)
    }
}

/// Writes GraphML documents for one source block.
#[derive(Debug, Clone)]
pub struct Graphml {
    context: GraphmlContext,
}

impl Graphml {
    pub fn new(context: GraphmlContext) -> Self {
        Self { context }
    }

    /// # Errors
    ///
    /// Returns [`Error::Format`] if writing the document text fails.
    pub fn export(&self, diagram: &Diagram) -> Result<String, Error> {
        let mut writer = GraphWriter::new(&self.context);
        writer.header()?;
        writer.diagram_node(diagram)?;
        match diagram {
            Diagram::Sequence(diagram) => sequence(&mut writer, diagram)?,
            Diagram::Timing(diagram) => timing(&mut writer, diagram)?,
            Diagram::Ebnf(diagram) => ebnf(&mut writer, diagram)?,
            Diagram::Entity(diagram) => entity(&mut writer, diagram)?,
        }
        let nodes = writer.next_node - 1;
        let edges = writer.edges.len();
        let document = writer.finish()?;
        debug!(nodes, edges; "GraphML document written");
        Ok(document)
    }
}

fn entity(writer: &mut GraphWriter<'_>, diagram: &EntityDiagram) -> Result<(), Error> {
    let mut nodes = Vec::with_capacity(diagram.entities().len());
    for entity in diagram.entities() {
        let extra: &[(usize, &str)] = if entity.kind() == EntityKind::AbstractClass {
            &[(ABSTRACT, "true")]
        } else {
            &[]
        };
        let node = writer.leaf(
            entity.kind().graphml_name(),
            &entity.display(),
            Some(entity.uid()),
            extra,
        )?;
        nodes.push((entity.code(), node));
    }

    let node_of = |code: Id| nodes.iter().find(|(id, _)| *id == code).map(|(_, node)| *node);
    for link in diagram.links() {
        let (Some(source), Some(target)) = (node_of(link.from), node_of(link.to)) else {
            continue;
        };
        let mut data = vec![
            (EDGE_TYPE, "LINK".to_string()),
            (STYLE, line_style_name(link.style).to_string()),
            (SOURCE_DECOR, link.from_decor.graphml_name().to_string()),
            (TARGET_DECOR, link.to_decor.graphml_name().to_string()),
        ];
        if !link.label.is_empty() {
            data.push((LABEL, link.label.to_string()));
        }
        writer.edge(source, target, data);
    }
    Ok(())
}

fn sequence(writer: &mut GraphWriter<'_>, diagram: &SequenceDiagram) -> Result<(), Error> {
    let mut nodes = Vec::with_capacity(diagram.participants().len());
    for participant in diagram.participants() {
        let node = writer.leaf(
            participant.kind().graphml_name(),
            &participant.display(),
            None,
            &[],
        )?;
        nodes.push(node);
    }

    for event in diagram.events() {
        let Event::Message(message) = event else {
            continue;
        };
        let (Some(from), Some(to)) = (
            diagram.participant_index(message.from()),
            diagram.participant_index(message.to()),
        ) else {
            continue;
        };
        let mut data = vec![(EDGE_TYPE, "MESSAGE".to_string())];
        if !message.label().is_empty() {
            data.push((LABEL, message.label().to_string()));
        }
        writer.edge(nodes[from], nodes[to], data);
    }
    Ok(())
}

fn timing(writer: &mut GraphWriter<'_>, diagram: &TimingDiagram) -> Result<(), Error> {
    let mut nodes = Vec::with_capacity(diagram.players().len());
    for player in diagram.players() {
        let node = writer.leaf(player.kind().graphml_name(), &player.display(), None, &[])?;
        nodes.push((player.code(), node));
    }

    let node_of = |code: Id| nodes.iter().find(|(id, _)| *id == code).map(|(_, node)| *node);
    for message in diagram.messages() {
        let (Some(source), Some(target)) = (node_of(message.from), node_of(message.to)) else {
            continue;
        };
        let mut data = vec![(EDGE_TYPE, "MESSAGE".to_string())];
        if !message.label.is_empty() {
            data.push((LABEL, message.label.to_string()));
        }
        writer.edge(source, target, data);
    }
    Ok(())
}

fn ebnf(writer: &mut GraphWriter<'_>, diagram: &EbnfDiagram) -> Result<(), Error> {
    let mut nodes: Vec<(&str, usize)> = Vec::with_capacity(diagram.rules().len());
    for rule in diagram.rules() {
        let node = writer.leaf("RULE", &Label::plain(rule.name()), None, &[])?;
        nodes.push((rule.name(), node));
    }

    for (rule, &(_, source)) in diagram.rules().zip(&nodes) {
        let mut seen: Vec<usize> = Vec::new();
        for reference in rule.expr().references() {
            let Some(&(_, target)) = nodes.iter().find(|(name, _)| *name == reference) else {
                continue;
            };
            if seen.contains(&target) {
                continue;
            }
            seen.push(target);
            writer.edge(source, target, vec![(EDGE_TYPE, "REFERENCES".to_string())]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracery_core::{
        model::{
            DiagramKind, EbnfExpr, EbnfRule, HasMeta, Link, LinkDecor,
            sequence::{ArrowConfig, Message, Participant, ParticipantKind},
        },
    };

    use super::*;

    const GML0003: &str = r#"<?xml version="1.0" encoding="UTF-8"?><graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">
<key attr.name="label" attr.type="string" for="node" id="d0"/>
<key attr.name="type" attr.type="string" for="node" id="d1"/>
<key attr.name="entityType" attr.type="string" for="node" id="d2"/>
<key attr.name="style" attr.type="string" for="node" id="d3"/>
<key attr.name="sourceDecor" attr.type="string" for="node" id="d4"/>
<key attr.name="targetDecor" attr.type="string" for="node" id="d5"/>
<key attr.name="middleDecor" attr.type="string" for="node" id="d6"/>
<key attr.name="sourceLabel" attr.type="string" for="node" id="d7"/>
<key attr.name="targetLabel" attr.type="string" for="node" id="d8"/>
<key attr.name="direction" attr.type="string" for="node" id="d9"/>
<key attr.name="static" attr.type="boolean" for="node" id="d10"/>
<key attr.name="abstract" attr.type="boolean" for="node" id="d11"/>
<key attr.name="visibility" attr.type="string" for="node" id="d12"/>
<key attr.name="edgeType" attr.type="string" for="edge" id="d13"/>
<key attr.name="title" attr.type="string" for="node" id="d14"/>
<key attr.name="header" attr.type="string" for="node" id="d15"/>
<key attr.name="footer" attr.type="string" for="node" id="d16"/>
<key attr.name="caption" attr.type="string" for="node" id="d17"/>
<key attr.name="diagramType" attr.type="string" for="node" id="d18"/>
<key attr.name="sourceFile" attr.type="string" for="node" id="d19"/>
<key attr.name="pumlId" attr.type="string" for="node" id="d20"/>
<key attr.name="pumlPath" attr.type="string" for="node" id="d21"/>
<graph edgedefault="undirected">
<node id="1">
<data key="d1">Diagram</data>
<data key="d2">DIAGRAM</data>
<data key="d0">GML0003_Test.puml</data>
<data key="d20">diag0</data>
<data key="d21">./nonreg/graphml/component/GML0003_Test/0/diag0</data>
<data key="d18">COMPONENT</data>
<data key="d19">./nonreg/graphml/component/GML0003_Test.puml</data>
</node>
<node id="2">
<data key="d1">Leaf</data>
<data key="d2">COMPONENT</data>
<data key="d0">comp1</data>
<data key="d20">cl0002</data>
<data key="d21">./nonreg/graphml/component/GML0003_Test/0/cl0002</data>
</node>
<node id="3">
<data key="d1">Leaf</data>
<data key="d2">CIRCLE</data>
<data key="d0">intf1</data>
<data key="d20">cl0003</data>
<data key="d21">./nonreg/graphml/component/GML0003_Test/0/cl0003</data>
</node>
<edge id="1" source="1" target="2">
<data key="d13">DIAGRAM_CONTAINS</data>
</edge>
<edge id="2" source="1" target="3">
<data key="d13">DIAGRAM_CONTAINS</data>
</edge>
</graph>
</graphml>
"#;

    fn context() -> GraphmlContext {
        GraphmlContext::new("./nonreg/graphml/component/GML0003_Test.puml", 0)
    }

    fn component_diagram() -> EntityDiagram {
        let mut diagram = EntityDiagram::new(DiagramKind::Component);
        diagram.get_or_create(Id::new("comp1"), EntityKind::Component, true);
        diagram.get_or_create(Id::new("intf1"), EntityKind::Circle, true);
        diagram
    }

    #[test]
    fn test_component_golden() {
        let diagram = Diagram::Entity(component_diagram());
        let graphml = Graphml::new(context()).export(&diagram).unwrap();
        assert_eq!(graphml, GML0003);
    }

    #[test]
    fn test_context_paths() {
        let context = GraphmlContext::new(r"dir\sub\file.name.puml", 2);
        assert_eq!(context.file_name(), "file.name.puml");
        assert_eq!(context.path_of("diag2"), r"dir\sub\file.name/2/diag2");

        let bare = GraphmlContext::new(".hidden", 0);
        assert_eq!(bare.path_of("x"), ".hidden/0/x");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_links_and_title() {
        let mut diagram = component_diagram();
        diagram.add_link(Link {
            from: Id::new("comp1"),
            to: Id::new("intf1"),
            from_decor: LinkDecor::None,
            to_decor: LinkDecor::Aggregation,
            style: LineStyle::Dotted,
            label: Label::plain("uses <it>"),
            vertical: true,
        });
        diagram.meta_mut().title = Some(Label::plain("Overview"));

        let graphml = Graphml::new(context())
            .export(&Diagram::Entity(diagram))
            .unwrap();
        assert!(graphml.contains(
            "<data key=\"d21\">./nonreg/graphml/component/GML0003_Test/0/diag0</data>\n<data key=\"d14\">Overview</data>\n<data key=\"d18\">COMPONENT</data>"
        ));
        assert!(graphml.contains(
            "<edge id=\"3\" source=\"2\" target=\"3\">\n<data key=\"d13\">LINK</data>\n<data key=\"d3\">DOTTED</data>\n<data key=\"d4\">NONE</data>\n<data key=\"d5\">AGREGATION</data>\n<data key=\"d0\">uses &lt;it&gt;</data>\n</edge>"
        ));
    }

    #[test]
    fn test_sequence_messages() {
        let mut diagram = SequenceDiagram::new();
        for code in ["Alice", "Bob"] {
            diagram.declare_participant(Participant::new(
                Id::new(code),
                Label::default(),
                ParticipantKind::Participant,
            ));
        }
        diagram
            .add_message(Event::Message(Message::new(
                Id::new("Alice"),
                Id::new("Bob"),
                Label::plain("hello"),
                ArrowConfig::default(),
                None,
            )))
            .unwrap();

        let graphml = Graphml::new(GraphmlContext::new("seq.puml", 0))
            .export(&Diagram::Sequence(diagram))
            .unwrap();
        assert!(graphml.contains("<data key=\"d20\">cl0002</data>"));
        assert!(graphml.contains("<data key=\"d18\">SEQUENCE</data>"));
        assert!(graphml.contains(
            "<edge id=\"3\" source=\"2\" target=\"3\">\n<data key=\"d13\">MESSAGE</data>\n<data key=\"d0\">hello</data>"
        ));
    }

    #[test]
    fn test_ebnf_references() {
        let mut diagram = EbnfDiagram::new();
        diagram
            .add_rule(EbnfRule::new(
                "number",
                EbnfExpr::Sequence(vec![
                    EbnfExpr::Identifier("digit".to_string()),
                    EbnfExpr::Identifier("digit".to_string()),
                    EbnfExpr::Identifier("undefined".to_string()),
                ]),
            ))
            .unwrap();
        diagram
            .add_rule(EbnfRule::new("digit", EbnfExpr::Terminal("0".to_string())))
            .unwrap();

        let graphml = Graphml::new(GraphmlContext::new("g.puml", 1))
            .export(&Diagram::Ebnf(diagram))
            .unwrap();
        assert_eq!(graphml.matches("REFERENCES").count(), 1);
        assert!(graphml.contains("<edge id=\"3\" source=\"2\" target=\"3\">\n<data key=\"d13\">REFERENCES</data>"));
        assert!(graphml.contains("<data key=\"d21\">g/1/diag1</data>"));
    }
}
