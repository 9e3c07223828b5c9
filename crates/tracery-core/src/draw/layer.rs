//! Z-ordered grouping of SVG nodes.
//!
//! Drawables push nodes into a [`LayeredOutput`] tagged with a
//! [`RenderLayer`]. Rendering sorts the nodes by layer (stably, so insertion
//! order is kept within a layer) and wraps every layer in a
//! `<g data-layer="...">` group.
//!
//! ```
//! # use tracery_core::draw::{LayeredOutput, RenderLayer};
//! # use svg::node::element::{Line, Rectangle};
//! let mut output = LayeredOutput::new();
//! output.add_to_layer(RenderLayer::Arrow, Box::new(Line::new()));
//! output.add_to_layer(RenderLayer::Background, Box::new(Rectangle::new()));
//!
//! assert_eq!(output.render().len(), 2);
//! ```

use svg::node::element as svg_element;

pub type SvgNode = Box<dyn svg::Node>;

/// Rendering layers, bottom first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderLayer {
    Background,
    /// Sequence lifelines, timing grid lines and railroad tracks.
    Track,
    Content,
    Activation,
    Note,
    Arrow,
    Text,
    /// Title, header, footer and caption.
    Frame,
}

impl RenderLayer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Track => "track",
            Self::Content => "content",
            Self::Activation => "activation",
            Self::Note => "note",
            Self::Arrow => "arrow",
            Self::Text => "text",
            Self::Frame => "frame",
        }
    }
}

#[derive(Debug, Default)]
pub struct LayeredOutput {
    items: Vec<(RenderLayer, SvgNode)>,
}

impl LayeredOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_layer(&mut self, layer: RenderLayer, node: SvgNode) {
        self.items.push((layer, node));
    }

    pub fn merge(&mut self, other: LayeredOutput) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the output and returns one group per non-empty layer.
    pub fn render(mut self) -> Vec<SvgNode> {
        self.items.sort_by_key(|(layer, _)| *layer);

        let mut result: Vec<SvgNode> = Vec::new();
        let mut current: Option<(RenderLayer, svg_element::Group)> = None;

        for (layer, node) in self.items {
            current = match current {
                Some((current_layer, group)) if current_layer == layer => {
                    Some((layer, group.add(node)))
                }
                previous => {
                    if let Some((_, group)) = previous {
                        result.push(Box::new(group));
                    }
                    let group = svg_element::Group::new().set("data-layer", layer.name());
                    Some((layer, group.add(node)))
                }
            };
        }

        if let Some((_, group)) = current {
            result.push(Box::new(group));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use svg::node::element::Rectangle;

    use super::*;

    #[test]
    fn test_empty_output_renders_nothing() {
        let output = LayeredOutput::new();
        assert!(output.is_empty());
        assert!(output.render().is_empty());
    }

    #[test]
    fn test_same_layer_is_grouped_once() {
        let mut first = LayeredOutput::new();
        first.add_to_layer(RenderLayer::Content, Box::new(Rectangle::new()));
        let mut second = LayeredOutput::new();
        second.add_to_layer(RenderLayer::Content, Box::new(Rectangle::new()));

        first.merge(second);
        assert_eq!(first.render().len(), 1);
    }

    #[test]
    fn test_layers_render_bottom_first() {
        let mut output = LayeredOutput::new();
        output.add_to_layer(RenderLayer::Frame, Box::new(Rectangle::new()));
        output.add_to_layer(RenderLayer::Background, Box::new(Rectangle::new()));
        output.add_to_layer(RenderLayer::Note, Box::new(Rectangle::new()));

        let rendered: Vec<String> = output
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].contains("data-layer=\"background\""));
        assert!(rendered[1].contains("data-layer=\"note\""));
        assert!(rendered[2].contains("data-layer=\"frame\""));
    }
}
