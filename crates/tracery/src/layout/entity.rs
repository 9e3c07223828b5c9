//! Class and component diagram layout.
//!
//! Entities are placed in the layers computed by [`EntityGraph`]: one row
//! per layer, rows stacked from the top and centered on the widest one.
//! Links are straight arrows clipped to the outline of both ends.

use std::collections::HashMap;

use log::debug;

use tracery_core::{
    draw::Drawable,
    geometry::{Point, Size},
    identifier::Id,
    model::{Entity, EntityDiagram, EntityKind, LineStyle, Link, LinkDecor},
};

use super::{Layout, Theme};
use crate::{
    TraceryError,
    draw::{Arrow, ArrowHead, Shape, ShapeKind, TextBlock},
    structure::EntityGraph,
};

const COLUMN_GAP: f32 = 40.0;
const ROW_GAP: f32 = 50.0;
const LABEL_SPACING: f32 = 30.0;
const SELF_LINK: f32 = 20.0;

fn shape_kind(kind: EntityKind) -> ShapeKind {
    if let Some(marker) = kind.class_marker() {
        return ShapeKind::Class { marker };
    }
    match kind {
        EntityKind::Component => ShapeKind::Component,
        EntityKind::Circle => ShapeKind::Circle,
        EntityKind::Actor => ShapeKind::Actor,
        EntityKind::Node => ShapeKind::Node,
        EntityKind::Database => ShapeKind::Database,
        _ => ShapeKind::Rectangle,
    }
}

fn entity_shape(entity: &Entity, theme: &Theme) -> Shape {
    let kind = shape_kind(entity.kind());
    let mut shape = Shape::new(kind, entity.display().lines().to_vec(), theme.text())
        .with_stereotype(entity.stereotype().map(ToString::to_string))
        .with_fill(entity.color().copied().or(theme.fill()))
        .with_stroke(theme.line());
    if matches!(kind, ShapeKind::Class { .. }) {
        shape = shape.with_members(entity.members().to_vec());
    }
    shape
}

fn decor_head(decor: LinkDecor) -> ArrowHead {
    match decor {
        LinkDecor::None => ArrowHead::None,
        LinkDecor::Arrow => ArrowHead::Open,
        LinkDecor::Extends => ArrowHead::Triangle,
        LinkDecor::Composition => ArrowHead::FilledDiamond,
        LinkDecor::Aggregation => ArrowHead::Diamond,
    }
}

/// The point where the segment from `center` towards `target` leaves a box
/// of `size` centered on `center`.
fn clip(center: Point, size: Size, target: Point) -> Point {
    let delta = target.sub_point(center);
    let (dx, dy) = (delta.x(), delta.y());
    if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
        return center;
    }
    let (half_w, half_h) = (size.width() / 2.0, size.height() / 2.0);
    let scale_x = if dx.abs() < f32::EPSILON {
        f32::INFINITY
    } else {
        half_w / dx.abs()
    };
    let scale_y = if dy.abs() < f32::EPSILON {
        f32::INFINITY
    } else {
        half_h / dy.abs()
    };
    let scale = scale_x.min(scale_y).min(1.0);
    Point::new(center.x() + dx * scale, center.y() + dy * scale)
}

#[derive(Debug)]
struct Placed {
    shape: Shape,
    size: Size,
    center: Point,
}

struct EntityEngine<'a> {
    diagram: &'a EntityDiagram,
    theme: &'a Theme,
    placed: HashMap<Id, Placed>,
    /// Placement order, for deterministic output.
    order: Vec<Id>,
}

impl<'a> EntityEngine<'a> {
    fn new(diagram: &'a EntityDiagram, theme: &'a Theme) -> Self {
        Self {
            diagram,
            theme,
            placed: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn label_size(&self, link: &Link) -> Size {
        TextBlock::new(self.theme.small_text(), link.label.lines().to_vec()).size()
    }

    /// Gap below every layer but the last, widened for labeled links that
    /// cross it.
    fn row_gaps(&self, rank_of: &HashMap<Id, usize>, layer_count: usize) -> Vec<f32> {
        let mut gaps = vec![ROW_GAP; layer_count.saturating_sub(1)];
        for link in self.diagram.links() {
            let (Some(&from), Some(&to)) = (rank_of.get(&link.from), rank_of.get(&link.to)) else {
                continue;
            };
            if from == to || link.label.is_empty() {
                continue;
            }
            let needed = self.label_size(link).height() + LABEL_SPACING;
            let upper = from.min(to);
            gaps[upper] = gaps[upper].max(needed);
        }
        gaps
    }

    fn place(&mut self, graph: &EntityGraph<'a>) {
        let layers = graph.layers();
        let rank_of: HashMap<Id, usize> = layers
            .iter()
            .enumerate()
            .flat_map(|(rank, layer)| layer.iter().map(move |entity| (entity.code(), rank)))
            .collect();
        let gaps = self.row_gaps(&rank_of, layers.len());

        let rows: Vec<Vec<(Id, Shape, Size)>> = layers
            .iter()
            .map(|layer| {
                layer
                    .iter()
                    .map(|entity| {
                        let shape = entity_shape(entity, self.theme);
                        let size = shape.size();
                        (entity.code(), shape, size)
                    })
                    .collect()
            })
            .collect();
        let row_width = |row: &[(Id, Shape, Size)]| {
            row.iter().map(|(_, _, size)| size.width()).sum::<f32>()
                + COLUMN_GAP * row.len().saturating_sub(1) as f32
        };
        let widest = rows
            .iter()
            .map(|row| row_width(row.as_slice()))
            .fold(0.0, f32::max);

        let mut y = 0.0;
        for (rank, row) in rows.into_iter().enumerate() {
            let height = row
                .iter()
                .map(|(_, _, size)| size.height())
                .fold(0.0, f32::max);
            let mut x = (widest - row_width(row.as_slice())) / 2.0;
            for (code, shape, size) in row {
                let center = Point::new(x + size.width() / 2.0, y + height / 2.0);
                x += size.width() + COLUMN_GAP;
                self.order.push(code);
                self.placed.insert(code, Placed { shape, size, center });
            }
            y += height + gaps.get(rank).copied().unwrap_or(0.0);
        }
    }

    fn link(&self, layout: &mut Layout, link: &Link) {
        let (Some(from), Some(to)) = (self.placed.get(&link.from), self.placed.get(&link.to)) else {
            return;
        };
        let mut stroke = self.theme.line();
        if link.style == LineStyle::Dotted {
            stroke = self.theme.dashed_line();
        }
        let heads = (decor_head(link.from_decor), decor_head(link.to_decor));

        let (points, label_anchor) = if link.from == link.to {
            let right = from.center.x() + from.size.width() / 2.0;
            let (top, bottom) = (from.center.y() - SELF_LINK / 2.0, from.center.y() + SELF_LINK / 2.0);
            let points = vec![
                Point::new(right, top),
                Point::new(right + SELF_LINK, top),
                Point::new(right + SELF_LINK, bottom),
                Point::new(right, bottom),
            ];
            (points, Point::new(right + SELF_LINK, from.center.y()))
        } else {
            let start = clip(from.center, from.size, to.center);
            let end = clip(to.center, to.size, from.center);
            (vec![start, end], start.midpoint(end))
        };
        layout.push_arrow(Arrow::new(points, stroke).with_heads(heads.0, heads.1));

        let label = TextBlock::new(self.theme.small_text(), link.label.lines().to_vec());
        if !label.is_empty() {
            let size = label.size();
            let center = label_anchor.add_point(Point::new(size.width() / 2.0 + 4.0, 0.0));
            layout.push(label, center);
        }
    }

    fn run(mut self) -> Result<Layout, TraceryError> {
        let graph = EntityGraph::new(self.diagram)?;
        self.place(&graph);

        let mut layout = Layout::new();
        for code in &self.order {
            if let Some(placed) = self.placed.get(code) {
                layout.push(placed.shape.clone(), placed.center);
            }
        }
        for link in self.diagram.links() {
            self.link(&mut layout, link);
        }
        debug!(
            entities = self.order.len(),
            links = self.diagram.links().len();
            "Entity layout finished"
        );
        Ok(layout)
    }
}

/// Lays out a class or component diagram.
///
/// # Errors
///
/// Fails when a link refers to an entity the diagram does not contain.
pub fn layout(diagram: &EntityDiagram, theme: &Theme) -> Result<Layout, TraceryError> {
    EntityEngine::new(diagram, theme).run()
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use tracery_core::{label::Label, model::DiagramKind};

    use super::*;

    fn component_diagram() -> EntityDiagram {
        let mut diagram = EntityDiagram::new(DiagramKind::Component);
        diagram.get_or_create(Id::new("comp1"), EntityKind::Component, true);
        diagram.get_or_create(Id::new("intf1"), EntityKind::Circle, true);
        diagram
    }

    fn svg(layout: &Layout) -> String {
        layout
            .render()
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect()
    }

    #[test]
    fn test_clip_to_box_edge() {
        let center = Point::new(0.0, 0.0);
        let size = Size::new(40.0, 20.0);
        assert_eq!(clip(center, size, Point::new(100.0, 0.0)), Point::new(20.0, 0.0));
        assert_eq!(clip(center, size, Point::new(0.0, -100.0)), Point::new(0.0, -10.0));
        let corner = clip(center, size, Point::new(100.0, 100.0));
        assert_approx_eq!(f32, corner.x(), 10.0);
        assert_approx_eq!(f32, corner.y(), 10.0);
    }

    #[test]
    fn test_decor_heads() {
        assert_eq!(decor_head(LinkDecor::Extends), ArrowHead::Triangle);
        assert_eq!(decor_head(LinkDecor::Composition), ArrowHead::FilledDiamond);
        assert_eq!(decor_head(LinkDecor::Aggregation), ArrowHead::Diamond);
        assert_eq!(decor_head(LinkDecor::None), ArrowHead::None);
    }

    #[test]
    fn test_unlinked_entities_share_a_row() {
        let diagram = component_diagram();
        let layout = layout(&diagram, &Theme::default()).unwrap();
        assert_eq!(layout.len(), 2);
        let svg = svg(&layout);
        assert!(svg.contains("comp1"));
        assert!(svg.contains("intf1"));
    }

    #[test]
    fn test_vertical_link_stacks_rows() {
        let mut flat = component_diagram();
        let mut stacked = component_diagram();
        for (diagram, vertical) in [(&mut flat, false), (&mut stacked, true)] {
            diagram.add_link(Link {
                from: Id::new("comp1"),
                to: Id::new("intf1"),
                from_decor: LinkDecor::None,
                to_decor: LinkDecor::Arrow,
                style: LineStyle::Dotted,
                label: Label::plain("uses"),
                vertical,
            });
        }
        let theme = Theme::default();
        let flat = layout(&flat, &theme).unwrap();
        let stacked = layout(&stacked, &theme).unwrap();
        assert!(stacked.bounds().height() > flat.bounds().height());
        assert!(svg(&stacked).contains("uses"));
        assert!(svg(&stacked).contains("stroke-dasharray"));
    }

    #[test]
    fn test_class_members_are_drawn() {
        let mut diagram = EntityDiagram::new(DiagramKind::Class);
        let entity = diagram.get_or_create(Id::new("Car"), EntityKind::Class, true);
        entity.add_member("+drive()");
        let svg = svg(&layout(&diagram, &Theme::default()).unwrap());
        assert!(svg.contains("+drive()"));
        assert!(svg.contains("#ADD1B2"));
    }
}
