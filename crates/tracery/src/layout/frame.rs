//! Title, header, footer and caption around laid out content.

use tracery_core::{
    draw::{Drawable, TextStyle},
    geometry::Point,
    label::Label,
    model::DiagramMeta,
};

use super::{Layout, Theme};
use crate::draw::TextBlock;

const GAP: f32 = 10.0;
const TITLE_SCALE: f32 = 1.4;

fn block(label: Option<&Label>, style: TextStyle) -> Option<TextBlock> {
    let label = label.filter(|label| !label.is_empty())?;
    Some(TextBlock::new(style, label.lines().to_vec()))
}

/// Adds the diagram's decorations around the current content of `layout`.
///
/// The title is centered above the content with the header right-aligned
/// above it; the caption and then the footer are centered below.
pub fn add_frame(layout: &mut Layout, meta: &DiagramMeta, theme: &Theme) {
    let content = layout.bounds();
    let center_x = content.center().x();

    let title_style = {
        let text = theme.text();
        let size = text.font_size() * TITLE_SCALE;
        text.with_font_size(size).with_bold(true)
    };
    let mut top = content.min_y();
    if let Some(title) = block(meta.title.as_ref(), title_style) {
        let height = title.size().height();
        top -= GAP + height;
        layout.push(title, Point::new(center_x, top + height / 2.0));
    }
    if let Some(header) = block(meta.header.as_ref(), theme.small_text()) {
        let size = header.size();
        top -= GAP + size.height();
        let x = content.max_x() - size.width() / 2.0;
        layout.push(header, Point::new(x, top + size.height() / 2.0));
    }

    let mut bottom = content.max_y();
    if let Some(caption) = block(meta.caption.as_ref(), theme.text().with_italic(true)) {
        let height = caption.size().height();
        layout.push(caption, Point::new(center_x, bottom + GAP + height / 2.0));
        bottom += GAP + height;
    }
    if let Some(footer) = block(meta.footer.as_ref(), theme.small_text()) {
        let height = footer.size().height();
        layout.push(footer, Point::new(center_x, bottom + GAP + height / 2.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{Shape, ShapeKind};

    fn content() -> Layout {
        let mut layout = Layout::new();
        let shape = Shape::new(
            ShapeKind::Rectangle,
            ["body".to_string()],
            Theme::default().text(),
        );
        layout.push(shape, Point::new(100.0, 100.0));
        layout
    }

    #[test]
    fn test_no_decorations_is_a_no_op() {
        let mut layout = content();
        add_frame(&mut layout, &DiagramMeta::default(), &Theme::default());
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn test_title_above_and_footer_below() {
        let mut layout = content();
        let before = layout.bounds();
        let meta = DiagramMeta {
            title: Some(Label::plain("Title")),
            header: Some(Label::plain("page 1")),
            caption: Some(Label::plain("figure")),
            footer: Some(Label::plain("end")),
            ..DiagramMeta::default()
        };
        add_frame(&mut layout, &meta, &Theme::default());
        assert_eq!(layout.len(), 5);

        let after = layout.bounds();
        assert!(after.min_y() < before.min_y());
        assert!(after.max_y() > before.max_y());
    }

    #[test]
    fn test_empty_title_is_skipped() {
        let mut layout = content();
        let meta = DiagramMeta {
            title: Some(Label::default()),
            ..DiagramMeta::default()
        };
        add_frame(&mut layout, &meta, &Theme::default());
        assert_eq!(layout.len(), 1);
    }
}
