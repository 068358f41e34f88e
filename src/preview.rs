//! Plain-text rendering of a layout, for the CLI and for tests.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::{Block, Borders, Widget};

use crate::layout::{LayoutTree, NodeId, ViewportMap, rect_is_degenerate, visible_leaves};

/// Draw every visible leaf as a bordered block titled with its id and type
/// and return the buffer's text, one line per row with trailing blanks
/// trimmed. Tabs of a stack show their position, e.g. `[1/3]`.
pub fn render_text(tree: &LayoutTree, viewports: &ViewportMap, area: Rect) -> String {
    if rect_is_degenerate(area) {
        return String::new();
    }
    let mut buffer = Buffer::empty(area);
    for id in visible_leaves(tree) {
        let Some(rect) = viewports.get(id) else {
            continue;
        };
        let rect = rect.intersection(area);
        if rect_is_degenerate(rect) {
            continue;
        }
        Block::default()
            .title(title(tree, id))
            .borders(Borders::ALL)
            .render(rect, &mut buffer);
    }

    let mut joined = String::new();
    for y in area.y..area.y.saturating_add(area.height) {
        let mut row = String::new();
        for x in area.x..area.x.saturating_add(area.width) {
            if let Some(cell) = buffer.cell((x, y)) {
                row.push_str(cell.symbol());
            }
        }
        joined.push_str(row.trim_end());
        joined.push('\n');
    }
    joined
}

fn title(tree: &LayoutTree, id: NodeId) -> String {
    let tag = tree
        .area(id)
        .map(|area| area.type_tag.as_str())
        .unwrap_or_default();
    let lock = if tree.area(id).is_some_and(|area| area.locked) {
        " *"
    } else {
        ""
    };
    let tab = tree.parent_of(id).and_then(|(parent, index)| {
        let row = tree.row(parent)?;
        row.orientation
            .is_stack()
            .then(|| format!(" [{}/{}]", index + 1, row.children.len()))
    });
    format!("{id} {tag}{lock}{}", tab.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Area, compute};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_area_is_one_block() {
        let tree = LayoutTree::new(Area::new("viewer"));
        let area = Rect::new(0, 0, 20, 5);
        let viewports = compute(&tree, area);
        let expected = indoc! {"
            ┌#1 viewer─────────┐
            │                  │
            │                  │
            │                  │
            └──────────────────┘
        "};
        assert_eq!(render_text(&tree, &viewports, area), expected);
    }

    #[test]
    fn degenerate_area_renders_nothing() {
        let tree = LayoutTree::new(Area::new("viewer"));
        let viewports = compute(&tree, Rect::new(0, 0, 10, 10));
        assert_eq!(render_text(&tree, &viewports, Rect::new(0, 0, 0, 4)), "");
    }
}
