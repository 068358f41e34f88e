use std::collections::BTreeSet;

use ratatui::prelude::Rect;

use super::{Axis, LayoutNode, LayoutTree, NodeId, ViewportMap, rect_contains, rect_is_degenerate};

/// Boundary between child `index` and child `index + 1` of `row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorRef {
    pub row: NodeId,
    pub index: usize,
}

/// A separator with its on-screen handle: the first line of the second child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorHandle {
    pub separator: SeparatorRef,
    pub axis: Axis,
    pub rect: Rect,
}

/// Turns a layout tree plus a root rectangle into per-node rectangles.
///
/// Remembers the last non-degenerate root rectangle so a transient zero-size
/// surface (minimized window, collapsed host) keeps the previous geometry.
#[derive(Debug, Clone, Default)]
pub struct ViewportCompiler {
    last_good: Option<Rect>,
}

impl ViewportCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_good(&self) -> Option<Rect> {
        self.last_good
    }

    pub fn compute(&mut self, tree: &LayoutTree, root_rect: Rect) -> ViewportMap {
        let area = if rect_is_degenerate(root_rect) {
            match self.last_good {
                Some(previous) => {
                    tracing::warn!(?root_rect, ?previous, "degenerate root rect; reusing last good");
                    previous
                }
                None => {
                    tracing::warn!(?root_rect, "degenerate root rect and no fallback");
                    return ViewportMap::default();
                }
            }
        } else {
            self.last_good = Some(root_rect);
            root_rect
        };
        compute(tree, area)
    }
}

/// Compile viewports for every node reachable from the root of `tree`.
///
/// Nodes present in the tree but unreachable get `Rect::default()`.
pub fn compute(tree: &LayoutTree, area: Rect) -> ViewportMap {
    let mut map = ViewportMap::default();
    let mut visited = BTreeSet::new();
    compile_node(tree, tree.root(), area, &mut map, &mut visited);
    for id in tree.node_ids() {
        if !visited.contains(&id) {
            tracing::warn!(node = %id, "node unreachable from root; placeholder viewport");
            map.set(id, Rect::default());
        }
    }
    map
}

fn compile_node(
    tree: &LayoutTree,
    id: NodeId,
    area: Rect,
    map: &mut ViewportMap,
    visited: &mut BTreeSet<NodeId>,
) {
    if !visited.insert(id) {
        tracing::warn!(node = %id, "node reached twice while compiling viewports");
        return;
    }
    map.set(id, area);
    let Some(LayoutNode::Row(row)) = tree.node(id) else {
        return;
    };
    match row.orientation.axis() {
        None => {
            for child in row.child_ids() {
                compile_node(tree, child, area, map, visited);
            }
        }
        Some(axis) => {
            let rects = split_rect(axis, area, &row.sizes());
            for (child, rect) in row.child_ids().zip(rects) {
                compile_node(tree, child, rect, map, visited);
            }
        }
    }
}

/// Float noise absorbed before flooring a share: products such as
/// `0.29 × 100` land just under the integer they denote. Shares further
/// below an integer than this still floor down.
const FLOOR_SLACK: f64 = 1e-6;

/// Partition `area` along `axis`: every child but the last gets
/// `floor(size × extent)`, the last takes whatever is left.
pub fn split_rect(axis: Axis, area: Rect, sizes: &[f64]) -> Vec<Rect> {
    let total = axis.extent(area);
    let count = sizes.len();
    let mut extents = Vec::with_capacity(count);
    let mut used: u16 = 0;
    for (index, size) in sizes.iter().enumerate() {
        let extent = if index + 1 == count {
            total.saturating_sub(used)
        } else {
            let portion = (size.max(0.0) * f64::from(total) + FLOOR_SLACK).floor();
            let portion = (portion as u16).min(total.saturating_sub(used));
            used = used.saturating_add(portion);
            portion
        };
        extents.push(extent);
    }
    build_rects_from_extents(axis, area, &extents)
}

fn build_rects_from_extents(axis: Axis, area: Rect, extents: &[u16]) -> Vec<Rect> {
    let mut rects = Vec::with_capacity(extents.len());
    let mut cursor_x = area.x;
    let mut cursor_y = area.y;
    for extent in extents {
        let rect = match axis {
            Axis::Horizontal => {
                let rect = Rect {
                    x: cursor_x,
                    y: area.y,
                    width: *extent,
                    height: area.height,
                };
                cursor_x = cursor_x.saturating_add(*extent);
                rect
            }
            Axis::Vertical => {
                let rect = Rect {
                    x: area.x,
                    y: cursor_y,
                    width: area.width,
                    height: *extent,
                };
                cursor_y = cursor_y.saturating_add(*extent);
                rect
            }
        };
        rects.push(rect);
    }
    rects
}

/// Every resizable boundary in the visible part of the tree, outermost first.
pub fn separator_handles(tree: &LayoutTree, viewports: &ViewportMap) -> Vec<SeparatorHandle> {
    let mut handles = Vec::new();
    for id in visible_nodes(tree) {
        let Some(row) = tree.row(id) else {
            continue;
        };
        let Some(axis) = row.orientation.axis() else {
            continue;
        };
        for (index, child) in row.children.iter().enumerate().skip(1) {
            let Some(rect) = viewports.get(child.id) else {
                continue;
            };
            let handle = match axis {
                Axis::Horizontal => Rect {
                    width: rect.width.min(1),
                    ..rect
                },
                Axis::Vertical => Rect {
                    height: rect.height.min(1),
                    ..rect
                },
            };
            handles.push(SeparatorHandle {
                separator: SeparatorRef {
                    row: id,
                    index: index - 1,
                },
                axis,
                rect: handle,
            });
        }
    }
    handles
}

/// Innermost separator whose handle contains the point.
pub fn hit_test_separator(
    tree: &LayoutTree,
    viewports: &ViewportMap,
    column: u16,
    row: u16,
) -> Option<SeparatorHandle> {
    separator_handles(tree, viewports)
        .into_iter()
        .filter(|handle| rect_contains(handle.rect, column, row))
        .max_by_key(|handle| tree.depth(handle.separator.row))
}

/// Reachable nodes that are not hidden behind an inactive stack tab.
pub fn visible_nodes(tree: &LayoutTree) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    let mut stack = vec![tree.root()];
    while let Some(current) = stack.pop() {
        if !seen.insert(current) || !tree.contains(current) {
            continue;
        }
        out.push(current);
        if let Some(row) = tree.row(current) {
            if row.orientation.is_stack() {
                stack.extend(row.visible_tab());
            } else {
                stack.extend(row.child_ids().collect::<Vec<_>>().into_iter().rev());
            }
        }
    }
    out
}

/// Visible leaves in layout order.
pub fn visible_leaves(tree: &LayoutTree) -> Vec<NodeId> {
    visible_nodes(tree)
        .into_iter()
        .filter(|id| tree.is_area(*id))
        .collect()
}
