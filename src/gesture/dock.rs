//! Drop-target resolution for drag-and-drop docking.

use std::collections::BTreeSet;

use ratatui::prelude::{Position, Rect};

use crate::editor::{InsertSide, Placement};
use crate::layout::{LayoutTree, NodeId, ViewportMap, rect_contains, visible_leaves};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub target: NodeId,
    pub placement: Placement,
    /// Where the dropped area would land, for previews.
    pub preview: Rect,
}

/// Visible leaf under the pointer, skipping `excluded` ids and hidden tabs.
pub fn hit_leaf(
    tree: &LayoutTree,
    viewports: &ViewportMap,
    position: Position,
    excluded: &BTreeSet<NodeId>,
) -> Option<NodeId> {
    visible_leaves(tree).into_iter().find(|id| {
        !excluded.contains(id)
            && viewports
                .get(*id)
                .is_some_and(|rect| rect_contains(rect, position.x, position.y))
    })
}

/// Which placement a drop at `position` inside `rect` asks for.
///
/// Each edge owns a band `edge_band_ratio` of the shorter dimension deep.
/// Inside a band, the nearest edge wins; equal distances resolve left,
/// right, top, bottom. Everything else stacks.
pub fn placement_zone(rect: Rect, position: Position, edge_band_ratio: f64) -> Placement {
    let shorter = rect.width.min(rect.height);
    let band = (f64::from(shorter) * edge_band_ratio).floor() as u16;
    let right = rect.x.saturating_add(rect.width.saturating_sub(1));
    let bottom = rect.y.saturating_add(rect.height.saturating_sub(1));
    let edges = [
        (position.x.saturating_sub(rect.x), Placement::Left),
        (right.saturating_sub(position.x), Placement::Right),
        (position.y.saturating_sub(rect.y), Placement::Top),
        (bottom.saturating_sub(position.y), Placement::Bottom),
    ];
    edges
        .into_iter()
        .filter(|(distance, _)| *distance < band)
        .min_by_key(|(distance, _)| *distance)
        .map_or(Placement::Stack, |(_, placement)| placement)
}

pub fn preview_rect(rect: Rect, placement: Placement) -> Rect {
    match placement {
        Placement::Left => Rect {
            width: rect.width / 2,
            ..rect
        },
        Placement::Right => Rect {
            x: rect.x + rect.width - rect.width / 2,
            width: rect.width / 2,
            ..rect
        },
        Placement::Top => Rect {
            height: rect.height / 2,
            ..rect
        },
        Placement::Bottom => Rect {
            y: rect.y + rect.height - rect.height / 2,
            height: rect.height / 2,
            ..rect
        },
        Placement::Stack => rect,
    }
}

/// Resolve a drop at `position`. Edge drops on a stack tab target the whole
/// stack. Returns `None` when nothing valid is under the pointer or the drop
/// would reproduce the current layout.
pub fn resolve_drop(
    tree: &LayoutTree,
    viewports: &ViewportMap,
    edge_band_ratio: f64,
    source: Option<NodeId>,
    position: Position,
    excluded: &BTreeSet<NodeId>,
) -> Option<DropTarget> {
    let leaf = hit_leaf(tree, viewports, position, excluded)?;
    let rect = viewports.get(leaf)?;
    let placement = placement_zone(rect, position, edge_band_ratio);
    let mut target = leaf;
    if placement != Placement::Stack
        && let Some((parent, _)) = tree.parent_of(leaf)
        && tree.row(parent).is_some_and(|row| row.orientation.is_stack())
    {
        target = parent;
    }
    if let Some(source) = source
        && is_degenerate_drop(tree, source, target, placement)
    {
        tracing::debug!(%source, %target, ?placement, "drop would not change the layout");
        return None;
    }
    let target_rect = viewports.get(target).unwrap_or(rect);
    Some(DropTarget {
        target,
        placement,
        preview: preview_rect(target_rect, placement),
    })
}

/// Drops that would leave the tree as it is: onto the source itself or
/// inside it, onto the source's own stack as a tab, or onto the facing edge
/// of the sibling it already touches.
pub fn is_degenerate_drop(
    tree: &LayoutTree,
    source: NodeId,
    target: NodeId,
    placement: Placement,
) -> bool {
    if source == target || tree.is_descendant(target, source) {
        return true;
    }
    let source_slot = tree.parent_of(source);
    match placement.axis() {
        None => {
            let own_stack = source_slot
                .map(|(parent, _)| parent)
                .filter(|parent| tree.row(*parent).is_some_and(|row| row.orientation.is_stack()));
            own_stack.is_some_and(|stack| {
                stack == target || tree.parent_of(target).is_some_and(|(p, _)| p == stack)
            })
        }
        Some(axis) => {
            let (Some((source_parent, source_index)), Some((target_parent, target_index))) =
                (source_slot, tree.parent_of(target))
            else {
                return false;
            };
            if source_parent != target_parent
                || tree
                    .row(source_parent)
                    .is_none_or(|row| row.orientation.axis() != Some(axis))
            {
                return false;
            }
            match placement.side() {
                InsertSide::After => source_index == target_index + 1,
                InsertSide::Before => source_index + 1 == target_index,
            }
        }
    }
}
