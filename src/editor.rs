//! Atomic structural edits on a [`LayoutTree`].
//!
//! Every operation runs against a clone of the tree. The clone is repaired
//! and checked; only then does it replace the caller's tree. A rejected
//! operation leaves the tree exactly as it was.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::layout::{
    Area, Axis, Direction, LayoutNode, LayoutTree, NodeId, Orientation, RowChild, RowNode,
    ViewportMap,
};
use crate::registry::{AreaDescriptor, AreaRegistry};

/// Which side of the source area a split puts the new area on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertSide {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Top,
    Bottom,
    Left,
    Right,
    Stack,
}

impl Placement {
    pub fn axis(self) -> Option<Axis> {
        match self {
            Placement::Left | Placement::Right => Some(Axis::Horizontal),
            Placement::Top | Placement::Bottom => Some(Axis::Vertical),
            Placement::Stack => None,
        }
    }

    pub fn side(self) -> InsertSide {
        match self {
            Placement::Right | Placement::Bottom => InsertSide::After,
            _ => InsertSide::Before,
        }
    }

    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Left => Placement::Left,
            Direction::Right => Placement::Right,
            Direction::Up => Placement::Top,
            Direction::Down => Placement::Bottom,
        }
    }
}

/// What `place_area` puts next to the target.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceSource {
    Existing(NodeId),
    New(AreaDescriptor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinDirection {
    Previous,
    Next,
}

impl JoinDirection {
    fn neighbor(self, index: usize) -> Option<usize> {
        match self {
            JoinDirection::Previous => index.checked_sub(1),
            JoinDirection::Next => index.checked_add(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub label: String,
    pub created: Vec<NodeId>,
    /// Area the edit is confined to, for area-scoped undo.
    pub scope: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct StructuralEditor {
    config: LayoutConfig,
    registry: Arc<dyn AreaRegistry>,
}

impl StructuralEditor {
    pub fn new(config: LayoutConfig, registry: Arc<dyn AreaRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn AreaRegistry> {
        &self.registry
    }

    fn transact<F>(
        &self,
        tree: &mut LayoutTree,
        label: &str,
        scope: Option<NodeId>,
        edit: F,
    ) -> Result<EditOutcome, LayoutError>
    where
        F: FnOnce(&mut LayoutTree) -> Result<Vec<NodeId>, LayoutError>,
    {
        let mut working = tree.clone();
        let result = edit(&mut working).and_then(|created| {
            working.repair(self.config.min_fraction);
            working.check_invariants(self.config.min_fraction)?;
            Ok(created)
        });
        match result {
            Ok(created) => {
                let created = created
                    .into_iter()
                    .filter(|id| working.contains(*id))
                    .collect::<Vec<_>>();
                *tree = working;
                tracing::debug!(label, ?created, "layout edit applied");
                Ok(EditOutcome {
                    label: label.to_string(),
                    created,
                    scope,
                })
            }
            Err(err) => {
                tracing::debug!(label, error = %err, "layout edit rejected");
                Err(err)
            }
        }
    }

    pub fn split_area(
        &self,
        tree: &mut LayoutTree,
        viewports: &ViewportMap,
        leaf: NodeId,
        axis: Axis,
        side: InsertSide,
    ) -> Result<EditOutcome, LayoutError> {
        self.split_area_at(tree, viewports, leaf, axis, side, 0.5)
    }

    /// Split `leaf` along `axis`, giving the new area `fraction` of the
    /// leaf's extent. The fraction is clamped so both halves keep at least
    /// `min_area_size` cells.
    pub fn split_area_at(
        &self,
        tree: &mut LayoutTree,
        viewports: &ViewportMap,
        leaf: NodeId,
        axis: Axis,
        side: InsertSide,
        fraction: f64,
    ) -> Result<EditOutcome, LayoutError> {
        let source = tree.area(leaf).ok_or(LayoutError::UnknownNode(leaf))?;
        if source.locked {
            return Err(LayoutError::invalid(format!("area {leaf} is locked")));
        }
        if !self.registry.splittable(&source.type_tag) {
            return Err(LayoutError::invalid(format!(
                "areas of type `{}` cannot be split",
                source.type_tag
            )));
        }
        let rect = viewports
            .get(leaf)
            .ok_or_else(|| LayoutError::invalid(format!("area {leaf} has no viewport")))?;
        let extent = axis.extent(rect);
        let min_area = self.config.min_area_size.max(1);
        if extent < min_area.saturating_mul(2) {
            return Err(LayoutError::invalid(format!(
                "area {leaf} is {extent} cells along {axis:?}; splitting needs {}",
                u32::from(min_area) * 2
            )));
        }
        if !fraction.is_finite() {
            return Err(LayoutError::invalid("split fraction is not finite"));
        }
        let edge = f64::from(min_area) / f64::from(extent);
        let fraction = fraction.clamp(edge, 1.0 - edge);
        let new_area = Area::new(source.type_tag.clone())
            .with_state(self.registry.default_state(&source.type_tag));
        let orientation = Orientation::from(axis);

        self.transact(tree, "split", None, |working| {
            let created = working.insert(LayoutNode::Area(new_area));
            let slot = working.parent_of(leaf);
            let same_parent = slot.and_then(|(parent, index)| {
                let row = working.row(parent)?;
                (row.orientation == orientation).then_some((parent, index))
            });
            match same_parent {
                Some((parent, index)) => {
                    let Some(row) = working.row_mut(parent) else {
                        return Err(LayoutError::UnknownNode(parent));
                    };
                    let slot_size = row.children[index].size;
                    row.children[index].size = slot_size * (1.0 - fraction);
                    let child = RowChild::new(created, slot_size * fraction);
                    let at = match side {
                        InsertSide::Before => index,
                        InsertSide::After => index + 1,
                    };
                    row.children.insert(at, child);
                    Ok(vec![created])
                }
                None => {
                    let children = match side {
                        InsertSide::Before => vec![
                            RowChild::new(created, fraction),
                            RowChild::new(leaf, 1.0 - fraction),
                        ],
                        InsertSide::After => vec![
                            RowChild::new(leaf, 1.0 - fraction),
                            RowChild::new(created, fraction),
                        ],
                    };
                    let row = working.insert(LayoutNode::Row(RowNode::new(orientation, children)));
                    working.replace_slot(slot, leaf, row);
                    Ok(vec![created, row])
                }
            }
        })
    }

    /// Assign a row's sizes. Sizes summing to roughly 1.0 are taken as-is,
    /// anything else is scaled.
    pub fn set_row_sizes(
        &self,
        tree: &mut LayoutTree,
        row: NodeId,
        sizes: &[f64],
    ) -> Result<EditOutcome, LayoutError> {
        let current = tree.row(row).ok_or(LayoutError::UnknownNode(row))?;
        if sizes.len() != current.children.len() {
            return Err(LayoutError::invalid(format!(
                "row {row} has {} children but {} sizes were given",
                current.children.len(),
                sizes.len()
            )));
        }
        if sizes.iter().any(|size| !size.is_finite() || *size < 0.0) {
            return Err(LayoutError::invalid("sizes must be finite and non-negative"));
        }
        let sum: f64 = sizes.iter().sum();
        if sum <= f64::EPSILON {
            return Err(LayoutError::invalid("sizes sum to zero"));
        }
        let scaled: Vec<f64> = if (sum - 1.0).abs() <= crate::layout::SIZE_TOLERANCE {
            sizes.to_vec()
        } else {
            sizes.iter().map(|size| size / sum).collect()
        };
        let floor = crate::layout::effective_min_fraction(scaled.len(), self.config.min_fraction);
        if let Some(small) = scaled.iter().find(|size| **size < floor - 1e-9) {
            return Err(LayoutError::invalid(format!(
                "size {small} is below the minimum fraction {floor}"
            )));
        }
        self.transact(tree, "resize", None, |working| {
            let Some(target) = working.row_mut(row) else {
                return Err(LayoutError::UnknownNode(row));
            };
            for (child, size) in target.children.iter_mut().zip(&scaled) {
                child.size = *size;
            }
            Ok(Vec::new())
        })
    }

    /// Remove child `remove_index` of `row`, handing its size to the
    /// neighbor in `direction`.
    pub fn join_areas(
        &self,
        tree: &mut LayoutTree,
        row: NodeId,
        remove_index: usize,
        direction: JoinDirection,
    ) -> Result<EditOutcome, LayoutError> {
        let current = tree.row(row).ok_or(LayoutError::UnknownNode(row))?;
        let removed = current
            .children
            .get(remove_index)
            .copied()
            .ok_or_else(|| LayoutError::invalid(format!("row {row} has no child {remove_index}")))?;
        let neighbor = direction
            .neighbor(remove_index)
            .filter(|index| *index < current.children.len())
            .ok_or_else(|| {
                LayoutError::invalid(format!(
                    "child {remove_index} of row {row} has no neighbor toward {direction:?}"
                ))
            })?;
        if tree.contains_locked(removed.id) {
            return Err(LayoutError::invalid(format!(
                "{} holds a locked area",
                removed.id
            )));
        }
        let survivor = current.children[neighbor].id;
        let two_children = current.children.len() == 2;

        self.transact(tree, "join", None, |working| {
            if two_children {
                let slot = working.parent_of(row);
                working.replace_slot(slot, row, survivor);
                working.set_node(row, None);
            } else {
                let Some(target) = working.row_mut(row) else {
                    return Err(LayoutError::UnknownNode(row));
                };
                target.children[neighbor].size += removed.size;
                target.children.remove(remove_index);
                if target.active_tab == Some(removed.id) {
                    target.active_tab = Some(survivor);
                }
            }
            working.remove_subtree(removed.id);
            Ok(Vec::new())
        })
    }

    /// Put `source` at `placement` relative to `target`.
    pub fn place_area(
        &self,
        tree: &mut LayoutTree,
        source: PlaceSource,
        target: NodeId,
        placement: Placement,
    ) -> Result<EditOutcome, LayoutError> {
        if !tree.contains(target) {
            return Err(LayoutError::UnknownNode(target));
        }
        let (label, prepared) = match &source {
            PlaceSource::Existing(id) => {
                let id = *id;
                if !tree.contains(id) {
                    return Err(LayoutError::UnknownNode(id));
                }
                if id == target || tree.is_descendant(target, id) {
                    return Err(LayoutError::invalid(format!(
                        "cannot place {id} relative to itself or its own descendant {target}"
                    )));
                }
                if tree.contains_locked(id) {
                    return Err(LayoutError::invalid(format!("{id} holds a locked area")));
                }
                ("move", None)
            }
            PlaceSource::New(descriptor) => ("place", Some(descriptor.validate(&*self.registry)?)),
        };

        self.transact(tree, label, None, |working| {
            let (moved, target, mut created) = match (source, prepared) {
                (PlaceSource::Existing(id), _) => {
                    // The target's row collapses when `id` was its only sibling.
                    let mut target = target;
                    if let Some((parent, _)) = working.parent_of(id)
                        && parent == target
                        && let Some(row) = working.row(parent)
                        && row.children.len() == 2
                        && let Some(other) = row.child_ids().find(|child| *child != id)
                    {
                        target = other;
                    }
                    working.detach_from_parent(id);
                    working.collapse_single_child_rows();
                    (id, target, Vec::new())
                }
                (PlaceSource::New(_), Some(area)) => {
                    let id = working.insert(LayoutNode::Area(area));
                    (id, target, vec![id])
                }
                (PlaceSource::New(_), None) => {
                    return Err(LayoutError::invalid("descriptor was not validated"));
                }
            };
            if !working.contains(target) {
                return Err(LayoutError::UnknownNode(target));
            }
            match placement.axis() {
                None => {
                    if let Some(stack) = attach_to_stack(working, moved, target) {
                        created.push(stack);
                    }
                }
                Some(axis) => {
                    // A row target of the same orientation takes the source
                    // as its first or last child.
                    if let Some(row) = attach_on_edge(working, moved, target, axis, placement.side()) {
                        created.push(row);
                    }
                }
            }
            Ok(created)
        })
    }

    pub fn add_area(
        &self,
        tree: &mut LayoutTree,
        descriptor: AreaDescriptor,
        target: NodeId,
        placement: Placement,
    ) -> Result<EditOutcome, LayoutError> {
        self.place_area(tree, PlaceSource::New(descriptor), target, placement)
    }

    pub fn remove_area(&self, tree: &mut LayoutTree, id: NodeId) -> Result<EditOutcome, LayoutError> {
        self.check_removable(tree, id)?;
        self.transact(tree, "remove", None, |working| {
            working.detach_from_parent(id);
            working.remove_subtree(id);
            Ok(Vec::new())
        })
    }

    /// Remove `id` and everything below it, returning it as a new tree.
    pub fn detach_area(
        &self,
        tree: &mut LayoutTree,
        id: NodeId,
    ) -> Result<(LayoutTree, EditOutcome), LayoutError> {
        self.check_removable(tree, id)?;
        let mut detached = tree
            .extract_subtree(id)
            .ok_or(LayoutError::UnknownNode(id))?;
        detached.repair(self.config.min_fraction);
        let outcome = self.transact(tree, "detach", None, |working| {
            working.detach_from_parent(id);
            working.remove_subtree(id);
            Ok(Vec::new())
        })?;
        Ok((detached, outcome))
    }

    fn check_removable(&self, tree: &LayoutTree, id: NodeId) -> Result<(), LayoutError> {
        if !tree.contains(id) {
            return Err(LayoutError::UnknownNode(id));
        }
        if id == tree.root() {
            return Err(LayoutError::invalid("the root cannot be removed"));
        }
        if tree.contains_locked(id) {
            return Err(LayoutError::invalid(format!("{id} holds a locked area")));
        }
        Ok(())
    }

    pub fn set_active_tab(
        &self,
        tree: &mut LayoutTree,
        row: NodeId,
        child: NodeId,
    ) -> Result<EditOutcome, LayoutError> {
        let stack = tree.row(row).ok_or(LayoutError::UnknownNode(row))?;
        if !stack.orientation.is_stack() {
            return Err(LayoutError::invalid(format!("row {row} is not a stack")));
        }
        if stack.index_of(child).is_none() {
            return Err(LayoutError::invalid(format!("{child} is not a tab of {row}")));
        }
        self.transact(tree, "activate tab", None, |working| {
            if let Some(stack) = working.row_mut(row) {
                stack.active_tab = Some(child);
            }
            Ok(Vec::new())
        })
    }

    pub fn set_area_state(
        &self,
        tree: &mut LayoutTree,
        id: NodeId,
        state: Value,
    ) -> Result<EditOutcome, LayoutError> {
        let area = tree.area(id).ok_or(LayoutError::UnknownNode(id))?;
        self.registry
            .validate_state(&area.type_tag, &state)
            .map_err(LayoutError::Validation)?;
        self.transact(tree, "set state", Some(id), |working| {
            let area = working.area_mut(id).ok_or(LayoutError::UnknownNode(id))?;
            area.state = state;
            Ok(Vec::new())
        })
    }

    /// Change an area's type. The state is reset to the new type's default.
    pub fn set_area_type(
        &self,
        tree: &mut LayoutTree,
        id: NodeId,
        type_tag: &str,
    ) -> Result<EditOutcome, LayoutError> {
        if tree.area(id).is_none() {
            return Err(LayoutError::UnknownNode(id));
        }
        let area = AreaDescriptor::new(type_tag).validate(&*self.registry)?;
        self.transact(tree, "set type", Some(id), |working| {
            let current = working.area_mut(id).ok_or(LayoutError::UnknownNode(id))?;
            current.type_tag = area.type_tag;
            current.state = area.state;
            Ok(Vec::new())
        })
    }

    pub fn set_locked(
        &self,
        tree: &mut LayoutTree,
        id: NodeId,
        locked: bool,
    ) -> Result<EditOutcome, LayoutError> {
        if tree.area(id).is_none() {
            return Err(LayoutError::UnknownNode(id));
        }
        let label = if locked { "lock" } else { "unlock" };
        self.transact(tree, label, Some(id), |working| {
            let area = working.area_mut(id).ok_or(LayoutError::UnknownNode(id))?;
            area.locked = locked;
            Ok(Vec::new())
        })
    }
}

/// Add `moved` as a tab next to `target`. Returns the stack row when one had
/// to be created.
fn attach_to_stack(tree: &mut LayoutTree, moved: NodeId, target: NodeId) -> Option<NodeId> {
    let existing = if tree.row(target).is_some_and(|row| row.orientation.is_stack()) {
        Some(target)
    } else {
        tree.parent_of(target)
            .map(|(parent, _)| parent)
            .filter(|parent| tree.row(*parent).is_some_and(|row| row.orientation.is_stack()))
    };
    if let Some(stack) = existing
        && let Some(row) = tree.row_mut(stack)
    {
        let count = row.children.len() as f64 + 1.0;
        for child in &mut row.children {
            child.size = 1.0 / count;
        }
        row.children.push(RowChild::new(moved, 1.0 / count));
        return None;
    }
    let slot = tree.parent_of(target);
    let mut row = RowNode::new(
        Orientation::Stack,
        vec![RowChild::new(target, 0.5), RowChild::new(moved, 0.5)],
    );
    row.active_tab = Some(target);
    let stack = tree.insert(LayoutNode::Row(row));
    tree.replace_slot(slot, target, stack);
    Some(stack)
}

/// Put `moved` beside `target` along `axis`. Returns the new row when one
/// had to be created.
fn attach_on_edge(
    tree: &mut LayoutTree,
    moved: NodeId,
    target: NodeId,
    axis: Axis,
    side: InsertSide,
) -> Option<NodeId> {
    let orientation = Orientation::from(axis);
    if let Some((parent, index)) = tree.parent_of(target)
        && let Some(row) = tree.row_mut(parent)
        && row.orientation == orientation
    {
        let half = row.children[index].size / 2.0;
        row.children[index].size = half;
        let at = match side {
            InsertSide::Before => index,
            InsertSide::After => index + 1,
        };
        row.children.insert(at, RowChild::new(moved, half));
        return None;
    }
    if let Some(row) = tree.row_mut(target)
        && row.orientation == orientation
    {
        let count = row.children.len() as f64;
        for child in &mut row.children {
            child.size *= count / (count + 1.0);
        }
        let child = RowChild::new(moved, 1.0 / (count + 1.0));
        match side {
            InsertSide::Before => row.children.insert(0, child),
            InsertSide::After => row.children.push(child),
        }
        return None;
    }
    let slot = tree.parent_of(target);
    let children = match side {
        InsertSide::Before => vec![RowChild::new(moved, 0.5), RowChild::new(target, 0.5)],
        InsertSide::After => vec![RowChild::new(target, 0.5), RowChild::new(moved, 0.5)],
    };
    let row = tree.insert(LayoutNode::Row(RowNode::new(orientation, children)));
    tree.replace_slot(slot, target, row);
    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute;
    use crate::registry::{AreaType, PermissiveRegistry, TypeRegistry};
    use pretty_assertions::assert_eq;
    use ratatui::prelude::Rect;

    const BOUNDS: Rect = Rect {
        x: 0,
        y: 0,
        width: 800,
        height: 600,
    };

    fn editor() -> StructuralEditor {
        StructuralEditor::new(LayoutConfig::default(), Arc::new(PermissiveRegistry))
    }

    fn split(editor: &StructuralEditor, tree: &mut LayoutTree, leaf: NodeId, axis: Axis) -> NodeId {
        let viewports = compute(tree, BOUNDS);
        let outcome = editor
            .split_area(tree, &viewports, leaf, axis, InsertSide::After)
            .expect("split");
        outcome.created[0]
    }

    #[test]
    fn split_wraps_root_leaf_in_row() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("viewer"));
        let first = tree.root();
        let second = split(&editor, &mut tree, first, Axis::Horizontal);
        let root = tree.row(tree.root()).expect("root row");
        assert_eq!(root.orientation, Orientation::Horizontal);
        assert_eq!(
            root.children,
            vec![RowChild::new(first, 0.5), RowChild::new(second, 0.5)]
        );
        let viewports = compute(&tree, BOUNDS);
        assert_eq!(viewports.get(first), Some(Rect::new(0, 0, 400, 600)));
        assert_eq!(viewports.get(second), Some(Rect::new(400, 0, 400, 600)));
    }

    #[test]
    fn split_in_matching_parent_halves_the_slot() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("viewer"));
        let first = tree.root();
        let second = split(&editor, &mut tree, first, Axis::Horizontal);
        let third = split(&editor, &mut tree, second, Axis::Horizontal);
        let root = tree.row(tree.root()).expect("root row");
        assert_eq!(
            root.children,
            vec![
                RowChild::new(first, 0.5),
                RowChild::new(second, 0.25),
                RowChild::new(third, 0.25)
            ]
        );
    }

    #[test]
    fn split_refuses_small_and_locked_areas() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("viewer"));
        let leaf = tree.root();
        let tiny = compute(&tree, Rect::new(0, 0, 7, 7));
        let before = tree.clone();
        assert!(matches!(
            editor.split_area(&mut tree, &tiny, leaf, Axis::Horizontal, InsertSide::After),
            Err(LayoutError::InvalidOperation(_))
        ));
        editor.set_locked(&mut tree, leaf, true).expect("lock");
        let viewports = compute(&tree, BOUNDS);
        assert!(
            editor
                .split_area(&mut tree, &viewports, leaf, Axis::Vertical, InsertSide::After)
                .is_err()
        );
        assert_eq!(tree.row(tree.root()), before.row(before.root()));
    }

    #[test]
    fn split_refuses_unsplittable_types() {
        let registry = TypeRegistry::new().with_type(
            "toolbar",
            AreaType {
                splittable: false,
                ..AreaType::default()
            },
        );
        let editor = StructuralEditor::new(LayoutConfig::default(), Arc::new(registry));
        let mut tree = LayoutTree::new(Area::new("toolbar"));
        let viewports = compute(&tree, BOUNDS);
        let leaf = tree.root();
        assert!(
            editor
                .split_area(&mut tree, &viewports, leaf, Axis::Vertical, InsertSide::Before)
                .is_err()
        );
    }

    #[test]
    fn set_row_sizes_validates_input() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("viewer"));
        let leaf = tree.root();
        split(&editor, &mut tree, leaf, Axis::Horizontal);
        let row = tree.root();
        assert!(editor.set_row_sizes(&mut tree, row, &[1.0]).is_err());
        assert!(editor.set_row_sizes(&mut tree, row, &[f64::NAN, 1.0]).is_err());
        assert!(editor.set_row_sizes(&mut tree, row, &[0.0, 0.0]).is_err());
        assert!(editor.set_row_sizes(&mut tree, row, &[0.99, 0.01]).is_err());
        editor.set_row_sizes(&mut tree, row, &[3.0, 1.0]).expect("scaled");
        assert_eq!(tree.row(row).map(RowNode::sizes), Some(vec![0.75, 0.25]));
    }

    #[test]
    fn join_two_children_collapses_into_parent_slot() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("viewer"));
        let a = tree.root();
        let b = split(&editor, &mut tree, a, Axis::Horizontal);
        let c = split(&editor, &mut tree, b, Axis::Vertical);
        let root = tree.root();
        let inner = tree.parent_of(b).map(|(row, _)| row).expect("inner row");
        editor
            .join_areas(&mut tree, inner, 1, JoinDirection::Previous)
            .expect("join");
        assert!(!tree.contains(c));
        assert!(!tree.contains(inner));
        let root_row = tree.row(root).expect("root row");
        assert_eq!(root_row.children[1], RowChild::new(b, 0.5));
    }

    #[test]
    fn join_merges_size_into_neighbor() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("viewer"));
        let a = tree.root();
        let b = split(&editor, &mut tree, a, Axis::Horizontal);
        let c = split(&editor, &mut tree, b, Axis::Horizontal);
        let row = tree.root();
        editor
            .join_areas(&mut tree, row, 2, JoinDirection::Previous)
            .expect("join");
        assert!(!tree.contains(c));
        assert_eq!(tree.row(row).map(RowNode::sizes), Some(vec![0.5, 0.5]));
        assert!(
            editor
                .join_areas(&mut tree, row, 1, JoinDirection::Next)
                .is_err()
        );
    }

    #[test]
    fn place_new_area_on_edges_and_stack() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("viewer"));
        let target = tree.root();
        let below = editor
            .add_area(&mut tree, AreaDescriptor::new("outline"), target, Placement::Bottom)
            .expect("bottom")
            .created[0];
        let root = tree.row(tree.root()).expect("root row");
        assert_eq!(root.orientation, Orientation::Vertical);
        assert_eq!(root.child_ids().collect::<Vec<_>>(), vec![target, below]);

        let tab = editor
            .add_area(&mut tree, AreaDescriptor::new("timeline"), below, Placement::Stack)
            .expect("stack")
            .created[0];
        let (stack, _) = tree.parent_of(tab).expect("stack parent");
        let stack_row = tree.row(stack).expect("stack row");
        assert!(stack_row.orientation.is_stack());
        assert_eq!(stack_row.active_tab, Some(below));

        let another = editor
            .add_area(&mut tree, AreaDescriptor::new("console"), tab, Placement::Stack)
            .expect("append tab")
            .created[0];
        let stack_row = tree.row(stack).expect("stack row");
        assert_eq!(stack_row.children.len(), 3);
        assert_eq!(stack_row.children[2].id, another);
        assert_eq!(stack_row.active_tab, Some(below));
    }

    #[test]
    fn move_next_to_own_parent_row() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("a"));
        let a = tree.root();
        let b = split(&editor, &mut tree, a, Axis::Horizontal);
        let row = tree.root();
        editor
            .place_area(&mut tree, PlaceSource::Existing(b), row, Placement::Top)
            .expect("move");
        let root = tree.row(tree.root()).expect("root row");
        assert_eq!(root.orientation, Orientation::Vertical);
        assert_eq!(root.child_ids().collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn place_rejects_self_and_descendants() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("a"));
        let a = tree.root();
        split(&editor, &mut tree, a, Axis::Horizontal);
        let row = tree.root();
        assert!(
            editor
                .place_area(&mut tree, PlaceSource::Existing(a), a, Placement::Left)
                .is_err()
        );
        assert!(
            editor
                .place_area(&mut tree, PlaceSource::Existing(row), a, Placement::Left)
                .is_err()
        );
    }

    #[test]
    fn remove_refuses_root_and_locked() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("a"));
        let a = tree.root();
        let b = split(&editor, &mut tree, a, Axis::Vertical);
        let root = tree.root();
        assert!(editor.remove_area(&mut tree, root).is_err());
        editor.set_locked(&mut tree, b, true).expect("lock");
        assert!(editor.remove_area(&mut tree, b).is_err());
        editor.remove_area(&mut tree, a).expect("remove");
        assert_eq!(tree.root(), b);
    }

    #[test]
    fn detach_returns_independent_tree() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("a"));
        let a = tree.root();
        let b = split(&editor, &mut tree, a, Axis::Vertical);
        editor
            .set_area_state(&mut tree, b, serde_json::json!({ "scroll": 4 }))
            .expect("state");
        let (detached, outcome) = editor.detach_area(&mut tree, b).expect("detach");
        assert_eq!(outcome.label, "detach");
        assert_eq!(tree.root(), a);
        let area = detached.area(detached.root()).expect("leaf");
        assert_eq!(area.state, serde_json::json!({ "scroll": 4 }));
    }

    #[test]
    fn set_active_tab_requires_stack_member() {
        let editor = editor();
        let mut tree = LayoutTree::new(Area::new("a"));
        let a = tree.root();
        let b = editor
            .add_area(&mut tree, AreaDescriptor::new("b"), a, Placement::Stack)
            .expect("stack")
            .created[0];
        let stack = tree.root();
        editor.set_active_tab(&mut tree, stack, b).expect("activate");
        assert_eq!(tree.row(stack).and_then(|row| row.active_tab), Some(b));
        assert!(editor.set_active_tab(&mut tree, stack, stack).is_err());
    }
}
