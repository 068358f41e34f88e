//! Flat, id-addressed layout tree.
//!
//! Nodes live in a single `id -> node` map and refer to each other only by
//! [`NodeId`]. Rows own an ordered list of `(child id, size fraction)` slots;
//! leaves carry an [`Area`] payload. Nothing here holds references into the
//! map, so structural edits are plain map updates and a malformed tree can
//! always be repaired in place by [`LayoutTree::repair`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::Axis;

/// Tolerance for `Σ size == 1.0` on a committed row.
pub const SIZE_TOLERANCE: f64 = 1e-3;

/// Sums closer to 1.0 than this are left untouched by the repair pass.
const NORMALIZED_EPSILON: f64 = 1e-9;

/// Type tag given to areas materialized by the repair pass.
pub const EMPTY_AREA_TYPE: &str = "empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an area participates in cross-area focus propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaRole {
    #[default]
    Independent,
    Lead,
    Follow,
}

/// Leaf payload: what occupies one rectangle of the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub type_tag: String,
    #[serde(default)]
    pub state: Value,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub role: AreaRole,
}

impl Area {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            state: Value::Null,
            locked: false,
            role: AreaRole::Independent,
        }
    }

    pub fn empty() -> Self {
        Self::new(EMPTY_AREA_TYPE)
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    pub fn with_role(mut self, role: AreaRole) -> Self {
        self.role = role;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
    /// Children overlap completely; only the active tab is shown.
    Stack,
}

impl Orientation {
    pub fn axis(self) -> Option<Axis> {
        match self {
            Orientation::Horizontal => Some(Axis::Horizontal),
            Orientation::Vertical => Some(Axis::Vertical),
            Orientation::Stack => None,
        }
    }

    pub fn is_stack(self) -> bool {
        self == Orientation::Stack
    }
}

impl From<Axis> for Orientation {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Orientation::Horizontal,
            Axis::Vertical => Orientation::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowChild {
    pub id: NodeId,
    pub size: f64,
}

impl RowChild {
    pub fn new(id: NodeId, size: f64) -> Self {
        Self { id, size }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowNode {
    pub orientation: Orientation,
    pub children: Vec<RowChild>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab: Option<NodeId>,
}

impl RowNode {
    pub fn new(orientation: Orientation, children: Vec<RowChild>) -> Self {
        let active_tab = if orientation.is_stack() {
            children.first().map(|child| child.id)
        } else {
            None
        };
        Self {
            orientation,
            children,
            active_tab,
        }
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.children.iter().position(|child| child.id == id)
    }

    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().map(|child| child.id)
    }

    pub fn sizes(&self) -> Vec<f64> {
        self.children.iter().map(|child| child.size).collect()
    }

    /// The tab a stack shows; falls back to the first child.
    pub fn visible_tab(&self) -> Option<NodeId> {
        self.active_tab
            .filter(|tab| self.index_of(*tab).is_some())
            .or_else(|| self.children.first().map(|child| child.id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutNode {
    Area(Area),
    Row(RowNode),
}

impl LayoutNode {
    pub fn as_area(&self) -> Option<&Area> {
        match self {
            LayoutNode::Area(area) => Some(area),
            LayoutNode::Row(_) => None,
        }
    }

    pub fn as_row(&self) -> Option<&RowNode> {
        match self {
            LayoutNode::Row(row) => Some(row),
            LayoutNode::Area(_) => None,
        }
    }
}

/// Everything the repair pass changed. Empty when the tree was already valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub materialized: Vec<NodeId>,
    /// `(row, child)` slots dropped because the child was already reachable.
    pub dropped_links: Vec<(NodeId, NodeId)>,
    pub emptied_rows: Vec<NodeId>,
    pub collapsed: Vec<NodeId>,
    pub normalized: Vec<NodeId>,
    pub retargeted_tabs: Vec<NodeId>,
    pub pruned: Vec<NodeId>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.materialized.is_empty()
            && self.dropped_links.is_empty()
            && self.emptied_rows.is_empty()
            && self.collapsed.is_empty()
            && self.normalized.is_empty()
            && self.retargeted_tabs.is_empty()
            && self.pruned.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("root {0} is missing")]
    MissingRoot(NodeId),
    #[error("row {row} references missing child {child}")]
    DanglingChild { row: NodeId, child: NodeId },
    #[error("node {0} is reachable through more than one path")]
    SharedNode(NodeId),
    #[error("row {row} has {count} children")]
    DegenerateRow { row: NodeId, count: usize },
    #[error("row {row} sizes sum to {sum}")]
    SizeSum { row: NodeId, sum: f64 },
    #[error("row {row} gives child {child} only {size}")]
    SizeBelowMinimum { row: NodeId, child: NodeId, size: f64 },
    #[error("row {row} marks {tab} active but does not contain it")]
    ForeignActiveTab { row: NodeId, tab: NodeId },
    #[error("node {0} is not reachable from the root")]
    Unreachable(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTree {
    nodes: BTreeMap<NodeId, LayoutNode>,
    root: NodeId,
    #[serde(default)]
    next_id: u64,
}

impl LayoutTree {
    /// A tree holding a single area as its root.
    pub fn new(area: Area) -> Self {
        let root = NodeId::new(1);
        let mut nodes = BTreeMap::new();
        nodes.insert(root, LayoutNode::Area(area));
        Self {
            nodes,
            root,
            next_id: 2,
        }
    }

    /// Build a tree from raw parts. No validation happens here; run
    /// [`LayoutTree::repair`] before handing the result to anything else.
    pub fn from_parts(nodes: BTreeMap<NodeId, LayoutNode>, root: NodeId) -> Self {
        let mut tree = Self {
            nodes,
            root,
            next_id: 0,
        };
        tree.sync_next_id();
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes.get(&id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn area(&self, id: NodeId) -> Option<&Area> {
        self.nodes.get(&id).and_then(LayoutNode::as_area)
    }

    pub fn area_mut(&mut self, id: NodeId) -> Option<&mut Area> {
        match self.nodes.get_mut(&id) {
            Some(LayoutNode::Area(area)) => Some(area),
            _ => None,
        }
    }

    pub fn row(&self, id: NodeId) -> Option<&RowNode> {
        self.nodes.get(&id).and_then(LayoutNode::as_row)
    }

    pub fn row_mut(&mut self, id: NodeId) -> Option<&mut RowNode> {
        match self.nodes.get_mut(&id) {
            Some(LayoutNode::Row(row)) => Some(row),
            _ => None,
        }
    }

    pub fn is_area(&self, id: NodeId) -> bool {
        self.area(id).is_some()
    }

    /// Parent row and slot index of `id`, or `None` for the root.
    pub fn parent_of(&self, id: NodeId) -> Option<(NodeId, usize)> {
        self.nodes.iter().find_map(|(row_id, node)| {
            let row = node.as_row()?;
            row.index_of(id).map(|index| (*row_id, index))
        })
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some((parent, _)) = self.parent_of(current) {
            if out.contains(&parent) {
                break;
            }
            out.push(parent);
            current = parent;
        }
        out
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Ids reachable from the root in depth-first pre-order. A node reached a
    /// second time is not descended into again.
    pub fn reachable(&self) -> Vec<NodeId> {
        self.subtree(self.root)
    }

    /// `id` and everything below it, pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(&current) || !seen.insert(current) {
                continue;
            }
            out.push(current);
            if let Some(row) = self.row(current) {
                stack.extend(row.child_ids().collect::<Vec<_>>().into_iter().rev());
            }
        }
        out
    }

    /// Leaf ids under the root, in layout order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.reachable()
            .into_iter()
            .filter(|id| self.is_area(*id))
            .collect()
    }

    pub fn contains_locked(&self, id: NodeId) -> bool {
        self.subtree(id)
            .into_iter()
            .any(|node| self.area(node).is_some_and(|area| area.locked))
    }

    /// Smallest extent `id` can be given along `axis` without squeezing any
    /// area below `leaf_min`.
    ///
    /// Rows sum their children's minimums along their own axis and take the
    /// maximum across it; stacks always take the maximum.
    pub fn min_extent(&self, id: NodeId, axis: Axis, leaf_min: u16) -> u32 {
        self.min_extent_guarded(id, axis, leaf_min, &mut BTreeSet::new())
    }

    fn min_extent_guarded(
        &self,
        id: NodeId,
        axis: Axis,
        leaf_min: u16,
        seen: &mut BTreeSet<NodeId>,
    ) -> u32 {
        let Some(LayoutNode::Row(row)) = self.nodes.get(&id) else {
            return u32::from(leaf_min);
        };
        if !seen.insert(id) {
            return u32::from(leaf_min);
        }
        let mins = row
            .child_ids()
            .map(|child| self.min_extent_guarded(child, axis, leaf_min, seen))
            .collect::<Vec<_>>();
        if row.orientation.axis() == Some(axis) {
            mins.iter().sum()
        } else {
            mins.into_iter().max().unwrap_or(u32::from(leaf_min))
        }
    }

    /// Areas that receive focus alongside `id`.
    ///
    /// A `Lead` area pulls in every `Follow` area sharing its type tag; any
    /// other area is focused alone.
    pub fn focus_group(&self, id: NodeId) -> Vec<NodeId> {
        let Some(area) = self.area(id) else {
            return Vec::new();
        };
        let mut group = vec![id];
        if area.role == AreaRole::Lead {
            group.extend(self.leaves().into_iter().filter(|other| {
                *other != id
                    && self.area(*other).is_some_and(|candidate| {
                        candidate.role == AreaRole::Follow && candidate.type_tag == area.type_tag
                    })
            }));
        }
        group
    }

    /// Copy the subtree rooted at `id` into a fresh, independent tree.
    pub fn extract_subtree(&self, id: NodeId) -> Option<LayoutTree> {
        let ids = self.subtree(id);
        if ids.is_empty() {
            return None;
        }
        let mut remap = BTreeMap::new();
        for (index, old) in ids.iter().enumerate() {
            remap.insert(*old, NodeId::new(index as u64 + 1));
        }
        let mut nodes = BTreeMap::new();
        for old in &ids {
            let node = match self.nodes.get(old)? {
                LayoutNode::Area(area) => LayoutNode::Area(area.clone()),
                LayoutNode::Row(row) => {
                    let children = row
                        .children
                        .iter()
                        .filter_map(|child| {
                            remap.get(&child.id).map(|id| RowChild::new(*id, child.size))
                        })
                        .collect();
                    LayoutNode::Row(RowNode {
                        orientation: row.orientation,
                        children,
                        active_tab: row.active_tab.and_then(|tab| remap.get(&tab).copied()),
                    })
                }
            };
            nodes.insert(remap[old], node);
        }
        Some(LayoutTree::from_parts(nodes, NodeId::new(1)))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut tree: LayoutTree = serde_json::from_str(json)?;
        tree.sync_next_id();
        Ok(tree)
    }

    pub(crate) fn insert(&mut self, node: LayoutNode) -> NodeId {
        self.sync_next_id();
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    pub(crate) fn set_node(&mut self, id: NodeId, node: Option<LayoutNode>) {
        match node {
            Some(node) => {
                self.nodes.insert(id, node);
            }
            None => {
                self.nodes.remove(&id);
            }
        }
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn set_next_id(&mut self, next_id: u64) {
        self.next_id = next_id;
        self.sync_next_id();
    }

    fn sync_next_id(&mut self) {
        let floor = self
            .nodes
            .keys()
            .next_back()
            .map(|id| id.get() + 1)
            .unwrap_or(1)
            .max(self.root.get() + 1);
        if self.next_id < floor {
            self.next_id = floor;
        }
    }

    /// Put `new` where `old` currently sits: in its parent's slot (keeping
    /// the slot size and active-tab marker) or at the root.
    pub(crate) fn replace_slot(&mut self, slot: Option<(NodeId, usize)>, old: NodeId, new: NodeId) {
        match slot {
            None => self.root = new,
            Some((parent, index)) => {
                if let Some(row) = self.row_mut(parent) {
                    if let Some(child) = row.children.get_mut(index) {
                        child.id = new;
                    }
                    if row.active_tab == Some(old) {
                        row.active_tab = Some(new);
                    }
                }
            }
        }
    }

    /// Unlink `id` from its parent row and rescale the remaining siblings.
    /// Returns the former slot. The node itself stays in the map.
    pub(crate) fn detach_from_parent(&mut self, id: NodeId) -> Option<(NodeId, usize, f64)> {
        let (parent, index) = self.parent_of(id)?;
        let row = self.row_mut(parent)?;
        let removed = row.children.remove(index);
        let remaining: f64 = row.children.iter().map(|child| child.size).sum();
        if remaining > 0.0 {
            for child in &mut row.children {
                child.size /= remaining;
            }
        }
        if row.active_tab == Some(id) {
            let fallback = index.min(row.children.len().saturating_sub(1));
            row.active_tab = row.children.get(fallback).map(|child| child.id);
        }
        Some((parent, index, removed.size))
    }

    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let ids = self.subtree(id);
        for node in &ids {
            self.nodes.remove(node);
        }
        ids
    }

    /// Repair every invariant the tree may have lost. Total and idempotent.
    pub fn repair(&mut self, min_fraction: f64) -> RepairReport {
        let mut report = RepairReport::default();
        self.sync_next_id();
        if !self.nodes.contains_key(&self.root) {
            tracing::warn!(root = %self.root, "layout root missing; materializing empty area");
            self.nodes.insert(self.root, LayoutNode::Area(Area::empty()));
            report.materialized.push(self.root);
        }
        self.repair_links(&mut report);
        report.collapsed = self.collapse_single_child_rows();
        self.normalize_rows(min_fraction, &mut report);
        self.repair_active_tabs(&mut report);
        self.prune_unreachable(&mut report);
        if !report.is_clean() {
            tracing::debug!(?report, "layout repaired");
        }
        report
    }

    fn repair_links(&mut self, report: &mut RepairReport) {
        let mut seen = BTreeSet::from([self.root]);
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let Some(row) = self.row(current) else {
                continue;
            };
            let mut kept = Vec::with_capacity(row.children.len());
            let mut missing = Vec::new();
            for child in row.children.clone() {
                if !seen.insert(child.id) {
                    tracing::warn!(row = %current, child = %child.id, "dropping duplicate link");
                    report.dropped_links.push((current, child.id));
                    continue;
                }
                if !self.nodes.contains_key(&child.id) {
                    missing.push(child.id);
                }
                kept.push(child);
            }
            for id in missing {
                tracing::warn!(row = %current, child = %id, "materializing missing child");
                self.nodes.insert(id, LayoutNode::Area(Area::empty()));
                report.materialized.push(id);
            }
            if kept.is_empty() {
                tracing::warn!(row = %current, "row has no children; replacing with empty area");
                self.nodes.insert(current, LayoutNode::Area(Area::empty()));
                report.emptied_rows.push(current);
                continue;
            }
            stack.extend(kept.iter().rev().map(|child| child.id));
            if let Some(row) = self.row_mut(current) {
                row.children = kept;
            }
        }
    }

    /// Replace every reachable single-child row by its child. Returns the
    /// collapsed row ids.
    pub(crate) fn collapse_single_child_rows(&mut self) -> Vec<NodeId> {
        let mut collapsed = Vec::new();
        loop {
            let candidate = self.reachable().into_iter().find_map(|id| {
                let row = self.row(id)?;
                (row.children.len() == 1).then(|| (id, row.children[0].id))
            });
            let Some((row_id, survivor)) = candidate else {
                break;
            };
            let slot = self.parent_of(row_id);
            self.replace_slot(slot, row_id, survivor);
            self.nodes.remove(&row_id);
            collapsed.push(row_id);
        }
        collapsed
    }

    fn normalize_rows(&mut self, min_fraction: f64, report: &mut RepairReport) {
        for id in self.reachable() {
            let Some(row) = self.row_mut(id) else {
                continue;
            };
            let sizes = row.sizes();
            if sizes_are_normalized(&sizes, min_fraction) {
                continue;
            }
            let normalized = normalize_sizes(&sizes, min_fraction);
            for (child, size) in row.children.iter_mut().zip(normalized) {
                child.size = size;
            }
            report.normalized.push(id);
        }
    }

    fn repair_active_tabs(&mut self, report: &mut RepairReport) {
        for id in self.reachable() {
            let Some(row) = self.row_mut(id) else {
                continue;
            };
            let valid = row.active_tab.is_some_and(|tab| row.index_of(tab).is_some());
            let replacement = match (row.orientation.is_stack(), row.active_tab, valid) {
                (_, Some(_), true) => continue,
                (true, _, _) => row.children.first().map(|child| child.id),
                (false, Some(_), false) => None,
                (false, None, _) => continue,
            };
            if row.active_tab.is_some() {
                tracing::warn!(row = %id, "active tab points outside its row");
            }
            row.active_tab = replacement;
            report.retargeted_tabs.push(id);
        }
    }

    fn prune_unreachable(&mut self, report: &mut RepairReport) {
        let reachable: BTreeSet<NodeId> = self.reachable().into_iter().collect();
        let orphans: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !reachable.contains(id))
            .collect();
        for id in orphans {
            tracing::warn!(node = %id, "pruning unreachable node");
            self.nodes.remove(&id);
            report.pruned.push(id);
        }
    }

    /// Report the first invariant the tree violates, without changing it.
    pub fn check_invariants(&self, min_fraction: f64) -> Result<(), InvariantViolation> {
        if !self.nodes.contains_key(&self.root) {
            return Err(InvariantViolation::MissingRoot(self.root));
        }
        let mut seen = BTreeSet::from([self.root]);
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let Some(row) = self.row(current) else {
                continue;
            };
            if row.children.len() < 2 {
                return Err(InvariantViolation::DegenerateRow {
                    row: current,
                    count: row.children.len(),
                });
            }
            let sum: f64 = row.children.iter().map(|child| child.size).sum();
            if !sum.is_finite() || (sum - 1.0).abs() > SIZE_TOLERANCE {
                return Err(InvariantViolation::SizeSum { row: current, sum });
            }
            let floor = effective_min_fraction(row.children.len(), min_fraction);
            for child in &row.children {
                if !self.nodes.contains_key(&child.id) {
                    return Err(InvariantViolation::DanglingChild {
                        row: current,
                        child: child.id,
                    });
                }
                if !seen.insert(child.id) {
                    return Err(InvariantViolation::SharedNode(child.id));
                }
                if child.size < floor - NORMALIZED_EPSILON {
                    return Err(InvariantViolation::SizeBelowMinimum {
                        row: current,
                        child: child.id,
                        size: child.size,
                    });
                }
                stack.push(child.id);
            }
            if let Some(tab) = row.active_tab
                && row.index_of(tab).is_none()
            {
                return Err(InvariantViolation::ForeignActiveTab { row: current, tab });
            }
        }
        if let Some(orphan) = self.nodes.keys().find(|id| !seen.contains(id)) {
            return Err(InvariantViolation::Unreachable(*orphan));
        }
        Ok(())
    }
}

/// The minimum fraction a row of `count` children can honor. When
/// `count × min_fraction` exceeds the whole, every child gets an equal share.
pub fn effective_min_fraction(count: usize, min_fraction: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    min_fraction.clamp(0.0, 1.0 / count as f64)
}

fn sizes_are_normalized(sizes: &[f64], min_fraction: f64) -> bool {
    let floor = effective_min_fraction(sizes.len(), min_fraction);
    let sum: f64 = sizes.iter().sum();
    sum.is_finite()
        && (sum - 1.0).abs() <= NORMALIZED_EPSILON
        && sizes
            .iter()
            .all(|size| size.is_finite() && *size >= floor - NORMALIZED_EPSILON)
}

/// Clamp every size to `min_fraction` and rescale so the sizes sum to 1.0.
///
/// Non-finite and negative entries count as zero. A zero total falls back to
/// an equal split, as does a row too crowded to give everyone the minimum.
pub fn normalize_sizes(sizes: &[f64], min_fraction: f64) -> Vec<f64> {
    let count = sizes.len();
    if count == 0 {
        return Vec::new();
    }
    let equal = 1.0 / count as f64;
    let floor = effective_min_fraction(count, min_fraction);
    if floor >= equal {
        return vec![equal; count];
    }
    let cleaned: Vec<f64> = sizes
        .iter()
        .map(|size| {
            if size.is_finite() && *size > 0.0 {
                *size
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = cleaned.iter().sum();
    if total <= f64::EPSILON {
        return vec![equal; count];
    }
    let mut out: Vec<f64> = cleaned.iter().map(|size| size / total).collect();

    // Pin entries below the floor and shrink the rest until nothing new drops
    // under it.
    let mut pinned = vec![false; count];
    loop {
        let mut changed = false;
        for (index, size) in out.iter().enumerate() {
            if !pinned[index] && *size < floor {
                pinned[index] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        let pinned_count = pinned.iter().filter(|pin| **pin).count() as f64;
        let free_target = 1.0 - pinned_count * floor;
        let free_total: f64 = out
            .iter()
            .zip(&pinned)
            .filter(|(_, pin)| !**pin)
            .map(|(size, _)| *size)
            .sum();
        for (size, pin) in out.iter_mut().zip(&pinned) {
            if *pin {
                *size = floor;
            } else if free_total > 0.0 {
                *size = *size / free_total * free_target;
            }
        }
    }

    let drift = 1.0 - out.iter().sum::<f64>();
    if let Some(largest) = out
        .iter_mut()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    {
        *largest += drift;
    }
    out
}
