//! Undo/redo over committed layout edits.
//!
//! Entries hold a node-level diff rather than whole snapshots: only the
//! nodes an edit touched are recorded, before and after.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Instant;

use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::layout::{LayoutNode, LayoutTree, NodeId};

/// Before/after image of every node that differs between two trees.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDiff {
    changes: BTreeMap<NodeId, (Option<LayoutNode>, Option<LayoutNode>)>,
    root: (NodeId, NodeId),
    next_id: (u64, u64),
}

impl TreeDiff {
    pub fn between(before: &LayoutTree, after: &LayoutTree) -> Self {
        let ids: BTreeSet<NodeId> = before.node_ids().chain(after.node_ids()).collect();
        let changes = ids
            .into_iter()
            .filter_map(|id| {
                let old = before.node(id);
                let new = after.node(id);
                (old != new).then(|| (id, (old.cloned(), new.cloned())))
            })
            .collect();
        Self {
            changes,
            root: (before.root(), after.root()),
            next_id: (before.next_id(), after.next_id()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.root.0 == self.root.1
    }

    pub fn touched(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.changes.keys().copied()
    }

    pub fn apply_forward(&self, tree: &mut LayoutTree) {
        for (id, (_, after)) in &self.changes {
            tree.set_node(*id, after.clone());
        }
        if tree.root() == self.root.0 {
            tree.set_root(self.root.1);
        }
        tree.set_next_id(self.next_id.1);
    }

    pub fn apply_inverse(&self, tree: &mut LayoutTree) {
        for (id, (before, _)) in &self.changes {
            tree.set_node(*id, before.clone());
        }
        if tree.root() == self.root.1 {
            tree.set_root(self.root.0);
        }
        tree.set_next_id(self.next_id.0);
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub label: String,
    pub diff: TreeDiff,
    pub timestamp: Instant,
    pub scope: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    past: VecDeque<HistoryEntry>,
    future: VecDeque<HistoryEntry>,
    limit: usize,
    replaying: bool,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLedger {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit: limit.max(1),
            replaying: false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.past.iter()
    }

    pub fn future(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.future.iter()
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Record the change from `before` to `after`. Returns `false` when
    /// nothing was recorded: the trees are equal, or an undo/redo is being
    /// applied.
    pub fn commit(
        &mut self,
        label: impl Into<String>,
        scope: Option<NodeId>,
        before: &LayoutTree,
        after: &LayoutTree,
    ) -> bool {
        if self.replaying {
            return false;
        }
        let diff = TreeDiff::between(before, after);
        if diff.is_empty() {
            return false;
        }
        let label = label.into();
        tracing::debug!(label = %label, ?scope, nodes = diff.changes.len(), "history commit");
        self.past.push_back(HistoryEntry {
            label,
            diff,
            timestamp: Instant::now(),
            scope,
        });
        self.future.clear();
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        true
    }

    pub fn undo(&mut self, tree: &mut LayoutTree, scope: Option<NodeId>) -> Option<String> {
        self.undo_with(tree, scope, |_, _| {})
    }

    pub fn redo(&mut self, tree: &mut LayoutTree, scope: Option<NodeId>) -> Option<String> {
        self.redo_with(tree, scope, |_, _| {})
    }

    /// Undo, then run `after` with recording suppressed.
    pub fn undo_with<F>(
        &mut self,
        tree: &mut LayoutTree,
        scope: Option<NodeId>,
        after: F,
    ) -> Option<String>
    where
        F: FnOnce(&mut LayoutTree, &mut HistoryLedger),
    {
        let index = take_index(&self.past, scope)?;
        let entry = self.past.remove(index)?;
        self.replaying = true;
        entry.diff.apply_inverse(tree);
        after(tree, self);
        self.replaying = false;
        tracing::debug!(label = %entry.label, ?scope, "undo");
        let label = entry.label.clone();
        self.future.push_back(entry);
        while self.future.len() > self.limit {
            self.future.pop_front();
        }
        Some(label)
    }

    /// Redo, then run `after` with recording suppressed.
    pub fn redo_with<F>(
        &mut self,
        tree: &mut LayoutTree,
        scope: Option<NodeId>,
        after: F,
    ) -> Option<String>
    where
        F: FnOnce(&mut LayoutTree, &mut HistoryLedger),
    {
        let index = take_index(&self.future, scope)?;
        let entry = self.future.remove(index)?;
        self.replaying = true;
        entry.diff.apply_forward(tree);
        after(tree, self);
        self.replaying = false;
        tracing::debug!(label = %entry.label, ?scope, "redo");
        let label = entry.label.clone();
        self.past.push_back(entry);
        Some(label)
    }
}

/// Most recent entry matching `scope`; any entry when unscoped.
fn take_index(entries: &VecDeque<HistoryEntry>, scope: Option<NodeId>) -> Option<usize> {
    match scope {
        None => entries.len().checked_sub(1),
        Some(scope) => entries.iter().rposition(|entry| entry.scope == Some(scope)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Area;
    use pretty_assertions::assert_eq;

    fn retagged(tree: &LayoutTree, tag: &str) -> LayoutTree {
        let mut next = tree.clone();
        let root = next.root();
        if let Some(area) = next.area_mut(root) {
            area.type_tag = tag.to_string();
        }
        next
    }

    #[test]
    fn empty_diff_is_not_recorded() {
        let tree = LayoutTree::new(Area::new("a"));
        let mut ledger = HistoryLedger::default();
        assert!(!ledger.commit("noop", None, &tree, &tree));
        assert!(!ledger.can_undo());
    }

    #[test]
    fn undo_and_redo_walk_the_stacks() {
        let t0 = LayoutTree::new(Area::new("a"));
        let t1 = retagged(&t0, "b");
        let t2 = retagged(&t1, "c");
        let t3 = retagged(&t2, "d");
        let mut ledger = HistoryLedger::default();
        ledger.commit("one", None, &t0, &t1);
        ledger.commit("two", None, &t1, &t2);
        ledger.commit("three", None, &t2, &t3);

        let mut tree = t3.clone();
        assert_eq!(ledger.undo(&mut tree, None).as_deref(), Some("three"));
        assert_eq!(ledger.undo(&mut tree, None).as_deref(), Some("two"));
        assert_eq!(tree, t1);
        assert_eq!(ledger.redo(&mut tree, None).as_deref(), Some("two"));
        assert_eq!(tree, t2);
    }

    #[test]
    fn commit_clears_future_and_trims_oldest() {
        let t0 = LayoutTree::new(Area::new("a"));
        let t1 = retagged(&t0, "b");
        let t2 = retagged(&t1, "c");
        let mut ledger = HistoryLedger::new(1);
        ledger.commit("one", None, &t0, &t1);
        ledger.commit("two", None, &t1, &t2);
        assert_eq!(ledger.past().count(), 1);
        let mut tree = t2.clone();
        ledger.undo(&mut tree, None);
        assert!(ledger.can_redo());
        ledger.commit("three", None, &t1, &t0);
        assert!(!ledger.can_redo());
    }

    #[test]
    fn scoped_undo_skips_other_scopes() {
        let t0 = LayoutTree::new(Area::new("a"));
        let root = t0.root();
        let t1 = retagged(&t0, "b");
        let mut t2 = t1.clone();
        if let Some(area) = t2.area_mut(root) {
            area.locked = true;
        }
        let mut ledger = HistoryLedger::default();
        ledger.commit("retag", Some(root), &t0, &t1);
        ledger.commit("structural", None, &t1, &t2);
        let mut tree = t2.clone();
        assert_eq!(ledger.undo(&mut tree, Some(root)).as_deref(), Some("retag"));
        assert_eq!(ledger.past().count(), 1);
        assert_eq!(ledger.undo(&mut tree, Some(NodeId::new(99))), None);
    }

    #[test]
    fn recording_is_suppressed_while_replaying() {
        let t0 = LayoutTree::new(Area::new("a"));
        let t1 = retagged(&t0, "b");
        let mut ledger = HistoryLedger::default();
        ledger.commit("one", None, &t0, &t1);
        let mut tree = t1.clone();
        ledger.undo_with(&mut tree, None, |tree, ledger| {
            let changed = retagged(tree, "z");
            assert!(ledger.is_replaying());
            assert!(!ledger.commit("nested", None, tree, &changed));
        });
        assert!(!ledger.can_undo());
        assert!(ledger.can_redo());
    }
}
