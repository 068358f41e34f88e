//! One layout surface: tree, geometry, editor, history and gestures.

use std::sync::Arc;
use std::time::Instant;

use ratatui::prelude::{Position, Rect};
use serde_json::Value;

use crate::config::LayoutConfig;
use crate::editor::{
    EditOutcome, InsertSide, JoinDirection, PlaceSource, Placement, StructuralEditor,
};
use crate::error::LayoutError;
use crate::gesture::{
    Corner, DragSource, GestureCommand, GestureContext, GesturePhase, GesturePreview,
    GestureResolver, PointerEvent,
};
use crate::history::HistoryLedger;
use crate::layout::{
    Axis, Direction, LayoutTree, NodeId, Orientation, SeparatorHandle, SeparatorRef,
    ViewportCompiler, ViewportMap, hit_test_separator, rect_is_degenerate, separator_handles,
    visible_leaves,
};
use crate::registry::{AreaDescriptor, AreaRegistry};

/// Result of a command: what was created and the geometry afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub label: String,
    /// `false` when the command resolved to nothing (cancelled gesture).
    pub applied: bool,
    pub created: Vec<NodeId>,
    pub viewports: ViewportMap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderKind {
    Area { type_tag: String, state: Value },
    Row {
        orientation: Orientation,
        active_tab: Option<NodeId>,
    },
}

/// One entry of the render boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub id: NodeId,
    pub rect: Rect,
    pub kind: RenderKind,
}

macro_rules! gesture_ctx {
    ($session:expr) => {
        GestureContext {
            tree: &$session.tree,
            viewports: &$session.viewports,
            config: $session.editor.config(),
            registry: $session.editor.registry().as_ref(),
        }
    };
}

#[derive(Debug)]
pub struct LayoutSession {
    tree: LayoutTree,
    bounds: Rect,
    compiler: ViewportCompiler,
    viewports: ViewportMap,
    editor: StructuralEditor,
    history: HistoryLedger,
    gestures: GestureResolver,
    gesture_origin: Option<LayoutTree>,
}

impl LayoutSession {
    pub fn new(
        tree: LayoutTree,
        bounds: Rect,
        config: LayoutConfig,
        registry: Arc<dyn AreaRegistry>,
    ) -> Result<Self, LayoutError> {
        let mut session = Self {
            tree,
            bounds,
            compiler: ViewportCompiler::new(),
            viewports: ViewportMap::default(),
            history: HistoryLedger::new(config.history_limit),
            gestures: GestureResolver::new(config.resize_debounce()),
            editor: StructuralEditor::new(config, registry),
            gesture_origin: None,
        };
        session.recompute()?;
        Ok(session)
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    pub fn viewports(&self) -> &ViewportMap {
        &self.viewports
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn config(&self) -> &LayoutConfig {
        self.editor.config()
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    pub fn gesture_phase(&self) -> GesturePhase {
        self.gestures.phase()
    }

    pub fn gesture_preview(&self) -> Option<GesturePreview> {
        self.gestures.preview()
    }

    /// Repair the tree and recompile viewports, giving up after
    /// `max_recalc_attempts` rounds that leave the tree inconsistent.
    fn recompute(&mut self) -> Result<(), LayoutError> {
        let min_fraction = self.editor.config().min_fraction;
        let limit = self.editor.config().max_recalc_attempts.max(1);
        for attempt in 1..=limit {
            self.tree.repair(min_fraction);
            match self.tree.check_invariants(min_fraction) {
                Ok(()) => {
                    self.viewports = self.compiler.compute(&self.tree, self.bounds);
                    return Ok(());
                }
                Err(violation) => {
                    tracing::warn!(attempt, %violation, "layout inconsistent after repair");
                }
            }
        }
        Err(LayoutError::RecalculationLimit(limit))
    }

    /// Resize the surface. A degenerate rectangle keeps the previous
    /// geometry; it is an error only when there is no previous geometry.
    pub fn set_bounds(&mut self, bounds: Rect) -> Result<&ViewportMap, LayoutError> {
        if rect_is_degenerate(bounds) && self.compiler.last_good().is_none() {
            tracing::warn!(?bounds, "rejecting degenerate bounds");
            return Err(LayoutError::InvalidGeometry(bounds));
        }
        if !rect_is_degenerate(bounds) {
            self.bounds = bounds;
        }
        self.recompute()?;
        Ok(&self.viewports)
    }

    fn outcome(&self, edit: EditOutcome) -> CommandOutcome {
        CommandOutcome {
            label: edit.label,
            applied: true,
            created: edit.created,
            viewports: self.viewports.clone(),
        }
    }

    fn unapplied(&self, label: &str) -> CommandOutcome {
        CommandOutcome {
            label: label.to_string(),
            applied: false,
            created: Vec::new(),
            viewports: self.viewports.clone(),
        }
    }

    /// Run one editor operation as its own history entry.
    fn run<F>(&mut self, edit: F) -> Result<CommandOutcome, LayoutError>
    where
        F: FnOnce(&StructuralEditor, &mut LayoutTree, &ViewportMap) -> Result<EditOutcome, LayoutError>,
    {
        if !self.gestures.is_idle() {
            return Err(LayoutError::GestureBusy);
        }
        let before = self.tree.clone();
        let outcome = edit(&self.editor, &mut self.tree, &self.viewports)?;
        if let Err(err) = self.recompute() {
            self.tree = before;
            self.recompute()?;
            return Err(err);
        }
        self.history
            .commit(outcome.label.clone(), outcome.scope, &before, &self.tree);
        Ok(self.outcome(outcome))
    }

    pub fn split(
        &mut self,
        leaf: NodeId,
        axis: Axis,
        side: InsertSide,
    ) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, viewports| editor.split_area(tree, viewports, leaf, axis, side))
    }

    pub fn set_row_sizes(&mut self, row: NodeId, sizes: &[f64]) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.set_row_sizes(tree, row, sizes))
    }

    pub fn join(
        &mut self,
        row: NodeId,
        remove_index: usize,
        direction: JoinDirection,
    ) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.join_areas(tree, row, remove_index, direction))
    }

    pub fn place(
        &mut self,
        source: PlaceSource,
        target: NodeId,
        placement: Placement,
    ) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.place_area(tree, source, target, placement))
    }

    pub fn add_area(
        &mut self,
        descriptor: AreaDescriptor,
        target: NodeId,
        placement: Placement,
    ) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.add_area(tree, descriptor, target, placement))
    }

    pub fn remove(&mut self, id: NodeId) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.remove_area(tree, id))
    }

    /// Cut `id` out of this surface. The returned tree is independent.
    pub fn detach(&mut self, id: NodeId) -> Result<(LayoutTree, CommandOutcome), LayoutError> {
        let mut detached = None;
        let outcome = self.run(|editor, tree, _| {
            let (subtree, outcome) = editor.detach_area(tree, id)?;
            detached = Some(subtree);
            Ok(outcome)
        })?;
        let detached = detached.ok_or(LayoutError::UnknownNode(id))?;
        Ok((detached, outcome))
    }

    pub fn set_active_tab(&mut self, row: NodeId, child: NodeId) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.set_active_tab(tree, row, child))
    }

    pub fn set_area_state(&mut self, id: NodeId, state: Value) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.set_area_state(tree, id, state))
    }

    pub fn set_area_type(&mut self, id: NodeId, type_tag: &str) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.set_area_type(tree, id, type_tag))
    }

    pub fn set_locked(&mut self, id: NodeId, locked: bool) -> Result<CommandOutcome, LayoutError> {
        self.run(|editor, tree, _| editor.set_locked(tree, id, locked))
    }

    pub fn focus_group(&self, id: NodeId) -> Vec<NodeId> {
        self.tree.focus_group(id)
    }

    /// Split `leaf` by dragging `corner` to `pointer` in one step.
    pub fn request_split(
        &mut self,
        leaf: NodeId,
        corner: Corner,
        pointer: Position,
    ) -> Result<CommandOutcome, LayoutError> {
        let rect = self
            .viewports
            .get(leaf)
            .ok_or(LayoutError::UnknownNode(leaf))?;
        let start = corner.point(rect);
        let now = Instant::now();
        self.begin_corner_drag(leaf, corner, PointerEvent::down(start.x, start.y, now))?;
        self.pointer_move(PointerEvent::moved(pointer.x, pointer.y, now));
        self.finish_request(PointerEvent::up(pointer.x, pointer.y, now))
    }

    /// Drag `separator` to `pointer` in one step.
    pub fn request_resize(
        &mut self,
        separator: SeparatorRef,
        pointer: Position,
    ) -> Result<CommandOutcome, LayoutError> {
        let handle = separator_handles(&self.tree, &self.viewports)
            .into_iter()
            .find(|handle| handle.separator == separator)
            .ok_or_else(|| LayoutError::invalid(format!("no visible separator {separator:?}")))?;
        let now = Instant::now();
        self.begin_separator_drag(
            separator,
            PointerEvent::down(handle.rect.x, handle.rect.y, now),
        )?;
        self.pointer_move(PointerEvent::moved(pointer.x, pointer.y, now));
        self.finish_request(PointerEvent::up(pointer.x, pointer.y, now))
    }

    /// Drop a new area at `pointer`.
    pub fn request_place(
        &mut self,
        descriptor: AreaDescriptor,
        pointer: Position,
    ) -> Result<CommandOutcome, LayoutError> {
        let now = Instant::now();
        self.begin_dock_drag(
            DragSource::New(descriptor),
            &[],
            PointerEvent::down(pointer.x, pointer.y, now),
        )?;
        self.finish_request(PointerEvent::up(pointer.x, pointer.y, now))
    }

    /// Join `target` into `source` when they are neighbors along
    /// `direction`; otherwise move `source` to `target`'s `direction` edge.
    pub fn request_join_or_move(
        &mut self,
        source: NodeId,
        target: NodeId,
        direction: Direction,
    ) -> Result<CommandOutcome, LayoutError> {
        if let Some((row, source_index)) = self.tree.parent_of(source)
            && let Some((target_row, target_index)) = self.tree.parent_of(target)
            && row == target_row
            && self
                .tree
                .row(row)
                .is_some_and(|node| node.orientation.axis() == Some(direction.axis()))
        {
            let adjacent = if direction.is_forward() {
                target_index == source_index + 1
            } else {
                target_index + 1 == source_index
            };
            if adjacent {
                let toward_source = if direction.is_forward() {
                    JoinDirection::Previous
                } else {
                    JoinDirection::Next
                };
                return self.join(row, target_index, toward_source);
            }
        }
        self.place(
            PlaceSource::Existing(source),
            target,
            Placement::from_direction(direction),
        )
    }

    fn finish_request(&mut self, release: PointerEvent) -> Result<CommandOutcome, LayoutError> {
        match self.pointer_up(release)? {
            Some(outcome) => Ok(outcome),
            None => Ok(self.unapplied("cancelled")),
        }
    }

    pub fn begin_corner_drag(
        &mut self,
        leaf: NodeId,
        corner: Corner,
        event: PointerEvent,
    ) -> Result<(), LayoutError> {
        let ctx = gesture_ctx!(self);
        self.gestures.begin_corner_drag(ctx, leaf, corner, event)?;
        self.gesture_origin = Some(self.tree.clone());
        Ok(())
    }

    pub fn begin_separator_drag(
        &mut self,
        separator: SeparatorRef,
        event: PointerEvent,
    ) -> Result<(), LayoutError> {
        let ctx = gesture_ctx!(self);
        self.gestures.begin_separator_drag(ctx, separator, event)?;
        self.gesture_origin = Some(self.tree.clone());
        Ok(())
    }

    pub fn begin_dock_drag(
        &mut self,
        source: DragSource,
        excluded: &[NodeId],
        event: PointerEvent,
    ) -> Result<(), LayoutError> {
        let ctx = gesture_ctx!(self);
        self.gestures.begin_dock_drag(ctx, source, excluded, event)?;
        self.gesture_origin = Some(self.tree.clone());
        Ok(())
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        let ctx = gesture_ctx!(self);
        self.gestures.pointer_move(ctx, event);
    }

    /// Apply a debounced resize if one is due. Intermediate resizes change
    /// the tree but are not recorded; the release records the whole drag.
    pub fn tick(&mut self, now: Instant) -> Result<Option<CommandOutcome>, LayoutError> {
        let Some(command) = self.gestures.tick(now) else {
            return Ok(None);
        };
        let edit = self.apply_command(command)?;
        self.recompute()?;
        Ok(Some(self.outcome(edit)))
    }

    /// Finish the current gesture. `None` means it resolved to nothing and
    /// every preview was reverted.
    pub fn pointer_up(&mut self, event: PointerEvent) -> Result<Option<CommandOutcome>, LayoutError> {
        let ctx = gesture_ctx!(self);
        let command = self.gestures.pointer_up(ctx, event);
        let Some(origin) = self.gesture_origin.take() else {
            return Ok(None);
        };
        let Some(command) = command else {
            self.restore(origin)?;
            return Ok(None);
        };
        match self.apply_command(command) {
            Ok(edit) => {
                if let Err(err) = self.recompute() {
                    self.restore(origin)?;
                    return Err(err);
                }
                self.history
                    .commit(edit.label.clone(), edit.scope, &origin, &self.tree);
                Ok(Some(self.outcome(edit)))
            }
            Err(err) => {
                self.restore(origin)?;
                Err(err)
            }
        }
    }

    /// Abandon the current gesture and revert anything it changed.
    pub fn cancel_gesture(&mut self) -> Result<bool, LayoutError> {
        let cancelled = self.gestures.cancel();
        if let Some(origin) = self.gesture_origin.take() {
            self.restore(origin)?;
        }
        Ok(cancelled)
    }

    fn restore(&mut self, origin: LayoutTree) -> Result<(), LayoutError> {
        if self.tree != origin {
            tracing::debug!("reverting gesture preview");
            self.tree = origin;
        }
        self.recompute()
    }

    fn apply_command(&mut self, command: GestureCommand) -> Result<EditOutcome, LayoutError> {
        match command {
            GestureCommand::Split {
                leaf,
                axis,
                side,
                fraction,
            } => self
                .editor
                .split_area_at(&mut self.tree, &self.viewports, leaf, axis, side, fraction),
            GestureCommand::Resize { row, sizes, .. } => {
                self.editor.set_row_sizes(&mut self.tree, row, &sizes)
            }
            GestureCommand::Join {
                row,
                remove_index,
                direction,
            } => self
                .editor
                .join_areas(&mut self.tree, row, remove_index, direction),
            GestureCommand::Place {
                source,
                target,
                placement,
            } => self
                .editor
                .place_area(&mut self.tree, source, target, placement),
        }
    }

    pub fn undo(&mut self, scope: Option<NodeId>) -> Result<Option<CommandOutcome>, LayoutError> {
        self.replay(scope, true)
    }

    pub fn redo(&mut self, scope: Option<NodeId>) -> Result<Option<CommandOutcome>, LayoutError> {
        self.replay(scope, false)
    }

    fn replay(&mut self, scope: Option<NodeId>, backward: bool) -> Result<Option<CommandOutcome>, LayoutError> {
        if !self.gestures.is_idle() {
            return Err(LayoutError::GestureBusy);
        }
        let min_fraction = self.editor.config().min_fraction;
        let repair = |tree: &mut LayoutTree, _: &mut HistoryLedger| {
            tree.repair(min_fraction);
        };
        let label = if backward {
            self.history.undo_with(&mut self.tree, scope, repair)
        } else {
            self.history.redo_with(&mut self.tree, scope, repair)
        };
        let Some(label) = label else {
            return Ok(None);
        };
        self.recompute()?;
        Ok(Some(CommandOutcome {
            label,
            applied: true,
            created: Vec::new(),
            viewports: self.viewports.clone(),
        }))
    }

    /// Every reachable node with its rectangle, in pre-order.
    pub fn render_nodes(&self) -> Vec<RenderNode> {
        self.tree
            .reachable()
            .into_iter()
            .filter_map(|id| {
                let kind = match self.tree.node(id)? {
                    crate::layout::LayoutNode::Area(area) => RenderKind::Area {
                        type_tag: area.type_tag.clone(),
                        state: area.state.clone(),
                    },
                    crate::layout::LayoutNode::Row(row) => RenderKind::Row {
                        orientation: row.orientation,
                        active_tab: row.active_tab,
                    },
                };
                Some(RenderNode {
                    id,
                    rect: self.viewports.get(id).unwrap_or_default(),
                    kind,
                })
            })
            .collect()
    }

    pub fn visible_leaves(&self) -> Vec<NodeId> {
        visible_leaves(&self.tree)
    }

    pub fn separator_at(&self, column: u16, row: u16) -> Option<SeparatorHandle> {
        hit_test_separator(&self.tree, &self.viewports, column, row)
    }

    /// Visible leaf whose corner lies within `reach` cells of the point.
    pub fn corner_at(&self, column: u16, row: u16, reach: u16) -> Option<(NodeId, Corner)> {
        self.visible_leaves().into_iter().find_map(|id| {
            let rect = self.viewports.get(id)?;
            Corner::hit(rect, column, row, reach).map(|corner| (id, corner))
        })
    }

    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(self.tree.to_json()?)
    }

    /// Replace the tree with a persisted one. History is cleared.
    pub fn load_json(&mut self, json: &str) -> Result<(), LayoutError> {
        if !self.gestures.is_idle() {
            return Err(LayoutError::GestureBusy);
        }
        let tree = LayoutTree::from_json(json)?;
        let previous = std::mem::replace(&mut self.tree, tree);
        if let Err(err) = self.recompute() {
            self.tree = previous;
            self.recompute()?;
            return Err(err);
        }
        self.history.clear();
        Ok(())
    }

    pub fn into_tree(self) -> LayoutTree {
        self.tree
    }
}
