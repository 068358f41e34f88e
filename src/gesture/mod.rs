//! Pointer gestures resolved into structural edits.
//!
//! [`GestureResolver`] is an explicit state machine. Every state change is
//! looked up in [`TRANSITIONS`]; an input with no entry for the current
//! phase is refused. The resolver never touches the tree: it reads the tree
//! and viewports through a [`GestureContext`] and hands back
//! [`GestureCommand`]s for the session to apply.

pub mod corner;
pub mod dock;
pub mod pointer;
pub mod resize;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use ratatui::prelude::{Position, Rect};

use crate::config::LayoutConfig;
use crate::editor::{InsertSide, JoinDirection, PlaceSource, Placement};
use crate::error::LayoutError;
use crate::layout::{Axis, Direction, LayoutTree, NodeId, SeparatorRef, ViewportMap, rect_contains};
use crate::registry::{AreaDescriptor, AreaRegistry};

pub use corner::{Corner, CornerIntent, classify};
pub use dock::{DropTarget, hit_leaf, is_degenerate_drop, placement_zone, resolve_drop};
pub use pointer::{PointerEvent, PointerKind};
pub use resize::ResizeDrag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GesturePhase {
    Idle,
    AwaitingDirection,
    Splitting,
    Resizing,
    JoiningOrMoving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureInput {
    BeginCorner,
    BeginSeparator,
    BeginDock,
    Move,
    ChooseSplit,
    ChooseJoinOrMove,
    Tick,
    Release,
    Cancel,
}

use GestureInput as In;
use GesturePhase as Ph;

pub const TRANSITIONS: &[(GesturePhase, GestureInput, GesturePhase)] = &[
    (Ph::Idle, In::BeginCorner, Ph::AwaitingDirection),
    (Ph::Idle, In::BeginSeparator, Ph::Resizing),
    (Ph::Idle, In::BeginDock, Ph::JoiningOrMoving),
    (Ph::AwaitingDirection, In::Move, Ph::AwaitingDirection),
    (Ph::AwaitingDirection, In::ChooseSplit, Ph::Splitting),
    (Ph::AwaitingDirection, In::ChooseJoinOrMove, Ph::JoiningOrMoving),
    (Ph::AwaitingDirection, In::Release, Ph::Idle),
    (Ph::AwaitingDirection, In::Cancel, Ph::Idle),
    (Ph::Splitting, In::Move, Ph::Splitting),
    (Ph::Splitting, In::Release, Ph::Idle),
    (Ph::Splitting, In::Cancel, Ph::Idle),
    (Ph::Resizing, In::Move, Ph::Resizing),
    (Ph::Resizing, In::Tick, Ph::Resizing),
    (Ph::Resizing, In::Release, Ph::Idle),
    (Ph::Resizing, In::Cancel, Ph::Idle),
    (Ph::JoiningOrMoving, In::Move, Ph::JoiningOrMoving),
    (Ph::JoiningOrMoving, In::Release, Ph::Idle),
    (Ph::JoiningOrMoving, In::Cancel, Ph::Idle),
];

pub fn next_phase(from: GesturePhase, input: GestureInput) -> Option<GesturePhase> {
    TRANSITIONS
        .iter()
        .find(|(phase, candidate, _)| *phase == from && *candidate == input)
        .map(|(_, _, to)| *to)
}

/// Read-only view of what a gesture needs to decide.
#[derive(Clone, Copy)]
pub struct GestureContext<'a> {
    pub tree: &'a LayoutTree,
    pub viewports: &'a ViewportMap,
    pub config: &'a LayoutConfig,
    pub registry: &'a dyn AreaRegistry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    Existing(NodeId),
    New(AreaDescriptor),
}

impl DragSource {
    fn existing(&self) -> Option<NodeId> {
        match self {
            DragSource::Existing(id) => Some(*id),
            DragSource::New(_) => None,
        }
    }

    fn into_place_source(self) -> PlaceSource {
        match self {
            DragSource::Existing(id) => PlaceSource::Existing(id),
            DragSource::New(descriptor) => PlaceSource::New(descriptor),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureCommand {
    Split {
        leaf: NodeId,
        axis: Axis,
        side: InsertSide,
        fraction: f64,
    },
    Resize {
        row: NodeId,
        sizes: Vec<f64>,
        /// `false` for debounced intermediate commits.
        final_commit: bool,
    },
    Join {
        row: NodeId,
        remove_index: usize,
        direction: JoinDirection,
    },
    Place {
        source: PlaceSource,
        target: NodeId,
        placement: Placement,
    },
}

/// Transient feedback for the host to draw while a gesture runs.
#[derive(Debug, Clone, PartialEq)]
pub enum GesturePreview {
    Split {
        leaf: NodeId,
        axis: Axis,
        side: InsertSide,
        fraction: f64,
    },
    Resize {
        row: NodeId,
        sizes: Vec<f64>,
    },
    Join {
        row: NodeId,
        removed: NodeId,
        survivor: NodeId,
    },
    Drop(DropTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CornerDrag {
    leaf: NodeId,
    corner: Corner,
    origin: Position,
    rect: Rect,
}

impl CornerDrag {
    /// Share of the leaf's extent between the near edge and the pointer.
    fn fraction(&self, axis: Axis, position: Position) -> f64 {
        let extent = axis.extent(self.rect);
        if extent == 0 {
            return 0.5;
        }
        let start = f64::from(axis.start(self.rect));
        let end = start + f64::from(extent);
        let coord = f64::from(axis.coord(position));
        let distance = match self.corner.near_side(axis) {
            InsertSide::Before => coord - start,
            InsertSide::After => end - coord,
        };
        (distance / f64::from(extent)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JoinCandidate {
    row: NodeId,
    neighbor: NodeId,
    survivor: NodeId,
    remove_index: usize,
    direction: JoinDirection,
}

#[derive(Debug, Clone, PartialEq)]
struct MoveDrag {
    source: DragSource,
    excluded: BTreeSet<NodeId>,
    join: Option<JoinCandidate>,
    preview: Option<GesturePreview>,
}

#[derive(Debug, Clone, PartialEq)]
enum GestureState {
    Idle,
    AwaitingDirection(CornerDrag),
    Splitting {
        drag: CornerDrag,
        axis: Axis,
        fraction: f64,
    },
    Resizing {
        drag: ResizeDrag,
        pending: bool,
        last_move: Instant,
    },
    JoiningOrMoving(MoveDrag),
}

impl GestureState {
    fn phase(&self) -> GesturePhase {
        match self {
            GestureState::Idle => GesturePhase::Idle,
            GestureState::AwaitingDirection(_) => GesturePhase::AwaitingDirection,
            GestureState::Splitting { .. } => GesturePhase::Splitting,
            GestureState::Resizing { .. } => GesturePhase::Resizing,
            GestureState::JoiningOrMoving(_) => GesturePhase::JoiningOrMoving,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GestureResolver {
    state: GestureState,
    debounce: Duration,
}

impl GestureResolver {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: GestureState::Idle,
            debounce,
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.state.phase()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GestureState::Idle)
    }

    fn transition(&mut self, input: GestureInput, next: GestureState) -> Result<(), LayoutError> {
        let from = self.state.phase();
        self.apply(from, input, next)
    }

    fn apply(
        &mut self,
        from: GesturePhase,
        input: GestureInput,
        next: GestureState,
    ) -> Result<(), LayoutError> {
        match next_phase(from, input) {
            Some(to) if to == next.phase() => {
                if from != to {
                    tracing::debug!(?from, ?input, ?to, "gesture transition");
                }
                self.state = next;
                Ok(())
            }
            _ => {
                tracing::warn!(?from, ?input, "gesture input has no transition");
                Err(LayoutError::invalid(format!(
                    "no gesture transition from {from:?} on {input:?}"
                )))
            }
        }
    }

    pub fn begin_corner_drag(
        &mut self,
        ctx: GestureContext<'_>,
        leaf: NodeId,
        corner: Corner,
        event: PointerEvent,
    ) -> Result<(), LayoutError> {
        self.ensure_idle()?;
        if !ctx.tree.is_area(leaf) {
            return Err(LayoutError::UnknownNode(leaf));
        }
        let rect = ctx
            .viewports
            .get(leaf)
            .ok_or_else(|| LayoutError::invalid(format!("area {leaf} has no viewport")))?;
        let drag = CornerDrag {
            leaf,
            corner,
            origin: event.position,
            rect,
        };
        self.transition(In::BeginCorner, GestureState::AwaitingDirection(drag))
    }

    pub fn begin_separator_drag(
        &mut self,
        ctx: GestureContext<'_>,
        separator: SeparatorRef,
        event: PointerEvent,
    ) -> Result<(), LayoutError> {
        self.ensure_idle()?;
        let drag = ResizeDrag::begin(ctx.tree, ctx.viewports, ctx.config, separator)?;
        self.transition(
            In::BeginSeparator,
            GestureState::Resizing {
                drag,
                pending: false,
                last_move: event.at,
            },
        )
    }

    /// Start dragging `source` toward a dock target. `excluded` lists
    /// overlay ids that must never be hit; an existing source and its
    /// subtree are always excluded.
    pub fn begin_dock_drag(
        &mut self,
        ctx: GestureContext<'_>,
        source: DragSource,
        excluded: &[NodeId],
        event: PointerEvent,
    ) -> Result<(), LayoutError> {
        self.ensure_idle()?;
        let mut excluded: BTreeSet<NodeId> = excluded.iter().copied().collect();
        if let Some(id) = source.existing() {
            if !ctx.tree.contains(id) {
                return Err(LayoutError::UnknownNode(id));
            }
            excluded.extend(ctx.tree.subtree(id));
        }
        let mut drag = MoveDrag {
            source,
            excluded,
            join: None,
            preview: None,
        };
        drag.preview = move_preview(ctx, &drag, event.position);
        self.transition(In::BeginDock, GestureState::JoiningOrMoving(drag))
    }

    fn ensure_idle(&self) -> Result<(), LayoutError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(LayoutError::GestureBusy)
        }
    }

    pub fn pointer_move(&mut self, ctx: GestureContext<'_>, event: PointerEvent) {
        let from = self.state.phase();
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        let (input, next) = match state {
            GestureState::Idle => return,
            GestureState::AwaitingDirection(drag) => {
                let (dx, dy) = event.delta_from(drag.origin);
                match classify(drag.corner, dx, dy, ctx.config.dead_zone) {
                    None => (In::Move, GestureState::AwaitingDirection(drag)),
                    Some(CornerIntent::Inward(axis)) if can_split(ctx, &drag, axis) => (
                        In::ChooseSplit,
                        GestureState::Splitting {
                            drag,
                            axis,
                            fraction: drag.fraction(axis, event.position),
                        },
                    ),
                    Some(intent) => {
                        let axis = intent.axis();
                        let direction = drag.corner.outward_direction(axis);
                        let mut moving = MoveDrag {
                            source: DragSource::Existing(drag.leaf),
                            excluded: BTreeSet::from([drag.leaf]),
                            join: join_candidate(ctx.tree, drag.leaf, direction),
                            preview: None,
                        };
                        moving.preview = move_preview(ctx, &moving, event.position);
                        (In::ChooseJoinOrMove, GestureState::JoiningOrMoving(moving))
                    }
                }
            }
            GestureState::Splitting { drag, axis, .. } => (
                In::Move,
                GestureState::Splitting {
                    drag,
                    axis,
                    fraction: drag.fraction(axis, event.position),
                },
            ),
            GestureState::Resizing {
                mut drag,
                pending,
                last_move,
            } => {
                let moved = drag.update(event.position);
                (
                    In::Move,
                    GestureState::Resizing {
                        drag,
                        pending: pending || moved,
                        last_move: if moved { event.at } else { last_move },
                    },
                )
            }
            GestureState::JoiningOrMoving(mut moving) => {
                moving.preview = move_preview(ctx, &moving, event.position);
                (In::Move, GestureState::JoiningOrMoving(moving))
            }
        };
        if let Err(err) = self.apply(from, input, next) {
            tracing::warn!(error = %err, "pointer move abandoned the gesture");
        }
    }

    /// Flush a debounced resize once the pointer has rested long enough.
    pub fn tick(&mut self, now: Instant) -> Option<GestureCommand> {
        next_phase(self.phase(), In::Tick)?;
        let GestureState::Resizing {
            drag,
            pending,
            last_move,
        } = &mut self.state
        else {
            return None;
        };
        if !*pending || now.saturating_duration_since(*last_move) < self.debounce {
            return None;
        }
        *pending = false;
        tracing::debug!(row = %drag.separator.row, t = drag.t(), "debounced resize commit");
        Some(GestureCommand::Resize {
            row: drag.separator.row,
            sizes: drag.sizes(),
            final_commit: false,
        })
    }

    pub fn pointer_up(
        &mut self,
        ctx: GestureContext<'_>,
        event: PointerEvent,
    ) -> Option<GestureCommand> {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        let from = state.phase();
        if from == GesturePhase::Idle {
            return None;
        }
        if next_phase(from, In::Release) != Some(GesturePhase::Idle) {
            tracing::warn!(?from, "release has no transition");
            self.state = state;
            return None;
        }
        tracing::debug!(?from, input = ?In::Release, to = ?GesturePhase::Idle, "gesture transition");
        let command = match state {
            GestureState::Idle | GestureState::AwaitingDirection(_) => None,
            GestureState::Splitting { drag, axis, .. } => Some(GestureCommand::Split {
                leaf: drag.leaf,
                axis,
                side: drag.corner.near_side(axis),
                fraction: drag.fraction(axis, event.position),
            }),
            GestureState::Resizing { mut drag, .. } => {
                drag.update(event.position);
                Some(GestureCommand::Resize {
                    row: drag.separator.row,
                    sizes: drag.sizes(),
                    final_commit: true,
                })
            }
            GestureState::JoiningOrMoving(moving) => release_move(ctx, moving, event.position),
        };
        tracing::debug!(?command, "gesture released");
        command
    }

    /// Abandon the current gesture. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        let from = self.state.phase();
        if from == GesturePhase::Idle {
            return false;
        }
        if let Err(err) = self.transition(In::Cancel, GestureState::Idle) {
            tracing::warn!(error = %err, "gesture cancel refused");
            self.state = GestureState::Idle;
        }
        true
    }

    pub fn preview(&self) -> Option<GesturePreview> {
        match &self.state {
            GestureState::Idle | GestureState::AwaitingDirection(_) => None,
            GestureState::Splitting {
                drag,
                axis,
                fraction,
            } => Some(GesturePreview::Split {
                leaf: drag.leaf,
                axis: *axis,
                side: drag.corner.near_side(*axis),
                fraction: *fraction,
            }),
            GestureState::Resizing { drag, .. } => Some(GesturePreview::Resize {
                row: drag.separator.row,
                sizes: drag.sizes(),
            }),
            GestureState::JoiningOrMoving(moving) => moving.preview.clone(),
        }
    }
}

impl Default for GestureResolver {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::constants::DEFAULT_RESIZE_DEBOUNCE_MS))
    }
}

fn can_split(ctx: GestureContext<'_>, drag: &CornerDrag, axis: Axis) -> bool {
    let Some(area) = ctx.tree.area(drag.leaf) else {
        return false;
    };
    let min = ctx.config.min_area_size.max(1).saturating_mul(2);
    !area.locked && ctx.registry.splittable(&area.type_tag) && axis.extent(drag.rect) >= min
}

/// The sibling `leaf` could absorb by dragging out toward `direction`.
fn join_candidate(tree: &LayoutTree, leaf: NodeId, direction: Direction) -> Option<JoinCandidate> {
    let (row_id, index) = tree.parent_of(leaf)?;
    let row = tree.row(row_id)?;
    if row.orientation.axis() != Some(direction.axis()) {
        return None;
    }
    let (neighbor_index, toward_leaf) = if direction.is_forward() {
        (index + 1, JoinDirection::Previous)
    } else {
        (index.checked_sub(1)?, JoinDirection::Next)
    };
    let neighbor = row.children.get(neighbor_index)?.id;
    let area = tree.area(neighbor)?;
    if area.locked {
        return None;
    }
    Some(JoinCandidate {
        row: row_id,
        neighbor,
        survivor: leaf,
        remove_index: neighbor_index,
        direction: toward_leaf,
    })
}

fn in_join_zone(ctx: GestureContext<'_>, moving: &MoveDrag, position: Position) -> Option<JoinCandidate> {
    let join = moving.join?;
    let rect = ctx.viewports.get(join.neighbor)?;
    rect_contains(rect, position.x, position.y).then_some(join)
}

fn move_preview(ctx: GestureContext<'_>, moving: &MoveDrag, position: Position) -> Option<GesturePreview> {
    if let Some(join) = in_join_zone(ctx, moving, position) {
        return Some(GesturePreview::Join {
            row: join.row,
            removed: join.neighbor,
            survivor: join.survivor,
        });
    }
    resolve_drop(
        ctx.tree,
        ctx.viewports,
        ctx.config.edge_band_ratio,
        moving.source.existing(),
        position,
        &moving.excluded,
    )
    .map(GesturePreview::Drop)
}

fn release_move(
    ctx: GestureContext<'_>,
    moving: MoveDrag,
    position: Position,
) -> Option<GestureCommand> {
    if let Some(join) = in_join_zone(ctx, &moving, position) {
        return Some(GestureCommand::Join {
            row: join.row,
            remove_index: join.remove_index,
            direction: join.direction,
        });
    }
    let Some(drop) = resolve_drop(
        ctx.tree,
        ctx.viewports,
        ctx.config.edge_band_ratio,
        moving.source.existing(),
        position,
        &moving.excluded,
    ) else {
        tracing::debug!(?position, "drop without a target; cancelled");
        return None;
    };
    Some(GestureCommand::Place {
        source: moving.source.into_place_source(),
        target: drop.target,
        placement: drop.placement,
    })
}
