use std::sync::Arc;
use std::time::Instant;

use area_layout::editor::{InsertSide, Placement};
use area_layout::error::LayoutError;
use area_layout::gesture::{GesturePhase, GesturePreview, PointerEvent, PointerKind};
use area_layout::layout::{Area, AreaRole, Axis, LayoutTree, NodeId, RowNode};
use area_layout::registry::{AreaDescriptor, PermissiveRegistry};
use area_layout::screen::{LayoutCommand, ScreenManager};
use area_layout::session::CommandOutcome;
use area_layout::{LayoutConfig, LayoutSession};
use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use pretty_assertions::assert_eq;
use ratatui::prelude::{Position, Rect};

fn session() -> LayoutSession {
    LayoutSession::new(
        LayoutTree::new(Area::new("viewer")),
        Rect::new(0, 0, 800, 600),
        LayoutConfig::default(),
        Arc::new(PermissiveRegistry),
    )
    .expect("session")
}

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
    MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    }
}

/// Route one mouse event the way a host event loop would: presses start a
/// separator drag when one is under the pointer, else a corner drag.
fn feed(session: &mut LayoutSession, event: MouseEvent) -> Option<CommandOutcome> {
    let pointer = PointerEvent::from_mouse(&event, Instant::now())?;
    match pointer.kind {
        PointerKind::Down => {
            let Position { x, y } = pointer.position;
            if let Some(handle) = session.separator_at(x, y) {
                session
                    .begin_separator_drag(handle.separator, pointer)
                    .expect("separator drag");
            } else if let Some((leaf, corner)) = session.corner_at(x, y, 0) {
                session
                    .begin_corner_drag(leaf, corner, pointer)
                    .expect("corner drag");
            }
            None
        }
        PointerKind::Move => {
            session.pointer_move(pointer);
            None
        }
        PointerKind::Up => session.pointer_up(pointer).expect("release"),
    }
}

fn split_columns(session: &mut LayoutSession) -> (NodeId, NodeId) {
    let left = session.tree().root();
    let right = session
        .split(left, Axis::Horizontal, InsertSide::After)
        .expect("split")
        .created[0];
    (left, right)
}

#[test]
fn corner_drag_from_mouse_splits_toward_pointer() {
    let mut session = session();
    let leaf = session.tree().root();
    feed(&mut session, mouse(MouseEventKind::Down(MouseButton::Left), 0, 0));
    assert_eq!(session.gesture_phase(), GesturePhase::AwaitingDirection);

    feed(&mut session, mouse(MouseEventKind::Drag(MouseButton::Left), 100, 3));
    assert_eq!(session.gesture_phase(), GesturePhase::Splitting);
    assert!(matches!(
        session.gesture_preview(),
        Some(GesturePreview::Split { axis: Axis::Horizontal, .. })
    ));

    let outcome = feed(&mut session, mouse(MouseEventKind::Up(MouseButton::Left), 100, 3))
        .expect("split applied");
    let created = outcome.created[0];
    assert_eq!(session.gesture_phase(), GesturePhase::Idle);
    assert_eq!(session.viewports().get(created), Some(Rect::new(0, 0, 100, 600)));
    assert_eq!(session.viewports().get(leaf), Some(Rect::new(100, 0, 700, 600)));
    assert_eq!(session.history().past().count(), 1);
}

#[test]
fn hover_and_other_buttons_are_ignored() {
    let mut session = session();
    feed(&mut session, mouse(MouseEventKind::Moved, 0, 0));
    feed(&mut session, mouse(MouseEventKind::Down(MouseButton::Right), 0, 0));
    assert_eq!(session.gesture_phase(), GesturePhase::Idle);
}

#[test]
fn separator_drag_from_mouse_resizes_once() {
    let mut session = session();
    let (left, right) = split_columns(&mut session);
    let row = session.tree().root();
    let entries = session.history().past().count();

    feed(&mut session, mouse(MouseEventKind::Down(MouseButton::Left), 400, 10));
    assert_eq!(session.gesture_phase(), GesturePhase::Resizing);
    feed(&mut session, mouse(MouseEventKind::Drag(MouseButton::Left), 300, 10));
    feed(&mut session, mouse(MouseEventKind::Drag(MouseButton::Left), 200, 10));
    feed(&mut session, mouse(MouseEventKind::Up(MouseButton::Left), 200, 10))
        .expect("resize applied");

    assert_eq!(
        session.tree().row(row).map(RowNode::sizes),
        Some(vec![0.25, 0.75])
    );
    assert_eq!(session.viewports().get(left).map(|r| r.width), Some(200));
    assert_eq!(session.viewports().get(right).map(|r| r.width), Some(600));
    assert_eq!(session.history().past().count(), entries + 1);
}

#[test]
fn dragging_a_corner_outward_joins_the_neighbor() {
    let mut session = session();
    let (left, right) = split_columns(&mut session);

    feed(&mut session, mouse(MouseEventKind::Down(MouseButton::Left), 399, 0));
    feed(&mut session, mouse(MouseEventKind::Drag(MouseButton::Left), 420, 2));
    assert_eq!(session.gesture_phase(), GesturePhase::JoiningOrMoving);
    assert!(matches!(
        session.gesture_preview(),
        Some(GesturePreview::Join { removed, survivor, .. }) if removed == right && survivor == left
    ));
    feed(&mut session, mouse(MouseEventKind::Up(MouseButton::Left), 420, 2)).expect("joined");

    assert!(!session.tree().contains(right));
    assert_eq!(session.tree().root(), left);
    assert_eq!(session.viewports().get(left), Some(Rect::new(0, 0, 800, 600)));
}

#[test]
fn new_area_docks_on_the_edge_under_the_pointer() {
    let mut session = session();
    let leaf = session.tree().root();
    let outcome = session
        .request_place(AreaDescriptor::new("outline"), Position::new(790, 300))
        .expect("place");
    assert!(outcome.applied);
    let created = outcome.created[0];
    assert_eq!(session.viewports().get(leaf), Some(Rect::new(0, 0, 400, 600)));
    assert_eq!(session.viewports().get(created), Some(Rect::new(400, 0, 400, 600)));

    let outcome = session
        .request_place(AreaDescriptor::new("notes"), Position::new(200, 300))
        .expect("stack");
    let tab = outcome.created[0];
    let (stack, _) = session.tree().parent_of(tab).expect("stacked");
    let stack = session.tree().row(stack).expect("stack row");
    assert!(stack.orientation.is_stack());
    assert_eq!(stack.active_tab, Some(leaf));
}

#[test]
fn gestures_block_direct_commands_until_released() {
    let mut session = session();
    let (left, _) = split_columns(&mut session);
    feed(&mut session, mouse(MouseEventKind::Down(MouseButton::Left), 400, 10));
    assert!(matches!(session.remove(left), Err(LayoutError::GestureBusy)));
    assert!(matches!(session.undo(None), Err(LayoutError::GestureBusy)));
    assert!(session.cancel_gesture().expect("cancel"));
    session.remove(left).expect("remove after cancel");
}

#[test]
fn lead_focus_reaches_following_areas_of_its_type() {
    let mut session = session();
    let root = session.tree().root();
    let lead = session
        .add_area(
            AreaDescriptor::new("terminal").with_role(AreaRole::Lead),
            root,
            Placement::Right,
        )
        .expect("lead")
        .created[0];
    let follow = session
        .add_area(
            AreaDescriptor::new("terminal").with_role(AreaRole::Follow),
            lead,
            Placement::Bottom,
        )
        .expect("follow")
        .created[0];
    let other = session
        .add_area(
            AreaDescriptor::new("viewer").with_role(AreaRole::Follow),
            root,
            Placement::Stack,
        )
        .expect("other type")
        .created[0];

    assert_eq!(session.focus_group(lead), vec![lead, follow]);
    assert_eq!(session.focus_group(follow), vec![follow]);
    assert_eq!(session.focus_group(other), vec![other]);
    assert_eq!(session.focus_group(root), vec![root]);
}

#[test]
fn detached_area_lives_on_as_its_own_screen() {
    let mut screens = ScreenManager::new(session(), Arc::new(PermissiveRegistry));
    let first = screens.active();
    let leaf = screens.active_session().expect("active").tree().root();
    let created = screens
        .route(LayoutCommand::Split {
            leaf,
            axis: Axis::Vertical,
            side: InsertSide::After,
        })
        .expect("split")
        .expect("outcome")
        .created[0];

    let second = screens
        .detach_area(created, Rect::new(0, 0, 80, 24))
        .expect("detach");
    assert_eq!(screens.screen_ids(), vec![first, second]);

    screens.set_active(second).expect("activate");
    let hosted_root = screens.active_session().expect("hosted").tree().root();
    screens
        .route(LayoutCommand::Split {
            leaf: hosted_root,
            axis: Axis::Horizontal,
            side: InsertSide::After,
        })
        .expect("split detached");

    assert_eq!(screens.session(first).map(|s| s.tree().len()), Some(1));
    assert_eq!(screens.session(second).map(|s| s.tree().len()), Some(3));
}
