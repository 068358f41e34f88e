use std::collections::BTreeMap;
use std::sync::Arc;

use area_layout::editor::{InsertSide, JoinDirection};
use area_layout::layout::{
    Area, Axis, LayoutNode, LayoutTree, NodeId, Orientation, RowChild, RowNode, SeparatorRef,
    compute,
};
use area_layout::registry::PermissiveRegistry;
use area_layout::{LayoutConfig, LayoutSession};
use pretty_assertions::assert_eq;
use ratatui::prelude::{Position, Rect};

fn session_with(bounds: Rect, config: LayoutConfig) -> LayoutSession {
    LayoutSession::new(
        LayoutTree::new(Area::new("viewer")),
        bounds,
        config,
        Arc::new(PermissiveRegistry),
    )
    .expect("session")
}

fn sizes_of(session: &LayoutSession, row: NodeId) -> Vec<f64> {
    session.tree().row(row).map(RowNode::sizes).unwrap_or_default()
}

fn assert_sizes_near(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-6, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn split_root_leaf_in_half() {
    let mut session = session_with(Rect::new(0, 0, 800, 600), LayoutConfig::default());
    let l1 = session.tree().root();
    let outcome = session
        .split(l1, Axis::Horizontal, InsertSide::After)
        .expect("split");
    let l2 = outcome.created[0];

    let root = session.tree().row(session.tree().root()).expect("root row");
    assert_eq!(root.orientation, Orientation::Horizontal);
    assert_eq!(
        root.children,
        vec![RowChild::new(l1, 0.5), RowChild::new(l2, 0.5)]
    );
    assert_eq!(outcome.viewports.get(l1), Some(Rect::new(0, 0, 400, 600)));
    assert_eq!(outcome.viewports.get(l2), Some(Rect::new(400, 0, 400, 600)));
}

#[test]
fn remainder_cells_go_to_the_last_child() {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        NodeId::new(1),
        LayoutNode::Row(RowNode::new(
            Orientation::Horizontal,
            vec![
                RowChild::new(NodeId::new(2), 0.3),
                RowChild::new(NodeId::new(3), 0.4),
                RowChild::new(NodeId::new(4), 0.3),
            ],
        )),
    );
    for (id, tag) in [(2, "a"), (3, "b"), (4, "c")] {
        nodes.insert(NodeId::new(id), LayoutNode::Area(Area::new(tag)));
    }
    let tree = LayoutTree::from_parts(nodes, NodeId::new(1));
    let viewports = compute(&tree, Rect::new(0, 0, 1000, 10));

    assert_eq!(viewports.get(NodeId::new(2)), Some(Rect::new(0, 0, 300, 10)));
    assert_eq!(viewports.get(NodeId::new(3)), Some(Rect::new(300, 0, 400, 10)));
    assert_eq!(viewports.get(NodeId::new(4)), Some(Rect::new(700, 0, 300, 10)));
}

#[test]
fn joining_a_pair_collapses_the_row_into_its_slot() {
    let mut session = session_with(Rect::new(0, 0, 800, 600), LayoutConfig::default());
    let a = session.tree().root();
    let b = session
        .split(a, Axis::Horizontal, InsertSide::After)
        .expect("split")
        .created[0];
    let c = session
        .split(b, Axis::Vertical, InsertSide::After)
        .expect("split")
        .created[0];
    let root = session.tree().root();
    let inner = session.tree().parent_of(b).map(|(row, _)| row).expect("inner row");
    assert_ne!(inner, root);

    session
        .join(inner, 1, JoinDirection::Previous)
        .expect("join");

    assert!(!session.tree().contains(c));
    assert!(!session.tree().contains(inner));
    let root_row = session.tree().row(root).expect("root row");
    assert_eq!(root_row.children[1], RowChild::new(b, 0.5));
    assert_eq!(
        session.viewports().get(b),
        Some(Rect::new(400, 0, 400, 600))
    );

    session.undo(None).expect("undo").expect("entry");
    assert!(session.tree().contains(c));
    assert_eq!(session.tree().parent_of(c).map(|(row, _)| row), Some(inner));
}

#[test]
fn resize_stops_exactly_at_the_minimum() {
    let config = LayoutConfig {
        min_area_size: 10,
        ..LayoutConfig::default()
    };
    let mut session = session_with(Rect::new(0, 0, 100, 20), config);
    let a = session.tree().root();
    let b = session
        .split(a, Axis::Horizontal, InsertSide::After)
        .expect("split")
        .created[0];
    let row = session.tree().root();
    let separator = SeparatorRef { row, index: 0 };

    session
        .request_resize(separator, Position::new(2, 5))
        .expect("resize left");
    assert_sizes_near(&sizes_of(&session, row), &[0.1, 0.9]);
    assert_eq!(session.viewports().get(a).map(|r| r.width), Some(10));

    session
        .request_resize(separator, Position::new(99, 5))
        .expect("resize right");
    assert_sizes_near(&sizes_of(&session, row), &[0.9, 0.1]);
    assert_eq!(session.viewports().get(b).map(|r| r.width), Some(10));
}

#[test]
fn clamped_resize_respects_the_minimum_beside_a_trailing_child() {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        NodeId::new(1),
        LayoutNode::Row(RowNode::new(
            Orientation::Horizontal,
            vec![
                RowChild::new(NodeId::new(2), 0.335),
                RowChild::new(NodeId::new(3), 0.335),
                RowChild::new(NodeId::new(4), 0.33),
            ],
        )),
    );
    for (id, tag) in [(2, "a"), (3, "b"), (4, "c")] {
        nodes.insert(NodeId::new(id), LayoutNode::Area(Area::new(tag)));
    }
    let config = LayoutConfig {
        min_area_size: 10,
        ..LayoutConfig::default()
    };
    let mut session = LayoutSession::new(
        LayoutTree::from_parts(nodes, NodeId::new(1)),
        Rect::new(0, 0, 100, 20),
        config,
        Arc::new(PermissiveRegistry),
    )
    .expect("session");
    let row = session.tree().root();
    let separator = SeparatorRef { row, index: 1 };
    let widths = |session: &LayoutSession| -> Vec<u16> {
        [2, 3, 4]
            .map(|id| session.viewports().get(NodeId::new(id)).map_or(0, |r| r.width))
            .to_vec()
    };
    let assert_minimums = |session: &LayoutSession| {
        for (id, width) in [2, 3, 4].into_iter().zip(widths(session)) {
            let min = session.tree().min_extent(NodeId::new(id), Axis::Horizontal, 10);
            assert!(u32::from(width) >= min, "area {id} is {width} cells, min {min}");
        }
    };
    assert_eq!(widths(&session), vec![33, 33, 34]);

    session
        .request_resize(separator, Position::new(0, 5))
        .expect("resize left");
    assert_eq!(widths(&session), vec![33, 10, 57]);
    assert_minimums(&session);

    session
        .request_resize(separator, Position::new(99, 5))
        .expect("resize right");
    assert_eq!(widths(&session), vec![33, 56, 11]);
    assert_minimums(&session);
}

#[test]
fn undo_twice_then_redo_once() {
    let mut session = session_with(Rect::new(0, 0, 800, 600), LayoutConfig::default());
    let a = session.tree().root();
    let b = session
        .split(a, Axis::Horizontal, InsertSide::After)
        .expect("first")
        .created[0];
    let after_first = session.tree().clone();
    session
        .split(b, Axis::Vertical, InsertSide::After)
        .expect("second");
    let after_second = session.tree().clone();
    let root = session.tree().root();
    session
        .set_row_sizes(root, &[0.7, 0.3])
        .expect("third");

    session.undo(None).expect("undo").expect("entry");
    session.undo(None).expect("undo").expect("entry");
    assert_eq!(session.tree(), &after_first);

    session.redo(None).expect("redo").expect("entry");
    assert_eq!(session.tree(), &after_second);
    assert!(session.history().can_redo());
}
