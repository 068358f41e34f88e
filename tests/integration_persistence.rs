use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::Arc;

use area_layout::editor::{InsertSide, Placement};
use area_layout::layout::{
    Area, AreaRole, Axis, LayoutNode, LayoutTree, NodeId, Orientation, RowChild, RowNode,
    effective_min_fraction,
};
use area_layout::registry::{AreaDescriptor, PermissiveRegistry};
use area_layout::{LayoutConfig, LayoutSession};
use indoc::indoc;
use pretty_assertions::assert_eq;
use ratatui::prelude::Rect;
use serde_json::json;

const BOUNDS: Rect = Rect {
    x: 0,
    y: 0,
    width: 240,
    height: 80,
};

fn edited_session() -> LayoutSession {
    let mut session = LayoutSession::new(
        LayoutTree::new(Area::new("editor").with_state(json!({ "path": "main.rs" }))),
        BOUNDS,
        LayoutConfig::default(),
        Arc::new(PermissiveRegistry),
    )
    .expect("session");
    let editor = session.tree().root();
    let side = session
        .split(editor, Axis::Horizontal, InsertSide::After)
        .expect("split")
        .created[0];
    session
        .add_area(
            AreaDescriptor::new("terminal").with_role(AreaRole::Lead),
            editor,
            Placement::Bottom,
        )
        .expect("bottom");
    session
        .add_area(AreaDescriptor::new("outline"), side, Placement::Stack)
        .expect("stack");
    session.set_locked(editor, true).expect("lock");
    session
}

/// Every non-stack row is tiled exactly by its children.
fn assert_rows_tile(session: &LayoutSession) {
    let tree = session.tree();
    let viewports = session.viewports();
    for id in tree.reachable() {
        let Some(row) = tree.row(id) else {
            continue;
        };
        let Some(axis) = row.orientation.axis() else {
            continue;
        };
        let outer = viewports.get(id).expect("row rect");
        let rects: Vec<Rect> = row
            .child_ids()
            .map(|child| viewports.get(child).expect("child rect"))
            .collect();
        let covered: u32 = rects
            .iter()
            .map(|rect| u32::from(axis.extent(*rect)))
            .sum();
        assert_eq!(covered, u32::from(axis.extent(outer)), "row {id}");
        for pair in rects.windows(2) {
            assert!(
                pair[0].intersection(pair[1]).is_empty(),
                "row {id} overlaps: {pair:?}"
            );
        }
        for rect in &rects {
            assert_eq!(rect.intersection(outer), *rect, "row {id} spills");
        }
    }
}

#[test]
fn layout_file_round_trip() {
    let session = edited_session();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("layout.json");
    fs::write(&path, session.to_json().expect("to json")).expect("write");

    let loaded = LayoutTree::from_json(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(&loaded, session.tree());
}

#[test]
fn loading_replaces_tree_and_clears_history() {
    let source = edited_session();
    let json = source.to_json().expect("to json");

    let mut target = LayoutSession::new(
        LayoutTree::new(Area::new("scratch")),
        BOUNDS,
        LayoutConfig::default(),
        Arc::new(PermissiveRegistry),
    )
    .expect("session");
    let root = target.tree().root();
    target
        .split(root, Axis::Vertical, InsertSide::Before)
        .expect("split");
    assert!(target.history().can_undo());

    target.load_json(&json).expect("load");
    assert_eq!(target.tree(), source.tree());
    assert_eq!(target.viewports(), source.viewports());
    assert!(!target.history().can_undo());
}

#[test]
fn malformed_layout_is_rejected_and_tree_kept() {
    let mut session = edited_session();
    let before = session.tree().clone();
    assert!(session.load_json("{\"nodes\": 3}").is_err());
    assert_eq!(session.tree(), &before);
}

#[test]
fn damaged_tree_repairs_once() {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        NodeId::new(1),
        LayoutNode::Row(RowNode::new(
            Orientation::Horizontal,
            vec![
                RowChild::new(NodeId::new(2), 2.0),
                RowChild::new(NodeId::new(3), 0.0),
                RowChild::new(NodeId::new(9), 1.0),
                RowChild::new(NodeId::new(5), 1.0),
            ],
        )),
    );
    nodes.insert(NodeId::new(2), LayoutNode::Area(Area::new("a")));
    nodes.insert(NodeId::new(3), LayoutNode::Area(Area::new("b")));
    nodes.insert(
        NodeId::new(5),
        LayoutNode::Row(RowNode::new(
            Orientation::Vertical,
            vec![RowChild::new(NodeId::new(6), 1.0)],
        )),
    );
    nodes.insert(NodeId::new(6), LayoutNode::Area(Area::new("c")));
    nodes.insert(NodeId::new(7), LayoutNode::Area(Area::new("orphan")));
    let mut tree = LayoutTree::from_parts(nodes, NodeId::new(1));
    let min_fraction = LayoutConfig::default().min_fraction;

    let report = tree.repair(min_fraction);
    assert!(!report.is_clean());
    tree.check_invariants(min_fraction).expect("consistent");
    assert!(!tree.contains(NodeId::new(7)));
    assert!(!tree.contains(NodeId::new(5)));
    assert_eq!(tree.area(NodeId::new(9)).map(|a| a.type_tag.as_str()), Some("empty"));

    let row = tree.row(tree.root()).expect("root row");
    assert_eq!(
        row.child_ids().collect::<Vec<_>>(),
        [2, 3, 9, 6].map(NodeId::new).to_vec()
    );
    let sum: f64 = row.sizes().iter().sum();
    assert!((sum - 1.0).abs() < 1e-3);
    let floor = effective_min_fraction(row.children.len(), min_fraction);
    assert!(row.sizes().iter().all(|size| *size >= floor - 1e-9));

    let once = tree.clone();
    let second = tree.repair(min_fraction);
    assert!(second.is_clean());
    assert_eq!(tree, once);
}

#[test]
fn viewports_cover_exactly_the_reachable_nodes() {
    let session = edited_session();
    let reachable: BTreeSet<NodeId> = session.tree().reachable().into_iter().collect();
    let keys: BTreeSet<NodeId> = session.viewports().ids().into_iter().collect();
    assert_eq!(keys, reachable);
    assert_rows_tile(&session);
}

#[test]
fn committed_rows_stay_normalized() {
    let session = edited_session();
    let min_fraction = session.config().min_fraction;
    for id in session.tree().reachable() {
        let Some(row) = session.tree().row(id) else {
            continue;
        };
        let sizes = row.sizes();
        let sum: f64 = sizes.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "row {id}: {sizes:?}");
        let floor = effective_min_fraction(sizes.len(), min_fraction);
        assert!(sizes.iter().all(|size| *size >= floor - 1e-9), "row {id}: {sizes:?}");
    }
}

#[test]
fn config_file_feeds_the_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("layout.toml");
    fs::write(
        &path,
        indoc! {r#"
            min_area_size = 12
            history_limit = 2
        "#},
    )
    .expect("write");
    let config = LayoutConfig::load(&path).expect("config");
    assert_eq!(config.min_area_size, 12);

    let mut session = LayoutSession::new(
        LayoutTree::new(Area::new("viewer")),
        Rect::new(0, 0, 30, 30),
        config,
        Arc::new(PermissiveRegistry),
    )
    .expect("session");
    let leaf = session.tree().root();
    // 30 cells cannot hold two areas of 12 plus a further split.
    let second = session
        .split(leaf, Axis::Horizontal, InsertSide::After)
        .expect("split")
        .created[0];
    assert!(session.split(second, Axis::Horizontal, InsertSide::After).is_err());

    session
        .split(leaf, Axis::Vertical, InsertSide::After)
        .expect("vertical");
    session
        .split(second, Axis::Vertical, InsertSide::After)
        .expect("vertical");
    assert_eq!(session.history().past().count(), 2);
}
