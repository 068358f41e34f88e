pub mod tree;
pub mod viewport;

pub use tree::*;
pub use viewport::{
    SeparatorHandle, SeparatorRef, ViewportCompiler, compute, hit_test_separator,
    separator_handles, split_rect, visible_leaves, visible_nodes,
};

use ratatui::prelude::{Position, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis a row partitions its rectangle along.
///
/// `Horizontal` lays children out left to right (splitting the width),
/// `Vertical` lays them out top to bottom (splitting the height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn extent(self, rect: Rect) -> u16 {
        match self {
            Axis::Horizontal => rect.width,
            Axis::Vertical => rect.height,
        }
    }

    pub fn start(self, rect: Rect) -> u16 {
        match self {
            Axis::Horizontal => rect.x,
            Axis::Vertical => rect.y,
        }
    }

    pub fn coord(self, position: Position) -> u16 {
        match self {
            Axis::Horizontal => position.x,
            Axis::Vertical => position.y,
        }
    }

    pub fn other(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Horizontal,
            Direction::Up | Direction::Down => Axis::Vertical,
        }
    }

    /// `true` for directions that move toward later children of a row.
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Right | Direction::Down)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn from_axis(axis: Axis, forward: bool) -> Direction {
        match (axis, forward) {
            (Axis::Horizontal, true) => Direction::Right,
            (Axis::Horizontal, false) => Direction::Left,
            (Axis::Vertical, true) => Direction::Down,
            (Axis::Vertical, false) => Direction::Up,
        }
    }
}

/// Resolved rectangles for every reachable node of a layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewportMap {
    regions: BTreeMap<NodeId, Rect>,
}

impl ViewportMap {
    pub fn ids(&self) -> Vec<NodeId> {
        self.regions.keys().copied().collect()
    }

    pub fn set(&mut self, id: NodeId, rect: Rect) {
        self.regions.insert(id, rect);
    }

    pub fn get(&self, id: NodeId) -> Option<Rect> {
        self.regions.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.regions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Rect)> + '_ {
        self.regions.iter().map(|(id, rect)| (*id, *rect))
    }

    pub fn hit_test(&self, column: u16, row: u16, ids: &[NodeId]) -> Option<NodeId> {
        for id in ids {
            if let Some(rect) = self.regions.get(id)
                && rect_contains(*rect, column, row)
            {
                return Some(*id);
            }
        }
        None
    }
}

pub fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    let max_x = rect.x.saturating_add(rect.width);
    let max_y = rect.y.saturating_add(rect.height);
    column >= rect.x && column < max_x && row >= rect.y && row < max_y
}

pub fn rect_is_degenerate(rect: Rect) -> bool {
    rect.width == 0 || rect.height == 0
}
