//! Corner handles and the direction a corner drag commits to.

use ratatui::prelude::{Position, Rect};
use serde::{Deserialize, Serialize};

use crate::editor::InsertSide;
use crate::layout::{Axis, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// What a corner drag turned into once it left the dead zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerIntent {
    /// Movement points into the area.
    Inward(Axis),
    /// Movement points out of the area, toward a neighbor.
    Outward(Axis),
}

impl CornerIntent {
    pub fn axis(self) -> Axis {
        match self {
            CornerIntent::Inward(axis) | CornerIntent::Outward(axis) => axis,
        }
    }
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Sign of a movement along `axis` that points into the area.
    pub fn inward_sign(self, axis: Axis) -> i32 {
        match (self, axis) {
            (Corner::TopLeft | Corner::BottomLeft, Axis::Horizontal) => 1,
            (Corner::TopRight | Corner::BottomRight, Axis::Horizontal) => -1,
            (Corner::TopLeft | Corner::TopRight, Axis::Vertical) => 1,
            (Corner::BottomLeft | Corner::BottomRight, Axis::Vertical) => -1,
        }
    }

    /// The side of the area this corner sits on along `axis`.
    pub fn near_side(self, axis: Axis) -> InsertSide {
        if self.inward_sign(axis) > 0 {
            InsertSide::Before
        } else {
            InsertSide::After
        }
    }

    /// The direction that leaves the area through this corner's edge.
    pub fn outward_direction(self, axis: Axis) -> Direction {
        Direction::from_axis(axis, self.inward_sign(axis) < 0)
    }

    /// The cell this corner occupies in `rect`.
    pub fn point(self, rect: Rect) -> Position {
        let right = rect.x.saturating_add(rect.width.saturating_sub(1));
        let bottom = rect.y.saturating_add(rect.height.saturating_sub(1));
        match self {
            Corner::TopLeft => Position::new(rect.x, rect.y),
            Corner::TopRight => Position::new(right, rect.y),
            Corner::BottomLeft => Position::new(rect.x, bottom),
            Corner::BottomRight => Position::new(right, bottom),
        }
    }

    /// The corner of `rect` within `reach` cells of the point, if any.
    pub fn hit(rect: Rect, column: u16, row: u16, reach: u16) -> Option<Corner> {
        Corner::ALL.into_iter().find(|corner| {
            let point = corner.point(rect);
            column.abs_diff(point.x) <= reach && row.abs_diff(point.y) <= reach
        })
    }
}

/// Decide what a corner drag means once its Chebyshev distance exceeds
/// `dead_zone`.
///
/// The larger component wins. On a tie the axis whose component points
/// inward wins; when both or neither do, the horizontal axis wins.
pub fn classify(corner: Corner, dx: i32, dy: i32, dead_zone: u16) -> Option<CornerIntent> {
    if dx.abs().max(dy.abs()) <= i32::from(dead_zone) {
        return None;
    }
    let inward = |axis: Axis, component: i32| component.signum() == corner.inward_sign(axis);
    let axis = if dx.abs() > dy.abs() {
        Axis::Horizontal
    } else if dy.abs() > dx.abs() {
        Axis::Vertical
    } else {
        match (inward(Axis::Horizontal, dx), inward(Axis::Vertical, dy)) {
            (false, true) => Axis::Vertical,
            _ => Axis::Horizontal,
        }
    };
    let component = match axis {
        Axis::Horizontal => dx,
        Axis::Vertical => dy,
    };
    if inward(axis, component) {
        Some(CornerIntent::Inward(axis))
    } else {
        Some(CornerIntent::Outward(axis))
    }
}
