use std::time::Instant;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::prelude::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Position,
    pub at: Instant,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, column: u16, row: u16, at: Instant) -> Self {
        Self {
            kind,
            position: Position::new(column, row),
            at,
        }
    }

    pub fn down(column: u16, row: u16, at: Instant) -> Self {
        Self::new(PointerKind::Down, column, row, at)
    }

    pub fn moved(column: u16, row: u16, at: Instant) -> Self {
        Self::new(PointerKind::Move, column, row, at)
    }

    pub fn up(column: u16, row: u16, at: Instant) -> Self {
        Self::new(PointerKind::Up, column, row, at)
    }

    /// Convert a primary-button crossterm mouse event. Scrolls, hover moves
    /// and other buttons yield `None`.
    pub fn from_mouse(mouse: &MouseEvent, at: Instant) -> Option<Self> {
        let kind = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
            MouseEventKind::Drag(MouseButton::Left) => PointerKind::Move,
            MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
            _ => return None,
        };
        Some(Self::new(kind, mouse.column, mouse.row, at))
    }

    /// Signed offset from `origin`.
    pub fn delta_from(&self, origin: Position) -> (i32, i32) {
        (
            i32::from(self.position.x) - i32::from(origin.x),
            i32::from(self.position.y) - i32::from(origin.y),
        )
    }
}
