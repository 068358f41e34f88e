//! Engine-wide error type.

use ratatui::prelude::Rect;
use thiserror::Error;

use crate::layout::{InvariantViolation, NodeId};
use crate::screen::ScreenId;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("degenerate geometry {0:?} and no previous bounds to fall back to")]
    InvalidGeometry(Rect),
    #[error("another gesture is already in progress")]
    GestureBusy,
    #[error("layout still inconsistent after {0} recalculation attempts")]
    RecalculationLimit(u8),
    #[error("unknown screen {0}")]
    UnknownScreen(ScreenId),
    #[error("layout invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("layout serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl LayoutError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LayoutError::InvalidOperation(message.into())
    }
}
