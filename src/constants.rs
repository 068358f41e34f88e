//! Shared crate-wide constants.
//!
//! These are the defaults [`crate::config::LayoutConfig`] starts from.

/// Smallest extent (in cells) an area may be squeezed to along either axis.
///
/// A split is refused when the area's extent along the split axis is below
/// twice this value, and separator drags stop once either neighbor would
/// shrink past it.
pub const DEFAULT_MIN_AREA_SIZE: u16 = 4;

/// Smallest size fraction any child of a row may hold.
pub const DEFAULT_MIN_FRACTION: f64 = 0.05;

/// Pointer travel (Chebyshev distance, in cells) before a corner drag
/// commits to a direction.
pub const DEFAULT_DEAD_ZONE: u16 = 2;

/// Share of a drop target's shorter dimension that counts as an edge band.
pub const DEFAULT_EDGE_BAND_RATIO: f64 = 0.25;

/// Quiet period after the last separator move before the resize is
/// committed to the whole tree.
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 75;

/// Entries kept on each of the undo and redo stacks.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Repair/recompute rounds before the session gives up.
pub const DEFAULT_MAX_RECALC_ATTEMPTS: u8 = 3;

/// Most verbose `tracing` level the engine log records unless overridden.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Lines kept by the in-process diagnostics buffer.
pub const DEFAULT_DIAGNOSTIC_LINES: usize = 2000;
