use ratatui::prelude::Position;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::layout::{Axis, LayoutTree, SeparatorRef, ViewportMap};

/// A separator drag between two adjacent children of one row.
///
/// `t` is the share of the pair's combined size given to the first child.
/// The pointer offset from the first child's start is measured in row cells,
/// the same basis the compiler floors sizes against, so a clamped `t` never
/// compiles either child below its recursive minimum extent or the minimum
/// fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeDrag {
    pub separator: SeparatorRef,
    pub axis: Axis,
    span_start: u16,
    /// Row cells covered by the whole pair: `pair × row extent`.
    scale: f64,
    pair: f64,
    t_lo: f64,
    t_hi: f64,
    t: f64,
    base_sizes: Vec<f64>,
}

impl ResizeDrag {
    pub fn begin(
        tree: &LayoutTree,
        viewports: &ViewportMap,
        config: &LayoutConfig,
        separator: SeparatorRef,
    ) -> Result<Self, LayoutError> {
        let row = tree
            .row(separator.row)
            .ok_or(LayoutError::UnknownNode(separator.row))?;
        let axis = row.orientation.axis().ok_or_else(|| {
            LayoutError::invalid(format!("stack {} has no separators", separator.row))
        })?;
        let (Some(first), Some(second)) = (
            row.children.get(separator.index),
            row.children.get(separator.index + 1),
        ) else {
            return Err(LayoutError::invalid(format!(
                "row {} has no separator {}",
                separator.row, separator.index
            )));
        };
        let (Some(row_rect), Some(first_rect)) =
            (viewports.get(separator.row), viewports.get(first.id))
        else {
            return Err(LayoutError::invalid("separator has no viewport"));
        };
        let pair = first.size + second.size;
        let row_extent = f64::from(axis.extent(row_rect));
        let scale = pair * row_extent;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(LayoutError::invalid("separator spans no cells"));
        }
        let fraction_px = (config.min_fraction * row_extent).ceil();
        let min_first = f64::from(tree.min_extent(first.id, axis, config.min_area_size))
            .max(fraction_px);
        let min_second = f64::from(tree.min_extent(second.id, axis, config.min_area_size))
            .max(fraction_px);
        // A trailing second child absorbs the remainder, so it compiles to at
        // least `pair × (1 - t) × row extent` cells as well.
        let mut t_lo = (min_first / scale).max(config.min_fraction / pair);
        let mut t_hi = (1.0 - min_second / scale).min(1.0 - config.min_fraction / pair);
        let t = first.size / pair;
        if t_lo > t_hi {
            // The pair is already as small as it may get; the separator is pinned.
            t_lo = t;
            t_hi = t;
        }
        Ok(Self {
            separator,
            axis,
            span_start: axis.start(first_rect),
            scale,
            pair,
            t_lo,
            t_hi,
            t,
            base_sizes: row.sizes(),
        })
    }

    /// Move the separator to follow `position`. Returns whether `t` changed.
    pub fn update(&mut self, position: Position) -> bool {
        let offset = f64::from(self.axis.coord(position)) - f64::from(self.span_start);
        let t = (offset / self.scale).clamp(self.t_lo, self.t_hi);
        let changed = t != self.t;
        self.t = t;
        changed
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.t_lo, self.t_hi)
    }

    /// Row sizes with the dragged pair rebalanced.
    pub fn sizes(&self) -> Vec<f64> {
        let mut sizes = self.base_sizes.clone();
        let index = self.separator.index;
        sizes[index] = self.pair * self.t;
        sizes[index + 1] = self.pair - sizes[index];
        sizes
    }
}
