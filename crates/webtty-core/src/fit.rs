#![forbid(unsafe_code)]

//! Container-to-grid fitting.
//!
//! Computes columns/rows from the mount point's CSS pixel size and the
//! surface's cell metrics, and reports only actual changes.

use core::fmt;

/// Terminal grid size. Both components are always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    cols: u16,
    rows: u16,
}

impl Dimensions {
    /// `None` if either component is zero.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Option<Self> {
        if cols == 0 || rows == 0 {
            None
        } else {
            Some(Self { cols, rows })
        }
    }

    #[must_use]
    pub const fn cols(self) -> u16 {
        self.cols
    }

    #[must_use]
    pub const fn rows(self) -> u16 {
        self.rows
    }
}

/// Renders as `<columns>x<rows>`, the overlay text for a resize.
impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Size of one character cell in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width_px: f64,
    pub height_px: f64,
}

/// Usable area of the mount point in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSize {
    pub width_px: f64,
    pub height_px: f64,
}

/// Space reserved for the surface's scrollbar and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitConfig {
    pub reserved_width_px: f64,
    pub reserved_height_px: f64,
}

fn cells_along(available: f64, cell: f64) -> u16 {
    if !available.is_finite() || !cell.is_finite() || cell <= 0.0 {
        return 1;
    }
    let count = (available / cell).floor();
    if count < 1.0 {
        1
    } else if count >= f64::from(u16::MAX) {
        u16::MAX
    } else {
        count as u16
    }
}

/// Fit a grid to a container. Degenerate input (zero, negative, NaN,
/// infinite) clamps to `1x1` rather than failing.
#[must_use]
pub fn fit_grid_to_container(
    container: ContainerSize,
    cell: CellMetrics,
    config: FitConfig,
) -> Dimensions {
    let width = container.width_px - config.reserved_width_px;
    let height = container.height_px - config.reserved_height_px;
    Dimensions {
        cols: cells_along(width, cell.width_px),
        rows: cells_along(height, cell.height_px),
    }
}

/// Tracks the last reported dimensions so repeated fits are silent.
#[derive(Debug, Clone, Default)]
pub struct FitNegotiator {
    config: FitConfig,
    last_reported: Option<Dimensions>,
}

impl FitNegotiator {
    #[must_use]
    pub fn new(config: FitConfig) -> Self {
        Self {
            config,
            last_reported: None,
        }
    }

    #[must_use]
    pub const fn last_reported(&self) -> Option<Dimensions> {
        self.last_reported
    }

    /// Fit and return the new dimensions if they differ from the last report.
    pub fn negotiate(&mut self, container: ContainerSize, cell: CellMetrics) -> Option<Dimensions> {
        let dims = fit_grid_to_container(container, cell, self.config);
        if self.last_reported == Some(dims) {
            return None;
        }
        self.last_reported = Some(dims);
        Some(dims)
    }
}
