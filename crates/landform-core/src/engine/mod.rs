//! Grid engine: the field operations the transport pipeline is written against.
//!
//! `RasterEngine` is the in-memory implementation used by the CLI and tests.
//! Other backends only need to honour the null rules documented per method.
pub mod flow;
pub mod raster;
pub mod stats;
pub mod surface;

use crate::error::{shape_label, GridError, Result};
use crate::field::Field;

pub use raster::RasterEngine;
pub use stats::UnivariateStats;
pub use surface::SurfaceDerivatives;

/// Upper bound on the number of fields one `evaluate` call can combine.
pub const MAX_EVAL_INPUTS: usize = 8;

pub trait GridEngine {
    /// Slope (degrees), aspect (degrees counter-clockwise from east, 0 = flat),
    /// profile and tangential curvature. Border cells and cells next to a null
    /// are null.
    fn slope_aspect_curvature(&self, elevation: &Field) -> SurfaceDerivatives;

    /// Upslope contributing cells per cell (excluding the cell itself), routed
    /// by multiple flow directions with the given convergence exponent.
    fn flow_accumulation(&self, elevation: &Field, convergence: f64) -> Field;

    /// Elementwise expression over same-shaped fields. `expr` receives one
    /// value per input, in order. Cells where any input is null stay null.
    fn evaluate<F>(&self, inputs: &[&Field], expr: F) -> Result<Field>
    where
        F: Fn(&[f64]) -> f64 + Sync;

    /// `(d/dx, d/dy)` with x positive east and y positive north.
    fn partial_derivatives(&self, field: &Field) -> (Field, Field);

    /// `out[r][c] = field[r + row_offset][c + col_offset]`; null when the read
    /// falls outside the grid.
    fn shift_by_offset(&self, field: &Field, row_offset: isize, col_offset: isize) -> Field;

    /// Summary of the non-null cells, `None` when there are none.
    fn univariate_stats(&self, field: &Field, percentile: f64) -> Option<UnivariateStats>;

    /// Nulls in `primary` filled from `fallback`.
    fn patch(&self, primary: &Field, fallback: &Field) -> Result<Field>;

    fn read_named(&self, name: &str) -> Result<Field>;
    fn write_named(&mut self, name: &str, field: Field);
    fn remove_named(&mut self, name: &str) -> Option<Field>;
    fn contains_named(&self, name: &str) -> bool {
        self.read_named(name).is_ok()
    }
    /// Stored field names in sorted order.
    fn names(&self) -> Vec<String>;
}

pub(crate) fn ensure_same_shape(a: &Field, b: &Field) -> std::result::Result<(), GridError> {
    if a.same_shape(b) {
        Ok(())
    } else {
        Err(GridError::ShapeMismatch {
            expected: shape_label(a.width, a.height, a.cellsize),
            found: shape_label(b.width, b.height, b.cellsize),
        })
    }
}
