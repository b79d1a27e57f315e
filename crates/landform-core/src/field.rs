use serde::{Deserialize, Deserializer, Serialize};

/// A 2D raster of `f64` values, row-major, row 0 = northern edge.
/// NaN is the null / no-data marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    /// Row-major cell values. Serialised with nulls in place of NaN.
    #[serde(deserialize_with = "null_as_nan_vec")]
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
    /// Cell edge length in metres.
    pub cellsize: f64,
}

fn null_as_nan_vec<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

impl Field {
    /// Create a new Field filled with the given value.
    pub fn new(width: usize, height: usize, cellsize: f64, fill: f64) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            cellsize,
        }
    }

    /// Create a Field with every cell null.
    pub fn null(width: usize, height: usize, cellsize: f64) -> Self {
        Self::new(width, height, cellsize, f64::NAN)
    }

    /// Wrap existing row-major values. `data.len()` must equal `width * height`.
    pub fn from_vec(width: usize, height: usize, cellsize: f64, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { data, width, height, cellsize }
    }

    /// A field of the same shape whose cells are produced by `f(row, col)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        cellsize: f64,
        mut f: impl FnMut(usize, usize) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for r in 0..height {
            for c in 0..width {
                data.push(f(r, c));
            }
        }
        Self { data, width, height, cellsize }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[row * self.width + col] = val;
    }

    /// Value at a signed offset from `(row, col)`, or `None` when the target
    /// falls outside the grid.
    #[inline]
    pub fn get_offset(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<f64> {
        let r = row as isize + dr;
        let c = col as isize + dc;
        if r < 0 || c < 0 || r >= self.height as isize || c >= self.width as isize {
            return None;
        }
        Some(self.get(r as usize, c as usize))
    }

    #[inline]
    pub fn is_null(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_nan()
    }

    /// True when width, height and cell size all agree.
    pub fn same_shape(&self, other: &Field) -> bool {
        self.width == other.width
            && self.height == other.height
            && (self.cellsize - other.cellsize).abs() <= f64::EPSILON * self.cellsize.abs().max(1.0)
    }

    /// Number of non-null cells.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Minimum over non-null cells; NaN when every cell is null.
    pub fn min_value(&self) -> f64 {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .cloned()
            .fold(f64::NAN, f64::min)
    }

    /// Maximum over non-null cells; NaN when every cell is null.
    pub fn max_value(&self) -> f64 {
        self.data
            .iter()
            .filter(|v| !v.is_nan())
            .cloned()
            .fold(f64::NAN, f64::max)
    }

    /// Sum over non-null cells.
    pub fn sum(&self) -> f64 {
        self.data.iter().filter(|v| !v.is_nan()).sum()
    }
}
