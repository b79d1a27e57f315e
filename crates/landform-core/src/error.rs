//! Error taxonomy for the evolution core.
//!
//! Configuration and dependency errors abort a run. Clamping erosion to the
//! available soil is normal behaviour and never surfaces here.

/// Invalid or conflicting run configuration. Raised before any grid work.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("conflicting single-regime flags: {}", .flags.join(", "))]
    ConflictingRegimes { flags: Vec<&'static str> },

    #[error("flow-accumulation cutoffs must be strictly increasing, got cutoff1={cutoff1}, cutoff2={cutoff2}, cutoff3={cutoff3}")]
    NonIncreasingCutoffs { cutoff1: f64, cutoff2: f64, cutoff3: f64 },

    #[error("invalid value for `{name}`: {value} ({reason})")]
    InvalidParameter { name: &'static str, value: f64, reason: &'static str },

    #[error("missing required input field `{0}`")]
    MissingInput(&'static str),

    #[error("input field `{name}` holds {values} values for a {width}x{height} grid")]
    MalformedInput { name: &'static str, values: usize, width: usize, height: usize },

    #[error("input field `{name}` has cell size {cellsize}; it must be finite and > 0")]
    InvalidCellsize { name: &'static str, cellsize: f64 },

    #[error("input fields `{first}` ({first_shape}) and `{second}` ({second_shape}) differ in shape")]
    ShapeMismatch {
        first: &'static str,
        first_shape: String,
        second: &'static str,
        second_shape: String,
    },
}

/// Failures reported by a grid engine.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GridError {
    #[error("field shapes differ: {expected} vs {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("no field named `{0}`")]
    UnknownField(String),

    #[error("evaluate takes at most {max} inputs, got {got}")]
    TooManyInputs { max: usize, got: usize },

    #[error("at least one input field is required")]
    NoInputs,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LandformError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("year {year}: required field `{name}` was not produced")]
    Dependency { year: u32, name: String },

    #[error("grid error: {0}")]
    Grid(#[from] GridError),
}

pub type Result<T> = std::result::Result<T, LandformError>;

pub(crate) fn shape_label(width: usize, height: usize, cellsize: f64) -> String {
    format!("{width}x{height} @ {cellsize} m")
}
