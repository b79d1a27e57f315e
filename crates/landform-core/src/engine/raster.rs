//! In-memory grid engine with a named field store.
use std::collections::BTreeMap;

#[cfg(feature = "threading")]
use rayon::prelude::*;

use super::flow::mfd_accumulation;
use super::stats::{univariate, UnivariateStats};
use super::surface::{compute_partials, compute_surface, SurfaceDerivatives};
use super::{ensure_same_shape, GridEngine, MAX_EVAL_INPUTS};
use crate::error::{GridError, Result};
use crate::field::Field;

#[derive(Debug, Default, Clone)]
pub struct RasterEngine {
    store: BTreeMap<String, Field>,
}

impl RasterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the engine, yielding every stored field by name.
    pub fn into_store(self) -> BTreeMap<String, Field> {
        self.store
    }
}

impl GridEngine for RasterEngine {
    fn slope_aspect_curvature(&self, elevation: &Field) -> SurfaceDerivatives {
        compute_surface(elevation)
    }

    fn flow_accumulation(&self, elevation: &Field, convergence: f64) -> Field {
        mfd_accumulation(elevation, convergence)
    }

    fn evaluate<F>(&self, inputs: &[&Field], expr: F) -> Result<Field>
    where
        F: Fn(&[f64]) -> f64 + Sync,
    {
        let first = *inputs.first().ok_or(GridError::NoInputs)?;
        if inputs.len() > MAX_EVAL_INPUTS {
            return Err(GridError::TooManyInputs { max: MAX_EVAL_INPUTS, got: inputs.len() }.into());
        }
        for f in &inputs[1..] {
            ensure_same_shape(first, f)?;
        }

        let n_inputs = inputs.len();
        let cell = |i: usize| -> f64 {
            let mut buf = [0.0f64; MAX_EVAL_INPUTS];
            for (slot, f) in buf.iter_mut().zip(inputs) {
                let v = f.data[i];
                if v.is_nan() {
                    return f64::NAN;
                }
                *slot = v;
            }
            expr(&buf[..n_inputs])
        };

        #[cfg(feature = "threading")]
        let data: Vec<f64> = (0..first.len()).into_par_iter().map(cell).collect();
        #[cfg(not(feature = "threading"))]
        let data: Vec<f64> = (0..first.len()).map(cell).collect();

        Ok(Field::from_vec(first.width, first.height, first.cellsize, data))
    }

    fn partial_derivatives(&self, field: &Field) -> (Field, Field) {
        compute_partials(field)
    }

    fn shift_by_offset(&self, field: &Field, row_offset: isize, col_offset: isize) -> Field {
        Field::from_fn(field.width, field.height, field.cellsize, |r, c| {
            field.get_offset(r, c, row_offset, col_offset).unwrap_or(f64::NAN)
        })
    }

    fn univariate_stats(&self, field: &Field, percentile: f64) -> Option<UnivariateStats> {
        univariate(field, percentile)
    }

    fn patch(&self, primary: &Field, fallback: &Field) -> Result<Field> {
        ensure_same_shape(primary, fallback)?;
        let data = primary
            .data
            .iter()
            .zip(fallback.data.iter())
            .map(|(&p, &f)| if p.is_nan() { f } else { p })
            .collect();
        Ok(Field::from_vec(primary.width, primary.height, primary.cellsize, data))
    }

    fn read_named(&self, name: &str) -> Result<Field> {
        self.store
            .get(name)
            .cloned()
            .ok_or_else(|| GridError::UnknownField(name.to_string()).into())
    }

    fn write_named(&mut self, name: &str, field: Field) {
        self.store.insert(name.to_string(), field);
    }

    fn remove_named(&mut self, name: &str) -> Option<Field> {
        self.store.remove(name)
    }

    fn contains_named(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    fn names(&self) -> Vec<String> {
        self.store.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LandformError;

    #[test]
    fn evaluate_propagates_input_nulls_only() {
        let engine = RasterEngine::new();
        let a = Field::from_vec(3, 1, 1.0, vec![1.0, f64::NAN, 3.0]);
        let b = Field::from_vec(3, 1, 1.0, vec![10.0, 20.0, 30.0]);
        let out = engine.evaluate(&[&a, &b], |v| v[0] + v[1]).unwrap();
        assert_eq!(out.get(0, 0), 11.0);
        assert!(out.is_null(0, 1));
        assert_eq!(out.get(0, 2), 33.0);
    }

    #[test]
    fn evaluate_rejects_mismatched_shapes() {
        let engine = RasterEngine::new();
        let a = Field::new(3, 3, 1.0, 0.0);
        let b = Field::new(3, 2, 1.0, 0.0);
        let err = engine.evaluate(&[&a, &b], |v| v[0]).unwrap_err();
        assert!(matches!(err, LandformError::Grid(GridError::ShapeMismatch { .. })));
    }

    #[test]
    fn shift_reads_neighbour_and_nulls_outside() {
        let engine = RasterEngine::new();
        let f = Field::from_fn(3, 3, 1.0, |r, c| (r * 3 + c) as f64);
        let east = engine.shift_by_offset(&f, 0, 1);
        assert_eq!(east.get(1, 1), 5.0);
        assert!(east.is_null(1, 2));
        let north_west = engine.shift_by_offset(&f, -1, -1);
        assert_eq!(north_west.get(2, 2), 4.0);
        assert!(north_west.is_null(0, 1));
    }

    #[test]
    fn patch_fills_only_nulls() {
        let engine = RasterEngine::new();
        let p = Field::from_vec(2, 1, 1.0, vec![f64::NAN, 2.0]);
        let f = Field::from_vec(2, 1, 1.0, vec![9.0, 9.0]);
        assert_eq!(engine.patch(&p, &f).unwrap().data, vec![9.0, 2.0]);
    }

    #[test]
    fn named_store_round_trip() {
        let mut engine = RasterEngine::new();
        engine.write_named("soil.0", Field::new(2, 2, 1.0, 1.5));
        assert_eq!(engine.read_named("soil.0").unwrap().get(1, 1), 1.5);
        assert_eq!(engine.names(), vec!["soil.0".to_string()]);
        assert!(engine.remove_named("soil.0").is_some());
        assert!(matches!(
            engine.read_named("soil.0"),
            Err(LandformError::Grid(GridError::UnknownField(_)))
        ));
    }
}
