use serde::{Deserialize, Serialize};

use crate::field::Field;

/// Univariate summary of the non-null cells of a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnivariateStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Requested percentile in [0, 100].
    pub percentile: f64,
    /// Nearest-rank value at `percentile`.
    pub percentile_value: f64,
}

pub(crate) fn univariate(field: &Field, percentile: f64) -> Option<UnivariateStats> {
    let mut values: Vec<f64> = field.data.iter().cloned().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let p = percentile.clamp(0.0, 100.0);
    let rank = ((p / 100.0) * n as f64).ceil() as usize;
    let percentile_value = values[rank.clamp(1, n) - 1];

    Some(UnivariateStats {
        count: n,
        mean,
        min: values[0],
        max: values[n - 1],
        percentile: p,
        percentile_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_percentile() {
        let f = Field::from_vec(10, 1, 1.0, (1..=10).map(|v| v as f64).collect());
        let s = univariate(&f, 90.0).unwrap();
        assert_eq!(s.count, 10);
        assert_eq!(s.percentile_value, 9.0);
        assert_eq!(univariate(&f, 0.0).unwrap().percentile_value, 1.0);
        assert_eq!(univariate(&f, 100.0).unwrap().percentile_value, 10.0);
        assert!((s.mean - 5.5).abs() < 1e-12);
    }

    #[test]
    fn nulls_are_ignored_and_all_null_is_none() {
        let f = Field::from_vec(3, 1, 1.0, vec![f64::NAN, -4.0, 2.0]);
        let s = univariate(&f, 50.0).unwrap();
        assert_eq!((s.count, s.min, s.max), (2, -4.0, 2.0));
        assert!(univariate(&Field::null(2, 2, 1.0), 50.0).is_none());
    }
}
