//! Per-year erosion, deposition and soil statistics.
use serde::{Deserialize, Serialize};

use crate::engine::{GridEngine, UnivariateStats};
use crate::error::Result;
use crate::field::Field;
use crate::transport::regime::RegimeCounts;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    pub year: u32,
    /// Cells that lost elevation. `None` when there were none.
    pub erosion: Option<UnivariateStats>,
    /// Cells that gained elevation.
    pub deposition: Option<UnivariateStats>,
    pub soil: Option<UnivariateStats>,
    pub regimes: RegimeCounts,
}

impl IterationStats {
    pub fn collect<E: GridEngine>(
        engine: &E,
        year: u32,
        applied: &Field,
        soil: &Field,
        percentile: f64,
        regimes: RegimeCounts,
    ) -> Result<Self> {
        let erosion = engine.evaluate(&[applied], |v| if v[0] < 0.0 { v[0] } else { f64::NAN })?;
        let deposition = engine.evaluate(&[applied], |v| if v[0] > 0.0 { v[0] } else { f64::NAN })?;
        Ok(Self {
            year,
            erosion: engine.univariate_stats(&erosion, percentile),
            deposition: engine.univariate_stats(&deposition, percentile),
            soil: engine.univariate_stats(soil, percentile),
            regimes,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsLedger {
    pub percentile: f64,
    pub years: Vec<IterationStats>,
}

impl StatsLedger {
    pub fn new(percentile: f64) -> Self {
        Self { percentile, years: Vec::new() }
    }

    pub fn csv_header(&self) -> Vec<String> {
        let mut header = vec!["year".to_string()];
        for group in ["erosion", "deposition", "soil"] {
            for stat in ["mean", "min", "max"] {
                header.push(format!("{group}_{stat}"));
            }
            header.push(format!("{group}_p{}", self.percentile));
        }
        header
    }

    /// One row per year; absent summaries become empty cells.
    pub fn csv_rows(&self) -> Vec<Vec<String>> {
        self.years
            .iter()
            .map(|y| {
                let mut row = vec![y.year.to_string()];
                for stats in [&y.erosion, &y.deposition, &y.soil] {
                    match stats {
                        Some(s) => row.extend(
                            [s.mean, s.min, s.max, s.percentile_value].iter().map(|v| v.to_string()),
                        ),
                        None => row.extend(std::iter::repeat_n(String::new(), 4)),
                    }
                }
                row
            })
            .collect()
    }
}
