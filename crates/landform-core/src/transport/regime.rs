//! Flow-regime classification.
//!
//! Cells are binned by flow accumulation against three strictly increasing
//! cutoffs, or one regime is forced over the whole map.

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::field::Field;

/// Transport law governing a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowRegime {
    /// Hillslope creep.
    Diffusive,
    /// Sheetwash.
    Overland,
    /// Rill and gully flow.
    Rill,
    /// Stream flow.
    Channelized,
}

/// Validated, strictly increasing flow-accumulation thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cutoffs {
    overland: f64,
    rill: f64,
    channel: f64,
}

impl Cutoffs {
    pub fn new(cutoff1: f64, cutoff2: f64, cutoff3: f64) -> Result<Self, ConfigError> {
        // Comparisons are false for NaN, which rejects it here as well.
        let increasing = cutoff1 < cutoff2 && cutoff2 < cutoff3;
        if !increasing || !cutoff1.is_finite() || !cutoff3.is_finite() {
            return Err(ConfigError::NonIncreasingCutoffs { cutoff1, cutoff2, cutoff3 });
        }
        Ok(Self { overland: cutoff1, rill: cutoff2, channel: cutoff3 })
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.overland, self.rill, self.channel]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegimeSelector {
    /// Per-cell choice by accumulation thresholds.
    Mixed(Cutoffs),
    /// One law for the whole map.
    Forced(FlowRegime),
}

/// Cell counts per regime for one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeCounts {
    pub diffusive: usize,
    pub overland: usize,
    pub rill: usize,
    pub channelized: usize,
}

impl RegimeSelector {
    /// Build from the single-regime flags and cutoffs.
    ///
    /// Cutoffs are validated even when a regime is forced; a broken config
    /// should not become valid by toggling a flag.
    pub fn from_config(cfg: &SimulationConfig) -> Result<Self, ConfigError> {
        let flags: Vec<(&'static str, FlowRegime)> = [
            ("diffusive_only", cfg.diffusive_only, FlowRegime::Diffusive),
            ("overland_only", cfg.overland_only, FlowRegime::Overland),
            ("channelized_only", cfg.channelized_only, FlowRegime::Channelized),
        ]
        .into_iter()
        .filter(|(_, set, _)| *set)
        .map(|(name, _, regime)| (name, regime))
        .collect();

        if flags.len() > 1 {
            return Err(ConfigError::ConflictingRegimes {
                flags: flags.iter().map(|(name, _)| *name).collect(),
            });
        }

        let [c1, c2, c3] = cfg.cutoffs;
        let cutoffs = Cutoffs::new(c1, c2, c3)?;

        Ok(match flags.first() {
            Some(&(_, regime)) => RegimeSelector::Forced(regime),
            None => RegimeSelector::Mixed(cutoffs),
        })
    }

    /// Regime for a cell with the given flow accumulation.
    #[inline]
    pub fn classify(&self, flowacc: f64) -> FlowRegime {
        match *self {
            RegimeSelector::Forced(regime) => regime,
            RegimeSelector::Mixed(c) => {
                if flowacc >= c.channel {
                    FlowRegime::Channelized
                } else if flowacc >= c.rill {
                    FlowRegime::Rill
                } else if flowacc >= c.overland {
                    FlowRegime::Overland
                } else {
                    FlowRegime::Diffusive
                }
            }
        }
    }

    /// Classify every cell. Cells with a null accumulation, slope or aspect
    /// have no regime.
    pub fn classify_field(
        &self,
        flowacc: &Field,
        slope: &Field,
        aspect: &Field,
    ) -> Vec<Option<FlowRegime>> {
        flowacc
            .data
            .iter()
            .zip(slope.data.iter())
            .zip(aspect.data.iter())
            .map(|((&a, &s), &asp)| {
                if a.is_nan() || s.is_nan() || asp.is_nan() {
                    None
                } else {
                    Some(self.classify(a))
                }
            })
            .collect()
    }
}

impl RegimeCounts {
    pub fn tally(regimes: &[Option<FlowRegime>]) -> Self {
        let mut counts = Self::default();
        for regime in regimes.iter().flatten() {
            match regime {
                FlowRegime::Diffusive => counts.diffusive += 1,
                FlowRegime::Overland => counts.overland += 1,
                FlowRegime::Rill => counts.rill += 1,
                FlowRegime::Channelized => counts.channelized += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.diffusive + self.overland + self.rill + self.channelized
    }
}
