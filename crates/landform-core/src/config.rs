//! Run configuration.
//!
//! Every key is optional in JSON; missing keys take the calibrated defaults
//! below. `validate` must pass before any grid work starts.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transport::regime::RegimeSelector;

/// Sediment load carried by channelized flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    Bedload,
    Suspended,
}

impl LoadType {
    /// Transport-law exponent applied to channel shear.
    pub fn exponent(self) -> f64 {
        match self {
            LoadType::Bedload => 1.5,
            LoadType::Suspended => 2.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// R: rainfall intensity factor.
    pub rainfall_factor: f64,
    /// K: soil erodibility.
    pub erodibility: f64,
    /// Soil bulk density (g/cm³).
    pub soil_density: f64,
    /// C: land-cover factor.
    pub cover_factor: f64,
    /// Rain depth per rain day (mm).
    pub rain_depth_mm: f64,
    /// Rain days per year.
    pub rain_days: f64,
    /// Fraction of rainfall lost to infiltration, in [0, 1).
    pub infiltration: f64,
    /// Kt: channel transport efficiency.
    pub stream_transport: f64,
    pub load_type: LoadType,
    /// kappa: hillslope diffusion rate, also the bedrock weathering rate.
    pub diffusion_rate: f64,
    /// Slope (degrees) above which slope failure moves soil downslope.
    /// 90 or more disables the pass.
    pub critical_slope_deg: f64,
    /// Flow-accumulation thresholds for overland, rill and channel flow.
    pub cutoffs: [f64; 3],
    /// MFD convergence exponent.
    pub convergence: f64,
    /// Divisor (with soil density) converting flux divergence to depth.
    pub unit_area_conversion: f64,
    pub iterations: u32,
    pub diffusive_only: bool,
    pub overland_only: bool,
    pub channelized_only: bool,
    /// Lower bedrock by a curvature-scaled weathering rate each year.
    pub weathering: bool,
    pub stats_percentile: f64,
    /// Keep every derived field of every year in the named store.
    pub keep_intermediates: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rainfall_factor: 5.66,
            erodibility: 0.42,
            soil_density: 1.2186,
            cover_factor: 0.005,
            rain_depth_mm: 20.61,
            rain_days: 25.0,
            infiltration: 0.0,
            stream_transport: 0.0001,
            load_type: LoadType::Bedload,
            diffusion_rate: 0.0001,
            critical_slope_deg: 40.0,
            cutoffs: [0.65, 2.25, 7.0],
            convergence: 5.0,
            unit_area_conversion: 10.0,
            iterations: 1,
            diffusive_only: false,
            overland_only: false,
            channelized_only: false,
            weathering: false,
            stats_percentile: 99.0,
            keep_intermediates: false,
        }
    }
}

impl SimulationConfig {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Check every parameter and build the regime selector.
    ///
    /// Regime flags and cutoffs are checked first so that their errors win
    /// over unrelated parameter complaints.
    pub fn validate(&self) -> Result<RegimeSelector, ConfigError> {
        let selector = RegimeSelector::from_config(self)?;

        non_negative("rainfall_factor", self.rainfall_factor)?;
        non_negative("erodibility", self.erodibility)?;
        positive("soil_density", self.soil_density)?;
        non_negative("cover_factor", self.cover_factor)?;
        non_negative("rain_depth_mm", self.rain_depth_mm)?;
        non_negative("rain_days", self.rain_days)?;
        non_negative("stream_transport", self.stream_transport)?;
        non_negative("diffusion_rate", self.diffusion_rate)?;
        non_negative("convergence", self.convergence)?;
        positive("unit_area_conversion", self.unit_area_conversion)?;
        positive("critical_slope_deg", self.critical_slope_deg)?;

        if !(0.0..1.0).contains(&self.infiltration) {
            return Err(ConfigError::InvalidParameter {
                name: "infiltration",
                value: self.infiltration,
                reason: "must lie in [0, 1)",
            });
        }
        if !(0.0..=100.0).contains(&self.stats_percentile) {
            return Err(ConfigError::InvalidParameter {
                name: "stats_percentile",
                value: self.stats_percentile,
                reason: "must lie in [0, 100]",
            });
        }

        Ok(selector)
    }

    /// Annual runoff depth per rain day (m) after infiltration.
    pub fn rain_excess_m(&self) -> f64 {
        self.rain_depth_mm / 1000.0 * (1.0 - self.infiltration)
    }

    pub fn slope_failure_enabled(&self) -> bool {
        self.critical_slope_deg < 90.0
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value, reason: "must be finite and >= 0" })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value, reason: "must be finite and > 0" })
    }
}
