//! Sediment transport capacity and its x/y flux components.
//!
//! Transport force per regime (S = slope, A = flow accumulation):
//!   diffusive    kappa · sin S
//!   overland     A^1.6 · sin(S)^1.3
//!   rill         (A · (1 − infiltration))^1.6 · sin(S)^1.3
//!   channelized  rain_days · (h · sin S)^p,  h = runoff depth · A
//!
//! Flux is `T · F` resolved along the aspect, with `T` chosen by soil state
//! and regime.
use crate::config::SimulationConfig;
use crate::engine::GridEngine;
use crate::error::Result;
use crate::field::Field;

use super::regime::{FlowRegime, RegimeSelector};

/// Transport coefficient for cells stripped to bedrock.
pub const BEDROCK_TRANSPORT_COEFF: f64 = 0.0001;

const AREA_EXP: f64 = 1.6;
const SLOPE_EXP: f64 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportParams {
    pub kappa: f64,
    /// Runoff depth per rain day after infiltration (m).
    pub rain_excess_m: f64,
    pub rain_days: f64,
    pub infiltration: f64,
    /// Channel transport-law exponent.
    pub exponent: f64,
    /// R · K · C.
    pub hillslope_coeff: f64,
    /// Kt.
    pub stream_coeff: f64,
}

impl TransportParams {
    pub fn from_config(cfg: &SimulationConfig) -> Self {
        Self {
            kappa: cfg.diffusion_rate,
            rain_excess_m: cfg.rain_excess_m(),
            rain_days: cfg.rain_days,
            infiltration: cfg.infiltration,
            exponent: cfg.load_type.exponent(),
            hillslope_coeff: cfg.rainfall_factor * cfg.erodibility * cfg.cover_factor,
            stream_coeff: cfg.stream_transport,
        }
    }
}

/// Scalar transport force for one cell.
pub fn transport_force(regime: FlowRegime, flowacc: f64, slope_deg: f64, p: &TransportParams) -> f64 {
    let sin_s = slope_deg.to_radians().sin();
    match regime {
        FlowRegime::Diffusive => p.kappa * sin_s,
        FlowRegime::Overland => flowacc.powf(AREA_EXP) * sin_s.powf(SLOPE_EXP),
        FlowRegime::Rill => (flowacc * (1.0 - p.infiltration)).powf(AREA_EXP) * sin_s.powf(SLOPE_EXP),
        FlowRegime::Channelized => {
            let depth = p.rain_excess_m * flowacc;
            p.rain_days * (depth * sin_s).powf(p.exponent)
        }
    }
}

/// `T`: detachment-limited on bare bedrock, `Kt` in channels, `R·K·C` elsewhere.
pub fn transport_coefficient(regime: FlowRegime, soil_depth: f64, p: &TransportParams) -> f64 {
    if soil_depth <= 0.0 {
        BEDROCK_TRANSPORT_COEFF
    } else if regime == FlowRegime::Channelized {
        p.stream_coeff
    } else {
        p.hillslope_coeff
    }
}

/// Transport force and its components for one year.
#[derive(Debug, Clone)]
pub struct SedimentFlux {
    pub force: Field,
    /// Eastward component.
    pub qsx: Field,
    /// Northward component.
    pub qsy: Field,
}

/// Compute `F`, `Qsx` and `Qsy`. Flat cells (aspect 0) carry no flux.
pub fn compute_sediment_flux<E: GridEngine>(
    engine: &E,
    selector: &RegimeSelector,
    params: &TransportParams,
    flowacc: &Field,
    slope: &Field,
    aspect: &Field,
    soil: &Field,
) -> Result<SedimentFlux> {
    let force = engine.evaluate(&[flowacc, slope], |v| {
        transport_force(selector.classify(v[0]), v[0], v[1], params)
    })?;

    let component = |project: fn(f64) -> f64| {
        engine.evaluate(&[&force, flowacc, aspect, soil], move |v| {
            let (f, acc, asp, soil) = (v[0], v[1], v[2], v[3]);
            if asp == 0.0 {
                return 0.0;
            }
            transport_coefficient(selector.classify(acc), soil, params) * f * project(asp.to_radians())
        })
    };
    let qsx = component(f64::cos)?;
    let qsy = component(f64::sin)?;

    Ok(SedimentFlux { force, qsx, qsy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RasterEngine;
    use crate::transport::regime::Cutoffs;
    use approx::assert_abs_diff_eq;

    fn params() -> TransportParams {
        TransportParams::from_config(&SimulationConfig::default())
    }

    #[test]
    fn every_law_vanishes_on_zero_slope() {
        let p = params();
        for regime in [
            FlowRegime::Diffusive,
            FlowRegime::Overland,
            FlowRegime::Rill,
            FlowRegime::Channelized,
        ] {
            assert_eq!(transport_force(regime, 50.0, 0.0, &p), 0.0, "{regime:?}");
        }
    }

    #[test]
    fn overland_law_matches_closed_form() {
        let p = params();
        let s = 10.0f64;
        let expected = 4.0f64.powf(1.6) * s.to_radians().sin().powf(1.3);
        assert_abs_diff_eq!(transport_force(FlowRegime::Overland, 4.0, s, &p), expected, epsilon = 1e-12);
    }

    #[test]
    fn channel_exponent_follows_load_type() {
        let bed = params();
        let sus = TransportParams { exponent: 2.5, ..bed };
        let h = bed.rain_excess_m * 100.0 * 30.0f64.to_radians().sin();
        assert_abs_diff_eq!(
            transport_force(FlowRegime::Channelized, 100.0, 30.0, &bed),
            bed.rain_days * h.powf(1.5),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            transport_force(FlowRegime::Channelized, 100.0, 30.0, &sus),
            bed.rain_days * h.powf(2.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn coefficient_depends_on_soil_and_regime() {
        let p = params();
        assert_eq!(transport_coefficient(FlowRegime::Channelized, 0.0, &p), BEDROCK_TRANSPORT_COEFF);
        assert_eq!(transport_coefficient(FlowRegime::Channelized, 1.0, &p), p.stream_coeff);
        assert_abs_diff_eq!(
            transport_coefficient(FlowRegime::Rill, 1.0, &p),
            5.66 * 0.42 * 0.005,
            epsilon = 1e-15
        );
    }

    #[test]
    fn flux_is_resolved_along_aspect() {
        let engine = RasterEngine::new();
        let p = params();
        let sel = RegimeSelector::Mixed(Cutoffs::new(0.65, 2.25, 7.0).unwrap());
        let acc = Field::new(2, 1, 10.0, 1.0);
        let slope = Field::new(2, 1, 10.0, 20.0);
        let aspect = Field::from_vec(2, 1, 10.0, vec![90.0, 0.0]);
        let soil = Field::new(2, 1, 10.0, 1.0);
        let flux = compute_sediment_flux(&engine, &sel, &p, &acc, &slope, &aspect, &soil).unwrap();

        let f = flux.force.get(0, 0);
        assert!(f > 0.0);
        // Facing north: all flux in y.
        assert_abs_diff_eq!(flux.qsx.get(0, 0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(flux.qsy.get(0, 0), p.hillslope_coeff * f, epsilon = 1e-12);
        // Flat aspect: no flux.
        assert_eq!(flux.qsx.get(0, 1), 0.0);
        assert_eq!(flux.qsy.get(0, 1), 0.0);
    }

    #[test]
    fn mixed_cells_follow_their_band_law_and_coefficient() {
        let engine = RasterEngine::new();
        let p = TransportParams { infiltration: 0.2, ..params() };
        let sel = RegimeSelector::Mixed(Cutoffs::new(0.65, 2.25, 7.0).unwrap());
        let acc = Field::from_vec(5, 1, 10.0, vec![0.3, 1.0, 3.0, 10.0, 10.0]);
        let slope = Field::new(5, 1, 10.0, 20.0);
        let aspect = Field::new(5, 1, 10.0, 360.0);
        let soil = Field::from_vec(5, 1, 10.0, vec![1.0, 1.0, 1.0, 1.0, 0.0]);
        let flux = compute_sediment_flux(&engine, &sel, &p, &acc, &slope, &aspect, &soil).unwrap();

        let sin_s = 20.0f64.to_radians().sin();
        let h = p.rain_excess_m * 10.0;
        let channel = p.rain_days * (h * sin_s).powf(1.5);
        let expected = [
            (p.kappa * sin_s, p.hillslope_coeff),
            (1.0f64.powf(1.6) * sin_s.powf(1.3), p.hillslope_coeff),
            ((3.0f64 * 0.8).powf(1.6) * sin_s.powf(1.3), p.hillslope_coeff),
            (channel, p.stream_coeff),
            (channel, BEDROCK_TRANSPORT_COEFF),
        ];
        for (c, &(force, coeff)) in expected.iter().enumerate() {
            assert_abs_diff_eq!(flux.force.get(0, c), force, epsilon = 1e-12);
            // Aspect 360 faces east: everything in x.
            assert_abs_diff_eq!(flux.qsx.get(0, c), coeff * force, epsilon = 1e-12);
            assert_abs_diff_eq!(flux.qsy.get(0, c), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn forced_regime_ignores_accumulation_bands() {
        let engine = RasterEngine::new();
        let p = params();
        let sel = RegimeSelector::Forced(FlowRegime::Diffusive);
        let acc = Field::from_vec(3, 1, 10.0, vec![0.1, 5.0, 500.0]);
        let slope = Field::new(3, 1, 10.0, 30.0);
        let aspect = Field::new(3, 1, 10.0, 180.0);
        let soil = Field::new(3, 1, 10.0, 1.0);
        let flux = compute_sediment_flux(&engine, &sel, &p, &acc, &slope, &aspect, &soil).unwrap();

        let force = p.kappa * 0.5;
        for c in 0..3 {
            assert_abs_diff_eq!(flux.force.get(0, c), force, epsilon = 1e-12);
            // Facing west.
            assert_abs_diff_eq!(flux.qsx.get(0, c), -p.hillslope_coeff * force, epsilon = 1e-12);
        }

        let channel = RegimeSelector::Forced(FlowRegime::Channelized);
        let flux = compute_sediment_flux(&engine, &channel, &p, &acc, &slope, &aspect, &soil).unwrap();
        let h = p.rain_excess_m * 0.1 * 0.5;
        assert_abs_diff_eq!(flux.force.get(0, 0), p.rain_days * h.powf(1.5), epsilon = 1e-12);
        assert_abs_diff_eq!(flux.qsx.get(0, 0), -p.stream_coeff * flux.force.get(0, 0), epsilon = 1e-12);
    }
}
