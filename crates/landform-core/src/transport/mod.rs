//! One simulated year: surface derivatives → flow accumulation → regime
//! selection → sediment flux → divergence correction → mass balance →
//! slope failure.
pub mod divergence;
pub mod flux;
pub mod mass_balance;
pub mod regime;
pub mod slope_failure;

use tracing::debug;

use crate::config::SimulationConfig;
use crate::engine::GridEngine;
use crate::error::Result;
use crate::field::Field;
use divergence::compute_net_change;
use flux::{compute_sediment_flux, TransportParams};
use mass_balance::{update, LandscapeState, Weathering};
use regime::{RegimeCounts, RegimeSelector};
use slope_failure::relax_slopes;

/// Everything one year produces. Nothing here is committed until the caller
/// takes it.
#[derive(Debug, Clone)]
pub struct YearOutcome {
    pub state: LandscapeState,
    /// Total elevation change over the year (negative = erosion).
    pub applied: Field,
    pub regimes: RegimeCounts,
    pub clamped_cells: usize,
    /// Depth moved by slope failure, summed over cells.
    pub slope_failure: f64,
    /// Derived fields by layer name, filled only when intermediates are kept.
    pub intermediates: Vec<(&'static str, Field)>,
}

/// Run the transport pipeline on `state`, producing next year's state.
pub fn simulate_year<E: GridEngine>(
    engine: &E,
    cfg: &SimulationConfig,
    selector: &RegimeSelector,
    state: &LandscapeState,
) -> Result<YearOutcome> {
    let surface = engine.slope_aspect_curvature(&state.elevation);
    let flowacc = engine.flow_accumulation(&state.elevation, cfg.convergence);

    let regimes = RegimeCounts::tally(&selector.classify_field(&flowacc, &surface.slope, &surface.aspect));
    debug!(
        diffusive = regimes.diffusive,
        overland = regimes.overland,
        rill = regimes.rill,
        channelized = regimes.channelized,
        "flow regimes"
    );

    let params = TransportParams::from_config(cfg);
    let flux = compute_sediment_flux(
        engine,
        selector,
        &params,
        &flowacc,
        &surface.slope,
        &surface.aspect,
        &state.soil,
    )?;

    let change = compute_net_change(
        engine,
        &flux,
        &surface.aspect,
        &state.soil,
        cfg.unit_area_conversion,
        cfg.soil_density,
    )?;

    let weathering = cfg.weathering.then_some(Weathering {
        kappa: cfg.diffusion_rate,
        profile_curvature: &surface.profile_curvature,
        tangential_curvature: &surface.tangential_curvature,
    });
    let mut balance = update(engine, state, &change.net_change, weathering)?;
    if balance.clamped_cells > 0 {
        debug!(cells = balance.clamped_cells, "erosion capped at available soil");
    }

    let mut slope_failure = 0.0;
    if cfg.slope_failure_enabled() {
        slope_failure = relax_slopes(&mut balance.state, cfg.critical_slope_deg);
        if slope_failure > 0.0 {
            debug!(depth = slope_failure, "slope failure moved soil");
            balance.applied =
                engine.evaluate(&[&balance.state.elevation, &state.elevation], |v| v[0] - v[1])?;
        }
    }

    let mut intermediates = Vec::new();
    if cfg.keep_intermediates {
        intermediates.extend([
            ("slope", surface.slope),
            ("aspect", surface.aspect),
            ("pcurv", surface.profile_curvature),
            ("tcurv", surface.tangential_curvature),
            ("flowacc", flowacc),
            ("force", flux.force),
            ("qsx", flux.qsx),
            ("qsy", flux.qsy),
            ("divergence", change.divergence),
            ("netchange", change.net_change),
        ]);
        if let Some(rate) = balance.weathering.take() {
            intermediates.push(("weathering", rate));
        }
    }

    Ok(YearOutcome {
        state: balance.state,
        applied: balance.applied,
        regimes,
        clamped_cells: balance.clamped_cells,
        slope_failure,
        intermediates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RasterEngine;
    use mass_balance::soil_depth;

    fn hill(n: usize) -> LandscapeState {
        let engine = RasterEngine::new();
        let mid = (n as f64 - 1.0) / 2.0;
        let elevation = Field::from_fn(n, n, 10.0, |r, c| {
            let d = ((r as f64 - mid).powi(2) + (c as f64 - mid).powi(2)).sqrt();
            100.0 - 4.0 * d
        });
        let bedrock = Field::from_fn(n, n, 10.0, |r, c| elevation.get(r, c) - 1.0);
        let soil = soil_depth(&engine, &elevation, &bedrock).unwrap();
        LandscapeState { elevation, bedrock, soil }
    }

    #[test]
    fn year_keeps_soil_non_negative() {
        let engine = RasterEngine::new();
        let cfg = SimulationConfig::default();
        let selector = cfg.validate().unwrap();
        let out = simulate_year(&engine, &cfg, &selector, &hill(12)).unwrap();
        assert!(out.state.soil.data.iter().all(|&s| s.is_nan() || s >= 0.0));
        assert!(out.regimes.total() > 0);
        assert!(out.intermediates.is_empty());
    }

    #[test]
    fn intermediates_are_returned_on_request() {
        let engine = RasterEngine::new();
        let cfg = SimulationConfig { keep_intermediates: true, weathering: true, ..Default::default() };
        let selector = cfg.validate().unwrap();
        let out = simulate_year(&engine, &cfg, &selector, &hill(8)).unwrap();
        let names: Vec<&str> = out.intermediates.iter().map(|(n, _)| *n).collect();
        for expected in ["slope", "aspect", "flowacc", "qsx", "qsy", "netchange", "weathering"] {
            assert!(names.contains(&expected), "missing {expected} in {names:?}");
        }
    }
}
