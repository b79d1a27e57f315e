//! Mass-balance closure: apply net change without eroding into bedrock.
use crate::engine::GridEngine;
use crate::error::Result;
use crate::field::Field;

/// Surface, rock and soil for one year. `soil = max(elevation − bedrock, 0)`.
#[derive(Debug, Clone)]
pub struct LandscapeState {
    pub elevation: Field,
    pub bedrock: Field,
    pub soil: Field,
}

/// Curvature inputs for bedrock weathering.
#[derive(Debug, Clone, Copy)]
pub struct Weathering<'a> {
    pub kappa: f64,
    pub profile_curvature: &'a Field,
    pub tangential_curvature: &'a Field,
}

/// Next-year state plus what was actually applied.
#[derive(Debug, Clone)]
pub struct MassBalance {
    pub state: LandscapeState,
    /// `elevation' − elevation`, after clamping and border patching.
    pub applied: Field,
    /// Bedrock lowering, when weathering ran.
    pub weathering: Option<Field>,
    /// Cells whose erosion was capped at the available soil.
    pub clamped_cells: usize,
}

/// `max(elevation − bedrock, 0)`.
pub fn soil_depth<E: GridEngine>(engine: &E, elevation: &Field, bedrock: &Field) -> Result<Field> {
    engine.evaluate(&[elevation, bedrock], |v| (v[0] - v[1]).max(0.0))
}

/// Erosion reaching bedrock is capped at exactly the soil depth.
pub fn clamp_to_soil<E: GridEngine>(engine: &E, net_change: &Field, soil: &Field) -> Result<Field> {
    engine.evaluate(&[net_change, soil], |v| {
        let (dz, soil) = (v[0], v[1]);
        if dz < 0.0 && -dz >= soil {
            -soil
        } else {
            dz
        }
    })
}

/// Bedrock lowering rate `kappa · (2 − r)` where `r` maps mean curvature
/// linearly from `[c_min, c_max]` onto `[2, 0]`. Uniform curvature gives `r = 1`.
pub fn weathering_rate<E: GridEngine>(engine: &E, w: &Weathering<'_>) -> Result<Field> {
    let mean = engine.evaluate(&[w.profile_curvature, w.tangential_curvature], |v| (v[0] + v[1]) / 2.0)?;
    let Some(range) = engine.univariate_stats(&mean, 100.0) else {
        return Ok(mean);
    };
    let (lo, hi) = (range.min, range.max);
    let span = hi - lo;
    let kappa = w.kappa;
    engine.evaluate(&[&mean], |v| {
        let rescaled = if span > 0.0 { 2.0 * (hi - v[0]) / span } else { 1.0 };
        kappa * (2.0 - rescaled)
    })
}

/// Advance elevation, bedrock and soil by one year.
pub fn update<E: GridEngine>(
    engine: &E,
    state: &LandscapeState,
    net_change: &Field,
    weathering: Option<Weathering<'_>>,
) -> Result<MassBalance> {
    let clamped_cells = net_change
        .data
        .iter()
        .zip(state.soil.data.iter())
        .filter(|&(&dz, &soil)| dz < 0.0 && -dz >= soil)
        .count();

    let change = clamp_to_soil(engine, net_change, &state.soil)?;
    let raised = engine.evaluate(&[&state.elevation, &change], |v| v[0] + v[1])?;
    // Anything the update left null (grid border) keeps last year's surface.
    let elevation = engine.patch(&raised, &state.elevation)?;

    let (bedrock, rate) = match weathering {
        None => (state.bedrock.clone(), None),
        Some(w) => {
            let rate = weathering_rate(engine, &w)?;
            let lowered = engine.evaluate(&[&state.bedrock, &rate], |v| v[0] - v[1])?;
            (engine.patch(&lowered, &state.bedrock)?, Some(rate))
        }
    };

    let soil = soil_depth(engine, &elevation, &bedrock)?;
    let applied = engine.evaluate(&[&elevation, &state.elevation], |v| v[0] - v[1])?;

    Ok(MassBalance {
        state: LandscapeState { elevation, bedrock, soil },
        applied,
        weathering: rate,
        clamped_cells,
    })
}
