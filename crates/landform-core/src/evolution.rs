//! Multi-year orchestrator: bootstrap, annual steps, finalize.
//!
//! Each year is computed entirely into locals by `simulate_year` and only
//! committed (state, ledger entry, named artifacts) once it has succeeded, so a
//! failed year leaves the previous one in place.

use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::engine::GridEngine;
use crate::error::{shape_label, ConfigError, LandformError, Result};
use crate::field::Field;
use crate::report::{IterationStats, StatsLedger};
use crate::transport::mass_balance::{soil_depth, LandscapeState};
use crate::transport::regime::RegimeSelector;
use crate::transport::simulate_year;

pub const ELEVATION: &str = "elevation";
pub const BEDROCK: &str = "bedrock";
pub const SOIL: &str = "soil";

/// `<layer>.<year>`, the key every artifact is stored under.
pub fn artifact_name(layer: &str, year: u32) -> String {
    format!("{layer}.{year}")
}

/// What a finished run hands back. Only `Evolution::finish` builds one, so
/// holding it means the run is over.
#[derive(Debug)]
pub struct EvolutionResult<E> {
    pub engine: E,
    pub state: LandscapeState,
    pub ledger: StatsLedger,
    /// Last committed year.
    pub years: u32,
}

pub struct Evolution<E: GridEngine> {
    engine: E,
    config: SimulationConfig,
    selector: RegimeSelector,
    state: LandscapeState,
    year: u32,
    ledger: StatsLedger,
}

impl<E: GridEngine> Evolution<E> {
    /// Validate `config`, derive the initial soil and store year 0.
    pub fn bootstrap(mut engine: E, config: SimulationConfig, elevation: Field, bedrock: Field) -> Result<Self> {
        let selector = config.validate()?;
        check_inputs(&elevation, &bedrock)?;

        let lowered = bedrock
            .data
            .iter()
            .zip(elevation.data.iter())
            .filter(|&(&b, &e)| b > e)
            .count();
        if lowered > 0 {
            warn!(cells = lowered, "bedrock above the surface lowered to the surface");
        }
        let bedrock = engine.evaluate(&[&bedrock, &elevation], |v| v[0].min(v[1]))?;
        let soil = soil_depth(&engine, &elevation, &bedrock)?;

        let state = LandscapeState { elevation, bedrock, soil };
        commit_state(&mut engine, &state, 0);

        info!(
            width = state.elevation.width,
            height = state.elevation.height,
            cellsize = state.elevation.cellsize,
            "bootstrapped landscape"
        );

        let ledger = StatsLedger::new(config.stats_percentile);
        Ok(Self { engine, config, selector, state, year: 0, ledger })
    }

    /// Rebuild an orchestrator from artifacts already stored for `year`.
    pub fn resume(engine: E, config: SimulationConfig, year: u32) -> Result<Self> {
        let selector = config.validate()?;
        let read = |layer: &str| {
            let name = artifact_name(layer, year);
            engine.read_named(&name).map_err(|_| LandformError::Dependency { year, name })
        };
        let elevation = read(ELEVATION)?;
        let bedrock = read(BEDROCK)?;
        let stored_soil = read(SOIL)?;
        check_inputs(&elevation, &bedrock)?;
        check_field(SOIL, &stored_soil)?;
        check_same_shape(&elevation, SOIL, &stored_soil)?;

        // Soil is re-derived, never trusted from the store.
        let soil = soil_depth(&engine, &elevation, &bedrock)?;
        let stale = soil
            .data
            .iter()
            .zip(stored_soil.data.iter())
            .filter(|&(&a, &b)| a.is_nan() != b.is_nan() || (a - b).abs() > 1e-9)
            .count();
        if stale > 0 {
            warn!(year, cells = stale, "stored soil disagrees with elevation minus bedrock, re-derived");
        }

        info!(year, "resumed landscape");
        let ledger = StatsLedger::new(config.stats_percentile);
        Ok(Self {
            engine,
            config,
            selector,
            state: LandscapeState { elevation, bedrock, soil },
            year,
            ledger,
        })
    }

    /// Simulate one year and commit it. On error nothing is committed.
    pub fn step(&mut self) -> Result<()> {
        for layer in [ELEVATION, BEDROCK, SOIL] {
            let name = artifact_name(layer, self.year);
            if !self.engine.contains_named(&name) {
                return Err(LandformError::Dependency { year: self.year, name });
            }
        }

        let next = self.year + 1;
        let outcome = simulate_year(&self.engine, &self.config, &self.selector, &self.state)?;
        let stats = IterationStats::collect(
            &self.engine,
            next,
            &outcome.applied,
            &outcome.state.soil,
            self.config.stats_percentile,
            outcome.regimes,
        )?;

        for (layer, field) in outcome.intermediates {
            self.engine.write_named(&artifact_name(layer, next), field);
        }
        commit_state(&mut self.engine, &outcome.state, next);

        info!(
            year = next,
            eroded_cells = stats.erosion.as_ref().map_or(0, |s| s.count),
            deposited_cells = stats.deposition.as_ref().map_or(0, |s| s.count),
            mean_soil = stats.soil.as_ref().map_or(f64::NAN, |s| s.mean),
            clamped = outcome.clamped_cells,
            "year complete"
        );
        if outcome.slope_failure > 0.0 {
            debug!(year = next, depth = outcome.slope_failure, "slope failure");
        }

        self.state = outcome.state;
        self.ledger.years.push(stats);
        self.year = next;
        Ok(())
    }

    /// Run `config.iterations` years from the current one.
    pub fn run(&mut self) -> Result<()> {
        for _ in 0..self.config.iterations {
            self.step()?;
        }
        Ok(())
    }

    pub fn finish(self) -> EvolutionResult<E> {
        info!(years = self.year, "evolution finished");
        EvolutionResult { engine: self.engine, state: self.state, ledger: self.ledger, years: self.year }
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn state(&self) -> &LandscapeState {
        &self.state
    }

    pub fn ledger(&self) -> &StatsLedger {
        &self.ledger
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

fn check_inputs(elevation: &Field, bedrock: &Field) -> std::result::Result<(), ConfigError> {
    check_field(ELEVATION, elevation)?;
    check_field(BEDROCK, bedrock)?;
    check_same_shape(elevation, BEDROCK, bedrock)
}

/// Fields have public members, so a caller can hand in anything.
fn check_field(name: &'static str, field: &Field) -> std::result::Result<(), ConfigError> {
    if field.data.len() != field.width * field.height {
        return Err(ConfigError::MalformedInput {
            name,
            values: field.data.len(),
            width: field.width,
            height: field.height,
        });
    }
    if !(field.cellsize.is_finite() && field.cellsize > 0.0) {
        return Err(ConfigError::InvalidCellsize { name, cellsize: field.cellsize });
    }
    if field.is_empty() || field.valid_count() == 0 {
        return Err(ConfigError::MissingInput(name));
    }
    Ok(())
}

fn check_same_shape(
    elevation: &Field,
    name: &'static str,
    other: &Field,
) -> std::result::Result<(), ConfigError> {
    if elevation.same_shape(other) {
        return Ok(());
    }
    Err(ConfigError::ShapeMismatch {
        first: ELEVATION,
        first_shape: shape_label(elevation.width, elevation.height, elevation.cellsize),
        second: name,
        second_shape: shape_label(other.width, other.height, other.cellsize),
    })
}

fn commit_state<E: GridEngine>(engine: &mut E, state: &LandscapeState, year: u32) {
    engine.write_named(&artifact_name(ELEVATION, year), state.elevation.clone());
    engine.write_named(&artifact_name(BEDROCK, year), state.bedrock.clone());
    engine.write_named(&artifact_name(SOIL, year), state.soil.clone());
}
