//! Mass-balance invariants over randomized synthetic landscapes.
use landform_core::engine::GridEngine;
use landform_core::transport::divergence::compute_net_change;
use landform_core::transport::flux::{compute_sediment_flux, TransportParams};
use landform_core::{Evolution, Field, RasterEngine, SimulationConfig, SyntheticTerrain};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_terrain(rng: &mut StdRng) -> SyntheticTerrain {
    SyntheticTerrain {
        width: rng.gen_range(8..24),
        height: rng.gen_range(8..24),
        cellsize: rng.gen_range(2.0..30.0),
        seed: rng.gen(),
        relief: rng.gen_range(1.0..80.0),
        soil_depth: rng.gen_range(0.0..3.0),
    }
}

fn assert_state_invariants(evo: &Evolution<RasterEngine>, label: &str) {
    let s = evo.state();
    for i in 0..s.soil.len() {
        let (e, b, soil) = (s.elevation.data[i], s.bedrock.data[i], s.soil.data[i]);
        if soil.is_nan() {
            continue;
        }
        assert!(soil >= 0.0, "{label}: negative soil {soil} at {i}");
        assert!(b <= e, "{label}: bedrock {b} above elevation {e} at {i}");
    }
}

#[test]
fn soil_stays_non_negative_and_bedrock_below_surface() {
    let mut rng = StdRng::seed_from_u64(0xE70D_E5);
    for case in 0..12 {
        let terrain = random_terrain(&mut rng);
        let (elevation, bedrock) = terrain.generate();
        let config = SimulationConfig {
            weathering: case % 2 == 1,
            diffusion_rate: rng.gen_range(0.0..0.01),
            erodibility: rng.gen_range(0.1..2.0),
            ..Default::default()
        };
        let mut evo = Evolution::bootstrap(RasterEngine::new(), config, elevation, bedrock).unwrap();
        for year in 1..=3 {
            evo.step().unwrap();
            assert_state_invariants(&evo, &format!("case {case} year {year} ({terrain:?})"));
        }
    }
}

#[test]
fn zero_iterations_leave_bootstrap_state_unchanged() {
    let (elevation, bedrock) = SyntheticTerrain { width: 16, height: 16, ..Default::default() }.generate();
    let config = SimulationConfig { iterations: 0, ..Default::default() };
    let mut evo = Evolution::bootstrap(RasterEngine::new(), config, elevation.clone(), bedrock.clone()).unwrap();
    let before = evo.state().clone();
    evo.run().unwrap();
    let result = evo.finish();
    assert_eq!(result.years, 0);
    assert!(result.ledger.years.is_empty());
    assert_eq!(result.state.elevation, before.elevation);
    assert_eq!(result.state.bedrock, before.bedrock);
    assert_eq!(result.state.soil, before.soil);
    assert_eq!(result.state.elevation, elevation);
}

#[test]
fn flat_terrain_does_not_change() {
    let engine = RasterEngine::new();
    let config = SimulationConfig::default();
    let selector = config.validate().unwrap();
    let elevation = Field::new(9, 9, 10.0, 250.0);
    let soil = Field::new(9, 9, 10.0, 1.0);
    let surface = engine.slope_aspect_curvature(&elevation);
    // Non-zero accumulation in every regime band.
    let flowacc = Field::from_fn(9, 9, 10.0, |r, c| (r * 9 + c) as f64 * 0.25);

    let flux = compute_sediment_flux(
        &engine,
        &selector,
        &TransportParams::from_config(&config),
        &flowacc,
        &surface.slope,
        &surface.aspect,
        &soil,
    )
    .unwrap();
    let change = compute_net_change(
        &engine,
        &flux,
        &surface.aspect,
        &soil,
        config.unit_area_conversion,
        config.soil_density,
    )
    .unwrap();
    assert!(change.net_change.data.iter().all(|&v| v == 0.0), "{:?}", change.net_change.data);

    let mut evo = Evolution::bootstrap(engine, config, elevation.clone(), Field::new(9, 9, 10.0, 249.0)).unwrap();
    evo.step().unwrap();
    assert_eq!(evo.state().elevation, elevation);
}

#[test]
fn steep_ramp_keeps_invariants_with_slope_failure() {
    let elevation = Field::from_fn(10, 10, 1.0, |_, c| 5.0 * c as f64);
    let bedrock = Field::from_fn(10, 10, 1.0, |r, c| elevation.get(r, c) - 0.5);
    let config = SimulationConfig { critical_slope_deg: 30.0, iterations: 2, ..Default::default() };
    let mut evo = Evolution::bootstrap(RasterEngine::new(), config, elevation, bedrock).unwrap();
    evo.run().unwrap();
    assert_eq!(evo.ledger().years.len(), 2);
    assert_state_invariants(&evo, "steep ramp");
}
