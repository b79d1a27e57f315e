//! Multi-year soil erosion and deposition over gridded terrain.
//!
//! Each simulated year derives slope, aspect and curvature from the current
//! surface, routes flow, picks a transport regime per cell, moves sediment
//! down the flux divergence and closes the mass balance against bedrock.
pub mod config;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod field;
pub mod report;
pub mod synthetic;
pub mod transport;

pub use config::{LoadType, SimulationConfig};
pub use engine::{GridEngine, RasterEngine};
pub use error::{ConfigError, GridError, LandformError, Result};
pub use evolution::{artifact_name, Evolution, EvolutionResult};
pub use field::Field;
pub use report::{IterationStats, StatsLedger};
pub use synthetic::SyntheticTerrain;
pub use transport::mass_balance::LandscapeState;
pub use transport::regime::{FlowRegime, RegimeSelector};
