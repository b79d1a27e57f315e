//! Flux divergence and the one-cell downslope correction.
//!
//! The Horn derivative of the flux field lands one cell downslope of the
//! source cell. Each cell therefore takes its depth from the neighbour its
//! aspect points at. Flat cells keep their own value, and so does any cell
//! whose neighbour read is null.
use crate::engine::{ensure_same_shape, GridEngine};
use crate::error::Result;
use crate::field::Field;

use super::flux::SedimentFlux;

/// One of eight 45° aspect sectors, centred on the compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectBin {
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
}

impl AspectBin {
    /// Counter-clockwise from east; index matches the discriminant.
    pub const ALL: [AspectBin; 8] = [
        AspectBin::East,
        AspectBin::NorthEast,
        AspectBin::North,
        AspectBin::NorthWest,
        AspectBin::West,
        AspectBin::SouthWest,
        AspectBin::South,
        AspectBin::SouthEast,
    ];

    /// Sector for an aspect in degrees counter-clockwise from east.
    /// `None` for flat (0) or null aspect.
    pub fn from_aspect(aspect: f64) -> Option<Self> {
        if aspect.is_nan() || aspect == 0.0 {
            return None;
        }
        let idx = ((aspect + 22.5).rem_euclid(360.0) / 45.0).floor() as usize % 8;
        Some(Self::ALL[idx])
    }

    /// (row, col) offset of the neighbour in this direction; row 0 is north.
    pub const fn offset(self) -> (isize, isize) {
        match self {
            AspectBin::East => (0, 1),
            AspectBin::NorthEast => (-1, 1),
            AspectBin::North => (-1, 0),
            AspectBin::NorthWest => (-1, -1),
            AspectBin::West => (0, -1),
            AspectBin::SouthWest => (1, -1),
            AspectBin::South => (1, 0),
            AspectBin::SouthEast => (1, 1),
        }
    }
}

/// `−(dQsx/dx + dQsy/dy) / (unit_area_conversion · soil_density)`.
/// Net outflow gives a negative depth.
pub fn divergence_depth<E: GridEngine>(
    engine: &E,
    flux: &SedimentFlux,
    unit_area_conversion: f64,
    soil_density: f64,
) -> Result<Field> {
    let (dqsx_dx, _) = engine.partial_derivatives(&flux.qsx);
    let (_, dqsy_dy) = engine.partial_derivatives(&flux.qsy);
    let scale = unit_area_conversion * soil_density;
    engine.evaluate(&[&dqsx_dx, &dqsy_dy], |v| -(v[0] + v[1]) / scale)
}

/// Move every depth value back to the cell it belongs to.
pub fn redistribute<E: GridEngine>(engine: &E, depth: &Field, aspect: &Field) -> Result<Field> {
    ensure_same_shape(depth, aspect)?;

    let shifted: Vec<Field> = AspectBin::ALL
        .iter()
        .map(|bin| {
            let (dr, dc) = bin.offset();
            engine.shift_by_offset(depth, dr, dc)
        })
        .collect();

    let gathered = Field::from_fn(depth.width, depth.height, depth.cellsize, |r, c| {
        match AspectBin::from_aspect(aspect.get(r, c)) {
            Some(bin) => shifted[bin as usize].get(r, c),
            None => depth.get(r, c),
        }
    });
    engine.patch(&gathered, depth)
}

/// Raw divergence depth and the corrected net change.
#[derive(Debug, Clone)]
pub struct NetChange {
    pub divergence: Field,
    /// Negative = erosion. Defined wherever soil is defined.
    pub net_change: Field,
}

pub fn compute_net_change<E: GridEngine>(
    engine: &E,
    flux: &SedimentFlux,
    aspect: &Field,
    soil: &Field,
    unit_area_conversion: f64,
    soil_density: f64,
) -> Result<NetChange> {
    let divergence = divergence_depth(engine, flux, unit_area_conversion, soil_density)?;
    let moved = redistribute(engine, &divergence, aspect)?;
    let no_change = engine.evaluate(&[soil], |_| 0.0)?;
    let net_change = engine.patch(&moved, &no_change)?;
    Ok(NetChange { divergence, net_change })
}
