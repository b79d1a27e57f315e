//! Slope-threshold failure of the soil mantle.
//!
//! Any interior cell whose Horn slope exceeds the critical angle sheds soil
//! to its steepest D8 downslope neighbour, never more than it holds. Cells
//! are processed high-to-low so each transfer is visible downstream in the
//! same sweep. Bedrock is never moved.
use crate::engine::flow::{D8_DIST, D8_OFFSETS};
use crate::engine::surface::horn_gradient;

use super::mass_balance::LandscapeState;

/// Apply one sweep of slope failure. Returns the total depth moved (m summed
/// over cells).
pub fn relax_slopes(state: &mut LandscapeState, critical_slope_deg: f64) -> f64 {
    let rows = state.elevation.height;
    let cols = state.elevation.width;
    if rows < 3 || cols < 3 {
        return 0.0;
    }
    let cs = state.elevation.cellsize;
    let tan_crit = critical_slope_deg.to_radians().tan();

    let mut order: Vec<usize> = (1..rows - 1)
        .flat_map(|r| (1..cols - 1).map(move |c| r * cols + c))
        .filter(|&i| !state.elevation.data[i].is_nan())
        .collect();
    order.sort_unstable_by(|&a, &b| {
        state.elevation.data[b]
            .partial_cmp(&state.elevation.data[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut moved = 0.0;
    for &i in &order {
        let r = i / cols;
        let c = i % cols;
        let Some((dz_dx, dz_dy)) = horn_gradient(&state.elevation, r, c) else {
            continue;
        };
        if (dz_dx * dz_dx + dz_dy * dz_dy).sqrt() <= tan_crit {
            continue;
        }

        let z0 = state.elevation.data[i];
        let mut best_drop = 0.0f64;
        let mut best_nb: Option<(usize, f64)> = None;
        for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
            let Some(z1) = state.elevation.get_offset(r, c, dr, dc) else {
                continue;
            };
            if z1.is_nan() {
                continue;
            }
            let dist = cs * D8_DIST[k];
            let drop = (z0 - z1) / dist;
            if drop > best_drop {
                best_drop = drop;
                let j = (r as isize + dr) as usize * cols + (c as isize + dc) as usize;
                best_nb = Some((j, dist));
            }
        }

        let Some((j, dist)) = best_nb else {
            continue;
        };
        let z1 = state.elevation.data[j];
        let available = state.soil.data[i];
        if available.is_nan() {
            continue;
        }
        let transfer = (((z0 - z1) - tan_crit * dist) / 2.0).min(available);
        if transfer > 0.0 {
            state.elevation.data[i] = z0 - transfer;
            state.elevation.data[j] = z1 + transfer;
            for k in [i, j] {
                let b = state.bedrock.data[k];
                state.soil.data[k] = (state.elevation.data[k] - b).max(0.0);
            }
            moved += transfer;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    /// Column 3 stands `cliff` metres above a flat floor; column 4 is a high
    /// wall so material can only go west.
    fn cliff(soil: f64, cliff: f64) -> LandscapeState {
        let elevation = Field::from_fn(5, 5, 10.0, |_, c| match c {
            0..=2 => 0.0,
            3 => cliff,
            _ => 10_000.0,
        });
        let bedrock = Field::from_fn(5, 5, 10.0, |r, c| elevation.get(r, c) - soil);
        let soil = Field::new(5, 5, 10.0, soil);
        LandscapeState { elevation, bedrock, soil }
    }

    #[test]
    fn transfer_conserves_mass() {
        let mut s = cliff(100.0, 20.0);
        let before = s.elevation.sum();
        let moved = relax_slopes(&mut s, 30.0);
        assert!(moved > 0.0);
        assert!((s.elevation.sum() - before).abs() < 1e-6);
    }

    #[test]
    fn transfer_never_exceeds_soil() {
        let mut s = cliff(0.5, 20.0);
        relax_slopes(&mut s, 30.0);
        for r in 1..4 {
            assert!(s.elevation.get(r, 3) >= 20.0 - 0.5 - 1e-12);
            assert!(s.soil.get(r, 3) >= 0.0);
            assert!(s.bedrock.get(r, 3) <= s.elevation.get(r, 3));
        }
    }

    #[test]
    fn gentle_slope_is_untouched() {
        let elevation = Field::from_fn(5, 5, 10.0, |_, c| c as f64 * 0.5);
        let bedrock = Field::from_fn(5, 5, 10.0, |_, c| c as f64 * 0.5 - 1.0);
        let soil = Field::new(5, 5, 10.0, 1.0);
        let mut s = LandscapeState { elevation: elevation.clone(), bedrock, soil };
        assert_eq!(relax_slopes(&mut s, 40.0), 0.0);
        assert_eq!(s.elevation, elevation);
    }
}
