//! Multiple-flow-direction accumulation.
//!
//! Each cell passes its own unit of area plus everything it received to its
//! lower D8 neighbours, split by Holmgren (1994) weights `tan(β)^p`. Cells are
//! processed high to low so every donor is finished before its receivers.
use crate::field::Field;

/// D8 neighbour offsets (row, col), row 0 = north.
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// D8 neighbour distances in cell units.
pub(crate) const D8_DIST: [f64; 8] = [
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
];

/// Upslope cell count per cell, excluding the cell itself. Null elevation
/// cells neither give nor receive flow and stay null.
pub(crate) fn mfd_accumulation(elevation: &Field, convergence: f64) -> Field {
    let rows = elevation.height;
    let cols = elevation.width;
    let cs = elevation.cellsize;

    let mut order: Vec<usize> = (0..rows * cols)
        .filter(|&i| !elevation.data[i].is_nan())
        .collect();
    order.sort_unstable_by(|&a, &b| {
        elevation.data[b]
            .partial_cmp(&elevation.data[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut acc = vec![0.0f64; rows * cols];
    let mut weights = [0.0f64; 8];

    for &i in &order {
        let r = i / cols;
        let c = i % cols;
        let z0 = elevation.data[i];

        let mut total = 0.0;
        for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
            weights[k] = 0.0;
            let Some(z1) = elevation.get_offset(r, c, dr, dc) else {
                continue;
            };
            if z1.is_nan() || z1 >= z0 {
                continue;
            }
            let tan_beta = (z0 - z1) / (cs * D8_DIST[k]);
            let w = tan_beta.powf(convergence);
            weights[k] = w;
            total += w;
        }
        if total <= 0.0 {
            continue;
        }

        let outflow = acc[i] + 1.0;
        for (k, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
            if weights[k] > 0.0 {
                let j = (r as isize + dr) as usize * cols + (c as isize + dc) as usize;
                acc[j] += outflow * weights[k] / total;
            }
        }
    }

    for (a, &z) in acc.iter_mut().zip(elevation.data.iter()) {
        if z.is_nan() {
            *a = f64::NAN;
        }
    }

    Field::from_vec(cols, rows, cs, acc)
}
