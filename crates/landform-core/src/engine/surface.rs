//! Slope, aspect and curvature from a 3×3 neighbourhood.
//!
//! Gradients use Horn's (1981) weighted finite differences; second
//! derivatives use the Evans–Young quadratic fit. Row 0 is north, so the
//! north neighbour of `(r, c)` is `(r − 1, c)`.
use crate::field::Field;

/// Gradient magnitude treated as flat. tan(0.01°) ≈ 1.745 × 10⁻⁴.
const FLAT_GRADIENT_THRESHOLD: f64 = 1.745e-4;

/// Per-cell surface derivatives of an elevation field.
#[derive(Debug, Clone)]
pub struct SurfaceDerivatives {
    /// Degrees above horizontal.
    pub slope: Field,
    /// Degrees counter-clockwise from east in (0, 360]; 0 = flat.
    pub aspect: Field,
    /// Curvature along the slope line (1/m), positive = convex.
    pub profile_curvature: Field,
    /// Curvature across the slope line (1/m), positive = convex.
    pub tangential_curvature: Field,
}

/// The 3×3 window around `(r, c)` in row order NW, N, NE, W, Z, E, SW, S, SE.
/// `None` on the border or when any cell is null.
fn window(f: &Field, r: usize, c: usize) -> Option<[f64; 9]> {
    if r == 0 || c == 0 || r + 1 >= f.height || c + 1 >= f.width {
        return None;
    }
    let mut w = [0.0f64; 9];
    let mut k = 0;
    for rr in r - 1..=r + 1 {
        for cc in c - 1..=c + 1 {
            let v = f.get(rr, cc);
            if v.is_nan() {
                return None;
            }
            w[k] = v;
            k += 1;
        }
    }
    Some(w)
}

/// Horn (1981) weighted 3×3 gradient at `(r, c)`.
///
/// ```text
///   NW  N  NE
///   W   *  E
///   SW  S  SE
/// ```
///
/// `dz/dx = ((NE + 2E + SE) − (NW + 2W + SW)) / (8 · cellsize)`
/// `dz/dy = ((NW + 2N + NE) − (SW + 2S + SE)) / (8 · cellsize)`
pub(crate) fn horn_gradient(f: &Field, r: usize, c: usize) -> Option<(f64, f64)> {
    let [nw, n, ne, w, _, e, sw, s, se] = window(f, r, c)?;
    let cs = f.cellsize;
    let dz_dx = ((ne + 2.0 * e + se) - (nw + 2.0 * w + sw)) / (8.0 * cs);
    let dz_dy = ((nw + 2.0 * n + ne) - (sw + 2.0 * s + se)) / (8.0 * cs);
    Some((dz_dx, dz_dy))
}

/// Slope angle in degrees from a gradient.
#[inline]
pub(crate) fn slope_deg(dz_dx: f64, dz_dy: f64) -> f64 {
    (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan().to_degrees()
}

/// Downslope direction in degrees counter-clockwise from east, in (0, 360].
/// Returns 0 for a flat cell.
pub(crate) fn aspect_deg(dz_dx: f64, dz_dy: f64) -> f64 {
    if (dz_dx * dz_dx + dz_dy * dz_dy).sqrt() < FLAT_GRADIENT_THRESHOLD {
        return 0.0;
    }
    let mut deg = (-dz_dy).atan2(-dz_dx).to_degrees();
    if deg <= 0.0 {
        deg += 360.0;
    }
    deg
}

/// Profile and tangential curvature at `(r, c)`.
fn curvatures(f: &Field, r: usize, c: usize) -> Option<(f64, f64)> {
    let [nw, n, ne, w, z, e, sw, s, se] = window(f, r, c)?;
    let (p, q) = horn_gradient(f, r, c)?;
    let cs2 = f.cellsize * f.cellsize;
    let rxx = (e - 2.0 * z + w) / cs2;
    let tyy = (n - 2.0 * z + s) / cs2;
    let sxy = ((ne - nw) - (se - sw)) / (4.0 * cs2);

    let g2 = p * p + q * q;
    if g2.sqrt() < FLAT_GRADIENT_THRESHOLD {
        return Some((0.0, 0.0));
    }
    let profile = -(p * p * rxx + 2.0 * p * q * sxy + q * q * tyy) / (g2 * (1.0 + g2).powf(1.5));
    let tangential = -(q * q * rxx - 2.0 * p * q * sxy + p * p * tyy) / (g2 * (1.0 + g2).sqrt());
    Some((profile, tangential))
}

pub(crate) fn compute_surface(elevation: &Field) -> SurfaceDerivatives {
    let (w, h, cs) = (elevation.width, elevation.height, elevation.cellsize);
    let mut slope = Field::null(w, h, cs);
    let mut aspect = Field::null(w, h, cs);
    let mut profile_curvature = Field::null(w, h, cs);
    let mut tangential_curvature = Field::null(w, h, cs);

    for r in 0..h {
        for c in 0..w {
            let Some((dz_dx, dz_dy)) = horn_gradient(elevation, r, c) else {
                continue;
            };
            slope.set(r, c, slope_deg(dz_dx, dz_dy));
            aspect.set(r, c, aspect_deg(dz_dx, dz_dy));
            if let Some((pc, tc)) = curvatures(elevation, r, c) {
                profile_curvature.set(r, c, pc);
                tangential_curvature.set(r, c, tc);
            }
        }
    }

    SurfaceDerivatives { slope, aspect, profile_curvature, tangential_curvature }
}

/// Horn partial derivatives of an arbitrary field, `(d/dx, d/dy)`.
pub(crate) fn compute_partials(field: &Field) -> (Field, Field) {
    let (w, h, cs) = (field.width, field.height, field.cellsize);
    let mut dx = Field::null(w, h, cs);
    let mut dy = Field::null(w, h, cs);
    for r in 0..h {
        for c in 0..w {
            if let Some((gx, gy)) = horn_gradient(field, r, c) {
                dx.set(r, c, gx);
                dy.set(r, c, gy);
            }
        }
    }
    (dx, dy)
}
