//! Binomial concentration intervals and template fragmentation.

/// Adjusted (Agresti-Coull) binomial proportion with a 95% interval,
/// clamped to `[0, 1]`.
pub fn binomial_fit(x: f64, n: f64) -> (f64, f64, f64) {
    let p = (x + 2.0) / (n + 4.0);
    let s = (p * (1.0 - p) / n).sqrt();
    let low = (p - 1.96 * s).max(0.0);
    let high = (p + 1.96 * s).min(1.0);
    (p, low, high)
}

/// Poisson-corrected copies per droplet, with the 95% interval.
pub fn conc_conf_interval(x: f64, n: f64) -> (f64, f64, f64) {
    let (p, low, high) = binomial_fit(x, n);
    (-(1.0 - p).ln(), -(1.0 - low).ln(), -(1.0 - high).ln())
}

/// Ratio of the concentration of `x` (numerator) over `y` (denominator),
/// with a Fieller-style 95% interval. Bounds are NaN when the interval
/// is unbounded.
pub fn ratio_conf_interval(y: f64, x: f64, ny: f64, nx: f64) -> (f64, f64, f64) {
    let (cx, cxl, cxh) = conc_conf_interval(x, nx);
    let (cy, cyl, cyh) = conc_conf_interval(y, ny);
    let h_top = cxh - cx;
    let h_bottom = cx - cxl;
    let w_right = cyh - cy;
    let w_left = cy - cyl;

    let t1 = cx * cy;
    let r = cx / cy;

    let t2 = (h_bottom.powi(2) - cx.powi(2)) * (w_right.powi(2) - cy.powi(2));
    let t3 = cy.powi(2) - w_right.powi(2);
    let low = if t1 * t1 >= t2 {
        (t1 - (t1 * t1 - t2).sqrt()) / t3
    } else {
        f64::NAN
    };

    let t2 = (h_top.powi(2) - cx.powi(2)) * (w_left.powi(2) - cy.powi(2));
    let t3 = cy.powi(2) - w_left.powi(2);
    let high = if t1 * t1 >= t2 {
        (t1 + (t1 * t1 - t2).sqrt()) / t3
    } else {
        f64::NAN
    };

    (r, low, high)
}

/// Fragmentation probability with its 95% interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragmentation {
    pub probability: f64,
    pub low: f64,
    pub high: f64,
}

const GRID_STEPS: usize = 1000;

/// Probability that the FAM and VIC templates are unlinked, from 2D
/// cluster counts.
///
/// Fits the co-partitioned concentration by grid search, then compares
/// the chance of a half-template droplet against a whole one. Returns
/// `None` when the count matrix is rank deficient.
pub fn prob_of_frag(fampos_vicneg: usize, fampos_vicpos: usize, famneg_vicneg: usize, famneg_vicpos: usize) -> Option<Fragmentation> {
    let zero = |a: usize, b: usize| a == 0 && b == 0;
    if zero(fampos_vicneg, fampos_vicpos)
        || zero(fampos_vicneg, famneg_vicneg)
        || zero(fampos_vicpos, famneg_vicpos)
        || zero(famneg_vicneg, famneg_vicpos)
    {
        return None;
    }

    let h = [
        [fampos_vicneg as f64, fampos_vicpos as f64],
        [famneg_vicneg as f64, famneg_vicpos as f64],
    ];
    let n = h[0][0] + h[0][1] + h[1][0] + h[1][1];

    let p_a = (h[0][1] + h[1][1]) / n;
    let p_b = (h[0][0] + h[0][1]) / n;
    let c_a = -(1.0 - p_a).ln();
    let c_b = -(1.0 - p_b).ln();

    let max_val = c_a.min(c_b);
    let delta = max_val / GRID_STEPS as f64;

    let mut best = (f64::INFINITY, 0.0);
    for step in 0..GRID_STEPS {
        let c_ab = step as f64 * delta;
        let g_a = 1.0 - (-(c_a - c_ab)).exp();
        let g_b = 1.0 - (-(c_b - c_ab)).exp();
        let g_ab = 1.0 - (-c_ab).exp();

        let p10 = (1.0 - g_a) * (1.0 - g_b) * (1.0 - g_ab);
        let p11 = g_a * (1.0 - g_b) * (1.0 - g_ab);
        let p00 = (1.0 - g_a) * g_b * (1.0 - g_ab);
        let p01 = 1.0 - p10 - p11 - p00;

        let err = ((h[0][0] - p00 * n).powi(2)
            + (h[0][1] - p01 * n).powi(2)
            + (h[1][0] - p10 * n).powi(2)
            + (h[1][1] - p11 * n).powi(2))
        .sqrt();
        if err < best.0 {
            best = (err, c_ab);
        }
    }

    let est_ab = best.1;
    let est_a = c_a - est_ab;
    let est_b = c_b - est_ab;

    let g_ab = 1.0 - (-est_ab).exp();
    let a_half = 1.0 - (-est_a * 0.5).exp();
    let b_half = 1.0 - (-est_b * 0.5).exp();
    let px = a_half + b_half - a_half * b_half;
    let py = g_ab + a_half + b_half - g_ab * a_half - g_ab * b_half - a_half * b_half
        + g_ab * a_half * b_half;

    let (r, low, high) = ratio_conf_interval(py * n, px * n, n, n);
    Some(Fragmentation {
        probability: r,
        low: low.max(0.0),
        high: high.min(1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial_fit_clamps() {
        let (p, low, high) = binomial_fit(0.0, 10.0);
        assert!((p - 2.0 / 14.0).abs() < 1e-12);
        assert_eq!(low, 0.0);
        assert!(high > p);
    }

    #[test]
    fn test_ratio_of_equal_counts_is_one() {
        let (r, low, high) = ratio_conf_interval(500.0, 500.0, 10000.0, 10000.0);
        assert!((r - 1.0).abs() < 1e-12);
        assert!(low < 1.0 && high > 1.0);
    }

    #[test]
    fn test_prob_of_frag_rank_deficient() {
        assert_eq!(prob_of_frag(0, 0, 100, 100), None);
        assert_eq!(prob_of_frag(10, 10, 0, 0), None);
    }

    #[test]
    fn test_prob_of_frag_in_unit_interval() {
        let frag = prob_of_frag(900, 100, 8100, 900).unwrap();
        assert!(frag.probability > 0.0);
        assert!(frag.low >= 0.0);
        assert!(frag.high <= 1.0);
    }
}
