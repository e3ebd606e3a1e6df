//! Summary statistics over metric samples.
//!
//! Every helper here treats an empty sample as "no data" rather than
//! producing NaN.

use std::cmp::Ordering;

/// Arithmetic mean, `None` for an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation, `None` for an empty sample.
pub fn pstdev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut values = values.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values
}

/// Empirical percentile with linear interpolation between closest ranks.
///
/// `pct` is a fraction in `0..=1`. The rank is `(n - 1) * pct`.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let values = sorted(values);
    let k = (values.len() - 1) as f64 * pct;
    let f = k.floor();
    let c = k.ceil();
    if f == c {
        return Some(values[k as usize]);
    }
    let d0 = values[f as usize] * (c - k);
    let d1 = values[c as usize] * (k - f);
    Some(d0 + d1)
}

/// Population skewness (third standardized moment).
pub fn skew(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let sd = pstdev(values)?;
    if sd == 0.0 {
        return None;
    }
    let n = values.len() as f64;
    Some(values.iter().map(|v| ((v - mean) / sd).powi(3)).sum::<f64>() / n)
}

/// Population excess kurtosis (fourth standardized moment minus 3).
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let sd = pstdev(values)?;
    if sd == 0.0 {
        return None;
    }
    let n = values.len() as f64;
    Some(values.iter().map(|v| ((v - mean) / sd).powi(4)).sum::<f64>() / n - 3.0)
}

/// Guarded ratio: `0` when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Mean, standard deviation and empirical 95% interval of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub mean: f64,
    pub stdev: f64,
    pub ci025: f64,
    pub ci975: f64,
}

impl Summary {
    pub const ZERO: Summary = Summary {
        mean: 0.0,
        stdev: 0.0,
        ci025: 0.0,
        ci975: 0.0,
    };

    /// Summarize a sample; an empty sample yields all zeros.
    pub fn of(values: &[f64]) -> Self {
        match (
            mean(values),
            pstdev(values),
            percentile(values, 0.025),
            percentile(values, 0.975),
        ) {
            (Some(mean), Some(stdev), Some(ci025), Some(ci975)) => Self {
                mean,
                stdev,
                ci025,
                ci975,
            },
            _ => Self::ZERO,
        }
    }

    /// Summarize the present values of an optional sample.
    pub fn of_present<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let values: Vec<f64> = values.into_iter().flatten().collect();
        Self::of(&values)
    }

    /// Scale every component, e.g. to present a ratio as a percentage.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            mean: self.mean * factor,
            stdev: self.stdev * factor,
            ci025: self.ci025 * factor,
            ci975: self.ci975 * factor,
        }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.mean, self.stdev, self.ci025, self.ci975)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_empty_is_zero() {
        assert_eq!(Summary::of(&[]), Summary::ZERO);
        assert_eq!(Summary::of_present(vec![None, None]), Summary::ZERO);
    }

    #[test]
    fn test_summary_constant() {
        let summary = Summary::of(&[4.5; 7]);
        assert_eq!(summary.as_tuple(), (4.5, 0.0, 4.5, 4.5));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.5), Some(2.5));
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 1.0), Some(4.0));
        // k = 3 * 0.975 = 2.925 -> 3*0.075 + 4*0.925
        let p = percentile(&values, 0.975).unwrap();
        assert!((p - 3.925).abs() < 1e-12);
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn test_pstdev_is_population() {
        let values = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let sd = pstdev(&values).unwrap();
        assert!((sd - 0.4330127).abs() < 1e-6);
    }

    #[test]
    fn test_skew_kurtosis_symmetric() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skew(&values).unwrap().abs() < 1e-12);
        assert!((kurtosis(&values).unwrap() - (-1.3)).abs() < 1e-12);
        assert_eq!(skew(&[2.0, 2.0]), None);
    }

    #[test]
    fn test_ratio_guards_zero() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(ratio(1.0, 4.0), 0.25);
    }
}
