use serde::Serialize;
use std::collections::BTreeMap;

/// Fixed quantile probabilities reported over `total_comp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Percentile {
    P50,
    P75,
    P90,
    P95,
    P99,
}

impl Percentile {
    pub fn probability(&self) -> f64 {
        match self {
            Percentile::P50 => 0.50,
            Percentile::P75 => 0.75,
            Percentile::P90 => 0.90,
            Percentile::P95 => 0.95,
            Percentile::P99 => 0.99,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Percentile::P50 => "p50",
            Percentile::P75 => "p75",
            Percentile::P90 => "p90",
            Percentile::P95 => "p95",
            Percentile::P99 => "p99",
        }
    }
}

pub const YEAR_SUMMARY_PERCENTILES: &[Percentile] = &[
    Percentile::P50,
    Percentile::P75,
    Percentile::P90,
    Percentile::P95,
    Percentile::P99,
];
pub const EMPLOYER_PERCENTILES: &[Percentile] =
    &[Percentile::P50, Percentile::P75, Percentile::P90, Percentile::P99];
pub const JOB_PERCENTILES: &[Percentile] = &[Percentile::P50, Percentile::P75, Percentile::P90];

/// Quantile of already-sorted values with linear interpolation between the
/// two nearest ranks. `NaN` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn quantile(values: &[f64], q: f64) -> f64 {
    quantile_sorted(&sorted_copy(values), q)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of the non-NaN values; `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        None
    } else {
        Some(quantile(&present, 0.5))
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Headcount, mean and a percentile set over one group's `total_comp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub headcount: usize,
    pub mean_pay: f64,
    #[serde(flatten)]
    pub percentiles: BTreeMap<&'static str, f64>,
}

impl Distribution {
    pub fn compute(values: &[f64], percentiles: &[Percentile]) -> Self {
        let sorted = sorted_copy(values);
        Self {
            headcount: values.len(),
            mean_pay: mean(values),
            percentiles: percentiles
                .iter()
                .map(|p| (p.label(), quantile_sorted(&sorted, p.probability())))
                .collect(),
        }
    }

    pub fn percentile(&self, p: Percentile) -> Option<f64> {
        self.percentiles.get(p.label()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.5), 2.5);
        assert_eq!(quantile(&values, 0.75), 3.25);
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
        assert_eq!(quantile(&[7.0], 0.99), 7.0);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_quantile_ignores_input_order() {
        assert_eq!(quantile(&[40.0, 10.0, 30.0, 20.0, 50.0], 0.9), 46.0);
    }

    #[test]
    fn test_median_skips_nan() {
        assert_eq!(median(&[f64::NAN, 3.0, 1.0]), Some(2.0));
        assert_eq!(median(&[f64::NAN]), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_distribution_selects_percentile_subset() {
        let d = Distribution::compute(&[100.0, 200.0, 300.0], JOB_PERCENTILES);
        assert_eq!(d.headcount, 3);
        assert_eq!(d.mean_pay, 200.0);
        assert_eq!(d.percentile(Percentile::P50), Some(200.0));
        assert_eq!(d.percentile(Percentile::P99), None);

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["p75"], 250.0);
        assert_eq!(json["headcount"], 3);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1234.5678, 2), 1234.57);
        assert_eq!(round_to(0.123456, 4), 0.1235);
    }
}
