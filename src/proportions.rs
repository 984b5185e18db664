//! Violation frequency comparisons between two groups of inspections.

use crate::records::CoffeeshopRecord;
use serde::Serialize;
use statrs::function::erf::erfc;
use std::collections::HashSet;
use std::f64::consts::SQRT_2;

/// Significance level used for [`ProportionComparison::significant`].
pub const ALPHA: f64 = 0.05;

/// Counts rows whose violation equals `violation`.
///
/// Returns `(specific, total)` where `total` is the number of rows.
pub fn calculate_proportion(data: &[CoffeeshopRecord], violation: &str) -> (usize, usize) {
    let specific = data
        .iter()
        .filter(|r| r.violation_description == violation)
        .count();
    (specific, data.len())
}

/// Counts rows whose violation is any of `violations`.
pub fn calculate_combined_proportion<S: AsRef<str>>(
    data: &[CoffeeshopRecord],
    violations: &[S],
) -> (usize, usize) {
    let wanted: HashSet<&str> = violations.iter().map(|v| v.as_ref()).collect();
    let specific = data
        .iter()
        .filter(|r| wanted.contains(r.violation_description.as_str()))
        .count();
    (specific, data.len())
}

/// Two-sample z-test for equal proportions with a pooled estimate.
///
/// Returns `(z, p)` with a two-tailed p-value. Both are NaN when either
/// sample is empty or the pooled variance is zero.
pub fn z_test_proportions(count1: usize, nobs1: usize, count2: usize, nobs2: usize) -> (f64, f64) {
    let (c1, n1, c2, n2) = (count1 as f64, nobs1 as f64, count2 as f64, nobs2 as f64);

    let p1 = c1 / n1;
    let p2 = c2 / n2;
    let pooled = (c1 + c2) / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();

    let z = (p1 - p2) / se;
    if !z.is_finite() {
        return (f64::NAN, f64::NAN);
    }

    let pval = 2.0 * (1.0 - standard_normal_cdf(z.abs()));
    (z, pval)
}

/// Φ(x) for the standard normal distribution.
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Violation frequency in two groups and the z-test between them.
#[derive(Debug, Clone, Serialize)]
pub struct ProportionComparison {
    pub violations: Vec<String>,
    pub count_a: usize,
    pub total_a: usize,
    pub proportion_a: f64,
    pub count_b: usize,
    pub total_b: usize,
    pub proportion_b: f64,
    pub z: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Compares how often `violations` occur in `group_a` versus `group_b`.
///
/// A single label is matched exactly; several labels are combined.
pub fn compare_groups(
    group_a: &[CoffeeshopRecord],
    group_b: &[CoffeeshopRecord],
    violations: &[String],
) -> ProportionComparison {
    let count = |data: &[CoffeeshopRecord]| match violations {
        [single] => calculate_proportion(data, single),
        many => calculate_combined_proportion(data, many),
    };

    let (count_a, total_a) = count(group_a);
    let (count_b, total_b) = count(group_b);
    let (z, p_value) = z_test_proportions(count_a, total_a, count_b, total_b);

    ProportionComparison {
        violations: violations.to_vec(),
        count_a,
        total_a,
        proportion_a: count_a as f64 / total_a as f64,
        count_b,
        total_b,
        proportion_b: count_b as f64 / total_b as f64,
        z,
        p_value,
        significant: p_value < ALPHA,
    }
}
