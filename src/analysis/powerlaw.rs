//! Power-law fitting of degree distributions.
//!
//! Continuous maximum-likelihood estimator for the exponent, with the lower
//! cutoff chosen by minimizing the Kolmogorov-Smirnov distance between the
//! tail and the model. Zero degrees are excluded: a power law is undefined
//! there.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::error::AnalysisError;

use super::types::{Distribution, DistributionComparison, FitOutcome, PowerLawFit};

/// Family pairs reported with every fit
const COMPARED_PAIRS: [(Distribution, Distribution); 3] = [
    (Distribution::PowerLaw, Distribution::Exponential),
    (Distribution::PowerLaw, Distribution::LogNormal),
    (Distribution::Exponential, Distribution::LogNormal),
];

/// Fit a degree-frequency table (degree value -> node count)
pub fn fit_frequency_table(frequency: &BTreeMap<u64, usize>) -> Result<PowerLawFit, AnalysisError> {
    fit_power_law(&expand(frequency))
}

/// Fit a power law to the positive entries of `values`.
///
/// Fails with [`AnalysisError::InsufficientData`] when fewer than two
/// distinct positive values are present.
pub fn fit_power_law(values: &[f64]) -> Result<PowerLawFit, AnalysisError> {
    match fit_outcome(values) {
        FitOutcome::Fitted(fit) => Ok(fit),
        FitOutcome::Insufficient { distinct } => Err(AnalysisError::InsufficientData { distinct }),
    }
}

/// [`fit_frequency_table`] with a too-small spectrum reported as an outcome
pub fn fit_frequency_outcome(frequency: &BTreeMap<u64, usize>) -> FitOutcome {
    fit_outcome(&expand(frequency))
}

/// One value per node
fn expand(frequency: &BTreeMap<u64, usize>) -> Vec<f64> {
    frequency
        .iter()
        .flat_map(|(&degree, &count)| std::iter::repeat(degree as f64).take(count))
        .collect()
}

fn fit_outcome(values: &[f64]) -> FitOutcome {
    let mut data: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut distinct = data.clone();
    distinct.dedup();
    if distinct.len() < 2 {
        return FitOutcome::Insufficient {
            distinct: distinct.len(),
        };
    }

    // The largest value cannot be a cutoff: its tail has a single distinct value.
    let mut best: Option<(f64, f64, f64)> = None; // (ks, xmin, alpha)
    for &xmin in &distinct[..distinct.len() - 1] {
        let tail = tail_from(&data, xmin);
        let alpha = estimate_alpha(tail, xmin);
        let ks = ks_distance(tail, xmin, alpha);

        let improves = match best {
            Some((best_ks, _, _)) => ks < best_ks,
            None => true,
        };
        if improves {
            best = Some((ks, xmin, alpha));
        }
    }

    let Some((ks_distance, xmin, alpha)) = best else {
        return FitOutcome::Insufficient {
            distinct: distinct.len(),
        };
    };
    let tail = tail_from(&data, xmin);
    let tail_size = tail.len();

    let comparisons = COMPARED_PAIRS
        .iter()
        .map(|&(first, second)| compare(tail, xmin, alpha, first, second))
        .collect();

    FitOutcome::Fitted(PowerLawFit {
        alpha,
        xmin,
        sigma: (alpha - 1.0) / (tail_size as f64).sqrt(),
        ks_distance,
        tail_size,
        sample_size: data.len(),
        comparisons,
    })
}

/// Sorted suffix of `data` at or above `xmin`
fn tail_from(data: &[f64], xmin: f64) -> &[f64] {
    let start = data.partition_point(|&v| v < xmin);
    &data[start..]
}

fn estimate_alpha(tail: &[f64], xmin: f64) -> f64 {
    let log_sum: f64 = tail.iter().map(|&x| (x / xmin).ln()).sum();
    1.0 + tail.len() as f64 / log_sum
}

/// KS distance between the sorted tail and the fitted power-law CDF
fn ks_distance(tail: &[f64], xmin: f64, alpha: f64) -> f64 {
    let n = tail.len() as f64;
    let mut max_distance: f64 = 0.0;
    let mut i = 0;

    while i < tail.len() {
        let x = tail[i];
        let below = i as f64 / n;
        // Step over ties so the empirical CDF jumps once per distinct value
        while i < tail.len() && tail[i] == x {
            i += 1;
        }
        let at_or_below = i as f64 / n;
        let model = 1.0 - (x / xmin).powf(1.0 - alpha);

        max_distance = max_distance
            .max((at_or_below - model).abs())
            .max((below - model).abs());
    }

    max_distance
}

/// Per-observation log-likelihoods of the tail under each family
struct TailModels {
    alpha: f64,
    xmin: f64,
    lambda: f64,
    mu: f64,
    sigma: f64,
    lognormal_norm: f64,
}

impl TailModels {
    fn fit(tail: &[f64], xmin: f64, alpha: f64) -> Self {
        let n = tail.len() as f64;
        let mean = tail.iter().sum::<f64>() / n;

        let logs: Vec<f64> = tail.iter().map(|x| x.ln()).collect();
        let mu = logs.iter().sum::<f64>() / n;
        let sigma = (logs.iter().map(|l| (l - mu).powi(2)).sum::<f64>() / n).sqrt();

        // Probability mass of the untruncated log-normal above xmin
        let lognormal_norm = 0.5 * erfc((xmin.ln() - mu) / (sigma * 2f64.sqrt()));

        Self {
            alpha,
            xmin,
            lambda: 1.0 / (mean - xmin),
            mu,
            sigma,
            lognormal_norm,
        }
    }

    fn log_likelihood(&self, family: Distribution, x: f64) -> f64 {
        match family {
            Distribution::PowerLaw => {
                (self.alpha - 1.0).ln() - self.xmin.ln() - self.alpha * (x / self.xmin).ln()
            }
            Distribution::Exponential => self.lambda.ln() - self.lambda * (x - self.xmin),
            Distribution::LogNormal => {
                let z = (x.ln() - self.mu) / self.sigma;
                -x.ln() - self.sigma.ln() - 0.5 * (2.0 * PI).ln() - 0.5 * z * z
                    - self.lognormal_norm.ln()
            }
        }
    }
}

/// Normalized log-likelihood ratio test of `first` against `second` on the tail
fn compare(
    tail: &[f64],
    xmin: f64,
    alpha: f64,
    first: Distribution,
    second: Distribution,
) -> DistributionComparison {
    let models = TailModels::fit(tail, xmin, alpha);
    let diffs: Vec<f64> = tail
        .iter()
        .map(|&x| models.log_likelihood(first, x) - models.log_likelihood(second, x))
        .collect();

    let n = diffs.len() as f64;
    let total: f64 = diffs.iter().sum();
    let mean = total / n;
    let std_dev = (diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();

    let (ratio, p_value) = if std_dev > 0.0 && std_dev.is_finite() {
        (
            total / (std_dev * n.sqrt()),
            erfc(total.abs() / (std_dev * (2.0 * n).sqrt())),
        )
    } else if total == 0.0 {
        (0.0, 1.0)
    } else {
        // Constant nonzero difference: every observation agrees
        (total, 0.0)
    };

    DistributionComparison {
        first,
        second,
        ratio,
        p_value,
    }
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7)
pub(crate) fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let result = t * poly.exp();

    if x >= 0.0 {
        result
    } else {
        2.0 - result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exact quantiles of a continuous power law
    fn power_law_sample(alpha: f64, xmin: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let u = (i as f64 + 0.5) / n as f64;
                xmin * (1.0 - u).powf(-1.0 / (alpha - 1.0))
            })
            .collect()
    }

    #[test]
    fn test_erfc_reference_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
        assert!((erfc(1.0) - 0.157_299_207).abs() < 1e-6);
        assert!((erfc(-1.0) - 1.842_700_793).abs() < 1e-6);
        assert!(erfc(6.0) < 1e-12);
    }

    #[test]
    fn test_recovers_known_exponent() {
        let sample = power_law_sample(2.5, 1.0, 2000);
        let fit = fit_power_law(&sample).unwrap();

        assert!((fit.alpha - 2.5).abs() < 0.15, "alpha was {}", fit.alpha);
        assert!(fit.sigma > 0.0);
        assert!(fit.ks_distance < 0.1);
        assert_eq!(fit.sample_size, 2000);
    }

    #[test]
    fn test_power_law_beats_exponential_on_heavy_tail() {
        let sample = power_law_sample(2.5, 1.0, 2000);
        let fit = fit_power_law(&sample).unwrap();

        let comparison = fit
            .comparison(Distribution::PowerLaw, Distribution::Exponential)
            .unwrap();
        assert!(comparison.ratio > 0.0);
        assert!(comparison.p_value < 0.05);
        assert_eq!(comparison.preferred(0.1), Some(Distribution::PowerLaw));

        // Reversed lookup flips the sign
        let reversed = fit
            .comparison(Distribution::Exponential, Distribution::PowerLaw)
            .unwrap();
        assert_eq!(reversed.ratio, -comparison.ratio);
    }

    #[test]
    fn test_all_comparisons_reported() {
        let sample = power_law_sample(2.2, 1.0, 500);
        let fit = fit_power_law(&sample).unwrap();

        assert_eq!(fit.comparisons.len(), 3);
        for comparison in &fit.comparisons {
            assert!(comparison.ratio.is_finite());
            assert!((0.0..=1.0).contains(&comparison.p_value));
        }
    }

    #[test]
    fn test_zero_degrees_are_excluded() {
        let mut frequency = BTreeMap::new();
        frequency.insert(0, 10);
        frequency.insert(1, 3);
        frequency.insert(2, 1);

        let fit = fit_frequency_table(&frequency).unwrap();
        assert_eq!(fit.sample_size, 4);
        assert_eq!(fit.xmin, 1.0);
        assert_eq!(fit.tail_size, 4);
        assert!(fit.alpha > 1.0);
    }

    #[test]
    fn test_insufficient_data() {
        let mut frequency = BTreeMap::new();
        frequency.insert(0, 5);
        frequency.insert(3, 4);

        assert_eq!(
            fit_frequency_table(&frequency).unwrap_err(),
            AnalysisError::InsufficientData { distinct: 1 }
        );
        assert_eq!(
            fit_power_law(&[]).unwrap_err(),
            AnalysisError::InsufficientData { distinct: 0 }
        );
    }

    #[test]
    fn test_outcome_reports_distinct_count() {
        let mut frequency = BTreeMap::new();
        frequency.insert(0, 5);
        frequency.insert(3, 4);
        assert_eq!(
            fit_frequency_outcome(&frequency),
            FitOutcome::Insufficient { distinct: 1 }
        );

        frequency.insert(7, 1);
        let outcome = fit_frequency_outcome(&frequency);
        assert_eq!(outcome.fit().unwrap(), &fit_frequency_table(&frequency).unwrap());
    }
}
