//! Poisson model for a predicted total, plus a Monte Carlo cross-check.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

pub const DEFAULT_ITERATIONS: usize = 10_000;
pub const DEFAULT_MAX_GOALS: u32 = 10;

/// Knuth's loop underflows `exp(-lambda)` for large means, so bigger means are
/// drawn as a sum of chunks no larger than this.
const KNUTH_CHUNK: f64 = 30.0;

fn sanitize(lambda: f64) -> f64 {
    if lambda.is_finite() { lambda.max(0.0) } else { 0.0 }
}

fn ln_factorial(k: u32) -> f64 {
    (2..=k).map(|i| (i as f64).ln()).sum()
}

/// P(X = k) for X ~ Poisson(lambda). A non-positive mean puts all mass on 0.
pub fn poisson_pmf(k: u32, lambda: f64) -> f64 {
    let lambda = sanitize(lambda);
    if lambda == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    (k as f64 * lambda.ln() - lambda - ln_factorial(k)).exp()
}

/// P(X <= k).
pub fn poisson_cdf(k: u32, lambda: f64) -> f64 {
    (0..=k).map(|i| poisson_pmf(i, lambda)).sum::<f64>().min(1.0)
}

/// P(X > threshold). For a half-integer line such as 8.5 this sums the mass
/// up to 8 and takes the complement.
pub fn poisson_over(threshold: f64, lambda: f64) -> f64 {
    if threshold.is_nan() || threshold < 0.0 {
        return 1.0;
    }
    let k = threshold.floor().min(u32::MAX as f64) as u32;
    (1.0 - poisson_cdf(k, lambda)).clamp(0.0, 1.0)
}

pub fn poisson_under(threshold: f64, lambda: f64) -> f64 {
    if threshold.is_nan() || threshold <= 0.0 {
        return 0.0;
    }
    let k = (threshold.ceil() - 1.0).min(u32::MAX as f64) as u32;
    poisson_cdf(k, lambda)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityRow {
    pub k: u32,
    pub pmf: f64,
    pub cdf: f64,
    /// P(X > k).
    pub over: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityTable {
    pub lambda: f64,
    pub rows: Vec<ProbabilityRow>,
}

impl ProbabilityTable {
    pub fn row(&self, k: u32) -> Option<&ProbabilityRow> {
        self.rows.get(k as usize)
    }
}

/// Large enough that the mass beyond it is negligible for display.
pub fn default_upper_bound(lambda: f64) -> u32 {
    let lambda = sanitize(lambda);
    let tail = (lambda + 6.0 * lambda.sqrt()).ceil() as u32;
    tail.max(20)
}

pub fn probability_table(lambda: f64, max_k: u32) -> ProbabilityTable {
    let mut rows = Vec::with_capacity(max_k as usize + 1);
    let mut cdf = 0.0;
    for k in 0..=max_k {
        let pmf = poisson_pmf(k, lambda);
        cdf = (cdf + pmf).min(1.0);
        rows.push(ProbabilityRow {
            k,
            pmf,
            cdf,
            over: (1.0 - cdf).max(0.0),
        });
    }
    ProbabilityTable {
        lambda: sanitize(lambda),
        rows,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

fn truncated_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let mut out: Vec<f64> = (0..=max_k).map(|k| poisson_pmf(k, lambda)).collect();
    let sum: f64 = out.iter().sum();
    if sum < 1.0 {
        out[max_k as usize] += 1.0 - sum;
    }
    out
}

/// 1X2 probabilities for two independent Poisson sides.
pub fn outcome_probs(lambda_home: f64, lambda_away: f64, max_goals: u32) -> OutcomeProbs {
    let pmf_h = truncated_pmf(lambda_home, max_goals);
    let pmf_a = truncated_pmf(lambda_away, max_goals);

    let mut home = 0.0;
    let mut draw = 0.0;
    let mut away = 0.0;
    for (i, p_i) in pmf_h.iter().enumerate() {
        for (j, p_j) in pmf_a.iter().enumerate() {
            let p = p_i * p_j;
            if i > j {
                home += p;
            } else if i < j {
                away += p;
            } else {
                draw += p;
            }
        }
    }

    let sum = home + draw + away;
    if sum > 0.0 {
        OutcomeProbs {
            home: home / sum,
            draw: draw / sum,
            away: away / sum,
        }
    } else {
        OutcomeProbs {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }
}

/// One Poisson draw using Knuth's multiplication loop.
pub fn sample_poisson<R: Rng>(lambda: f64, rng: &mut R) -> u32 {
    let mut remaining = sanitize(lambda);
    let mut total = 0;
    while remaining > 0.0 {
        let chunk = remaining.min(KNUTH_CHUNK);
        remaining -= chunk;
        let limit = (-chunk).exp();
        let mut p = 1.0f64;
        let mut k = 0;
        loop {
            p *= rng.gen_range(0.0f64..1.0);
            if p <= limit {
                break;
            }
            k += 1;
        }
        total += k;
    }
    total
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub iterations: usize,
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub mean_home: f64,
    pub mean_away: f64,
    pub mean_total: f64,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    /// `histogram[t]` is how many iterations produced total `t`.
    pub histogram: Vec<usize>,
}

impl SimulationSummary {
    /// Empirical P(total > threshold).
    pub fn prob_over(&self, threshold: f64) -> f64 {
        self.fraction(|t| t > threshold)
    }

    /// Empirical P(total < threshold).
    pub fn prob_under(&self, threshold: f64) -> f64 {
        self.fraction(|t| t < threshold)
    }

    fn fraction(&self, keep: impl Fn(f64) -> bool) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        let hits: usize = self
            .histogram
            .iter()
            .enumerate()
            .filter(|(t, _)| keep(*t as f64))
            .map(|(_, n)| n)
            .sum();
        hits as f64 / self.iterations as f64
    }
}

/// Simulates `iterations` matches with independent Poisson sides drawn from
/// `rng`.
pub fn simulate<R: Rng>(
    lambda_home: f64,
    lambda_away: f64,
    iterations: usize,
    rng: &mut R,
) -> SimulationSummary {
    let mut histogram: Vec<usize> = Vec::new();
    let mut sum_home = 0u64;
    let mut sum_away = 0u64;
    let mut wins = [0usize; 3];

    for _ in 0..iterations {
        let h = sample_poisson(lambda_home, rng);
        let a = sample_poisson(lambda_away, rng);
        sum_home += h as u64;
        sum_away += a as u64;
        let idx = match h.cmp(&a) {
            std::cmp::Ordering::Greater => 0,
            std::cmp::Ordering::Equal => 1,
            std::cmp::Ordering::Less => 2,
        };
        wins[idx] += 1;

        let total = (h + a) as usize;
        if histogram.len() <= total {
            histogram.resize(total + 1, 0);
        }
        histogram[total] += 1;
    }

    let per_iter = |n: f64| if iterations > 0 { n / iterations as f64 } else { 0.0 };
    let mean_home = per_iter(sum_home as f64);
    let mean_away = per_iter(sum_away as f64);
    SimulationSummary {
        iterations,
        lambda_home: sanitize(lambda_home),
        lambda_away: sanitize(lambda_away),
        mean_home,
        mean_away,
        mean_total: mean_home + mean_away,
        home_win: per_iter(wins[0] as f64),
        draw: per_iter(wins[1] as f64),
        away_win: per_iter(wins[2] as f64),
        histogram,
    }
}

/// Seeded when `seed` is given, otherwise drawn from OS entropy.
pub fn monte_carlo(
    lambda_home: f64,
    lambda_away: f64,
    iterations: usize,
    seed: Option<u64>,
) -> SimulationSummary {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    simulate(lambda_home, lambda_away, iterations, &mut rng)
}
