//! Offline comparison of ranking strategies on synthetic candidate sets.
//!
//! Each case draws candidates from a seeded generator with a hidden
//! quality score, ranks them with every strategy and reports the
//! performance bundle alongside the rank agreement with the hidden utility.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::problem::{Candidate, MetricSelection, Objective};
use crate::scoring::PerformanceMetrics;
use crate::strategy::{Ranker, RankingConfig, RankingStrategy};

// =============================================================================
// Synthetic case definitions
// =============================================================================

/// How metric values relate to the hidden quality of a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaseShape {
    /// Every metric drawn independently.
    Independent,
    /// Every metric tracks quality, plus gaussian noise.
    Correlated { noise_sigma: f64 },
    /// First metric tracks quality, all others its complement: a single front.
    TradeOff,
}

#[derive(Debug, Clone)]
pub struct SyntheticCase {
    pub name: &'static str,
    pub candidates: usize,
    pub metrics: Vec<MetricSelection>,
    pub shape: CaseShape,
    /// Probability that a candidate copies the previous candidate's values.
    pub duplicate_rate: f64,
    /// Probability that a candidate misses one selected metric.
    pub missing_rate: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub case_name: String,
    pub strategy_id: String,
    /// Kendall tau-b between strict ranks and hidden utility over complete candidates.
    pub kendall_tau: f64,
    pub ranked: usize,
    pub incomplete: usize,
    pub metrics: PerformanceMetrics,
}

// =============================================================================
// Public API
// =============================================================================

pub fn synthetic_cases() -> Vec<SyntheticCase> {
    vec![
        SyntheticCase {
            name: "independent_3d_40",
            candidates: 40,
            metrics: vec![
                MetricSelection::new("coverage", Objective::Maximize, 0.5, 1),
                MetricSelection::new("complexity", Objective::Minimize, 0.3, 1),
                MetricSelection::new("loc", Objective::Minimize, 0.2, 1),
            ],
            shape: CaseShape::Independent,
            duplicate_rate: 0.0,
            missing_rate: 0.0,
            seed: 42,
        },
        SyntheticCase {
            name: "correlated_prioritized_30",
            candidates: 30,
            metrics: vec![
                MetricSelection::new("coverage", Objective::Maximize, 0.4, 2),
                MetricSelection::new("mutation_score", Objective::Maximize, 0.4, 2),
                MetricSelection::new("complexity", Objective::Minimize, 0.2, 1),
            ],
            shape: CaseShape::Correlated { noise_sigma: 0.05 },
            duplicate_rate: 0.0,
            missing_rate: 0.0,
            seed: 43,
        },
        SyntheticCase {
            name: "trade_off_front_20",
            candidates: 20,
            metrics: vec![
                MetricSelection::new("throughput", Objective::Maximize, 0.5, 1),
                MetricSelection::new("latency", Objective::Maximize, 0.5, 1),
            ],
            shape: CaseShape::TradeOff,
            duplicate_rate: 0.0,
            missing_rate: 0.0,
            seed: 44,
        },
        SyntheticCase {
            name: "duplicates_and_gaps_25",
            candidates: 25,
            metrics: vec![
                MetricSelection::new("coverage", Objective::Maximize, 0.6, 2),
                MetricSelection::new("loc", Objective::Minimize, 0.4, 1),
            ],
            shape: CaseShape::Correlated { noise_sigma: 0.1 },
            duplicate_rate: 0.3,
            missing_rate: 0.2,
            seed: 45,
        },
    ]
}

pub fn run_synthetic_suite(filter: Option<&str>) -> Result<Vec<EvaluationResult>> {
    let cases = synthetic_cases();
    let selected: Vec<SyntheticCase> = match filter {
        Some(name) => cases.into_iter().filter(|c| c.name == name).collect(),
        None => cases,
    };

    let mut results = Vec::new();
    for case in &selected {
        results.extend(run_synthetic_case(case)?);
    }
    Ok(results)
}

/// Rank one case with every strategy.
pub fn run_synthetic_case(case: &SyntheticCase) -> Result<Vec<EvaluationResult>> {
    let (candidates, utilities) = generate_candidates(case);
    let ranker = Ranker::new(RankingConfig {
        measure_performance: true,
        ..RankingConfig::default()
    });

    RankingStrategy::ALL
        .into_iter()
        .map(|strategy| -> Result<EvaluationResult> {
            let ranking = ranker.rank(strategy, &case.metrics, candidates.clone())?;

            let mut predicted = Vec::new();
            let mut truth = Vec::new();
            let mut incomplete = 0usize;
            for candidate in &ranking.candidates {
                let idx = candidate_index(&candidate.id);
                match idx.and_then(|i| utilities.get(i).copied().flatten()) {
                    Some(utility) => {
                        let rank = candidate.rank(strategy.id(), false).unwrap_or(usize::MAX);
                        predicted.push(-(rank as f64));
                        truth.push(utility);
                    }
                    None => incomplete += 1,
                }
            }

            let kendall_tau = kendall_tau_b(&predicted, &truth);
            debug!(case = case.name, strategy = %strategy, kendall_tau, "Evaluated strategy");

            Ok(EvaluationResult {
                case_name: case.name.to_string(),
                strategy_id: strategy.id().to_string(),
                kendall_tau,
                ranked: predicted.len(),
                incomplete,
                metrics: ranking.performance.unwrap_or_default(),
            })
        })
        .collect()
}

// =============================================================================
// Generation
// =============================================================================

fn candidate_id(i: usize) -> String {
    format!("cand_{i}")
}

fn candidate_index(id: &str) -> Option<usize> {
    id.strip_prefix("cand_")?.parse().ok()
}

/// Candidates plus the hidden utility of each complete one.
fn generate_candidates(case: &SyntheticCase) -> (Vec<Candidate>, Vec<Option<f64>>) {
    let mut rng = StdRng::seed_from_u64(case.seed);
    let mut candidates: Vec<Candidate> = Vec::with_capacity(case.candidates);

    for i in 0..case.candidates {
        let mut candidate = Candidate::new(candidate_id(i));

        let copy_previous = i > 0 && rng.gen_bool(case.duplicate_rate.clamp(0.0, 1.0));
        match candidates.last() {
            Some(previous) if copy_previous => candidate.metrics = previous.metrics.clone(),
            _ => {
                let quality: f64 = rng.gen_range(0.0..1.0);
                for (dim, metric) in case.metrics.iter().enumerate() {
                    let value = metric_value(&mut rng, case.shape, dim, metric.objective, quality);
                    candidate.metrics.insert(metric.id.clone(), value);
                }
            }
        }

        if !case.metrics.is_empty() && rng.gen_bool(case.missing_rate.clamp(0.0, 1.0)) {
            let dim = rng.gen_range(0..case.metrics.len());
            candidate.metrics.remove(&case.metrics[dim].id);
        }

        candidates.push(candidate);
    }

    let utilities = candidates
        .iter()
        .map(|candidate| utility(&case.metrics, candidate))
        .collect();
    (candidates, utilities)
}

fn metric_value(
    rng: &mut impl Rng,
    shape: CaseShape,
    dim: usize,
    objective: Objective,
    quality: f64,
) -> f64 {
    let oriented = |good: f64| match objective {
        Objective::Maximize => good,
        Objective::Minimize => 1.0 - good,
    };

    match shape {
        CaseShape::Independent => rng.gen_range(0.0..1.0),
        CaseShape::Correlated { noise_sigma } => {
            oriented(quality + sample_normal(rng, 0.0, noise_sigma))
        }
        CaseShape::TradeOff => {
            let good = if dim == 0 { quality } else { 1.0 - quality };
            oriented(good)
        }
    }
}

/// Weighted utility of the raw values, larger is better; `None` when incomplete.
fn utility(metrics: &[MetricSelection], candidate: &Candidate) -> Option<f64> {
    metrics.iter().try_fold(0.0, |acc, metric| {
        let value = candidate.measure(&metric.id)?;
        let oriented = match metric.objective {
            Objective::Maximize => value,
            Objective::Minimize => -value,
        };
        Some(acc + metric.weight * oriented)
    })
}

fn sample_normal(rng: &mut impl Rng, mean: f64, std: f64) -> f64 {
    if std <= 0.0 {
        return mean;
    }
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + z0 * std
}

fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n != y.len() || n < 2 {
        return 0.0;
    }

    let mut concordant = 0f64;
    let mut discordant = 0f64;
    let mut ties_x = 0f64;
    let mut ties_y = 0f64;

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];

            if dx == 0.0 && dy == 0.0 {
                continue;
            } else if dx == 0.0 {
                ties_x += 1.0;
            } else if dy == 0.0 {
                ties_y += 1.0;
            } else if (dx > 0.0) == (dy > 0.0) {
                concordant += 1.0;
            } else {
                discordant += 1.0;
            }
        }
    }

    let denom = ((concordant + discordant + ties_x) * (concordant + discordant + ties_y)).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (concordant - discordant) / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let case = &synthetic_cases()[3];
        let (a, ua) = generate_candidates(case);
        let (b, ub) = generate_candidates(case);
        assert_eq!(a, b);
        assert_eq!(ua, ub);
        assert_eq!(a.len(), case.candidates);
    }

    #[test]
    fn trade_off_case_is_a_single_front() {
        let case = synthetic_cases()
            .into_iter()
            .find(|c| c.name == "trade_off_front_20")
            .unwrap();
        let results = run_synthetic_case(&case).unwrap();
        let nds = results.iter().find(|r| r.strategy_id == "NDS_SMOOP").unwrap();
        assert_eq!(nds.metrics.get("nds_size"), Some(1.0));
    }

    #[test]
    fn kendall_tau_b_bounds() {
        assert_eq!(kendall_tau_b(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]), 1.0);
        assert_eq!(kendall_tau_b(&[1.0, 2.0, 3.0], &[30.0, 20.0, 10.0]), -1.0);
        assert_eq!(kendall_tau_b(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn candidate_ids_parse_back() {
        assert_eq!(candidate_index(&candidate_id(17)), Some(17));
        assert_eq!(candidate_index("other"), None);
    }
}
