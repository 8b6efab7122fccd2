//! Property-based tests for sorting, normalization and candidate scoring.

use proptest::prelude::*;

use smoop::dominance::dominates;
use smoop::{
    non_dominated_sorting, normalize, Candidate, MetricSelection, Objective, Point, Problem,
    Ranker, RankingConfig, RankingStrategy,
};

// ── Strategies ────────────────────────────────────────────────────────

fn arb_objective() -> impl Strategy<Value = Objective> {
    prop_oneof![Just(Objective::Minimize), Just(Objective::Maximize)]
}

/// Small integer grid so ties and duplicates are common.
fn arb_points(dims: usize, max_len: usize) -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(
        prop::collection::vec((0u8..5).prop_map(f64::from), dims).prop_map(Point),
        0..=max_len,
    )
}

fn arb_problem() -> impl Strategy<Value = Problem> {
    (1usize..=3).prop_flat_map(|dims| {
        (
            prop::collection::vec(arb_objective(), dims),
            arb_points(dims, 24),
        )
            .prop_map(|(objectives, points)| Problem::new(objectives, points))
    })
}

/// Two weighted metrics and complete candidates over them.
fn arb_ranking_input() -> impl Strategy<Value = (Vec<MetricSelection>, Vec<Candidate>)> {
    (
        arb_objective(),
        arb_objective(),
        1i64..=2,
        arb_points(2, 16).prop_filter("non-empty", |points| !points.is_empty()),
    )
        .prop_map(|(o1, o2, priority, points)| {
            let selection = vec![
                MetricSelection::new("m1", o1, 0.5, priority),
                MetricSelection::new("m2", o2, 0.5, 1),
            ];
            let candidates = points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    Candidate::new(format!("c{i}"))
                        .with_metric("m1", p.values()[0])
                        .with_metric("m2", p.values()[1])
                })
                .collect();
            (selection, candidates)
        })
}

fn measuring_ranker() -> Ranker {
    Ranker::new(RankingConfig {
        measure_performance: true,
        relevance_top_n: 5,
        ..RankingConfig::default()
    })
}

// ── Sorting ───────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fronts_cover_every_point_once(problem in arb_problem()) {
        let fronts = non_dominated_sorting(&problem, None);
        let total: usize = fronts.iter().map(Vec::len).sum();
        prop_assert_eq!(total, problem.points.len());
        prop_assert!(fronts.iter().all(|front| !front.is_empty()));
    }

    #[test]
    fn fronts_are_pure_and_ordered(problem in arb_problem()) {
        let fronts = non_dominated_sorting(&problem, None);
        let objectives = &problem.objectives;

        for front in &fronts {
            for a in front {
                for b in front {
                    prop_assert!(!dominates(objectives, a, b, None));
                }
            }
        }

        for pair in fronts.windows(2) {
            for point in &pair[1] {
                prop_assert!(pair[0].iter().any(|better| dominates(objectives, better, point, None)));
            }
        }
    }

    #[test]
    fn normalized_values_stay_in_unit_interval(problem in arb_problem()) {
        for point in normalize(&problem.points, None) {
            prop_assert!(point.values().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
}

// ── Ranking ───────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn strict_ranks_are_a_permutation((selection, candidates) in arb_ranking_input()) {
        let n = candidates.len();
        for strategy in RankingStrategy::ALL {
            let ranking = Ranker::default()
                .rank(strategy, &selection, candidates.clone())
                .unwrap();
            let ranks: Vec<usize> = ranking
                .candidates
                .iter()
                .map(|c| c.rank(strategy.id(), false).unwrap())
                .collect();
            prop_assert_eq!(ranks, (1..=n).collect::<Vec<_>>(), "{}", strategy);
        }
    }

    #[test]
    fn strict_order_refines_partial_order((selection, candidates) in arb_ranking_input()) {
        for strategy in RankingStrategy::ALL {
            let ranking = Ranker::default()
                .rank(strategy, &selection, candidates.clone())
                .unwrap();
            let partial: Vec<usize> = ranking
                .candidates
                .iter()
                .map(|c| c.rank(strategy.id(), true).unwrap())
                .collect();

            prop_assert_eq!(partial.first().copied(), Some(1), "{}", strategy);
            prop_assert!(partial.windows(2).all(|pair| pair[0] <= pair[1]), "{}: {:?}", strategy, partial);
        }
    }

    #[test]
    fn diversity_is_a_ratio((selection, candidates) in arb_ranking_input()) {
        let n = candidates.len() as f64;
        for strategy in RankingStrategy::ALL {
            let ranking = measuring_ranker()
                .rank(strategy, &selection, candidates.clone())
                .unwrap();
            let performance = ranking.performance.unwrap();
            let diversity = performance.get("diversity").unwrap();
            prop_assert!(diversity > 0.0 && diversity <= 1.0, "{}: {}", strategy, diversity);

            let groups = performance.get("nds_size").unwrap();
            prop_assert!((diversity - groups / n).abs() < 1e-12);

            let cardinalities = performance.partial_order_cardinalities();
            prop_assert_eq!(cardinalities.iter().sum::<usize>(), candidates.len());
        }
    }
}
