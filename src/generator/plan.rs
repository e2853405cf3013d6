//! Which families to register, and how many instruments of each.

use rand::Rng;
use tracing::warn;

use crate::config::{GeneratorConfig, MetricType};
use crate::metrics::MetricKind;

/// Exclusive upper bound of the per-family count in random mode
pub const RANDOM_COUNT_LIMIT: usize = 200;

/// Registration request for one family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyPlan {
    pub kind: MetricKind,
    pub count: usize,
}

/// Resolve the registration plan for `config`
pub fn plan_for(config: &GeneratorConfig) -> Vec<FamilyPlan> {
    if config.random {
        if config.metric_type == MetricType::All {
            return random_plan(&mut rand::thread_rng());
        }
        warn!(
            "Random mode only applies to metric type all, generating {} {}(s)",
            config.metrics_count, config.metric_type
        );
    }
    fixed_plan(config.metric_type, config.metrics_count)
}

/// `count` instruments for each family covered by `metric_type`
pub fn fixed_plan(metric_type: MetricType, count: usize) -> Vec<FamilyPlan> {
    metric_type
        .kinds()
        .into_iter()
        .map(|kind| FamilyPlan { kind, count })
        .collect()
}

/// Between one and four distinct families, walked cyclically from a random
/// start, each with its own random count below [`RANDOM_COUNT_LIMIT`]
pub fn random_plan<R: Rng>(rng: &mut R) -> Vec<FamilyPlan> {
    let families = MetricKind::ALL;
    let counts: Vec<usize> = families
        .iter()
        .map(|_| rng.gen_range(0..RANDOM_COUNT_LIMIT))
        .collect();

    let start = rng.gen_range(0..families.len());
    let amount = rng.gen_range(1..=families.len());

    (0..amount)
        .map(|offset| {
            let idx = (start + offset) % families.len();
            FamilyPlan {
                kind: families[idx],
                count: counts[idx],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_fixed_plan_all() {
        let plan = fixed_plan(MetricType::All, 3);
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|p| p.count == 3));
        assert_eq!(plan[0].kind, MetricKind::Counter);
        assert_eq!(plan[3].kind, MetricKind::Summary);
    }

    #[test]
    fn test_fixed_plan_single() {
        let plan = fixed_plan(MetricType::Histogram, 2);
        assert_eq!(
            plan,
            vec![FamilyPlan {
                kind: MetricKind::Histogram,
                count: 2
            }]
        );
    }

    #[test]
    fn test_random_plan_bounds() {
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = random_plan(&mut rng);

            assert!((1..=4).contains(&plan.len()));
            let kinds: HashSet<MetricKind> = plan.iter().map(|p| p.kind).collect();
            assert_eq!(kinds.len(), plan.len(), "families must be distinct");
            assert!(plan.iter().all(|p| p.count < RANDOM_COUNT_LIMIT));
        }
    }

    #[test]
    fn test_random_plan_is_cyclic() {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = random_plan(&mut rng);
            let positions: Vec<usize> = plan
                .iter()
                .map(|p| MetricKind::ALL.iter().position(|k| *k == p.kind).unwrap())
                .collect();
            for pair in positions.windows(2) {
                assert_eq!(pair[1], (pair[0] + 1) % 4);
            }
        }
    }

    #[test]
    fn test_random_ignored_for_single_type() {
        let config = GeneratorConfig {
            metric_type: MetricType::Gauge,
            metrics_count: 5,
            random: true,
            ..Default::default()
        };
        assert_eq!(
            plan_for(&config),
            vec![FamilyPlan {
                kind: MetricKind::Gauge,
                count: 5
            }]
        );
    }
}
