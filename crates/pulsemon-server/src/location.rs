//! Multi-location result aggregation.
//!
//! Reduces per-location outcomes to one logical status:
//! `up_count / total ≥ threshold/100` → up, else down, with the threshold
//! derived from the configured strategy. A location that errored counts as
//! down, never as absent. The aggregated elapsed time is the slowest
//! location's, since the result cannot exist until all locations settle.

use pulsemon_common::types::{CheckStatus, ExecutionOutcome, LocationConfig};
use serde_json::json;

/// Minimum number of up locations for an aggregated up:
/// `ceil(total × threshold / 100)`.
pub fn up_required(total_locations: usize, threshold_percent: u8) -> usize {
    (total_locations * threshold_percent as usize).div_ceil(100)
}

/// Combines per-location outcomes into the logical outcome persisted for
/// the monitor. `outcomes` must contain one entry per configured location.
pub fn aggregate(
    outcomes: &[(String, ExecutionOutcome)],
    config: &LocationConfig,
) -> ExecutionOutcome {
    let total = outcomes.len();
    let threshold = config.strategy.effective_threshold(config.threshold_percent);
    let required = up_required(total, threshold);
    let up_count = outcomes
        .iter()
        .filter(|(_, o)| o.status.is_up())
        .count();

    let status = if total > 0 && up_count >= required {
        CheckStatus::Up
    } else {
        CheckStatus::Down
    };
    let elapsed_ms = outcomes.iter().map(|(_, o)| o.elapsed_ms).max().unwrap_or(0);

    let mut locations = serde_json::Map::new();
    for (location, outcome) in outcomes {
        locations.insert(
            location.clone(),
            json!({
                "status": outcome.status,
                "elapsed_ms": outcome.elapsed_ms,
                "detail": outcome.detail,
            }),
        );
    }

    ExecutionOutcome::new(
        status,
        elapsed_ms,
        json!({
            "aggregation": {
                "strategy": config.strategy,
                "threshold_percent": threshold,
                "up_required": required,
                "up_count": up_count,
                "total_locations": total,
            },
            "locations": locations,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsemon_common::types::AggregationStrategy;

    fn outcome(status: CheckStatus, elapsed_ms: u64) -> ExecutionOutcome {
        ExecutionOutcome::new(status, elapsed_ms, json!({}))
    }

    fn config(strategy: AggregationStrategy, threshold_percent: u8) -> LocationConfig {
        LocationConfig {
            enabled: true,
            locations: vec![
                "eu-west".to_string(),
                "us-east".to_string(),
                "ap-south".to_string(),
                "us-west".to_string(),
            ],
            strategy,
            threshold_percent,
        }
    }

    fn four_locations(up: usize) -> Vec<(String, ExecutionOutcome)> {
        ["eu-west", "us-east", "ap-south", "us-west"]
            .iter()
            .enumerate()
            .map(|(i, loc)| {
                let status = if i < up {
                    CheckStatus::Up
                } else {
                    CheckStatus::Down
                };
                (loc.to_string(), outcome(status, (i as u64 + 1) * 10))
            })
            .collect()
    }

    #[test]
    fn up_required_is_ceiling_of_percentage() {
        assert_eq!(up_required(4, 100), 4);
        assert_eq!(up_required(4, 50), 2);
        assert_eq!(up_required(4, 1), 1);
        assert_eq!(up_required(3, 50), 2); // ceil(1.5)
        assert_eq!(up_required(5, 34), 2); // ceil(1.7)
    }

    #[test]
    fn majority_of_four_needs_two_up() {
        let cfg = config(AggregationStrategy::Majority, 100);

        let agg = aggregate(&four_locations(2), &cfg);
        assert_eq!(agg.status, CheckStatus::Up);
        assert_eq!(agg.detail["aggregation"]["up_required"], 2);

        let agg = aggregate(&four_locations(1), &cfg);
        assert_eq!(agg.status, CheckStatus::Down);
        assert_eq!(agg.detail["aggregation"]["up_count"], 1);
    }

    #[test]
    fn all_strategy_requires_every_location() {
        let cfg = config(AggregationStrategy::All, 1);
        assert_eq!(aggregate(&four_locations(4), &cfg).status, CheckStatus::Up);
        assert_eq!(aggregate(&four_locations(3), &cfg).status, CheckStatus::Down);
    }

    #[test]
    fn any_strategy_needs_a_single_up() {
        let cfg = config(AggregationStrategy::Any, 100);
        assert_eq!(aggregate(&four_locations(1), &cfg).status, CheckStatus::Up);
        assert_eq!(aggregate(&four_locations(0), &cfg).status, CheckStatus::Down);
    }

    #[test]
    fn custom_strategy_uses_stored_percentage() {
        let cfg = config(AggregationStrategy::Custom, 75);
        assert_eq!(aggregate(&four_locations(3), &cfg).status, CheckStatus::Up);
        assert_eq!(aggregate(&four_locations(2), &cfg).status, CheckStatus::Down);
    }

    #[test]
    fn errored_location_counts_as_down_not_absent() {
        let cfg = config(AggregationStrategy::All, 1);
        let outcomes = vec![
            ("eu-west".to_string(), outcome(CheckStatus::Up, 10)),
            ("us-east".to_string(), outcome(CheckStatus::Error, 5)),
        ];
        let agg = aggregate(&outcomes, &cfg);
        assert_eq!(agg.status, CheckStatus::Down);
        assert_eq!(agg.detail["aggregation"]["total_locations"], 2);
        assert_eq!(agg.detail["locations"]["us-east"]["status"], "error");
    }

    #[test]
    fn aggregated_elapsed_is_the_slowest_location() {
        let cfg = config(AggregationStrategy::Any, 100);
        let outcomes = vec![
            ("eu-west".to_string(), outcome(CheckStatus::Up, 120)),
            ("us-east".to_string(), outcome(CheckStatus::Up, 340)),
        ];
        assert_eq!(aggregate(&outcomes, &cfg).elapsed_ms, 340);
    }

    #[test]
    fn per_location_breakdown_is_preserved() {
        let cfg = config(AggregationStrategy::Majority, 100);
        let agg = aggregate(&four_locations(2), &cfg);
        assert!(agg.detail["locations"]["eu-west"].is_object());
        assert_eq!(agg.detail["locations"]["eu-west"]["status"], "up");
        assert_eq!(agg.detail["locations"]["us-west"]["status"], "down");
    }
}
