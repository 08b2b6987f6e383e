//! Grouping/rounding passes and the adaptive privacy threshold search.

use crate::core::accuracy::{accuracy, total_balance};
use crate::core::grouping::{build_groups, sort_by_balance};
use crate::core::outliers::detect_outliers;
use crate::core::rounding::round_groups;
use crate::domain::model::{AdaptiveOutcome, GroupsConfig, Record, RoundingOutcome, SearchStatus};
use crate::utils::error::{CensusError, Result};
use num_bigint::BigUint;
use num_traits::Zero;

/// The threshold step grows with the threshold itself: `max(1, t / 33)`.
const STEP_DIVISOR: usize = 33;

/// One grouping, rounding and evaluation pass at a fixed minimum group size.
///
/// The rounded records come back in ascending balance order.
pub fn group_and_round(
    records: &[Record],
    min_group_size: usize,
    max_gap: &BigUint,
) -> Result<RoundingOutcome> {
    let sorted = sort_by_balance(records);
    round_sorted(&sorted, min_group_size, max_gap)
}

fn round_sorted(sorted: &[&Record], min_group_size: usize, max_gap: &BigUint) -> Result<RoundingOutcome> {
    ensure_positive_threshold(min_group_size)?;
    if sorted.is_empty() {
        return Err(CensusError::EmptyCensus);
    }
    let groups = build_groups(sorted, min_group_size, max_gap);
    let rounded = round_groups(&groups);
    let accuracy = accuracy(sorted, &rounded)?;
    Ok(RoundingOutcome {
        records: rounded,
        accuracy,
        groups: groups.len(),
    })
}

/// Rounds the census at the privacy threshold that preserves the most balance.
///
/// Outliers are split off first and appended, unchanged, after the rounded
/// records. Thresholds from `min_privacy_threshold` up to
/// `len / min_privacy_threshold` are evaluated with a step of
/// `max(1, threshold / 33)`. The best result is always returned; `status`
/// tells whether it reached `min_accuracy`.
pub fn adaptive_group_and_round(records: &[Record], config: &GroupsConfig) -> Result<AdaptiveOutcome> {
    if records.is_empty() {
        return Err(CensusError::EmptyCensus);
    }
    if total_balance(records).is_zero() {
        return Err(CensusError::ZeroBalanceCensus);
    }
    let min_threshold = config.min_privacy_threshold;
    ensure_positive_threshold(min_threshold)?;

    let partition = detect_outliers(records, &config.outliers)?;
    tracing::info!(
        "Isolated {} outliers, grouping {} holders",
        partition.outliers.len(),
        partition.retained.len()
    );

    // 剩下的餘額全為零時沒有可以損失的部分
    if total_balance(&partition.retained).is_zero() {
        tracing::warn!("Retained holders carry no balance, skipping threshold search");
        let outliers = partition.outliers.len();
        let groups = usize::from(!partition.retained.is_empty());
        let mut records = partition.retained;
        records.extend(partition.outliers);
        return Ok(AdaptiveOutcome {
            records,
            accuracy: 100.0,
            threshold: min_threshold,
            status: status_for(100.0, config.min_accuracy),
            outliers,
            groups,
            evaluated_thresholds: 0,
        });
    }

    let sorted = sort_by_balance(&partition.retained);
    let max_threshold = records.len() / min_threshold;
    let mut current = min_threshold;
    let mut best_accuracy = 0.0;
    let mut best_threshold = min_threshold;
    let mut evaluated = 0;

    while current <= max_threshold {
        let outcome = round_sorted(&sorted, current, &config.group_balance_diff)?;
        evaluated += 1;
        tracing::trace!(
            threshold = current,
            accuracy = outcome.accuracy,
            groups = outcome.groups,
            "evaluated privacy threshold"
        );
        if outcome.accuracy > best_accuracy {
            best_accuracy = outcome.accuracy;
            best_threshold = current;
        }
        current += (current / STEP_DIVISOR).max(1);
    }
    tracing::debug!(
        "Evaluated {} thresholds in [{}, {}], best {} at {:.4}%",
        evaluated,
        min_threshold,
        max_threshold,
        best_threshold,
        best_accuracy
    );

    let best = round_sorted(&sorted, best_threshold, &config.group_balance_diff)?;
    let status = status_for(best.accuracy, config.min_accuracy);
    if status == SearchStatus::AccuracyFloorUnmet {
        tracing::warn!(
            "Best accuracy {:.2}% at threshold {} is below the required {:.2}%",
            best.accuracy,
            best_threshold,
            config.min_accuracy
        );
    }

    let outliers = partition.outliers.len();
    let mut rounded = best.records;
    rounded.extend(partition.outliers);

    Ok(AdaptiveOutcome {
        records: rounded,
        accuracy: best.accuracy,
        threshold: best_threshold,
        status,
        outliers,
        groups: best.groups,
        evaluated_thresholds: evaluated,
    })
}

fn ensure_positive_threshold(min_group_size: usize) -> Result<()> {
    if min_group_size == 0 {
        return Err(CensusError::InvalidConfigValueError {
            field: "min_privacy_threshold".to_string(),
            value: "0".to_string(),
            reason: "Value must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn status_for(accuracy: f64, min_accuracy: f64) -> SearchStatus {
    if accuracy < min_accuracy {
        SearchStatus::AccuracyFloorUnmet
    } else {
        SearchStatus::Satisfied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::OutlierStrategy;

    fn census(balances: &[u64]) -> Vec<Record> {
        balances
            .iter()
            .enumerate()
            .map(|(i, b)| Record::new(format!("holder-{}", i), *b))
            .collect()
    }

    fn values(records: &[Record]) -> Vec<u64> {
        records
            .iter()
            .map(|r| u64::try_from(&r.balance).unwrap())
            .collect()
    }

    #[test]
    fn test_group_and_round_worked_example() {
        let records = census(&[100, 101, 200, 950, 960, 970]);
        let outcome = group_and_round(&records, 3, &BigUint::from(10u32)).unwrap();

        assert_eq!(outcome.groups, 2);
        assert_eq!(values(&outcome.records), vec![100, 100, 100, 900, 900, 900]);
        assert!((outcome.accuracy - 3000.0 / 3281.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_balances_lose_nothing() {
        let records = census(&[50, 50, 50, 50]);
        let outcome = group_and_round(&records, 2, &BigUint::from(1u32)).unwrap();
        assert_eq!(outcome.groups, 1);
        assert_eq!(outcome.accuracy, 100.0);
        assert_eq!(values(&outcome.records), vec![50, 50, 50, 50]);
    }

    #[test]
    fn test_group_and_round_is_idempotent_on_rounded_population() {
        let records = census(&[1200, 1200, 1200]);
        let first = group_and_round(&records, 3, &BigUint::zero()).unwrap();
        let second = group_and_round(&first.records, 3, &BigUint::zero()).unwrap();
        assert_eq!(first.records, second.records);
        assert_eq!(second.records, records);
    }

    #[test]
    fn test_group_and_round_rejects_degenerate_input() {
        assert!(matches!(
            group_and_round(&[], 3, &BigUint::zero()),
            Err(CensusError::EmptyCensus)
        ));
        assert!(matches!(
            group_and_round(&census(&[0, 0]), 3, &BigUint::zero()),
            Err(CensusError::ZeroBalanceCensus)
        ));
    }

    #[test]
    fn test_group_and_round_rejects_zero_group_size() {
        let err = group_and_round(&census(&[1, 2, 3]), 0, &BigUint::zero()).unwrap_err();
        assert!(matches!(
            err,
            CensusError::InvalidConfigValueError { ref field, .. } if field == "min_privacy_threshold"
        ));
    }

    #[test]
    fn test_single_record_is_unchanged() {
        let records = census(&[123456]);
        let outcome = adaptive_group_and_round(&records, &GroupsConfig::default()).unwrap();
        assert_eq!(outcome.records, records);
        assert_eq!(outcome.accuracy, 100.0);
        assert!(outcome.is_satisfied());
    }

    #[test]
    fn test_adaptive_reappends_outliers() {
        let mut balances: Vec<u64> = (0..40).map(|i| 1000 + i).collect();
        balances.push(50_000_000);
        let records = census(&balances);

        let config = GroupsConfig {
            min_accuracy: 0.0,
            ..GroupsConfig::default()
        };
        let outcome = adaptive_group_and_round(&records, &config).unwrap();

        assert_eq!(outcome.records.len(), records.len());
        assert_eq!(outcome.outliers, 1);
        let last = outcome.records.last().unwrap();
        assert_eq!(last.identity, "holder-40");
        assert_eq!(last.balance, BigUint::from(50_000_000u64));
    }

    #[test]
    fn test_adaptive_reports_unmet_floor_with_best_effort() {
        let records = census(&[10, 19, 28, 37, 46, 55, 64, 73, 82, 91]);
        let config = GroupsConfig {
            min_privacy_threshold: 2,
            group_balance_diff: BigUint::zero(),
            min_accuracy: 99.9,
            outliers: OutlierStrategy::Disabled,
        };
        let outcome = adaptive_group_and_round(&records, &config).unwrap();

        assert_eq!(outcome.status, SearchStatus::AccuracyFloorUnmet);
        assert_eq!(outcome.records.len(), records.len());
        assert!(outcome.accuracy < 99.9);
        assert!(outcome.accuracy > 0.0);
    }

    #[test]
    fn test_adaptive_search_range_and_best_threshold() {
        // 20 holders with min 2 gives thresholds 2..=10
        let records = census(&[
            11, 12, 13, 14, 21, 22, 23, 24, 31, 32, 33, 34, 41, 42, 43, 44, 51, 52, 53, 54,
        ]);
        let config = GroupsConfig {
            min_privacy_threshold: 2,
            group_balance_diff: BigUint::zero(),
            min_accuracy: 0.0,
            outliers: OutlierStrategy::Disabled,
        };
        let outcome = adaptive_group_and_round(&records, &config).unwrap();

        assert_eq!(outcome.evaluated_thresholds, 9);
        assert_eq!(outcome.threshold, 2);
        let direct = group_and_round(&records, 2, &BigUint::zero()).unwrap();
        assert_eq!(outcome.accuracy, direct.accuracy);
    }

    #[test]
    fn test_adaptive_is_deterministic() {
        let records = census(&[5, 900, 17, 17, 3000, 42, 42, 42, 77, 1_000_000, 18, 650]);
        let config = GroupsConfig::default();
        let first = adaptive_group_and_round(&records, &config).unwrap();
        let second = adaptive_group_and_round(&records, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_adaptive_zero_retained_balance() {
        let mut balances = vec![0u64; 10];
        balances.push(1_000);
        let records = census(&balances);
        let outcome = adaptive_group_and_round(&records, &GroupsConfig::default()).unwrap();

        assert_eq!(outcome.outliers, 1);
        assert_eq!(outcome.accuracy, 100.0);
        assert_eq!(outcome.evaluated_thresholds, 0);
        assert_eq!(outcome.records.len(), 11);
    }

    #[test]
    fn test_adaptive_rejects_zero_threshold() {
        let config = GroupsConfig {
            min_privacy_threshold: 0,
            ..GroupsConfig::default()
        };
        assert!(adaptive_group_and_round(&census(&[1, 2, 3]), &config).is_err());
    }
}
