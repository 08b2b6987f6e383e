use num_bigint::BigUint;
use proptest::prelude::*;
use rounded_census::core::accuracy::total_balance;
use rounded_census::core::grouping::{build_groups, sort_by_balance};
use rounded_census::core::outliers::z_score_outliers;
use rounded_census::{adaptive_group_and_round, group_and_round, GroupsConfig, OutlierStrategy, Record};
use std::collections::HashMap;

fn census_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(1u64..10_000_000, 1..200).prop_map(|balances| {
        balances
            .into_iter()
            .enumerate()
            .map(|(i, b)| Record::new(format!("0x{:08x}", i), b))
            .collect()
    })
}

proptest! {
    #[test]
    fn rounding_never_inflates_balances(
        census in census_strategy(),
        min_group_size in 1usize..20,
        gap in 0u64..5_000,
    ) {
        let outcome = group_and_round(&census, min_group_size, &BigUint::from(gap)).unwrap();

        prop_assert_eq!(outcome.records.len(), census.len());
        prop_assert!(total_balance(&outcome.records) <= total_balance(&census));
        prop_assert!(outcome.accuracy >= 0.0 && outcome.accuracy <= 100.0);

        let originals: HashMap<&str, &BigUint> =
            census.iter().map(|r| (r.identity.as_str(), &r.balance)).collect();
        for record in &outcome.records {
            prop_assert!(&record.balance <= originals[record.identity.as_str()]);
        }
    }

    #[test]
    fn groups_respect_size_or_gap(
        census in census_strategy(),
        min_group_size in 1usize..20,
        gap in 0u64..5_000,
    ) {
        let gap = BigUint::from(gap);
        let sorted = sort_by_balance(&census);
        let groups = build_groups(&sorted, min_group_size, &gap);

        let covered: usize = groups.iter().map(|g| g.len()).sum();
        prop_assert_eq!(covered, census.len());

        for group in &groups[..groups.len() - 1] {
            let within_gap = group
                .members
                .windows(2)
                .all(|pair| &pair[1].balance - &pair[0].balance <= gap);
            prop_assert!(group.len() >= min_group_size || within_gap);
        }
    }

    #[test]
    fn rounded_groups_share_one_balance(
        census in census_strategy(),
        min_group_size in 2usize..10,
    ) {
        let outcome = group_and_round(&census, min_group_size, &BigUint::from(0u32)).unwrap();
        let distinct: std::collections::BTreeSet<&BigUint> =
            outcome.records.iter().map(|r| &r.balance).collect();
        prop_assert!(distinct.len() <= outcome.groups);
    }

    #[test]
    fn outlier_split_conserves_cardinality(census in census_strategy(), threshold in 0.5f64..4.0) {
        let partition = z_score_outliers(&census, threshold).unwrap();
        prop_assert_eq!(partition.retained.len() + partition.outliers.len(), census.len());
    }

    #[test]
    fn adaptive_rounding_is_deterministic(census in census_strategy()) {
        let config = GroupsConfig {
            min_accuracy: 0.0,
            ..GroupsConfig::default()
        };
        let first = adaptive_group_and_round(&census, &config).unwrap();
        let second = adaptive_group_and_round(&census, &config).unwrap();

        prop_assert_eq!(first.records.len(), census.len());
        prop_assert_eq!(&first, &second);
    }

    #[test]
    fn lower_threshold_never_loses_accuracy(
        balances in prop::collection::vec(1u64..1_000_000, 12..120),
        threshold in 2usize..=4,
        gap in 0u64..1_000,
    ) {
        let census: Vec<Record> = balances
            .into_iter()
            .enumerate()
            .map(|(i, b)| Record::new(format!("h{}", i), b))
            .collect();
        let config = |min_privacy_threshold| GroupsConfig {
            min_privacy_threshold,
            group_balance_diff: BigUint::from(gap),
            min_accuracy: 0.0,
            outliers: OutlierStrategy::Disabled,
        };

        let looser = adaptive_group_and_round(&census, &config(threshold - 1)).unwrap();
        let stricter = adaptive_group_and_round(&census, &config(threshold)).unwrap();
        prop_assert!(
            looser.accuracy >= stricter.accuracy,
            "threshold {} gave {} but {} gave {}",
            threshold - 1,
            looser.accuracy,
            threshold,
            stricter.accuracy
        );
    }

    #[test]
    fn single_valued_population_is_a_fixed_point(balance in 1u64..u64::MAX, holders in 1usize..50) {
        let census: Vec<Record> = (0..holders)
            .map(|i| Record::new(format!("h{}", i), balance))
            .collect();
        let outcome = group_and_round(&census, 3, &BigUint::from(0u32)).unwrap();
        prop_assert_eq!(outcome.accuracy, 100.0);
        prop_assert_eq!(outcome.records, census);
    }
}

#[test]
fn adaptive_without_outliers_matches_best_fixed_threshold() {
    let census: Vec<Record> = [
        1_010u64, 1_020, 1_030, 2_510, 2_520, 2_530, 2_540, 7_001, 7_002, 7_003, 7_004, 7_005,
    ]
    .iter()
    .enumerate()
    .map(|(i, b)| Record::new(format!("h{}", i), *b))
    .collect();
    let config = GroupsConfig {
        min_privacy_threshold: 2,
        group_balance_diff: BigUint::from(0u32),
        min_accuracy: 0.0,
        outliers: OutlierStrategy::Disabled,
    };

    let adaptive = adaptive_group_and_round(&census, &config).unwrap();
    let best_fixed = (2..=6)
        .map(|t| group_and_round(&census, t, &BigUint::from(0u32)).unwrap().accuracy)
        .fold(0.0f64, f64::max);
    assert_eq!(adaptive.accuracy, best_fixed);
}
