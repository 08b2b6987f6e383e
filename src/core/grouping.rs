use crate::domain::model::{Group, Record};
use num_bigint::BigUint;

/// Ascending by balance. The sort is stable, so equal balances keep input order.
pub fn sort_by_balance(records: &[Record]) -> Vec<&Record> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| a.balance.cmp(&b.balance));
    sorted
}

/// Greedy single pass over balance-sorted records.
///
/// A record joins the current group while the group is still smaller than
/// `min_group_size`, or while its distance to the group's last balance is at
/// most `max_gap`. The last group is emitted even when it never reached the
/// minimum size. A `min_group_size` of 0 or 1 leaves grouping to the gap rule
/// alone.
pub fn build_groups<'a>(
    sorted: &[&'a Record],
    min_group_size: usize,
    max_gap: &BigUint,
) -> Vec<Group<'a>> {
    let mut groups = Vec::new();
    let mut current: Vec<&'a Record> = Vec::new();

    for &record in sorted {
        let extend = match current.last() {
            None => true,
            Some(last) => {
                current.len() < min_group_size || gap(&last.balance, &record.balance) <= *max_gap
            }
        };
        if !extend {
            groups.push(Group {
                members: std::mem::take(&mut current),
            });
        }
        current.push(record);
    }

    if !current.is_empty() {
        groups.push(Group { members: current });
    }
    groups
}

fn gap(a: &BigUint, b: &BigUint) -> BigUint {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census(balances: &[u64]) -> Vec<Record> {
        balances
            .iter()
            .enumerate()
            .map(|(i, b)| Record::new(format!("holder-{}", i), *b))
            .collect()
    }

    fn balances(group: &Group) -> Vec<u64> {
        group
            .members
            .iter()
            .map(|r| u64::try_from(&r.balance).unwrap())
            .collect()
    }

    #[test]
    fn test_worked_example() {
        let records = census(&[970, 100, 960, 101, 950, 200]);
        let sorted = sort_by_balance(&records);
        let groups = build_groups(&sorted, 3, &BigUint::from(10u32));

        assert_eq!(groups.len(), 2);
        // 200 joins because the first group still needs a third member
        assert_eq!(balances(&groups[0]), vec![100, 101, 200]);
        assert_eq!(balances(&groups[1]), vec![950, 960, 970]);
    }

    #[test]
    fn test_gap_extends_past_minimum() {
        let records = census(&[1, 2, 3, 4, 5, 100, 101, 102]);
        let sorted = sort_by_balance(&records);
        let groups = build_groups(&sorted, 2, &BigUint::from(1u32));

        assert_eq!(groups.len(), 2);
        assert_eq!(balances(&groups[0]), vec![1, 2, 3, 4, 5]);
        assert_eq!(balances(&groups[1]), vec![100, 101, 102]);
    }

    #[test]
    fn test_last_group_may_be_short() {
        let records = census(&[10, 20, 30, 40, 50]);
        let sorted = sort_by_balance(&records);
        let groups = build_groups(&sorted, 3, &BigUint::from(0u32));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1].len(), 2);
    }

    #[test]
    fn test_groups_cover_every_record_once() {
        let records = census(&[7, 3, 3, 9, 1, 12, 40, 41, 3, 8]);
        let sorted = sort_by_balance(&records);
        let groups = build_groups(&sorted, 2, &BigUint::from(2u32));

        let flattened: Vec<&Record> = groups.iter().flat_map(|g| g.members.iter().copied()).collect();
        assert_eq!(flattened, sorted);
    }

    #[test]
    fn test_sort_is_stable_for_equal_balances() {
        let records = census(&[5, 1, 5, 5]);
        let sorted = sort_by_balance(&records);
        let identities: Vec<&str> = sorted.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["holder-1", "holder-0", "holder-2", "holder-3"]);
    }

    #[test]
    fn test_zero_minimum_groups_by_gap_only() {
        let records = census(&[1, 50, 100]);
        let sorted = sort_by_balance(&records);
        let groups = build_groups(&sorted, 0, &BigUint::from(0u32));
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        let groups = build_groups(&[], 3, &BigUint::from(1u32));
        assert!(groups.is_empty());
    }
}
