use crate::domain::model::{Group, Record};
use num_bigint::BigUint;

/// Shared balance for every member of `group`.
///
/// Keeps the longest run of leading decimal digits common to all members and
/// zero-pads it to the digit length of the shortest balance. Single-member
/// groups, and groups whose balances already differ in the first digit, fall
/// back to the smallest balance. Returns `None` for an empty group.
pub fn representative_balance(group: &Group) -> Option<BigUint> {
    let smallest = group.members.iter().map(|r| &r.balance).min()?;
    if group.len() == 1 {
        return Some(smallest.clone());
    }

    let digits: Vec<Vec<u8>> = group
        .members
        .iter()
        .map(|r| r.balance.to_radix_be(10))
        .collect();
    let shortest = digits.iter().map(Vec::len).min()?;
    let reference = &digits[0];

    let prefix_len = (0..shortest)
        .take_while(|&i| digits.iter().all(|d| d[i] == reference[i]))
        .count();
    if prefix_len == 0 {
        return Some(smallest.clone());
    }

    let prefix = BigUint::from_radix_be(&reference[..prefix_len], 10)?;
    let padding = BigUint::from(10u32).pow((shortest - prefix_len) as u32);
    Some(prefix * padding)
}

/// One rounded record per member, in group order.
pub fn round_groups(groups: &[Group]) -> Vec<Record> {
    let mut rounded = Vec::with_capacity(groups.iter().map(Group::len).sum());
    for group in groups {
        let Some(representative) = representative_balance(group) else {
            continue;
        };
        rounded.extend(
            group
                .members
                .iter()
                .map(|member| member.with_balance(representative.clone())),
        );
    }
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(balances: &[u64]) -> u64 {
        let records: Vec<Record> = balances
            .iter()
            .enumerate()
            .map(|(i, b)| Record::new(format!("h{}", i), *b))
            .collect();
        let group = Group {
            members: records.iter().collect(),
        };
        u64::try_from(representative_balance(&group).unwrap()).unwrap()
    }

    #[test]
    fn test_common_leading_digits() {
        assert_eq!(round(&[1234, 1299]), 1200);
        assert_eq!(round(&[950, 960, 970]), 900);
        assert_eq!(round(&[123456, 123499, 123400]), 123400);
    }

    #[test]
    fn test_no_common_prefix_uses_smallest() {
        assert_eq!(round(&[100, 101, 200]), 100);
        assert_eq!(round(&[1234, 5234]), 1234);
    }

    #[test]
    fn test_mixed_digit_lengths_pad_to_shortest() {
        // "150" is a prefix of "1500", so nothing is lost from the short one
        assert_eq!(round(&[150, 1500]), 150);
        assert_eq!(round(&[120, 1299]), 120);
        assert_eq!(round(&[125, 1299]), 120);
        assert_eq!(round(&[999, 1000]), 999);
    }

    #[test]
    fn test_identical_balances_are_unchanged() {
        assert_eq!(round(&[50, 50, 50, 50]), 50);
        assert_eq!(round(&[0, 0]), 0);
    }

    #[test]
    fn test_single_member_is_unchanged() {
        assert_eq!(round(&[987654321]), 987654321);
    }

    #[test]
    fn test_never_rounds_above_a_member() {
        let cases: [&[u64]; 5] = [&[19, 21], &[10, 99], &[5, 50, 500], &[1001, 1009, 10000], &[7, 70]];
        for balances in cases {
            let smallest = *balances.iter().min().unwrap();
            assert!(round(balances) <= smallest, "{:?}", balances);
        }
    }

    #[test]
    fn test_round_groups_preserves_identities() {
        let records = vec![Record::new("a", 1210u32), Record::new("b", 1290u32)];
        let groups = vec![Group {
            members: records.iter().collect(),
        }];
        let rounded = round_groups(&groups);

        assert_eq!(rounded.len(), 2);
        assert_eq!(rounded[0], Record::new("a", 1200u32));
        assert_eq!(rounded[1], Record::new("b", 1200u32));
        // originals untouched
        assert_eq!(records[0].balance, BigUint::from(1210u32));
    }

    #[test]
    fn test_huge_balances() {
        let a = BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap();
        let b = BigUint::parse_bytes(b"123456789099999999999999999999", 10).unwrap();
        let records = vec![Record::new("a", a), Record::new("b", b)];
        let group = Group {
            members: records.iter().collect(),
        };
        assert_eq!(
            representative_balance(&group).unwrap().to_string(),
            "123456789000000000000000000000"
        );
    }
}
