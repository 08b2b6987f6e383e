use crate::domain::model::Record;
use crate::utils::error::{CensusError, Result};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::borrow::Borrow;

/// Fixed-point digits kept in the rounded/original ratio before going to f64.
const RATIO_SCALE: u32 = 15;

pub fn total_balance<R: Borrow<Record>>(records: &[R]) -> BigUint {
    records.iter().map(|r| &r.borrow().balance).sum()
}

/// Percentage of the original total balance still present after rounding.
///
/// `100 × (1 − (original − rounded) / original)`. Fails on mismatched
/// lengths and on a zero original total, where the ratio is undefined.
pub fn accuracy<A, B>(original: &[A], rounded: &[B]) -> Result<f64>
where
    A: Borrow<Record>,
    B: Borrow<Record>,
{
    if original.len() != rounded.len() {
        return Err(CensusError::LengthMismatch {
            original: original.len(),
            rounded: rounded.len(),
        });
    }
    if original.is_empty() {
        return Err(CensusError::EmptyCensus);
    }

    let original_total = total_balance(original);
    if original_total.is_zero() {
        return Err(CensusError::ZeroBalanceCensus);
    }
    let rounded_total = total_balance(rounded);

    Ok(preserved_percentage(&original_total, &rounded_total))
}

/// `100 × rounded / original` for a non-zero `original`.
pub fn preserved_percentage(original_total: &BigUint, rounded_total: &BigUint) -> f64 {
    let scaled = rounded_total * BigUint::from(10u32).pow(RATIO_SCALE) / original_total;
    scaled.to_f64().unwrap_or(f64::INFINITY) / 10f64.powi(RATIO_SCALE as i32 - 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census(balances: &[u64]) -> Vec<Record> {
        balances
            .iter()
            .enumerate()
            .map(|(i, b)| Record::new(format!("h{}", i), *b))
            .collect()
    }

    #[test]
    fn test_lossless_rounding_is_100() {
        let original = census(&[50, 50, 50, 50]);
        assert_eq!(accuracy(&original, &original).unwrap(), 100.0);
    }

    #[test]
    fn test_worked_example_accuracy() {
        let original = census(&[100, 101, 200, 950, 960, 970]);
        let rounded = census(&[100, 100, 100, 900, 900, 900]);
        let value = accuracy(&original, &rounded).unwrap();
        assert!((value - 3000.0 / 3281.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_lost() {
        let original = census(&[10, 10]);
        let rounded = census(&[5, 5]);
        assert_eq!(accuracy(&original, &rounded).unwrap(), 50.0);
    }

    #[test]
    fn test_degenerate_inputs_are_rejected() {
        let empty: Vec<Record> = Vec::new();
        assert!(matches!(accuracy(&empty, &empty), Err(CensusError::EmptyCensus)));

        let zeros = census(&[0, 0, 0]);
        assert!(matches!(accuracy(&zeros, &zeros), Err(CensusError::ZeroBalanceCensus)));

        let short = census(&[1]);
        assert!(matches!(
            accuracy(&zeros, &short),
            Err(CensusError::LengthMismatch { original: 3, rounded: 1 })
        ));
    }

    #[test]
    fn test_accepts_borrowed_records() {
        let original = census(&[10, 30]);
        let refs: Vec<&Record> = original.iter().collect();
        assert_eq!(accuracy(&refs, &original).unwrap(), 100.0);
    }

    #[test]
    fn test_huge_totals() {
        let big = BigUint::parse_bytes(b"9".repeat(400).as_slice(), 10).unwrap();
        let original = vec![Record::new("a", big.clone()), Record::new("b", big.clone())];
        let rounded = vec![Record::new("a", big.clone()), Record::new("b", BigUint::zero())];
        assert_eq!(accuracy(&original, &rounded).unwrap(), 50.0);
    }
}
