//! Outlier isolation ahead of grouping.
//!
//! Outliers are never rounded. They are split off here and appended back,
//! untouched, after the rounded census has been produced.

use crate::domain::model::{OutlierStrategy, Record};
use crate::utils::error::{CensusError, Result};
use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};

/// Decimal places kept from the squared z-score threshold in exact comparisons.
const THRESHOLD_SCALE: u32 = 9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierPartition {
    pub retained: Vec<Record>,
    pub outliers: Vec<Record>,
}

/// Exact first and second moments of a census.
#[derive(Debug, Clone)]
pub struct PopulationStats {
    count: BigInt,
    sum: BigInt,
    /// `n·Σb² − (Σb)²`, which is `n²` times the population variance.
    scaled_variance: BigInt,
}

impl PopulationStats {
    pub fn from_records(records: &[Record]) -> Self {
        let mut sum = BigInt::zero();
        let mut sum_squares = BigInt::zero();
        for record in records {
            let balance = BigInt::from(record.balance.clone());
            sum_squares += &balance * &balance;
            sum += balance;
        }
        let count = BigInt::from(records.len());
        let scaled_variance = &count * &sum_squares - &sum * &sum;
        Self {
            count,
            sum,
            scaled_variance,
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count.is_zero() {
            return 0.0;
        }
        ratio_to_f64(&self.sum, &self.count)
    }

    pub fn std_dev(&self) -> f64 {
        if self.count.is_zero() {
            return 0.0;
        }
        self.scaled_variance.to_f64().unwrap_or(f64::INFINITY).sqrt()
            / self.count.to_f64().unwrap_or(f64::INFINITY)
    }

    pub fn is_constant(&self) -> bool {
        self.scaled_variance.is_zero()
    }

    /// Signed number of standard deviations between `balance` and the mean.
    pub fn z_score(&self, balance: &BigUint) -> f64 {
        if self.is_constant() {
            return 0.0;
        }
        let deviation = self.scaled_deviation(balance);
        deviation.to_f64().unwrap_or(f64::NAN) / self.scaled_variance.to_f64().unwrap_or(f64::NAN).sqrt()
    }

    /// `|z| > threshold`, decided without leaving integer arithmetic.
    pub fn exceeds(&self, balance: &BigUint, threshold: f64) -> bool {
        if self.is_constant() {
            return false;
        }
        let deviation = self.scaled_deviation(balance);
        let lhs = &deviation * &deviation * BigInt::from(10u64.pow(THRESHOLD_SCALE));
        let rhs = scaled_squared_threshold(threshold) * &self.scaled_variance;
        lhs > rhs
    }

    // n·b − Σb, which is n times the deviation from the mean
    fn scaled_deviation(&self, balance: &BigUint) -> BigInt {
        &self.count * BigInt::from(balance.clone()) - &self.sum
    }
}

fn scaled_squared_threshold(threshold: f64) -> BigInt {
    let scaled = (threshold * threshold * 10f64.powi(THRESHOLD_SCALE as i32)).round();
    BigInt::from(scaled as u128)
}

fn ratio_to_f64(numerator: &BigInt, denominator: &BigInt) -> f64 {
    match (numerator.to_f64(), denominator.to_f64()) {
        (Some(n), Some(d)) if n.is_finite() && d.is_finite() => n / d,
        // 超出 f64 範圍時先做整數除法
        _ => (numerator / denominator).to_f64().unwrap_or(f64::INFINITY),
    }
}

/// Splits `records` into retained and outlier lists, both in input order.
pub fn detect_outliers(records: &[Record], strategy: &OutlierStrategy) -> Result<OutlierPartition> {
    match strategy {
        OutlierStrategy::ZScore { threshold } => z_score_outliers(records, *threshold),
        OutlierStrategy::LowerPercentile { percentile } => {
            lower_percentile_outliers(records, *percentile)
        }
        OutlierStrategy::Disabled => Ok(OutlierPartition {
            retained: records.to_vec(),
            outliers: Vec::new(),
        }),
    }
}

pub fn z_score_outliers(records: &[Record], threshold: f64) -> Result<OutlierPartition> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(CensusError::InvalidConfigValueError {
            field: "outliers.threshold".to_string(),
            value: threshold.to_string(),
            reason: "Threshold must be a non-negative number of standard deviations".to_string(),
        });
    }

    let stats = PopulationStats::from_records(records);
    tracing::debug!(
        "Census mean {:.2}, standard deviation {:.2} over {} holders",
        stats.mean(),
        stats.std_dev(),
        records.len()
    );

    let mut partition = OutlierPartition::default();
    for record in records {
        if stats.exceeds(&record.balance, threshold) {
            tracing::trace!(
                identity = %record.identity,
                z_score = stats.z_score(&record.balance),
                "outlier"
            );
            partition.outliers.push(record.clone());
        } else {
            partition.retained.push(record.clone());
        }
    }
    Ok(partition)
}

pub fn lower_percentile_outliers(records: &[Record], percentile: f64) -> Result<OutlierPartition> {
    if !(0.0..=100.0).contains(&percentile) {
        return Err(CensusError::InvalidConfigValueError {
            field: "outliers.percentile".to_string(),
            value: percentile.to_string(),
            reason: "Percentile must be between 0 and 100".to_string(),
        });
    }
    if records.is_empty() {
        return Ok(OutlierPartition::default());
    }

    let mut balances: Vec<&BigUint> = records.iter().map(|r| &r.balance).collect();
    balances.sort();
    let index = ((percentile / 100.0 * records.len() as f64) as usize).min(records.len() - 1);
    let cutoff = balances[index].clone();

    let (outliers, retained): (Vec<Record>, Vec<Record>) = records
        .iter()
        .cloned()
        .partition(|record| record.balance < cutoff);
    Ok(OutlierPartition { retained, outliers })
}
