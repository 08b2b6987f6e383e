use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// A census holder and its balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub identity: String,
    pub balance: BigUint,
}

impl Record {
    pub fn new(identity: impl Into<String>, balance: impl Into<BigUint>) -> Self {
        Self {
            identity: identity.into(),
            balance: balance.into(),
        }
    }

    /// Same holder, different balance. The original record is left untouched.
    pub fn with_balance(&self, balance: BigUint) -> Self {
        Self {
            identity: self.identity.clone(),
            balance,
        }
    }
}

/// Contiguous run of records taken from a balance-sorted census.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<'a> {
    pub members: Vec<&'a Record>,
}

impl Group<'_> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum OutlierStrategy {
    /// Records further than `threshold` standard deviations from the mean.
    ZScore { threshold: f64 },
    /// Records strictly below the balance found at the given percentile.
    LowerPercentile { percentile: f64 },
    Disabled,
}

impl Default for OutlierStrategy {
    fn default() -> Self {
        OutlierStrategy::ZScore {
            threshold: DEFAULT_OUTLIERS_THRESHOLD,
        }
    }
}

pub const DEFAULT_MIN_PRIVACY_THRESHOLD: usize = 3;
pub const DEFAULT_GROUP_BALANCE_DIFF: u64 = 1;
pub const DEFAULT_MIN_ACCURACY: f64 = 95.0;
pub const DEFAULT_OUTLIERS_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupsConfig {
    pub min_privacy_threshold: usize,
    pub group_balance_diff: BigUint,
    pub min_accuracy: f64,
    pub outliers: OutlierStrategy,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            min_privacy_threshold: DEFAULT_MIN_PRIVACY_THRESHOLD,
            group_balance_diff: BigUint::from(DEFAULT_GROUP_BALANCE_DIFF),
            min_accuracy: DEFAULT_MIN_ACCURACY,
            outliers: OutlierStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundingOutcome {
    /// Rounded records in ascending balance order.
    pub records: Vec<Record>,
    pub accuracy: f64,
    pub groups: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Satisfied,
    AccuracyFloorUnmet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveOutcome {
    /// Rounded retained records followed by the untouched outliers.
    pub records: Vec<Record>,
    pub accuracy: f64,
    pub threshold: usize,
    pub status: SearchStatus,
    pub outliers: usize,
    pub groups: usize,
    pub evaluated_thresholds: usize,
}

impl AdaptiveOutcome {
    pub fn is_satisfied(&self) -> bool {
        self.status == SearchStatus::Satisfied
    }
}

/// Output of the transform phase, consumed by load.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub outcome: AdaptiveOutcome,
    pub distribution: Vec<GroupDistribution>,
    pub min_accuracy: f64,
}

/// One row of the groups report: how many holders share a rounded balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDistribution {
    pub rounded_balance: String,
    pub holders: usize,
}
