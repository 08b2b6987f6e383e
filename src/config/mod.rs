pub mod cli;
pub mod toml_config;

use crate::core::codec::parse_balance;
use crate::domain::model::{DEFAULT_MIN_ACCURACY, DEFAULT_MIN_PRIVACY_THRESHOLD};
use crate::utils::error::{CensusError, Result};
use num_bigint::BigUint;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

pub const CENSUS_EXTENSIONS: [&str; 2] = ["json", "csv"];

/// Parses a gap tolerance with the same rules as census balances.
pub fn parse_group_balance_diff(field_name: &str, value: &str) -> Result<BigUint> {
    parse_balance(field_name, value).map_err(|e| CensusError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: match e {
            CensusError::InvalidBalance { reason, .. } => reason,
            other => other.to_string(),
        },
    })
}

pub fn default_min_privacy_threshold() -> usize {
    DEFAULT_MIN_PRIVACY_THRESHOLD
}

pub fn default_min_accuracy() -> f64 {
    DEFAULT_MIN_ACCURACY
}

#[cfg(feature = "cli")]
mod cli_config {
    use super::{parse_group_balance_diff, CENSUS_EXTENSIONS};
    use crate::core::ConfigProvider;
    use crate::domain::model::{GroupsConfig, OutlierStrategy};
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_file_extension, validate_path, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "rounded-census")]
    #[command(about = "Anonymize census balances by grouping and rounding them")]
    pub struct CliConfig {
        /// Census file: JSON object of identity to decimal balance, or identity,balance CSV
        #[arg(long, env = "TEST_CENSUS")]
        pub input: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        /// Smallest number of holders that must share a rounded balance
        #[arg(long, env = "MIN_PRIVACY_THRESHOLD", default_value = "3")]
        pub min_privacy_threshold: usize,

        /// Largest balance gap between neighbours merged into a full group
        #[arg(long, env = "GROUP_BALANCE_DIFF", default_value = "1")]
        pub group_balance_diff: String,

        /// Minimum percentage of the total balance that must be preserved
        #[arg(long, env = "MIN_ACCURACY", default_value = "95.0")]
        pub min_accuracy: f64,

        /// Standard deviations from the mean beyond which a holder is an outlier
        #[arg(long, env = "OUTLIERS_THRESHOLD", default_value = "2.0")]
        pub outliers_threshold: f64,

        /// Use the lower-percentile outlier detector instead of z-scores
        #[arg(long, conflicts_with = "no_outliers")]
        pub lower_percentile: Option<f64>,

        /// Group every holder, including outliers
        #[arg(long)]
        pub no_outliers: bool,

        /// Keep the best result even when it misses the minimum accuracy
        #[arg(long)]
        pub allow_best_effort: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log per-phase timings and memory usage")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl CliConfig {
        fn outlier_strategy(&self) -> OutlierStrategy {
            if self.no_outliers {
                OutlierStrategy::Disabled
            } else if let Some(percentile) = self.lower_percentile {
                OutlierStrategy::LowerPercentile { percentile }
            } else {
                OutlierStrategy::ZScore {
                    threshold: self.outliers_threshold,
                }
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn groups_config(&self) -> Result<GroupsConfig> {
            Ok(GroupsConfig {
                min_privacy_threshold: self.min_privacy_threshold,
                group_balance_diff: parse_group_balance_diff(
                    "group_balance_diff",
                    &self.group_balance_diff,
                )?,
                min_accuracy: self.min_accuracy,
                outliers: self.outlier_strategy(),
            })
        }

        fn allow_best_effort(&self) -> bool {
            self.allow_best_effort
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("input", &self.input)?;
            validate_file_extension("input", &self.input, &CENSUS_EXTENSIONS)?;
            validate_path("output_path", &self.output_path)?;
            self.groups_config()?.validate()
        }
    }

}
