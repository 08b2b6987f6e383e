pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{
    etl::CensusEngine,
    pipeline::CensusPipeline,
    search::{adaptive_group_and_round, group_and_round},
};
pub use domain::model::{AdaptiveOutcome, GroupsConfig, OutlierStrategy, Record, RoundingOutcome, SearchStatus};
pub use utils::error::{CensusError, Result};
