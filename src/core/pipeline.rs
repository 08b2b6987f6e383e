use crate::core::codec::{
    census_to_json, distribution_to_csv, group_distribution, parse_census, RunSummary,
};
use crate::core::search::adaptive_group_and_round;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::utils::error::{CensusError, Result};
use std::path::Path;

pub struct CensusPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> CensusPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn output_file(&self, filename: &str) -> String {
        Path::new(self.config.output_path())
            .join(filename)
            .to_string_lossy()
            .into_owned()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CensusPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let input = self.config.input_path();
        tracing::debug!("Reading census from: {}", input);
        let data = self.storage.read_file(input).await?;
        let census = parse_census(input, &data)?;
        if census.is_empty() {
            return Err(CensusError::EmptyCensus);
        }
        Ok(census)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let groups_config = self.config.groups_config()?;
        tracing::debug!("Groups config: {:?}", groups_config);

        let outcome = adaptive_group_and_round(&data, &groups_config)?;
        if !outcome.is_satisfied() && !self.config.allow_best_effort() {
            return Err(CensusError::AccuracyFloorUnmet {
                accuracy: outcome.accuracy,
                min_accuracy: groups_config.min_accuracy,
                threshold: outcome.threshold,
            });
        }

        let distribution = group_distribution(&outcome.records);
        Ok(TransformResult {
            outcome,
            distribution,
            min_accuracy: groups_config.min_accuracy,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let rounded_path = self.output_file(&self.config.rounded_filename());
        let groups_path = self.output_file(&self.config.groups_filename());
        let summary_path = self.output_file(&self.config.summary_filename());

        let census_json = census_to_json(&result.outcome.records)?;
        self.storage
            .write_file(&rounded_path, census_json.as_bytes())
            .await?;

        let groups_csv = distribution_to_csv(&result.distribution)?;
        self.storage
            .write_file(&groups_path, groups_csv.as_bytes())
            .await?;

        let summary = RunSummary {
            generated_at: chrono::Utc::now().to_rfc3339(),
            holders: result.outcome.records.len(),
            outliers: result.outcome.outliers,
            groups: result.outcome.groups,
            distinct_balances: result.distribution.len(),
            accuracy: result.outcome.accuracy,
            min_accuracy: result.min_accuracy,
            privacy_threshold: result.outcome.threshold,
            evaluated_thresholds: result.outcome.evaluated_thresholds,
            status: result.outcome.status,
        };
        let summary_json = serde_json::to_string_pretty(&summary)?;
        self.storage
            .write_file(&summary_path, summary_json.as_bytes())
            .await?;

        tracing::debug!(
            "Wrote {}, {} and {}",
            rounded_path,
            groups_path,
            summary_path
        );
        Ok(rounded_path)
    }
}
