use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::PhaseMonitor;
use std::time::Instant;

pub struct CensusEngine<P: Pipeline> {
    pipeline: P,
    monitor: PhaseMonitor,
}

impl<P: Pipeline> CensusEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: PhaseMonitor::new(monitor_enabled),
        }
    }

    pub fn monitor(&self) -> &PhaseMonitor {
        &self.monitor
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting census rounding");

        let started = Instant::now();
        let census = self.pipeline.extract().await?;
        tracing::info!("Extracted {} holders", census.len());
        self.monitor.record_phase("extract", started);

        let started = Instant::now();
        let result = self.pipeline.transform(census).await?;
        tracing::info!(
            "Rounded {} holders into {} groups ({:.2}% accuracy, threshold {})",
            result.outcome.records.len(),
            result.outcome.groups,
            result.outcome.accuracy,
            result.outcome.threshold
        );
        self.monitor.record_phase("transform", started);

        let started = Instant::now();
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.record_phase("load", started);

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
