use crate::domain::model::{GroupsConfig, Record, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn groups_config(&self) -> Result<GroupsConfig>;
    fn allow_best_effort(&self) -> bool;

    fn rounded_filename(&self) -> String {
        rounded_filename_for(self.input_path())
    }

    fn groups_filename(&self) -> String {
        "groups.csv".to_string()
    }

    fn summary_filename(&self) -> String {
        "summary.json".to_string()
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}

/// `holders.json` becomes `holders_rounded.json`.
pub fn rounded_filename_for(input_path: &str) -> String {
    let stem = std::path::Path::new(input_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("census");
    format!("{}_rounded.json", stem)
}
