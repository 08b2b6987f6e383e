use crate::config::{
    default_min_accuracy, default_min_privacy_threshold, parse_group_balance_diff,
    CENSUS_EXTENSIONS,
};
use crate::core::ConfigProvider;
use crate::domain::model::{GroupsConfig, OutlierStrategy};
use crate::domain::ports::rounded_filename_for;
use crate::utils::error::{CensusError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_path, validate_required_field, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub census: CensusSection,
    #[serde(default)]
    pub grouping: GroupingSection,
    #[serde(default)]
    pub outliers: OutlierStrategy,
    pub load: LoadSection,
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusSection {
    pub name: Option<String>,
    pub input: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingSection {
    #[serde(default = "default_min_privacy_threshold")]
    pub min_privacy_threshold: usize,
    /// Decimal string, balances may exceed any fixed-width integer.
    #[serde(default = "default_group_balance_diff")]
    pub group_balance_diff: String,
    #[serde(default = "default_min_accuracy")]
    pub min_accuracy: f64,
    #[serde(default)]
    pub allow_best_effort: bool,
}

fn default_group_balance_diff() -> String {
    crate::domain::model::DEFAULT_GROUP_BALANCE_DIFF.to_string()
}

impl Default for GroupingSection {
    fn default() -> Self {
        Self {
            min_privacy_threshold: default_min_privacy_threshold(),
            group_balance_diff: default_group_balance_diff(),
            min_accuracy: default_min_accuracy(),
            allow_best_effort: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSection {
    pub output_path: String,
    pub filenames: Option<FilenameSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameSection {
    pub rounded: Option<String>,
    pub groups: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CensusError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CensusError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MIN_ACCURACY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| CensusError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    fn filename(&self, pick: impl Fn(&FilenameSection) -> Option<&String>) -> Option<String> {
        self.load.filenames.as_ref().and_then(pick).cloned()
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        self.census.input.as_deref().unwrap_or_default()
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn groups_config(&self) -> Result<GroupsConfig> {
        Ok(GroupsConfig {
            min_privacy_threshold: self.grouping.min_privacy_threshold,
            group_balance_diff: parse_group_balance_diff(
                "grouping.group_balance_diff",
                &self.grouping.group_balance_diff,
            )?,
            min_accuracy: self.grouping.min_accuracy,
            outliers: self.outliers.clone(),
        })
    }

    fn allow_best_effort(&self) -> bool {
        self.grouping.allow_best_effort
    }

    fn rounded_filename(&self) -> String {
        self.filename(|f| f.rounded.as_ref())
            .unwrap_or_else(|| rounded_filename_for(self.input_path()))
    }

    fn groups_filename(&self) -> String {
        self.filename(|f| f.groups.as_ref())
            .unwrap_or_else(|| "groups.csv".to_string())
    }

    fn summary_filename(&self) -> String {
        self.filename(|f| f.summary.as_ref())
            .unwrap_or_else(|| "summary.json".to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        let input = validate_required_field("census.input", &self.census.input)?;
        validate_path("census.input", input)?;
        validate_file_extension("census.input", input, &CENSUS_EXTENSIONS)?;
        validate_path("load.output_path", &self.load.output_path)?;
        self.groups_config()?.validate()
    }
}
