use thiserror::Error;

#[derive(Error, Debug)]
pub enum CensusError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid balance '{value}' for holder '{identity}': {reason}")]
    InvalidBalance {
        identity: String,
        value: String,
        reason: String,
    },

    #[error("Duplicate holder identity: {identity}")]
    DuplicateIdentity { identity: String },

    #[error("Census is empty")]
    EmptyCensus,

    #[error("Census total balance is zero, accuracy is undefined")]
    ZeroBalanceCensus,

    #[error("Rounded census has {rounded} records but original has {original}")]
    LengthMismatch { original: usize, rounded: usize },

    #[error(
        "Could not find a privacy threshold that satisfies the minimum accuracy: \
         best {accuracy:.2}% at threshold {threshold}, required {min_accuracy:.2}%"
    )]
    AccuracyFloorUnmet {
        accuracy: f64,
        min_accuracy: f64,
        threshold: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    InputData,
    Rounding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CensusError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CensusError::IoError(_) => ErrorCategory::Io,
            CensusError::ConfigError { .. }
            | CensusError::ConfigValidationError { .. }
            | CensusError::InvalidConfigValueError { .. }
            | CensusError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CensusError::SerializationError(_)
            | CensusError::CsvError(_)
            | CensusError::InvalidBalance { .. }
            | CensusError::DuplicateIdentity { .. }
            | CensusError::EmptyCensus
            | CensusError::ZeroBalanceCensus => ErrorCategory::InputData,
            CensusError::LengthMismatch { .. } | CensusError::AccuracyFloorUnmet { .. } => {
                ErrorCategory::Rounding
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 最佳結果仍然可用，由呼叫端決定是否接受
            CensusError::AccuracyFloorUnmet { .. } => ErrorSeverity::Medium,
            CensusError::LengthMismatch { .. } => ErrorSeverity::Critical,
            CensusError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Io => "Check that the input file exists and the output path is writable",
            ErrorCategory::Configuration => {
                "Review the command line flags, environment variables or TOML file"
            }
            ErrorCategory::InputData => {
                "Make sure the census maps unique identities to non-negative decimal balances"
            }
            ErrorCategory::Rounding => match self {
                CensusError::AccuracyFloorUnmet { .. } => {
                    "Lower the minimum accuracy, increase the group balance diff, or pass --allow-best-effort"
                }
                _ => "This is an internal error, please report it",
            },
        }
    }

    /// Process exit code for the binaries.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CensusError::IoError(e) => format!("Could not read or write a file: {}", e),
            CensusError::EmptyCensus => "The census has no holders to round".to_string(),
            CensusError::ZeroBalanceCensus => {
                "Every balance in the census is zero, nothing to round".to_string()
            }
            CensusError::AccuracyFloorUnmet {
                accuracy,
                min_accuracy,
                ..
            } => format!(
                "Best accuracy {:.2}% is below the required {:.2}%",
                accuracy, min_accuracy
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;
