//! Domain error types.

/// Top-level error type for stockchat.
#[derive(Debug, thiserror::Error)]
pub enum StockchatError {
    #[error("missing required input: {field}")]
    MissingInput { field: String },

    #[error("market data error: {reason}")]
    MarketData { reason: String },

    #[error("language model error: {reason}")]
    LanguageModel { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StockchatError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingInput {
            field: field.into(),
        }
    }

    pub fn market_data(reason: impl Into<String>) -> Self {
        Self::MarketData {
            reason: reason.into(),
        }
    }
}

impl From<&StockchatError> for std::process::ExitCode {
    fn from(err: &StockchatError) -> Self {
        let code: u8 = match err {
            StockchatError::Io(_) => 1,
            StockchatError::ConfigParse { .. }
            | StockchatError::ConfigMissing { .. }
            | StockchatError::ConfigInvalid { .. } => 2,
            StockchatError::MissingInput { .. } => 3,
            StockchatError::MarketData { .. } => 4,
            StockchatError::LanguageModel { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
