use thiserror::Error;

/// Failure of a single prompt invocation.
///
/// The flows propagate this unchanged; only the action layer catches it.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid flow input: {0}")]
    Validation(String),
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("unusable model output: {0}")]
    Schema(#[from] SchemaError),
}

impl FlowError {
    /// Short label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "validation",
            FlowError::Provider(_) => "provider",
            FlowError::Schema(_) => "schema",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("transport error talking to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

impl ProviderError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                url: url.to_string(),
            }
        } else {
            ProviderError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("model returned no structured output")]
    MissingOutput,
    #[error("model output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("model output does not match schema: {0}")]
    Mismatch(String),
}
