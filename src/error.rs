use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(
        "the repository url \"{url}\" could not be parsed correctly. Example of a correct repository url: \"{example}\""
    )]
    InvalidRepositoryUrl { url: String, example: &'static str },
    #[error("{provider} request failed: {message}")]
    ProviderRequest {
        provider: &'static str,
        message: String,
    },
    #[error(
        "no branches returned by {provider} using the {api_url} base api; check that the repository has at least one branch"
    )]
    NoBranches {
        provider: &'static str,
        api_url: String,
    },
    #[error("found {count} root repositories for {url}; cannot pick one")]
    AmbiguousRootRepository { url: String, count: u64 },
    #[error("tracking tool rejected part of the batch: {}", .0.join("; "))]
    TrackingToolBatch(Vec<String>),
    #[error("tracking tool error: {0}")]
    TrackingTool(String),
}

impl AppError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        AppError::ProviderRequest {
            provider,
            message: message.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
