#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("invalid provider config: {0}")]
    InvalidConfig(String),
    #[error("missing credential field: {0}")]
    MissingCredentialField(&'static str),
    #[error("{0}")]
    Other(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
