pub type AgjendaResult<T> = Result<T, AgjendaError>;

#[derive(thiserror::Error, Debug)]
pub enum AgjendaError {
    #[error("agenda is empty: add at least one item before generating")]
    EmptyAgenda,

    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("finalization error: {0}")]
    Finalization(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgjendaError {
    pub fn unsupported_environment(msg: impl Into<String>) -> Self {
        Self::UnsupportedEnvironment(msg.into())
    }

    pub fn surface_unavailable(msg: impl Into<String>) -> Self {
        Self::SurfaceUnavailable(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn finalization(msg: impl Into<String>) -> Self {
        Self::Finalization(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
