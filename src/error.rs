use thiserror::Error;

/// Errors surfaced by the router core.
#[derive(Debug, Error)]
pub enum BotError {
    /// No usable inbound payload. Fatal for the request.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The requested targeting mode cannot be applied to this update.
    #[error("invalid targeting state: {0}")]
    InvalidTargetingState(String),

    /// A chat or message id could not be coerced to an integer id.
    #[error("invalid {field}: {value}")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("unknown handler kind: {0}")]
    UnknownHandlerKind(String),

    /// The platform answered, but not with what we asked for.
    #[error("API error on {method}: {description}")]
    Api { method: String, description: String },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type BotResult<T> = std::result::Result<T, BotError>;
