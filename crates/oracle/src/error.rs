use tabguard_core_types::GateError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(String),
    #[error("oracle returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle response invalid: {0}")]
    Response(String),
    #[error("oracle misconfigured: {0}")]
    Config(String),
}

impl OracleError {
    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }
}

impl From<OracleError> for GateError {
    fn from(value: OracleError) -> Self {
        match value {
            OracleError::Transport(_) | OracleError::Status { .. } => {
                GateError::OracleTransport(value.to_string())
            }
            OracleError::Response(_) => GateError::OracleResponse(value.to_string()),
            OracleError::Config(message) => GateError::internal(message),
        }
    }
}
