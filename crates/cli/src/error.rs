use bcd_core::CoreError;
use bcd_protocol::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

impl CliError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CliError::Core(err) => err.code(),
            CliError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            CliError::Io(_) | CliError::Config(_) => ErrorCode::Internal,
        }
    }
}
