use crate::ServiceState;

/// Everything that can stop a check from producing a regular verdict.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("{0}")]
    InsufficientData(String),
    #[error("older bucket is zero, cannot compute a percent change")]
    DivisionUndefined,
    #[error("{0}")]
    UnsupportedMode(String),
    #[error("query did not return any data point")]
    NoData,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl CheckError {
    /// The service state a failed check is reported with.
    ///
    /// Transport failures and usage errors are `Unknown`; anything that went wrong while
    /// looking at the data is `Critical`.
    pub fn service_state(&self) -> ServiceState {
        match self {
            CheckError::Fetch(_) | CheckError::InvalidConfiguration(_) => ServiceState::Unknown,
            CheckError::InsufficientData(_)
            | CheckError::DivisionUndefined
            | CheckError::UnsupportedMode(_)
            | CheckError::NoData => ServiceState::Critical,
        }
    }
}

/// Errors raised while talking to the TSD or reading its answer.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("couldn't connect to {address}: {cause}")]
    Connect { address: String, cause: String },
    #[error("request to {address} timed out")]
    Timeout { address: String },
    #[error("status = {status} when talking to {address}")]
    Status {
        address: String,
        status: u16,
        body: String,
    },
    #[error("malformed data point on line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
