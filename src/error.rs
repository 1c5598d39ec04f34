use thiserror::Error;

/// Status taxonomy a transport maps marketplace errors onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    Unauthenticated,
    FailedPrecondition,
    Internal,
}

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    #[error("internal error: {0}")]
    Internal(String),
    /// A settlement sub-step failed; the whole sequence was rolled back.
    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<MarketplaceError>,
    },
    #[error("payment gateway error: {0}")]
    Gateway(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl MarketplaceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Unauthenticated(_) => ErrorCode::Unauthenticated,
            Self::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            _ => ErrorCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;

/// Tags an error with the settlement step that produced it.
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T>;
}

impl<T> StepContext<T> for Result<T> {
    fn step(self, step: &'static str) -> Result<T> {
        self.map_err(|source| MarketplaceError::Step {
            step,
            source: Box::new(source),
        })
    }
}
