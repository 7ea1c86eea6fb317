use thiserror::Error;

/// Errors that reject a bundling call before any simulation work starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BundleError {
    /// The edge data is malformed (wrong shape, non-numeric or non-finite values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration parameter is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for bundling operations
pub type BundleResult<T> = Result<T, BundleError>;
