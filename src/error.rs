use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DashError {
    #[error("invalid dataset name: {0}")]
    InvalidDatasetName(String),

    #[error("dataset is not tracked: {0}")]
    UnknownDataset(String),

    #[error("dataset has no cached or fetched data yet: {0}")]
    DatasetUnavailable(String),

    #[error("remote request failed: {0}")]
    Network(String),

    #[error("remote returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("remote response is not a table of rows: {0}")]
    Format(String),

    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("no internet connection, connect to the internet to refresh data")]
    #[diagnostic(help("the cached copy is still shown; retry once the network is back"))]
    NoConnectivity,

    #[error("missing config file bizdash.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl DashError {
    /// Transport failures and non-success replies both count as network errors.
    pub fn is_network(&self) -> bool {
        matches!(self, DashError::Network(_) | DashError::RemoteStatus { .. })
    }
}
