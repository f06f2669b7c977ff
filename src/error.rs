use crate::model::RunId;
use thiserror::Error;

/// Failures loading the listing. Always fatal to the run.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Load { url: String, message: String },

    #[error("list container {selector} did not appear within {timeout_secs}s")]
    ContainerMissing { selector: String, timeout_secs: u64 },

    #[error("failed to activate latest tenders view: {0}")]
    TabSwitch(String),

    #[error("failed to read snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures fetching one detail page. Scoped to that detail only.
#[derive(Debug, Error)]
pub enum DetailFetchError {
    #[error("failed to open page for {url}: {message}")]
    Open { url: String, message: String },

    #[error("loading {url} failed or exceeded {timeout_secs}s: {message}")]
    Load {
        url: String,
        timeout_secs: u64,
        message: String,
    },

    #[error("no snapshot for {url} at {path}")]
    NotFound { url: String, path: String },

    #[error("failed to read snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("tender {0} already exists")]
    DuplicateTender(String),

    #[error("tender {0} does not exist")]
    UnknownTender(String),

    #[error("run {0} does not exist")]
    UnknownRun(RunId),

    #[error("run {0} was already finalized")]
    RunAlreadyFinalized(RunId),

    #[error("{0}")]
    Other(String),
}

/// A failure fetching or storing a detail. Never affects the row's record.
#[derive(Debug, Error)]
pub enum DetailError {
    #[error(transparent)]
    Fetch(#[from] DetailFetchError),

    #[error("failed to store detail: {0}")]
    Store(#[from] StoreError),
}

/// A failure contained to one listing row.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("row has an empty tender number")]
    MissingTenderNumber,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that escape a run. The run record is marked FAILED before any of
/// these reach the caller, except when the run record itself cannot be written.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("run record could not be written: {0}")]
    RunRecord(#[source] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
