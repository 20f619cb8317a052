use thiserror::Error;

/// Errors raised by the nested-archive engine.
///
/// Absence of an entry is never an error: lookup APIs return `Ok(None)` so
/// callers can distinguish "entry does not exist" from "entry exists but
/// could not be read."
#[derive(Debug, Error)]
pub enum Error {
    /// The archive structure is broken: no EOCD record, truncated central
    /// directory, or entry data pointing outside the archive.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// The archive uses a ZIP feature this engine does not implement
    /// (ZIP64, encryption, exotic compression methods).
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// An address tried to traverse into a Deflated container entry.
    /// Deflated containers cannot be randomly addressed and are treated
    /// as opaque leaves.
    #[error("cannot traverse into deflated container entry '{0}'")]
    UnsupportedNestedAccess(String),

    /// The compressed payload of an entry is corrupt or truncated.
    #[error("corrupt deflate stream in entry '{entry}': {detail}")]
    DataFormat { entry: String, detail: String },

    /// A nested address string could not be parsed.
    #[error("invalid nested address '{0}': {1}")]
    InvalidAddress(String, String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
