use thiserror::Error;

/// Errors returned by connection manager tag operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnMgrError {
    #[error("decaying tag with name {0} already exists")]
    DuplicateTag(String),
    #[error("decaying tag {0} has been closed")]
    TagClosed(String),
    #[error("connection manager does not support decaying tags")]
    DecayUnsupported,
    #[error("tag operation rejected: {0}")]
    Rejected(String),
}
