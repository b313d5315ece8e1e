use thiserror::Error;
use vertex_net_connmgr::ConnMgrError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagTracerError {
    #[error("no decaying tag registered for topic {topic}")]
    NoDecayingTag { topic: String },
    #[error(transparent)]
    ConnMgr(#[from] ConnMgrError),
}
