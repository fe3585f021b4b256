use thiserror::Error;

use crate::handle::{CallbackId, ProxyHandle};

pub type TargetResult<T> = Result<T, TargetError>;

/// Failures reported by a target runtime (or by the host when the target calls back).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("unknown target type `{0}`")]
    UnknownType(String),

    #[error("unknown handle {0}")]
    UnknownHandle(ProxyHandle),

    #[error("`{type_name}` has no member `{member}`")]
    UnknownMember { type_name: String, member: String },

    #[error("unknown host callback {0}")]
    UnknownCallback(CallbackId),

    #[error("target runtime unavailable: {0}")]
    Unavailable(String),

    #[error("target fault: {0}")]
    Fault(String),
}

impl TargetError {
    pub fn fault(msg: impl Into<String>) -> Self {
        TargetError::Fault(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        TargetError::Unavailable(msg.into())
    }
}
