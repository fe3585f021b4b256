use target_abi::{CodecError, TargetError};
use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error(
        "recursive call into the target runtime is not allowed; \
         defer the call until the current one has returned"
    )]
    Reentrancy,

    #[error("unknown target type `{0}`")]
    UnknownType(String),

    #[error("bridge `{bridge}` is not ready; construct proxies from an on_ready callback")]
    NotReady { bridge: String },

    #[error("target runtime unavailable: {0}")]
    TargetUnavailable(String),

    #[error("`{type_name}` has no member `{member}`")]
    UnknownMember { type_name: String, member: String },

    #[error("target call failed: {0}")]
    Target(TargetError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid bridge configuration: {0}")]
    Config(String),
}

/// Coarse classification callers can branch on without matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The call was refused before reaching the target; retry outside the current call stack.
    Rejected,
    /// The caller used the bridge out of order (not ready, undeclared member, bad config).
    Usage,
    /// Initialisation cannot complete; the bridge will never become usable.
    Fatal,
    /// The target or the codec rejected this particular call.
    Failed,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Reentrancy => ErrorKind::Rejected,
            BridgeError::NotReady { .. }
            | BridgeError::UnknownMember { .. }
            | BridgeError::Config(_) => ErrorKind::Usage,
            BridgeError::UnknownType(_) | BridgeError::TargetUnavailable(_) => ErrorKind::Fatal,
            BridgeError::Target(_) | BridgeError::Codec(_) => ErrorKind::Failed,
        }
    }

    /// True when the same call may succeed once scheduled outside the current call stack.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Rejected
    }

    pub(crate) fn not_ready(bridge: &str) -> Self {
        BridgeError::NotReady {
            bridge: bridge.to_owned(),
        }
    }
}

impl From<TargetError> for BridgeError {
    fn from(err: TargetError) -> Self {
        match err {
            TargetError::UnknownType(name) => BridgeError::UnknownType(name),
            TargetError::Unavailable(reason) => BridgeError::TargetUnavailable(reason),
            TargetError::UnknownMember { type_name, member } => {
                BridgeError::UnknownMember { type_name, member }
            }
            other => BridgeError::Target(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use target_abi::ProxyHandle;

    #[test]
    fn target_errors_map_onto_bridge_taxonomy() {
        assert_eq!(
            BridgeError::from(TargetError::UnknownType("x::Y".into())),
            BridgeError::UnknownType("x::Y".into())
        );
        assert_eq!(
            BridgeError::from(TargetError::unavailable("gone")).kind(),
            ErrorKind::Fatal
        );
        let handle = ProxyHandle::new(4);
        assert_eq!(
            BridgeError::from(TargetError::UnknownHandle(handle)),
            BridgeError::Target(TargetError::UnknownHandle(handle))
        );
    }

    #[test]
    fn only_reentrancy_is_retryable() {
        assert!(BridgeError::Reentrancy.is_retryable());
        assert!(!BridgeError::not_ready("flash").is_retryable());
        assert!(!BridgeError::UnknownType("t".into()).is_retryable());
    }
}
