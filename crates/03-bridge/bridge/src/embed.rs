//! Loading the target runtime into the host.

use log::{debug, warn};
use target_abi::{Embedder, TargetError};

use crate::context::Bridge;
use crate::error::{BridgeError, BridgeResult};

impl Bridge {
    /// Registers `on_ready` for this bridge's channel, then asks `embedder` to
    /// load the runtime image named by the configured `loader_path`.
    ///
    /// Embedding failures surface as [`BridgeError::TargetUnavailable`]; the
    /// barrier will then never open and `on_ready` never runs.
    pub fn load(
        &self,
        embedder: &dyn Embedder,
        on_ready: impl FnOnce(&Bridge) + 'static,
    ) -> BridgeResult<()> {
        let name = self.bridge_name();
        self.on_ready(name, on_ready);

        let path = self.config().loader_path.as_deref();
        debug!("bridge: embedding {path:?} as `{name}`");
        embedder.embed(path, name).map_err(|err| {
            warn!("bridge: embedding `{name}` failed: {err}");
            match err {
                TargetError::Unavailable(reason) => BridgeError::TargetUnavailable(reason),
                other => BridgeError::TargetUnavailable(other.to_string()),
            }
        })
    }
}
