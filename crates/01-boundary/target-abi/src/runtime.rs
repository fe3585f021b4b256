//! Operations a target runtime exposes to the host, and the reverse channel.

use std::path::Path;

use crate::codec::TransportPayload;
use crate::descriptor::TypeDescriptor;
use crate::error::{TargetError, TargetResult};
use crate::handle::{CallbackId, ProxyHandle};
use crate::value::Value;

/// The sandboxed runtime hosting real object instances.
///
/// Every method is a synchronous cross-boundary call: it blocks until the
/// target answers. There is no timeout; a target that never answers hangs
/// the caller.
pub trait TargetRuntime {
    /// Instantiates `type_name` with the serialized constructor arguments.
    fn create_object(&self, type_name: &str, args: &TransportPayload) -> TargetResult<ProxyHandle>;

    /// Returns the registry entry for `type_name`.
    fn get_type_descriptor(&self, type_name: &str) -> TargetResult<TypeDescriptor>;

    /// Drops one reference to `handle`; the target collects the object at zero.
    fn release(&self, handle: ProxyHandle) -> TargetResult<()>;

    /// Adds one reference to `handle`.
    fn add_ref(&self, handle: ProxyHandle) -> TargetResult<()>;

    /// Removes every cache entry naming `handle`, regardless of its refcount.
    fn evict_from_cache(&self, handle: ProxyHandle) -> TargetResult<()>;

    /// Calls `method` on `handle`. The target may call back into the host
    /// through `host` before returning.
    fn invoke_method(
        &self,
        handle: ProxyHandle,
        method: &str,
        args: &TransportPayload,
        host: &dyn HostSink,
    ) -> TargetResult<TransportPayload>;

    fn get_property(&self, handle: ProxyHandle, name: &str) -> TargetResult<TransportPayload>;

    fn set_property(
        &self,
        handle: ProxyHandle,
        name: &str,
        value: &TransportPayload,
    ) -> TargetResult<()>;
}

/// Host functions reachable from inside the target while a call is in flight.
pub trait HostSink {
    fn call_host(&self, id: CallbackId, args: &[Value]) -> TargetResult<Value>;
}

/// Sink for calls where the host exposes no functions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHost;

impl HostSink for NoHost {
    fn call_host(&self, id: CallbackId, _args: &[Value]) -> TargetResult<Value> {
        Err(TargetError::UnknownCallback(id))
    }
}

/// Loads a target runtime into the host process.
///
/// `path` names the runtime image; `bridge_name` is the channel the runtime
/// will announce itself on once its transport is up.
pub trait Embedder {
    fn embed(&self, path: Option<&Path>, bridge_name: &str) -> TargetResult<()>;
}
