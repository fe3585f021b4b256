//! In-process target runtime shared by integration tests, the CLI and demos.
//!
//! [`SandboxRuntime`] plays the part of the sandboxed environment: it owns a
//! type registry, mints handles, refcounts objects, runs scripted methods and
//! journals every call that reaches it. Clones share the same sandbox, so a
//! test can keep one clone as a probe while the bridge owns another.

mod catalog;
mod journal;
mod script;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;
use target_abi::{
    CodecError, Embedder, HostSink, PayloadCodec, ProxyHandle, TargetError, TargetResult,
    TargetRuntime, TransportPayload, TypeDescriptor, Value,
};
use target_codecs::JsonCodec;

pub use catalog::{messaging_catalog, CatalogEntry};
pub use journal::{BoundaryCall, Journal};
pub use script::{ScriptContext, ScriptFn};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Status {
    Detached,
    Loaded { bridge_name: String },
    Crashed,
}

struct SandboxObject {
    type_name: String,
    ctor_args: Vec<Value>,
    properties: HashMap<String, Value>,
    refcount: u32,
}

struct SandboxState {
    status: Status,
    embed_failure: Option<String>,
    registry: Vec<CatalogEntry>,
    scripts: HashMap<(String, String), ScriptFn>,
    objects: HashMap<ProxyHandle, SandboxObject>,
    next_handle: u32,
    journal: Journal,
}

impl SandboxState {
    fn ensure_alive(&self) -> TargetResult<()> {
        match &self.status {
            Status::Loaded { .. } => Ok(()),
            Status::Detached => Err(TargetError::unavailable("target runtime not loaded")),
            Status::Crashed => Err(TargetError::unavailable("target runtime crashed")),
        }
    }

    fn entry(&self, type_name: &str) -> TargetResult<&CatalogEntry> {
        self.registry
            .iter()
            .find(|entry| entry.name() == type_name)
            .ok_or_else(|| TargetError::UnknownType(type_name.to_owned()))
    }

    fn object_mut(&mut self, handle: ProxyHandle) -> TargetResult<&mut SandboxObject> {
        self.objects
            .get_mut(&handle)
            .ok_or(TargetError::UnknownHandle(handle))
    }

    fn descriptor_of(&self, handle: ProxyHandle) -> TargetResult<&TypeDescriptor> {
        let object = self
            .objects
            .get(&handle)
            .ok_or(TargetError::UnknownHandle(handle))?;
        Ok(&self.entry(&object.type_name)?.descriptor)
    }
}

/// Shared handle to an in-process sandbox.
#[derive(Clone)]
pub struct SandboxRuntime {
    state: Arc<Mutex<SandboxState>>,
    codec: JsonCodec,
}

impl SandboxRuntime {
    /// Creates a loaded sandbox serving the messaging catalog.
    pub fn new() -> Self {
        let runtime = Self::detached();
        runtime.state.lock().status = Status::Loaded {
            bridge_name: "flash".to_owned(),
        };
        runtime
    }

    /// Creates a sandbox that rejects every call until it is embedded.
    pub fn detached() -> Self {
        Self::with_catalog(messaging_catalog())
    }

    /// Creates a detached sandbox serving `catalog`.
    pub fn with_catalog(catalog: Vec<CatalogEntry>) -> Self {
        let scripts = script::builtin_scripts()
            .into_iter()
            .map(|(ty, method, f)| ((ty.to_owned(), method.to_owned()), f))
            .collect();
        Self {
            state: Arc::new(Mutex::new(SandboxState {
                status: Status::Detached,
                embed_failure: None,
                registry: catalog,
                scripts,
                objects: HashMap::new(),
                next_handle: 1,
                journal: Journal::default(),
            })),
            codec: JsonCodec,
        }
    }

    /// Adds or replaces a registry entry.
    pub fn register(&self, entry: CatalogEntry) {
        let mut state = self.state.lock();
        state.registry.retain(|e| e.name() != entry.name());
        state.registry.push(entry);
    }

    /// Removes `type_name` from the registry.
    pub fn unregister(&self, type_name: &str) {
        self.state.lock().registry.retain(|e| e.name() != type_name);
    }

    /// Installs a scripted body for `type_name.method`.
    pub fn script<F>(&self, type_name: &str, method: &str, f: F)
    where
        F: Fn(&ScriptContext<'_>, &[Value]) -> TargetResult<Value> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .scripts
            .insert((type_name.to_owned(), method.to_owned()), Arc::new(f));
    }

    /// Type data the registry layer announces when it comes up.
    pub fn type_data(&self) -> Vec<TypeDescriptor> {
        self.state
            .lock()
            .registry
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Makes the next [`Embedder::embed`] fail with `reason`.
    pub fn fail_embedding(&self, reason: impl Into<String>) {
        self.state.lock().embed_failure = Some(reason.into());
    }

    /// Kills the sandbox; every later call fails as unavailable.
    pub fn crash(&self) {
        warn!("sandbox: crashed");
        self.state.lock().status = Status::Crashed;
    }

    /// Returns true while the sandbox accepts calls.
    pub fn is_loaded(&self) -> bool {
        matches!(self.state.lock().status, Status::Loaded { .. })
    }

    /// Channel name the sandbox was embedded under.
    pub fn bridge_name(&self) -> Option<String> {
        match &self.state.lock().status {
            Status::Loaded { bridge_name } => Some(bridge_name.clone()),
            _ => None,
        }
    }

    /// Snapshot of every call that reached the sandbox.
    pub fn journal(&self) -> Vec<BoundaryCall> {
        self.state.lock().journal.calls().to_vec()
    }

    /// Number of journaled calls with the given wire operation name.
    pub fn count_calls(&self, op: &str) -> usize {
        self.state.lock().journal.count(op)
    }

    /// Forgets the journal.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Current refcount, or `None` once the object is gone.
    pub fn refcount(&self, handle: ProxyHandle) -> Option<u32> {
        self.state.lock().objects.get(&handle).map(|o| o.refcount)
    }

    /// Number of objects still alive in the sandbox.
    pub fn live_objects(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Canonical type name of a live object.
    pub fn type_of(&self, handle: ProxyHandle) -> Option<String> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .map(|o| o.type_name.clone())
    }

    /// Decoded constructor arguments of a live object.
    pub fn constructor_args(&self, handle: ProxyHandle) -> Option<Vec<Value>> {
        self.state
            .lock()
            .objects
            .get(&handle)
            .map(|o| o.ctor_args.clone())
    }

    /// Reads a property without member validation or journaling.
    pub fn raw_property(&self, handle: ProxyHandle, name: &str) -> Value {
        self.state
            .lock()
            .objects
            .get(&handle)
            .and_then(|o| o.properties.get(name).cloned())
            .unwrap_or_default()
    }

    /// Writes a property without member validation or journaling.
    pub fn raw_set_property(&self, handle: ProxyHandle, name: &str, value: Value) {
        if let Some(object) = self.state.lock().objects.get_mut(&handle) {
            object.properties.insert(name.to_owned(), value);
        }
    }

    fn decode(&self, payload: &TransportPayload) -> TargetResult<Vec<Value>> {
        self.codec
            .deserialize(payload)
            .map(|args| args.into_vec())
            .map_err(codec_fault)
    }

    fn encode(&self, value: &Value) -> TargetResult<TransportPayload> {
        self.codec.serialize_value(value).map_err(codec_fault)
    }
}

impl Default for SandboxRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn codec_fault(err: CodecError) -> TargetError {
    TargetError::fault(err.to_string())
}

impl TargetRuntime for SandboxRuntime {
    fn create_object(&self, type_name: &str, args: &TransportPayload) -> TargetResult<ProxyHandle> {
        let args = self.decode(args)?;
        let mut state = self.state.lock();
        state.ensure_alive()?;
        state.journal.push(BoundaryCall::CreateObject {
            type_name: type_name.to_owned(),
            args: args.clone(),
        });

        let properties = state
            .entry(type_name)?
            .ctor_params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();

        let handle = ProxyHandle::new(state.next_handle);
        state.next_handle += 1;
        state.objects.insert(
            handle,
            SandboxObject {
                type_name: type_name.to_owned(),
                ctor_args: args,
                properties,
                refcount: 1,
            },
        );
        debug!("sandbox: created {type_name} as {handle}");
        Ok(handle)
    }

    fn get_type_descriptor(&self, type_name: &str) -> TargetResult<TypeDescriptor> {
        let mut state = self.state.lock();
        state.ensure_alive()?;
        state.journal.push(BoundaryCall::GetTypeDescriptor {
            type_name: type_name.to_owned(),
        });
        Ok(state.entry(type_name)?.descriptor.clone())
    }

    fn release(&self, handle: ProxyHandle) -> TargetResult<()> {
        let mut state = self.state.lock();
        state.ensure_alive()?;
        state.journal.push(BoundaryCall::Release(handle));
        let object = state.object_mut(handle)?;
        object.refcount = object.refcount.saturating_sub(1);
        if object.refcount == 0 {
            state.objects.remove(&handle);
            debug!("sandbox: collected {handle}");
        } else {
            trace!("sandbox: released {handle}, refcount={}", object.refcount);
        }
        Ok(())
    }

    fn add_ref(&self, handle: ProxyHandle) -> TargetResult<()> {
        let mut state = self.state.lock();
        state.ensure_alive()?;
        state.journal.push(BoundaryCall::AddRef(handle));
        let object = state.object_mut(handle)?;
        object.refcount += 1;
        trace!("sandbox: add_ref {handle}, refcount={}", object.refcount);
        Ok(())
    }

    fn evict_from_cache(&self, handle: ProxyHandle) -> TargetResult<()> {
        let mut state = self.state.lock();
        state.ensure_alive()?;
        state.journal.push(BoundaryCall::EvictFromCache(handle));
        if state.objects.remove(&handle).is_some() {
            debug!("sandbox: evicted {handle}");
        }
        Ok(())
    }

    fn invoke_method(
        &self,
        handle: ProxyHandle,
        method: &str,
        args: &TransportPayload,
        host: &dyn HostSink,
    ) -> TargetResult<TransportPayload> {
        let args = self.decode(args)?;
        let script = {
            let mut state = self.state.lock();
            state.ensure_alive()?;
            state.journal.push(BoundaryCall::Invoke {
                handle,
                method: method.to_owned(),
                args: args.clone(),
            });
            let descriptor = state.descriptor_of(handle)?;
            if !descriptor.has_method(method) {
                return Err(TargetError::UnknownMember {
                    type_name: descriptor.name.clone(),
                    member: method.to_owned(),
                });
            }
            let key = (descriptor.name.clone(), method.to_owned());
            state.scripts.get(&key).cloned()
        };

        let result = match script {
            Some(script) => script(&ScriptContext::new(self, handle, host), &args)?,
            None => Value::Null,
        };
        self.encode(&result)
    }

    fn get_property(&self, handle: ProxyHandle, name: &str) -> TargetResult<TransportPayload> {
        let value = {
            let mut state = self.state.lock();
            state.ensure_alive()?;
            state.journal.push(BoundaryCall::GetProperty {
                handle,
                name: name.to_owned(),
            });
            let descriptor = state.descriptor_of(handle)?;
            if !descriptor.has_property(name) {
                return Err(TargetError::UnknownMember {
                    type_name: descriptor.name.clone(),
                    member: name.to_owned(),
                });
            }
            state
                .objects
                .get(&handle)
                .and_then(|o| o.properties.get(name).cloned())
                .unwrap_or_default()
        };
        self.encode(&value)
    }

    fn set_property(
        &self,
        handle: ProxyHandle,
        name: &str,
        value: &TransportPayload,
    ) -> TargetResult<()> {
        let value = self
            .codec
            .deserialize_value(value)
            .map_err(codec_fault)?;
        let mut state = self.state.lock();
        state.ensure_alive()?;
        state.journal.push(BoundaryCall::SetProperty {
            handle,
            name: name.to_owned(),
            value: value.clone(),
        });
        let descriptor = state.descriptor_of(handle)?;
        if !descriptor.has_property(name) {
            return Err(TargetError::UnknownMember {
                type_name: descriptor.name.clone(),
                member: name.to_owned(),
            });
        }
        state
            .object_mut(handle)?
            .properties
            .insert(name.to_owned(), value);
        Ok(())
    }
}

impl Embedder for SandboxRuntime {
    fn embed(&self, path: Option<&Path>, bridge_name: &str) -> TargetResult<()> {
        let mut state = self.state.lock();
        if state.status == Status::Crashed {
            return Err(TargetError::unavailable("target runtime crashed"));
        }
        if let Some(reason) = state.embed_failure.take() {
            warn!("sandbox: embedding {path:?} failed: {reason}");
            return Err(TargetError::Unavailable(reason));
        }
        debug!("sandbox: embedded {path:?} as `{bridge_name}`");
        state.status = Status::Loaded {
            bridge_name: bridge_name.to_owned(),
        };
        Ok(())
    }
}
