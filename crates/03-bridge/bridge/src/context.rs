//! The bridge context: one per embedded target runtime.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, trace};
use target_abi::{
    CallbackId, HostSink, PayloadCodec, ProxyHandle, TargetError, TargetResult, TargetRuntime,
    TypeDescriptor, Value,
};
use target_codecs::JsonCodec;

use crate::binder::{self, Binder, BoundClasses, TypeCache};
use crate::callbacks::{CallbackTable, HostFn};
use crate::classes::ProxyClass;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::guard::ReentrancyGuard;
use crate::proxy::Proxies;
use crate::readiness::{ReadinessTracker, Transition};

/// Callback run once the bridge is ready.
pub type ReadyFn = Box<dyn FnOnce(&Bridge)>;

/// Which side of a member lookup is being validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Member {
    Method,
    Property,
}

/// Owns the readiness state, the binding table and the call-depth counter for
/// one target runtime.
///
/// The context is single-threaded. No internal borrow is held while a
/// callback or the target runs, so callbacks receive `&Bridge` and may use it
/// freely; a callback that tries to cross the boundary while another call is
/// in flight gets [`BridgeError::Reentrancy`].
pub struct Bridge {
    config: BridgeConfig,
    runtime: Box<dyn TargetRuntime>,
    codec: Box<dyn PayloadCodec>,
    guard: ReentrancyGuard,
    readiness: RefCell<ReadinessTracker<ReadyFn>>,
    types: RefCell<TypeCache>,
    binder: RefCell<Binder>,
    callbacks: RefCell<CallbackTable>,
}

pub struct BridgeBuilder {
    config: BridgeConfig,
    runtime: Box<dyn TargetRuntime>,
    codec: Box<dyn PayloadCodec>,
}

impl BridgeBuilder {
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn codec(mut self, codec: impl PayloadCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn build(self) -> BridgeResult<Bridge> {
        self.config.validate()?;
        Ok(Bridge::assemble(self.config, self.runtime, self.codec))
    }
}

impl Bridge {
    pub fn builder(runtime: impl TargetRuntime + 'static) -> BridgeBuilder {
        BridgeBuilder {
            config: BridgeConfig::default(),
            runtime: Box::new(runtime),
            codec: Box::new(JsonCodec),
        }
    }

    /// A context with the default configuration and the JSON codec.
    pub fn new(runtime: impl TargetRuntime + 'static) -> Self {
        Self::assemble(BridgeConfig::default(), Box::new(runtime), Box::new(JsonCodec))
    }

    fn assemble(
        config: BridgeConfig,
        runtime: Box<dyn TargetRuntime>,
        codec: Box<dyn PayloadCodec>,
    ) -> Self {
        debug!("bridge: new context `{}`", config.bridge_name);
        Bridge {
            config,
            runtime,
            codec,
            guard: ReentrancyGuard::new(),
            readiness: RefCell::new(ReadinessTracker::new()),
            types: RefCell::new(TypeCache::new()),
            binder: RefCell::new(Binder::default()),
            callbacks: RefCell::new(CallbackTable::default()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn bridge_name(&self) -> &str {
        &self.config.bridge_name
    }

    /// The transport layer is up. Flushes this bridge's ready callbacks if the
    /// registry was already bound.
    pub fn signal_transport_ready(&self) -> Transition {
        let transition = self.readiness.borrow_mut().signal_transport_ready();
        if transition == Transition::BarrierOpened {
            self.flush_ready();
        }
        transition
    }

    /// The registry layer is up and delivered `type_data`.
    ///
    /// The data is cached, then every proxy class is bound; registry readiness
    /// is only recorded once binding succeeds. Types missing from the data are
    /// requested from the target.
    pub fn signal_registry_ready(
        &self,
        type_data: impl IntoIterator<Item = TypeDescriptor>,
    ) -> BridgeResult<Transition> {
        self.types.borrow_mut().add_all(type_data);
        self.bind_all(|name| self.lookup_type(name))
    }

    /// Runs one binding cycle through `lookup`.
    ///
    /// On failure nothing is installed and the registry stays not-ready, so a
    /// later call with a corrected lookup may still succeed. Once a cycle has
    /// succeeded further calls are no-ops.
    pub fn bind_all<F>(&self, lookup: F) -> BridgeResult<Transition>
    where
        F: FnMut(&str) -> BridgeResult<TypeDescriptor>,
    {
        if self.binder.borrow().is_bound() {
            return Ok(Transition::Unchanged);
        }
        let table = binder::bind_all(lookup)?;
        self.binder.borrow_mut().install(table);

        let transition = self.readiness.borrow_mut().signal_registry_ready();
        if transition == Transition::BarrierOpened {
            self.flush_ready();
        }
        Ok(transition)
    }

    /// Descriptor for `name` from the delivered type data, falling back to the target.
    pub fn lookup_type(&self, name: &str) -> BridgeResult<TypeDescriptor> {
        let cached = self.types.borrow().get(name).cloned();
        if let Some(descriptor) = cached {
            return Ok(descriptor);
        }
        let descriptor = self.guard.guarded_call("getTypeDescriptor", || {
            Ok(self.runtime.get_type_descriptor(name)?)
        })?;
        self.types.borrow_mut().add(descriptor.clone());
        Ok(descriptor)
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.borrow().is_barrier_open()
    }

    pub fn is_transport_ready(&self) -> bool {
        self.readiness.borrow().is_transport_ready()
    }

    pub fn is_registry_ready(&self) -> bool {
        self.readiness.borrow().is_registry_ready()
    }

    /// Runs `callback` once `channel` is ready: now if the barrier is open,
    /// otherwise when it opens. Only the channel named by the configured
    /// `bridge_name` is ever flushed.
    pub fn on_ready(&self, channel: &str, callback: impl FnOnce(&Bridge) + 'static) {
        let now = self
            .readiness
            .borrow_mut()
            .on_barrier_open(channel, Box::new(callback));
        match now {
            Some(callback) => callback(self),
            None => trace!("bridge: queued ready callback on `{channel}`"),
        }
    }

    /// Number of callbacks still queued on `channel`.
    pub fn pending_ready(&self, channel: &str) -> usize {
        self.readiness.borrow().pending_len(channel)
    }

    fn flush_ready(&self) {
        let batch = self
            .readiness
            .borrow_mut()
            .take_pending(&self.config.bridge_name);
        debug!(
            "bridge: `{}` ready, running {} queued callbacks",
            self.config.bridge_name,
            batch.len()
        );
        for callback in batch {
            callback(self);
        }
    }

    /// Typed factory for proxy instances; fails with [`BridgeError::NotReady`]
    /// until the barrier has opened.
    pub fn proxies(&self) -> BridgeResult<Proxies<'_>> {
        let classes = self.bound_classes()?;
        Ok(Proxies::new(self, classes))
    }

    fn bound_classes(&self) -> BridgeResult<Rc<BoundClasses>> {
        if !self.is_ready() {
            return Err(BridgeError::not_ready(&self.config.bridge_name));
        }
        self.binder
            .borrow()
            .bound()
            .ok_or_else(|| BridgeError::not_ready(&self.config.bridge_name))
    }

    pub(crate) fn check_member(
        &self,
        class: ProxyClass,
        member: Member,
        name: &str,
    ) -> BridgeResult<()> {
        if !self.config.strict_members {
            return Ok(());
        }
        let classes = self.bound_classes()?;
        let descriptor = classes.descriptor(class);
        let declared = match member {
            Member::Method => descriptor.has_method(name),
            Member::Property => descriptor.has_property(name),
        };
        if declared {
            Ok(())
        } else {
            Err(BridgeError::UnknownMember {
                type_name: descriptor.name.clone(),
                member: name.to_owned(),
            })
        }
    }

    pub(crate) fn create_object(&self, class: ProxyClass, args: &[Value]) -> BridgeResult<ProxyHandle> {
        let type_name = class.canonical_name();
        let payload = self.codec.serialize(args)?;
        let handle = self.guard.guarded_call("createObject", || {
            Ok(self.runtime.create_object(type_name, &payload)?)
        })?;
        debug!("bridge: created {type_name} as {handle}");
        Ok(handle)
    }

    /// Drops one target-side reference to `handle`.
    pub fn release(&self, handle: ProxyHandle) -> BridgeResult<()> {
        self.guard
            .guarded_call("release", || Ok(self.runtime.release(handle)?))?;
        trace!("bridge: released {handle}");
        Ok(())
    }

    /// Adds one target-side reference to `handle`.
    pub fn add_ref(&self, handle: ProxyHandle) -> BridgeResult<()> {
        self.guard
            .guarded_call("addRef", || Ok(self.runtime.add_ref(handle)?))?;
        trace!("bridge: add_ref {handle}");
        Ok(())
    }

    /// Evicts every target-side cache entry for `handle`, whatever its refcount.
    pub fn destroy_object(&self, handle: ProxyHandle) -> BridgeResult<()> {
        self.guard
            .guarded_call("evictFromCache", || Ok(self.runtime.evict_from_cache(handle)?))?;
        debug!("bridge: destroyed {handle}");
        Ok(())
    }

    pub(crate) fn invoke(
        &self,
        handle: ProxyHandle,
        method: &str,
        args: &[Value],
    ) -> BridgeResult<Value> {
        let payload = self.codec.serialize(args)?;
        let reply = self.guard.guarded_call("invokeMethod", || {
            Ok(self.runtime.invoke_method(handle, method, &payload, self)?)
        })?;
        Ok(self.codec.deserialize_value(&reply)?)
    }

    pub(crate) fn get_property(&self, handle: ProxyHandle, name: &str) -> BridgeResult<Value> {
        let reply = self.guard.guarded_call("getProperty", || {
            Ok(self.runtime.get_property(handle, name)?)
        })?;
        Ok(self.codec.deserialize_value(&reply)?)
    }

    pub(crate) fn set_property(
        &self,
        handle: ProxyHandle,
        name: &str,
        value: &Value,
    ) -> BridgeResult<()> {
        let payload = self.codec.serialize_value(value)?;
        self.guard.guarded_call("setProperty", || {
            Ok(self.runtime.set_property(handle, name, &payload)?)
        })
    }

    /// Number of cross-boundary calls currently in flight (0 or 1).
    pub fn call_depth(&self) -> u32 {
        self.guard.depth()
    }

    /// Registers a host function the target can call; pass the returned id as
    /// a [`Value::Callback`] argument.
    pub fn callback<F>(&self, f: F) -> CallbackId
    where
        F: Fn(&Bridge, &[Value]) -> BridgeResult<Value> + 'static,
    {
        let f: HostFn = Rc::new(f);
        self.callbacks.borrow_mut().insert(f)
    }

    pub fn remove_callback(&self, id: CallbackId) -> bool {
        self.callbacks.borrow_mut().remove(id)
    }

    /// Runs host function `id`; used by the target while a call is in flight.
    pub fn dispatch_callback(&self, id: CallbackId, args: &[Value]) -> BridgeResult<Value> {
        let f = self
            .callbacks
            .borrow()
            .get(id)
            .ok_or(BridgeError::Target(TargetError::UnknownCallback(id)))?;
        trace!("bridge: dispatching {id}");
        f(self, args)
    }
}

impl HostSink for Bridge {
    fn call_host(&self, id: CallbackId, args: &[Value]) -> TargetResult<Value> {
        self.dispatch_callback(id, args).map_err(|err| match err {
            BridgeError::Target(inner) => inner,
            other => TargetError::fault(other.to_string()),
        })
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("bridge_name", &self.config.bridge_name)
            .field("transport_ready", &self.is_transport_ready())
            .field("registry_ready", &self.is_registry_ready())
            .field("call_depth", &self.call_depth())
            .finish_non_exhaustive()
    }
}
