//! Host-side proxies for target objects.
//!
//! A [`Proxies`] factory is handed out by [`Bridge::proxies`] once the bridge
//! is ready; each constructor performs exactly one guarded `createObject`
//! call, except [`Proxies::adopt_collection`] which wraps a handle the target
//! already returned. Instances do not release their handle on drop: call
//! [`ProxyInstance::release`] (or [`ProxyInstance::destroy`]) explicitly.

use std::fmt;
use std::rc::Rc;

use log::trace;
use target_abi::{CallbackId, ProxyHandle, TypeDescriptor, Value};

use crate::binder::BoundClasses;
use crate::classes::{ChannelKind, ProxyClass, ResponderSpec, SortFieldSpec};
use crate::context::{Bridge, Member};
use crate::error::BridgeResult;

/// Constructors for every proxy class, available only while bound.
pub struct Proxies<'b> {
    bridge: &'b Bridge,
    classes: Rc<BoundClasses>,
}

impl<'b> Proxies<'b> {
    pub(crate) fn new(bridge: &'b Bridge, classes: Rc<BoundClasses>) -> Self {
        Self { bridge, classes }
    }

    pub fn bridge(&self) -> &'b Bridge {
        self.bridge
    }

    /// The bound registry entry for `class`.
    pub fn descriptor(&self, class: ProxyClass) -> &TypeDescriptor {
        self.classes.descriptor(class)
    }

    /// Instantiates `class` on the target with positional `args`.
    pub fn create(&self, class: ProxyClass, args: &[Value]) -> BridgeResult<ProxyInstance<'b>> {
        let handle = self.bridge.create_object(class, args)?;
        Ok(ProxyInstance::new(self.bridge, class, handle))
    }

    pub fn async_responder(&self, spec: &ResponderSpec) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::AsyncResponder, &spec.args())
    }

    pub fn channel_set(&self) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::ChannelSet, &[])
    }

    pub fn producer(&self) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::Producer, &[])
    }

    pub fn consumer(&self) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::Consumer, &[])
    }

    pub fn channel(&self, kind: ChannelKind, id: &str, uri: &str) -> BridgeResult<ProxyInstance<'b>> {
        self.create(kind.proxy_class(), &[Value::from(id), Value::from(uri)])
    }

    pub fn async_message(&self) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::AsyncMessage, &[])
    }

    pub fn array_collection(&self) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::ArrayCollection, &[])
    }

    /// Wraps a collection handle returned by the target. No boundary call is made
    /// and no reference is added.
    pub fn adopt_collection(&self, handle: ProxyHandle) -> ProxyInstance<'b> {
        trace!("proxy: adopting {handle} as ArrayCollection");
        ProxyInstance::new(self.bridge, ProxyClass::ArrayCollection, handle)
    }

    pub fn sort(&self) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::Sort, &[])
    }

    pub fn sort_field(&self, spec: &SortFieldSpec) -> BridgeResult<ProxyInstance<'b>> {
        self.create(ProxyClass::SortField, &spec.args())
    }
}

/// A host-side reference to one target object.
#[must_use = "a proxy holds a target reference; release it when done"]
pub struct ProxyInstance<'b> {
    bridge: &'b Bridge,
    class: ProxyClass,
    handle: ProxyHandle,
}

impl<'b> ProxyInstance<'b> {
    fn new(bridge: &'b Bridge, class: ProxyClass, handle: ProxyHandle) -> Self {
        Self {
            bridge,
            class,
            handle,
        }
    }

    pub fn class(&self) -> ProxyClass {
        self.class
    }

    pub fn handle(&self) -> ProxyHandle {
        self.handle
    }

    pub fn type_name(&self) -> &'static str {
        self.class.canonical_name()
    }

    /// This object as an argument value.
    pub fn to_value(&self) -> Value {
        Value::Handle(self.handle)
    }

    /// Drops this instance's reference on the target.
    pub fn release(self) -> BridgeResult<()> {
        self.bridge.release(self.handle)
    }

    /// Releases the target reference, then forgets host functions only this
    /// object could call, such as a responder's `result` and `fault`.
    pub fn release_with_callbacks(
        self,
        callbacks: impl IntoIterator<Item = CallbackId>,
    ) -> BridgeResult<()> {
        let bridge = self.bridge;
        self.release()?;
        for id in callbacks {
            bridge.remove_callback(id);
        }
        Ok(())
    }

    pub fn add_ref(&self) -> BridgeResult<()> {
        self.bridge.add_ref(self.handle)
    }

    /// A second instance over the same handle, holding its own reference.
    pub fn alias(&self) -> BridgeResult<ProxyInstance<'b>> {
        self.add_ref()?;
        Ok(ProxyInstance::new(self.bridge, self.class, self.handle))
    }

    /// Evicts the target object outright, ignoring outstanding references.
    pub fn destroy(self) -> BridgeResult<()> {
        self.bridge.destroy_object(self.handle)
    }

    pub fn invoke(&self, method: &str, args: &[Value]) -> BridgeResult<Value> {
        self.bridge.check_member(self.class, Member::Method, method)?;
        self.bridge.invoke(self.handle, method, args)
    }

    pub fn get(&self, property: &str) -> BridgeResult<Value> {
        self.bridge.check_member(self.class, Member::Property, property)?;
        self.bridge.get_property(self.handle, property)
    }

    pub fn set(&self, property: &str, value: impl Into<Value>) -> BridgeResult<()> {
        self.bridge.check_member(self.class, Member::Property, property)?;
        self.bridge.set_property(self.handle, property, &value.into())
    }
}

impl fmt::Debug for ProxyInstance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyInstance")
            .field("class", &self.class)
            .field("handle", &self.handle)
            .finish()
    }
}
