#![allow(missing_docs)]
//! Host-side bridge to objects living in a sandboxed target runtime.
//!
//! * [`Bridge`] – one context per embedded runtime: readiness, bindings,
//!   call depth and host callbacks.
//! * [`Proxies`] / [`ProxyInstance`] – typed construction and the
//!   `release` / `add_ref` / `destroy` protocol.
//! * [`ReadinessTracker`] – the two-phase barrier and per-channel ready queue.
//! * [`ReentrancyGuard`] – refuses a boundary call while another is in flight.

mod binder;
mod callbacks;
mod classes;
mod config;
mod context;
mod embed;
mod error;
mod guard;
mod proxy;
mod readiness;

pub use binder::{bind_all, Binder, BoundClasses, TypeCache};
pub use callbacks::{CallbackTable, HostFn};
pub use classes::{ChannelKind, ProxyClass, ResponderSpec, SortFieldSpec};
pub use config::{BridgeConfig, DEFAULT_BRIDGE_NAME};
pub use context::{Bridge, BridgeBuilder, ReadyFn};
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use guard::ReentrancyGuard;
pub use proxy::{ProxyInstance, Proxies};
pub use readiness::{Layer, PendingQueue, ReadinessTracker, Transition};

pub use target_abi::{CallbackId, Embedder, ProxyHandle, TargetRuntime, TypeDescriptor, Value};
