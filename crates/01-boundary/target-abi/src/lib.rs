//! Boundary types shared by the host bridge and target runtimes.
//!
//! This crate defines the narrow call-and-serialize surface between the host
//! and a sandboxed target runtime, with no bridge-specific dependencies:
//! * [`ProxyHandle`] / [`CallbackId`] – opaque identifiers minted on either side.
//! * [`Value`] – the argument values that cross the boundary.
//! * [`TypeDescriptor`] – what the target's type registry says about a type.
//! * [`TargetRuntime`] / [`HostSink`] – the operations each side exposes.
//! * [`Embedder`] – loads the target runtime into the host process.
//! * [`PayloadCodec`] – the serialization collaborator.

mod codec;
mod descriptor;
mod error;
mod handle;
mod runtime;
mod value;

pub use codec::{CodecError, PayloadCodec, TransportPayload};
pub use descriptor::TypeDescriptor;
pub use error::{TargetError, TargetResult};
pub use handle::{CallbackId, ProxyHandle};
pub use runtime::{Embedder, HostSink, NoHost, TargetRuntime};
pub use value::{Args, Value};
