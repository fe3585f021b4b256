//! Record of every call that reached the sandbox.

use target_abi::{ProxyHandle, Value};

/// One boundary call as observed by the target, with decoded arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryCall {
    CreateObject {
        type_name: String,
        args: Vec<Value>,
    },
    GetTypeDescriptor {
        type_name: String,
    },
    Release(ProxyHandle),
    AddRef(ProxyHandle),
    EvictFromCache(ProxyHandle),
    Invoke {
        handle: ProxyHandle,
        method: String,
        args: Vec<Value>,
    },
    GetProperty {
        handle: ProxyHandle,
        name: String,
    },
    SetProperty {
        handle: ProxyHandle,
        name: String,
        value: Value,
    },
}

impl BoundaryCall {
    /// Operation name as it would appear on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            BoundaryCall::CreateObject { .. } => "createObject",
            BoundaryCall::GetTypeDescriptor { .. } => "getTypeDescriptor",
            BoundaryCall::Release(_) => "release",
            BoundaryCall::AddRef(_) => "addRef",
            BoundaryCall::EvictFromCache(_) => "evictFromCache",
            BoundaryCall::Invoke { .. } => "invokeMethod",
            BoundaryCall::GetProperty { .. } => "getProperty",
            BoundaryCall::SetProperty { .. } => "setProperty",
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, BoundaryCall::CreateObject { .. })
    }
}

/// Append-only call journal.
#[derive(Debug, Default)]
pub struct Journal {
    calls: Vec<BoundaryCall>,
}

impl Journal {
    pub fn push(&mut self, call: BoundaryCall) {
        self.calls.push(call);
    }

    pub fn calls(&self) -> &[BoundaryCall] {
        &self.calls
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.iter().filter(|call| call.op() == op).count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}
