use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a live object inside the target runtime.
///
/// Handles are minted by the target; the host never interprets the number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyHandle(u32);

impl ProxyHandle {
    /// Wraps a raw identifier received from the target.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a host function the target may call back into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(u32);

impl CallbackId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_display_with_prefix() {
        assert_eq!(ProxyHandle::new(7).to_string(), "#7");
        assert_eq!(CallbackId::new(3).to_string(), "fn#3");
    }

    #[test]
    fn handles_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&ProxyHandle::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: ProxyHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back.raw(), 42);
    }
}
