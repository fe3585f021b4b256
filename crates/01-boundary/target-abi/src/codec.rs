use thiserror::Error;

use crate::value::{Args, Value};

/// Serialized argument list as carried by the boundary primitive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportPayload(Vec<u8>);

impl TransportPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("codec error: {0}")]
pub struct CodecError(pub String);

impl CodecError {
    pub fn new(msg: impl Into<String>) -> Self {
        CodecError(msg.into())
    }
}

/// Converts argument lists to and from the wire representation.
pub trait PayloadCodec {
    fn serialize(&self, args: &[Value]) -> Result<TransportPayload, CodecError>;
    fn deserialize(&self, payload: &TransportPayload) -> Result<Args, CodecError>;

    /// Encodes a single value as a one-element argument list.
    fn serialize_value(&self, value: &Value) -> Result<TransportPayload, CodecError> {
        self.serialize(std::slice::from_ref(value))
    }

    /// Decodes a single value; an empty list decodes to [`Value::Null`].
    fn deserialize_value(&self, payload: &TransportPayload) -> Result<Value, CodecError> {
        Ok(self
            .deserialize(payload)?
            .into_iter()
            .next()
            .unwrap_or_default())
    }
}
