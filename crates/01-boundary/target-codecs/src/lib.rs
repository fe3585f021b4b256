//! Codec implementations for boundary argument lists.
//!
//! Payloads are a small versioned envelope around the argument list so a
//! target can reject frames produced by an incompatible host.

use serde::{Deserialize, Serialize};
use target_abi::{Args, CodecError, PayloadCodec, TransportPayload, Value};

/// Envelope schema version written by this crate.
pub const SCHEMA_VERSION_V1: u8 = 1;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    v: u8,
    args: &'a [Value],
}

#[derive(Deserialize)]
struct EnvelopeIn {
    v: u8,
    #[serde(default)]
    args: Vec<Value>,
}

/// JSON payload codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn serialize(&self, args: &[Value]) -> Result<TransportPayload, CodecError> {
        args.iter().try_for_each(ensure_finite)?;
        let envelope = EnvelopeOut {
            v: SCHEMA_VERSION_V1,
            args,
        };
        serde_json::to_vec(&envelope)
            .map(TransportPayload::new)
            .map_err(|err| CodecError::new(format!("serialize failure: {err}")))
    }

    fn deserialize(&self, payload: &TransportPayload) -> Result<Args, CodecError> {
        let envelope: EnvelopeIn = serde_json::from_slice(payload.as_bytes())
            .map_err(|err| CodecError::new(format!("malformed payload: {err}")))?;
        ensure_version(envelope.v)?;
        Ok(envelope.args.into_iter().collect())
    }
}

/// JSON has no spelling for NaN or infinities; serde_json would write `null`.
fn ensure_finite(value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Number(n) if !n.is_finite() => Err(CodecError::new(format!(
            "serialize failure: non-finite number {n}"
        ))),
        Value::Array(items) => items.iter().try_for_each(ensure_finite),
        _ => Ok(()),
    }
}

fn ensure_version(ver: u8) -> Result<(), CodecError> {
    if ver != SCHEMA_VERSION_V1 {
        return Err(CodecError::new(format!(
            "schema version mismatch: {} vs {}",
            ver, SCHEMA_VERSION_V1
        )));
    }
    Ok(())
}
