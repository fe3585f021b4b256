//! Scripted method bodies executed inside the sandbox.
//!
//! Scripts run with no sandbox lock held, so they may call back into the host
//! and the host may in turn inspect the sandbox.

use std::cmp::Ordering;
use std::sync::Arc;

use target_abi::{CallbackId, HostSink, ProxyHandle, TargetError, TargetResult, Value};

use crate::SandboxRuntime;

/// Body of a scripted method.
pub type ScriptFn = Arc<dyn Fn(&ScriptContext<'_>, &[Value]) -> TargetResult<Value> + Send + Sync>;

/// View of the receiving object handed to a running script.
pub struct ScriptContext<'a> {
    runtime: &'a SandboxRuntime,
    handle: ProxyHandle,
    host: &'a dyn HostSink,
}

impl<'a> ScriptContext<'a> {
    pub(crate) fn new(runtime: &'a SandboxRuntime, handle: ProxyHandle, host: &'a dyn HostSink) -> Self {
        Self {
            runtime,
            handle,
            host,
        }
    }

    pub fn handle(&self) -> ProxyHandle {
        self.handle
    }

    pub fn runtime(&self) -> &SandboxRuntime {
        self.runtime
    }

    /// Positional constructor argument, `Null` when absent.
    pub fn constructor_arg(&self, idx: usize) -> Value {
        self.runtime
            .constructor_args(self.handle)
            .and_then(|args| args.into_iter().nth(idx))
            .unwrap_or_default()
    }

    pub fn property(&self, name: &str) -> Value {
        self.runtime.raw_property(self.handle, name)
    }

    pub fn set_property(&self, name: &str, value: Value) {
        self.runtime.raw_set_property(self.handle, name, value);
    }

    /// Calls a host function while the current boundary call is in flight.
    pub fn call_host(&self, id: CallbackId, args: &[Value]) -> TargetResult<Value> {
        self.host.call_host(id, args)
    }
}

fn items(ctx: &ScriptContext<'_>) -> Vec<Value> {
    match ctx.property("source") {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

fn store_items(ctx: &ScriptContext<'_>, items: Vec<Value>) {
    ctx.set_property("length", Value::from(items.len() as f64));
    ctx.set_property("source", Value::Array(items));
}

fn index_arg(args: &[Value], len: usize) -> TargetResult<usize> {
    let idx = args
        .first()
        .and_then(Value::as_number)
        .ok_or_else(|| TargetError::fault("index argument must be a number"))?;
    if idx < 0.0 || idx.fract() != 0.0 || idx as usize >= len {
        return Err(TargetError::fault(format!(
            "index {idx} out of bounds for length {len}"
        )));
    }
    Ok(idx as usize)
}

/// One bound `SortField`, read from the field object's properties.
struct FieldOrder {
    name: Option<String>,
    case_insensitive: bool,
    descending: bool,
    numeric: bool,
}

impl FieldOrder {
    fn read(runtime: &SandboxRuntime, field: ProxyHandle) -> Self {
        let flag = |name: &str| runtime.raw_property(field, name).as_bool().unwrap_or(false);
        Self {
            name: runtime.raw_property(field, "name").as_str().map(str::to_owned),
            case_insensitive: flag("caseInsensitive"),
            descending: flag("descending"),
            numeric: flag("numeric"),
        }
    }

    /// Items that are objects are compared by the named property, anything else by itself.
    fn key(&self, runtime: &SandboxRuntime, item: &Value) -> Value {
        match (item.as_handle(), &self.name) {
            (Some(handle), Some(name)) => runtime.raw_property(handle, name),
            _ => item.clone(),
        }
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = if self.numeric {
            let a = a.as_number().unwrap_or(f64::NAN);
            let b = b.as_number().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        } else {
            let text = |v: &Value| {
                let s = match v {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => String::new(),
                };
                if self.case_insensitive {
                    s.to_lowercase()
                } else {
                    s
                }
            };
            text(a).cmp(&text(b))
        };
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Fields of the `Sort` bound to the collection, empty when none is bound.
fn bound_fields(ctx: &ScriptContext<'_>) -> Vec<FieldOrder> {
    let Some(sort) = ctx.property("sort").as_handle() else {
        return Vec::new();
    };
    match ctx.runtime().raw_property(sort, "fields") {
        Value::Array(fields) => fields
            .iter()
            .filter_map(Value::as_handle)
            .map(|field| FieldOrder::read(ctx.runtime(), field))
            .collect(),
        _ => Vec::new(),
    }
}

fn responder_dispatch(slot: usize) -> ScriptFn {
    Arc::new(move |ctx: &ScriptContext<'_>, args: &[Value]| match ctx.constructor_arg(slot) {
        Value::Callback(id) => ctx.call_host(id, args),
        Value::Null => Ok(Value::Null),
        other => Err(TargetError::fault(format!(
            "responder slot {slot} holds a {}, not a function",
            other.kind()
        ))),
    })
}

/// Method bodies the messaging library ships with.
pub(crate) fn builtin_scripts() -> Vec<(&'static str, &'static str, ScriptFn)> {
    const RESPONDER: &str = "mx.rpc::AsyncResponder";
    const COLLECTION: &str = "mx.collections::ArrayCollection";

    let add_item: ScriptFn = Arc::new(|ctx: &ScriptContext<'_>, args: &[Value]| {
        let mut all = items(ctx);
        all.push(args.first().cloned().unwrap_or_default());
        store_items(ctx, all);
        Ok(Value::Null)
    });
    let get_item_at: ScriptFn = Arc::new(|ctx: &ScriptContext<'_>, args: &[Value]| {
        let all = items(ctx);
        let idx = index_arg(args, all.len())?;
        Ok(all[idx].clone())
    });
    let remove_item_at: ScriptFn = Arc::new(|ctx: &ScriptContext<'_>, args: &[Value]| {
        let mut all = items(ctx);
        let idx = index_arg(args, all.len())?;
        let removed = all.remove(idx);
        store_items(ctx, all);
        Ok(removed)
    });
    let remove_all: ScriptFn = Arc::new(|ctx: &ScriptContext<'_>, _args: &[Value]| {
        store_items(ctx, Vec::new());
        Ok(Value::Null)
    });
    let refresh: ScriptFn = Arc::new(|ctx: &ScriptContext<'_>, _args: &[Value]| {
        let fields = bound_fields(ctx);
        if fields.is_empty() {
            return Ok(Value::Bool(false));
        }
        let runtime = ctx.runtime();
        let mut all = items(ctx);
        all.sort_by(|a, b| {
            fields
                .iter()
                .map(|field| field.compare(&field.key(runtime, a), &field.key(runtime, b)))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        store_items(ctx, all);
        Ok(Value::Bool(true))
    });
    let to_array: ScriptFn = Arc::new(|ctx: &ScriptContext<'_>, _args: &[Value]| Ok(Value::Array(items(ctx))));

    vec![
        (RESPONDER, "result", responder_dispatch(0)),
        (RESPONDER, "fault", responder_dispatch(1)),
        (COLLECTION, "addItem", add_item),
        (COLLECTION, "getItemAt", get_item_at),
        (COLLECTION, "removeItemAt", remove_item_at),
        (COLLECTION, "removeAll", remove_all),
        (COLLECTION, "refresh", refresh),
        (COLLECTION, "toArray", to_array),
    ]
}
