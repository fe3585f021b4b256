//! Messaging sessions driven end to end: embed, handshake, construct, call back, tear down.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use bridge::{
    Bridge, BridgeError, ChannelKind, ProxyClass, ResponderSpec, SortFieldSpec, Value,
};
use parking_lot::Mutex;
use runtime_sandbox::{BoundaryCall, SandboxRuntime};
use target_abi::{Args, CodecError, PayloadCodec, TransportPayload};
use target_codecs::JsonCodec;

/// JSON codec that records the size of every payload it produces.
#[derive(Clone, Default)]
struct MeteredCodec {
    encoded: Arc<Mutex<Vec<usize>>>,
}

impl PayloadCodec for MeteredCodec {
    fn serialize(&self, args: &[Value]) -> Result<TransportPayload, CodecError> {
        let payload = JsonCodec.serialize(args)?;
        self.encoded.lock().push(payload.len());
        Ok(payload)
    }

    fn deserialize(&self, payload: &TransportPayload) -> Result<Args, CodecError> {
        JsonCodec.deserialize(payload)
    }
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ready(sandbox: &SandboxRuntime, bridge: &Bridge) {
    bridge.signal_transport_ready();
    bridge
        .signal_registry_ready(sandbox.type_data())
        .expect("registry binds");
}

#[test]
fn injected_codec_carries_every_outbound_payload() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    let codec = MeteredCodec::default();
    let bridge = Bridge::builder(sandbox.clone())
        .codec(codec.clone())
        .build()
        .unwrap();
    ready(&sandbox, &bridge);

    let proxies = bridge.proxies().unwrap();
    let field = proxies
        .sort_field(&SortFieldSpec::named("bid").numeric(true))
        .unwrap();
    let list = proxies.array_collection().unwrap();
    list.invoke("addItem", &[Value::from(1.25)]).unwrap();
    list.set("sort", Value::Null).unwrap();

    assert_eq!(codec.encoded.lock().len(), 4);
    assert!(codec.encoded.lock().iter().all(|len| *len > 0));
    assert_eq!(
        sandbox.constructor_args(field.handle()),
        Some(vec![
            Value::from("bid"),
            Value::Bool(false),
            Value::Bool(false),
            Value::Bool(true),
        ])
    );
    field.release().unwrap();
    list.release().unwrap();
}

#[test]
fn responder_callbacks_run_inside_the_call_and_defer_boundary_work() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    let bridge = Bridge::new(sandbox.clone());
    ready(&sandbox, &bridge);
    let proxies = bridge.proxies().unwrap();

    let consumer = proxies.consumer().unwrap();
    consumer.set("destination", "quotes").unwrap();
    let consumer_handle = consumer.handle();

    let received = Rc::new(RefCell::new(Vec::new()));
    let deferred = Rc::new(RefCell::new(Vec::new()));
    let inbox = Rc::clone(&received);
    let todo = Rc::clone(&deferred);
    let on_result = bridge.callback(move |bridge, args| {
        inbox.borrow_mut().extend(args.iter().cloned());
        // Releasing the consumer is itself a boundary call and must wait.
        todo.borrow_mut().push(bridge.release(consumer_handle));
        assert!(bridge.is_ready());
        Ok(Value::Bool(true))
    });
    let on_fault = bridge.callback(|_, _| Ok(Value::Null));

    let responder = proxies
        .async_responder(&ResponderSpec::new(on_result, on_fault).with_token(7))
        .unwrap();
    let ack = responder
        .invoke("result", &[Value::from("AAPL"), Value::Number(187.25)])
        .unwrap();

    assert_eq!(ack, Value::Bool(true));
    assert_eq!(*received.borrow(), [Value::from("AAPL"), Value::Number(187.25)]);
    assert_eq!(*deferred.borrow(), [Err(BridgeError::Reentrancy)]);
    assert_eq!(sandbox.refcount(consumer_handle), Some(1));

    // Deferred work succeeds once the outer call has returned.
    consumer.release().unwrap();
    assert_eq!(sandbox.refcount(consumer_handle), None);
    assert_eq!(responder.get("token").unwrap(), Value::from(7));
    responder.release().unwrap();
}

#[test]
fn bridges_do_not_share_state() {
    init_logs();
    let first_sandbox = SandboxRuntime::new();
    let second_sandbox = SandboxRuntime::new();
    let first = Bridge::new(first_sandbox.clone());
    let second = Bridge::new(second_sandbox.clone());

    ready(&first_sandbox, &first);
    assert!(first.is_ready());
    assert!(!second.is_ready());
    assert!(matches!(
        second.proxies(),
        Err(BridgeError::NotReady { .. })
    ));

    let channel = first
        .proxies()
        .unwrap()
        .channel(ChannelKind::SecureHttp, "secure-http", "https://example.test/http")
        .unwrap();
    assert_eq!(first_sandbox.live_objects(), 1);
    assert_eq!(second_sandbox.live_objects(), 0);
    assert!(second_sandbox.journal().is_empty());
    channel.destroy().unwrap();
}

#[test]
fn full_session_leaves_no_live_objects() {
    init_logs();
    let sandbox = SandboxRuntime::detached();
    let bridge = Bridge::new(sandbox.clone());
    let outcome = Rc::new(RefCell::new(None));

    let slot = Rc::clone(&outcome);
    bridge
        .load(&sandbox, move |bridge| {
            let run = || -> Result<usize, BridgeError> {
                let proxies = bridge.proxies()?;
                let channels = proxies.channel_set()?;
                let mut made = Vec::new();
                for kind in ChannelKind::ALL {
                    let channel = proxies.channel(kind, "ch", "/broker")?;
                    channels.invoke("addChannel", &[channel.to_value()])?;
                    made.push(channel);
                }
                let producer = proxies.producer()?;
                producer.set("channelSet", channels.to_value())?;
                let message = proxies.async_message()?;
                producer.invoke("send", &[message.to_value()])?;
                let created = made.len() + 3;
                for proxy in made {
                    proxy.release()?;
                }
                message.release()?;
                producer.release()?;
                channels.release()?;
                Ok(created)
            };
            *slot.borrow_mut() = Some(run());
        })
        .unwrap();
    ready(&sandbox, &bridge);

    assert_eq!(*outcome.borrow(), Some(Ok(ChannelKind::ALL.len() + 3)));
    assert_eq!(sandbox.live_objects(), 0);
    let creates: Vec<_> = sandbox
        .journal()
        .into_iter()
        .filter(BoundaryCall::is_create)
        .collect();
    assert_eq!(creates.len(), ChannelKind::ALL.len() + 3);
    assert!(matches!(
        &creates[0],
        BoundaryCall::CreateObject { type_name, .. }
            if type_name == ProxyClass::ChannelSet.canonical_name()
    ));
}
