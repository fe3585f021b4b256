//! Readiness handshake integration tests.
//! Drives a bridge against the in-process sandbox through every ordering of
//! the transport and registry signals, checking when proxies become
//! constructible and when ready callbacks fire.

use std::cell::RefCell;
use std::rc::Rc;

use bridge::{Bridge, BridgeError, ErrorKind, ProxyClass, Transition};
use runtime_sandbox::SandboxRuntime;

type Log = Rc<RefCell<Vec<String>>>;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn recorder(log: &Log, label: &str) -> impl FnOnce(&Bridge) + 'static {
    let log = Rc::clone(log);
    let label = label.to_owned();
    move |_: &Bridge| log.borrow_mut().push(label)
}

#[test]
fn boot_sequence_opens_barrier_and_runs_queued_callback() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    let bridge = Bridge::new(sandbox.clone());
    let handles = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&handles);
    bridge.on_ready("flash", move |bridge| {
        let proxies = bridge.proxies().expect("ready inside callback");
        let list = proxies.array_collection().expect("collection");
        sink.borrow_mut().push(list.handle());
    });

    assert_eq!(bridge.signal_transport_ready(), Transition::Signalled);
    let err = bridge.proxies().err().expect("not ready yet");
    assert_eq!(
        err,
        BridgeError::NotReady {
            bridge: "flash".into()
        }
    );
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(sandbox.count_calls("createObject"), 0);
    assert!(handles.borrow().is_empty());

    assert_eq!(
        bridge.signal_registry_ready(sandbox.type_data()),
        Ok(Transition::BarrierOpened)
    );
    assert_eq!(handles.borrow().len(), 1);
    assert_eq!(
        sandbox.type_of(handles.borrow()[0]).as_deref(),
        Some(ProxyClass::ArrayCollection.canonical_name())
    );

    let sort = bridge.proxies().unwrap().sort().expect("construct after ready");
    assert_eq!(sandbox.count_calls("createObject"), 2);
    sort.release().unwrap();
}

#[test]
fn registry_first_then_transport() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    let bridge = Bridge::new(sandbox.clone());
    let log = Log::default();
    bridge.on_ready("flash", recorder(&log, "early"));

    assert_eq!(
        bridge.signal_registry_ready(sandbox.type_data()),
        Ok(Transition::Signalled)
    );
    assert!(log.borrow().is_empty());
    assert_eq!(bridge.signal_transport_ready(), Transition::BarrierOpened);
    assert_eq!(*log.borrow(), ["early"]);
}

#[test]
fn callbacks_run_in_registration_order_exactly_once() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    let bridge = Bridge::new(sandbox.clone());
    let log = Log::default();
    for label in ["first", "second", "third"] {
        bridge.on_ready("flash", recorder(&log, label));
    }
    bridge.on_ready("elsewhere", recorder(&log, "wrong channel"));

    bridge.signal_transport_ready();
    bridge.signal_registry_ready(sandbox.type_data()).unwrap();
    bridge.signal_transport_ready();
    bridge.signal_registry_ready(sandbox.type_data()).unwrap();

    assert_eq!(*log.borrow(), ["first", "second", "third"]);
    assert_eq!(bridge.pending_ready("flash"), 0);
    assert_eq!(bridge.pending_ready("elsewhere"), 1);

    bridge.on_ready("flash", recorder(&log, "late"));
    bridge.on_ready("elsewhere", recorder(&log, "late elsewhere"));
    assert_eq!(
        *log.borrow(),
        ["first", "second", "third", "late", "late elsewhere"]
    );
}

#[test]
fn custom_bridge_name_flushes_its_own_channel() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    let bridge = Bridge::builder(sandbox.clone())
        .config(bridge::BridgeConfig::named("messaging"))
        .build()
        .unwrap();
    let log = Log::default();
    bridge.on_ready("flash", recorder(&log, "flash"));
    bridge.on_ready("messaging", recorder(&log, "messaging"));
    bridge.signal_transport_ready();
    bridge.signal_registry_ready(sandbox.type_data()).unwrap();
    assert_eq!(*log.borrow(), ["messaging"]);
}

#[test]
fn failed_binding_keeps_the_barrier_closed_until_retry() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    sandbox.unregister("mx.messaging::Consumer");
    let bridge = Bridge::new(sandbox.clone());
    let log = Log::default();
    bridge.on_ready("flash", recorder(&log, "ready"));
    bridge.signal_transport_ready();

    let err = bridge
        .signal_registry_ready(sandbox.type_data())
        .unwrap_err();
    assert_eq!(err, BridgeError::UnknownType("mx.messaging::Consumer".into()));
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(!bridge.is_registry_ready());
    assert!(!bridge.is_ready());
    assert!(matches!(bridge.proxies(), Err(BridgeError::NotReady { .. })));
    assert!(log.borrow().is_empty());

    let transition = bridge
        .bind_all(|name| {
            if name == "mx.messaging::Consumer" {
                Ok(bridge::TypeDescriptor::new(name).with_methods(["subscribe"]))
            } else {
                bridge.lookup_type(name)
            }
        })
        .unwrap();
    assert_eq!(transition, Transition::BarrierOpened);
    assert_eq!(*log.borrow(), ["ready"]);
    assert!(bridge.proxies().is_ok());
}

#[test]
fn unavailable_target_during_binding_never_opens_the_barrier() {
    init_logs();
    let sandbox = SandboxRuntime::new();
    let bridge = Bridge::new(sandbox.clone());
    let log = Log::default();
    bridge.on_ready("flash", recorder(&log, "ready"));
    bridge.signal_transport_ready();

    let partial: Vec<_> = sandbox
        .type_data()
        .into_iter()
        .filter(|desc| desc.name != ProxyClass::Sort.canonical_name())
        .collect();
    sandbox.crash();

    let err = bridge.signal_registry_ready(partial.clone()).unwrap_err();
    assert_eq!(
        err,
        BridgeError::TargetUnavailable("target runtime crashed".into())
    );
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(!bridge.is_registry_ready());
    assert!(!bridge.is_ready());
    assert_eq!(bridge.pending_ready("flash"), 1);

    assert!(bridge.signal_registry_ready(partial).is_err());
    assert!(!bridge.is_ready());
    assert!(log.borrow().is_empty());
    assert_eq!(bridge.call_depth(), 0);
}

mod prop {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Copy, Debug)]
    enum Step {
        Transport,
        Registry,
        Register,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Transport),
            Just(Step::Registry),
            Just(Step::Register),
        ]
    }

    proptest! {
        /// Any interleaving of duplicated signals and registrations opens the
        /// barrier once and runs every callback exactly once, in order.
        #[test]
        fn any_signal_order_opens_once(steps in proptest::collection::vec(step(), 0..24)) {
            let sandbox = SandboxRuntime::new();
            let bridge = Bridge::new(sandbox.clone());
            let log = Log::default();
            let mut registered = 0usize;
            let mut opened = 0usize;

            let all_steps = steps
                .into_iter()
                .chain([Step::Transport, Step::Registry]);
            for step in all_steps {
                let was_open = bridge.is_ready();
                let transition = match step {
                    Step::Transport => bridge.signal_transport_ready(),
                    Step::Registry => bridge.signal_registry_ready(sandbox.type_data()).unwrap(),
                    Step::Register => {
                        bridge.on_ready("flash", recorder(&log, &registered.to_string()));
                        registered += 1;
                        Transition::Unchanged
                    }
                };
                if transition == Transition::BarrierOpened {
                    opened += 1;
                    prop_assert!(!was_open);
                }
                if was_open {
                    prop_assert!(bridge.is_ready(), "barrier closed again");
                }
            }

            prop_assert_eq!(opened, 1);
            let expected: Vec<String> = (0..registered).map(|i| i.to_string()).collect();
            let seen = log.borrow().clone();
            prop_assert_eq!(seen, expected);
            prop_assert_eq!(bridge.call_depth(), 0);
        }
    }
}
