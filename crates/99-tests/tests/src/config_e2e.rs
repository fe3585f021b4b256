//! Configuration files flowing through embedding and member validation.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use bridge::{Bridge, BridgeConfig, BridgeError, Embedder, ProxyClass};
use parking_lot::Mutex;
use runtime_sandbox::SandboxRuntime;
use target_abi::TargetResult;

/// Embedder that remembers the image path before delegating to the sandbox.
struct PathRecorder {
    sandbox: SandboxRuntime,
    seen: Mutex<Vec<Option<PathBuf>>>,
}

impl Embedder for PathRecorder {
    fn embed(&self, path: Option<&Path>, bridge_name: &str) -> TargetResult<()> {
        self.seen.lock().push(path.map(Path::to_path_buf));
        self.sandbox.embed(path, bridge_name)
    }
}

fn write_config(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("bridge-e2e-{}-{name}.json", std::process::id()));
    fs::write(&path, body).expect("write config");
    path
}

#[test]
fn config_file_drives_name_path_and_validation() {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = write_config(
        "lax",
        r#"{"bridge_name":"messaging","loader_path":"lib/messaging.swf","strict_members":false}"#,
    );
    let config = BridgeConfig::from_path(&path).expect("config parses");
    let _ = fs::remove_file(&path);

    let sandbox = SandboxRuntime::detached();
    let embedder = PathRecorder {
        sandbox: sandbox.clone(),
        seen: Mutex::new(Vec::new()),
    };
    let bridge = Bridge::builder(sandbox.clone())
        .config(config)
        .build()
        .unwrap();

    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);
    bridge.load(&embedder, move |_| flag.set(true)).unwrap();
    assert_eq!(
        *embedder.seen.lock(),
        [Some(PathBuf::from("lib/messaging.swf"))]
    );
    assert_eq!(sandbox.bridge_name().as_deref(), Some("messaging"));

    bridge.signal_transport_ready();
    bridge.signal_registry_ready(sandbox.type_data()).unwrap();
    assert!(fired.get());

    let message = bridge
        .proxies()
        .unwrap()
        .create(ProxyClass::AsyncMessage, &[])
        .unwrap();
    sandbox.clear_journal();
    let err = message.get("priority").unwrap_err();
    assert_eq!(
        err,
        BridgeError::UnknownMember {
            type_name: ProxyClass::AsyncMessage.canonical_name().into(),
            member: "priority".into(),
        }
    );
    assert_eq!(sandbox.count_calls("getProperty"), 1, "lax config reaches the target");
    message.release().unwrap();
}

#[test]
fn invalid_config_file_is_rejected() {
    let path = write_config("empty-name", r#"{"bridge_name":""}"#);
    let err = BridgeConfig::from_path(&path).unwrap_err();
    let _ = fs::remove_file(&path);
    assert!(matches!(err, BridgeError::Config(_)));
}
