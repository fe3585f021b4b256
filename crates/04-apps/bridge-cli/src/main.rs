//! Command-line driver for the object proxy bridge, run against the in-process sandbox.

use anyhow::{Context, Result};
use bridge::{Bridge, BridgeConfig, ChannelKind, Layer, ProxyClass, SortFieldSpec, Value};
use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use runtime_sandbox::SandboxRuntime;
use serde::Serialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Text rendering helpers used by the CLI commands.
mod render {
    use bridge::{ProxyClass, ProxyHandle, Transition, Value};
    use serde::Serialize;

    /// One JSON object per line.
    pub fn ndjson<T: Serialize>(event: &T) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        Ok(line)
    }

    pub fn transition(transition: Transition) -> &'static str {
        match transition {
            Transition::Unchanged => "unchanged",
            Transition::Signalled => "signalled",
            Transition::BarrierOpened => "barrier_opened",
        }
    }

    /// Format the registry listing: binding index, canonical name, constructor shape.
    pub fn classes(classes: &[ProxyClass]) -> String {
        let mut out = String::new();
        for class in classes {
            out.push_str(&format!(
                "{:02}  {}({})",
                class.index(),
                class.canonical_name(),
                class.constructor_params().join(", ")
            ));
            if class.supports_adopt() {
                out.push_str(" [adopt]");
            }
            out.push('\n');
        }
        out
    }

    pub fn created(class: ProxyClass, handle: ProxyHandle) -> String {
        format!("created {class} as {handle}\n")
    }

    /// Format a decoded value compactly for terminal output.
    pub fn value(v: &Value) -> String {
        match v {
            Value::Null => "null".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("{s:?}"),
            Value::Array(items) => {
                let inner: Vec<_> = items.iter().map(value).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Handle(handle) => handle.to_string(),
            Value::Callback(id) => id.to_string(),
        }
    }

    /// Format per-operation boundary call counts, skipping operations never seen.
    pub fn call_counts(counts: &[(&str, usize)]) -> String {
        let parts: Vec<_> = counts
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(op, count)| format!("{op}={count}"))
            .collect();
        format!("boundary calls: {}\n", parts.join(" "))
    }
}

/// Drive the object proxy bridge against a sandboxed target runtime.
#[derive(Parser, Debug)]
#[command(author, version, about = "Exercise the object proxy bridge", long_about = None)]
struct Cli {
    /// JSON bridge configuration (bridge_name, loader_path, strict_members).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the readiness handshake and print an NDJSON event log.
    Boot {
        /// Which layer signals ready first.
        #[arg(long, value_enum, default_value_t = Order::TransportFirst)]
        order: Order,
        /// Remove a type from the sandbox registry before booting.
        #[arg(long, value_name = "TYPE")]
        without: Option<String>,
    },
    /// List the proxy classes in binding order.
    Classes,
    /// Wire a producer and consumer to a channel set and sort a collection of quotes.
    Demo {
        /// Field the collection is sorted by.
        #[arg(long, default_value = "symbol")]
        sort_by: String,
        /// Sort in descending order.
        #[arg(long)]
        descending: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Order {
    /// Transport layer first, then the type registry.
    TransportFirst,
    /// Type registry first, then the transport layer.
    RegistryFirst,
}

impl Order {
    fn layers(self) -> [Layer; 2] {
        match self {
            Order::TransportFirst => [Layer::Transport, Layer::Registry],
            Order::RegistryFirst => [Layer::Registry, Layer::Transport],
        }
    }
}

/// One line of the `boot` event log.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum BootEvent {
    Loaded {
        bridge: String,
    },
    Signal {
        layer: &'static str,
        transition: &'static str,
    },
    Failed {
        layer: &'static str,
        error: String,
    },
    Construct {
        class: &'static str,
        handle: Option<u32>,
        error: Option<String>,
    },
    Ready {
        bridge: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Boot { order, without } => {
            for event in boot(config, order, without.as_deref())? {
                print!("{}", render::ndjson(&event).context("serialize boot event")?);
            }
        }
        Command::Classes => print!("{}", render::classes(&ProxyClass::ALL)),
        Command::Demo {
            sort_by,
            descending,
        } => {
            let spec = SortFieldSpec::named(sort_by).descending(descending);
            for line in demo(config, &spec)? {
                print!("{line}");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    match path {
        Some(path) => {
            BridgeConfig::from_path(path).with_context(|| format!("failed to load config {path:?}"))
        }
        None => Ok(BridgeConfig::default()),
    }
}

/// Embeds a fresh sandbox under `config` and registers `on_ready`.
fn embed(
    config: BridgeConfig,
    on_ready: impl FnOnce(&Bridge) + 'static,
) -> Result<(SandboxRuntime, Bridge)> {
    let sandbox = SandboxRuntime::detached();
    let bridge = Bridge::builder(sandbox.clone())
        .config(config)
        .build()
        .context("invalid bridge configuration")?;
    bridge
        .load(&sandbox, on_ready)
        .context("failed to embed the target runtime")?;
    Ok((sandbox, bridge))
}

fn layer_name(layer: Layer) -> &'static str {
    match layer {
        Layer::Transport => "transport",
        Layer::Registry => "registry",
    }
}

fn boot(config: BridgeConfig, order: Order, without: Option<&str>) -> Result<Vec<BootEvent>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let (sandbox, bridge) = embed(config, move |bridge| {
        sink.borrow_mut().push(BootEvent::Ready {
            bridge: bridge.bridge_name().to_owned(),
        });
    })?;
    if let Some(type_name) = without {
        sandbox.unregister(type_name);
    }
    events.borrow_mut().push(BootEvent::Loaded {
        bridge: bridge.bridge_name().to_owned(),
    });

    for layer in order.layers() {
        let outcome = match layer {
            Layer::Transport => Ok(bridge.signal_transport_ready()),
            Layer::Registry => bridge.signal_registry_ready(sandbox.type_data()),
        };
        let event = match outcome {
            Ok(transition) => BootEvent::Signal {
                layer: layer_name(layer),
                transition: render::transition(transition),
            },
            Err(err) => BootEvent::Failed {
                layer: layer_name(layer),
                error: err.to_string(),
            },
        };
        events.borrow_mut().push(event);

        let probe = try_construct(&bridge)?;
        events.borrow_mut().push(probe);
    }

    let log = events.borrow().clone();
    Ok(log)
}

/// Attempts one collection construction and releases it again.
fn try_construct(bridge: &Bridge) -> Result<BootEvent> {
    let class = ProxyClass::ArrayCollection;
    let attempt = bridge
        .proxies()
        .and_then(|proxies| proxies.array_collection());
    Ok(match attempt {
        Ok(list) => {
            let handle = list.handle().raw();
            list.release().context("failed to release probe collection")?;
            BootEvent::Construct {
                class: class.short_name(),
                handle: Some(handle),
                error: None,
            }
        }
        Err(err) => BootEvent::Construct {
            class: class.short_name(),
            handle: None,
            error: Some(err.to_string()),
        },
    })
}

const QUOTES: [&str; 3] = ["MSFT", "AAPL", "GOOG"];

fn demo(config: BridgeConfig, spec: &SortFieldSpec) -> Result<Vec<String>> {
    let (sandbox, bridge) = embed(config, |bridge| {
        debug!("demo: bridge `{}` ready", bridge.bridge_name());
    })?;
    bridge.signal_transport_ready();
    bridge
        .signal_registry_ready(sandbox.type_data())
        .context("failed to bind proxy classes")?;
    let proxies = bridge.proxies().context("bridge never became ready")?;
    let mut lines = Vec::new();

    let channels = proxies.channel_set()?;
    let amf = proxies.channel(ChannelKind::Amf, "my-amf", "/messagebroker/amf")?;
    let streaming = proxies.channel(
        ChannelKind::StreamingAmf,
        "my-streaming-amf",
        "/messagebroker/streamingamf",
    )?;
    for channel in [&amf, &streaming] {
        channels
            .invoke("addChannel", &[channel.to_value()])
            .with_context(|| format!("failed to add {} to the channel set", channel.class()))?;
        lines.push(render::created(channel.class(), channel.handle()));
    }

    let producer = proxies.producer()?;
    let consumer = proxies.consumer()?;
    for endpoint in [&producer, &consumer] {
        endpoint.set("destination", "quotes")?;
        endpoint.set("channelSet", channels.to_value())?;
        lines.push(render::created(endpoint.class(), endpoint.handle()));
    }
    consumer.invoke("subscribe", &[])?;

    let message = proxies.async_message()?;
    message.set("body", QUOTES.join(","))?;
    producer
        .invoke("send", &[message.to_value()])
        .context("producer rejected the message")?;

    let field = proxies.sort_field(spec)?;
    let sort = proxies.sort()?;
    sort.set("fields", Value::Array(vec![field.to_value()]))?;
    let list = proxies.array_collection()?;
    for quote in QUOTES {
        list.invoke("addItem", &[Value::from(quote)])?;
    }
    list.set("sort", sort.to_value())?;
    list.invoke("refresh", &[]).context("failed to apply the sort")?;
    lines.push(render::created(list.class(), list.handle()));
    lines.push(format!(
        "items: {}\n",
        render::value(&list.invoke("toArray", &[])?)
    ));

    for proxy in [
        message, list, sort, field, consumer, producer, streaming, amf, channels,
    ] {
        proxy.release()?;
    }

    let ops = [
        "createObject",
        "getTypeDescriptor",
        "invokeMethod",
        "getProperty",
        "setProperty",
        "addRef",
        "release",
        "evictFromCache",
    ];
    let counts: Vec<_> = ops.iter().map(|op| (*op, sandbox.count_calls(op))).collect();
    lines.push(render::call_counts(&counts));
    Ok(lines)
}
