//! The closed set of proxy classes and their constructor shapes.

use std::fmt;

use target_abi::{Args, CallbackId, Value};

/// A proxy type the bridge can construct or adopt.
///
/// Declaration order is the binding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProxyClass {
    AsyncResponder,
    ChannelSet,
    Producer,
    Consumer,
    AmfChannel,
    HttpChannel,
    SecureAmfChannel,
    SecureHttpChannel,
    SecureStreamingAmfChannel,
    SecureStreamingHttpChannel,
    StreamingAmfChannel,
    StreamingHttpChannel,
    AsyncMessage,
    ArrayCollection,
    Sort,
    SortField,
}

impl ProxyClass {
    pub const COUNT: usize = 16;

    pub const ALL: [ProxyClass; Self::COUNT] = [
        ProxyClass::AsyncResponder,
        ProxyClass::ChannelSet,
        ProxyClass::Producer,
        ProxyClass::Consumer,
        ProxyClass::AmfChannel,
        ProxyClass::HttpChannel,
        ProxyClass::SecureAmfChannel,
        ProxyClass::SecureHttpChannel,
        ProxyClass::SecureStreamingAmfChannel,
        ProxyClass::SecureStreamingHttpChannel,
        ProxyClass::StreamingAmfChannel,
        ProxyClass::StreamingHttpChannel,
        ProxyClass::AsyncMessage,
        ProxyClass::ArrayCollection,
        ProxyClass::Sort,
        ProxyClass::SortField,
    ];

    /// Fully-qualified type name in the target's registry.
    pub const fn canonical_name(self) -> &'static str {
        match self {
            ProxyClass::AsyncResponder => "mx.rpc::AsyncResponder",
            ProxyClass::ChannelSet => "mx.messaging::ChannelSet",
            ProxyClass::Producer => "mx.messaging::Producer",
            ProxyClass::Consumer => "mx.messaging::Consumer",
            ProxyClass::AmfChannel => "mx.messaging.channels::AMFChannel",
            ProxyClass::HttpChannel => "mx.messaging.channels::HTTPChannel",
            ProxyClass::SecureAmfChannel => "mx.messaging.channels::SecureAMFChannel",
            ProxyClass::SecureHttpChannel => "mx.messaging.channels::SecureHTTPChannel",
            ProxyClass::SecureStreamingAmfChannel => {
                "mx.messaging.channels::SecureStreamingAMFChannel"
            }
            ProxyClass::SecureStreamingHttpChannel => {
                "mx.messaging.channels::SecureStreamingHTTPChannel"
            }
            ProxyClass::StreamingAmfChannel => "mx.messaging.channels::StreamingAMFChannel",
            ProxyClass::StreamingHttpChannel => "mx.messaging.channels::StreamingHTTPChannel",
            ProxyClass::AsyncMessage => "mx.messaging.messages::AsyncMessage",
            ProxyClass::ArrayCollection => "mx.collections::ArrayCollection",
            ProxyClass::Sort => "mx.collections::Sort",
            ProxyClass::SortField => "mx.collections::SortField",
        }
    }

    /// Unqualified type name (the part after `::`).
    pub fn short_name(self) -> &'static str {
        let name = self.canonical_name();
        name.rsplit_once("::").map_or(name, |(_, short)| short)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_canonical_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.canonical_name() == name)
    }

    /// Whether an instance can wrap a handle the target already returned.
    pub fn supports_adopt(self) -> bool {
        matches!(self, ProxyClass::ArrayCollection)
    }

    /// Names of the positional constructor arguments.
    pub fn constructor_params(self) -> &'static [&'static str] {
        match self {
            ProxyClass::AsyncResponder => &["result", "fault", "token"],
            ProxyClass::SortField => &["name", "caseInsensitive", "descending", "numeric"],
            class if class.channel_kind().is_some() => &["id", "uri"],
            _ => &[],
        }
    }

    pub fn channel_kind(self) -> Option<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.proxy_class() == self)
    }
}

impl fmt::Display for ProxyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// The eight channel flavours; all take `(id, uri)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Amf,
    Http,
    SecureAmf,
    SecureHttp,
    SecureStreamingAmf,
    SecureStreamingHttp,
    StreamingAmf,
    StreamingHttp,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 8] = [
        ChannelKind::Amf,
        ChannelKind::Http,
        ChannelKind::SecureAmf,
        ChannelKind::SecureHttp,
        ChannelKind::SecureStreamingAmf,
        ChannelKind::SecureStreamingHttp,
        ChannelKind::StreamingAmf,
        ChannelKind::StreamingHttp,
    ];

    pub const fn proxy_class(self) -> ProxyClass {
        match self {
            ChannelKind::Amf => ProxyClass::AmfChannel,
            ChannelKind::Http => ProxyClass::HttpChannel,
            ChannelKind::SecureAmf => ProxyClass::SecureAmfChannel,
            ChannelKind::SecureHttp => ProxyClass::SecureHttpChannel,
            ChannelKind::SecureStreamingAmf => ProxyClass::SecureStreamingAmfChannel,
            ChannelKind::SecureStreamingHttp => ProxyClass::SecureStreamingHttpChannel,
            ChannelKind::StreamingAmf => ProxyClass::StreamingAmfChannel,
            ChannelKind::StreamingHttp => ProxyClass::StreamingHttpChannel,
        }
    }
}

/// Constructor arguments for a sort field. Unset flags are sent as `false`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SortFieldSpec {
    pub name: Option<String>,
    pub case_insensitive: bool,
    pub descending: bool,
    pub numeric: bool,
}

impl SortFieldSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn case_insensitive(mut self, on: bool) -> Self {
        self.case_insensitive = on;
        self
    }

    pub fn descending(mut self, on: bool) -> Self {
        self.descending = on;
        self
    }

    pub fn numeric(mut self, on: bool) -> Self {
        self.numeric = on;
        self
    }

    pub fn args(&self) -> Args {
        Args::from_iter([
            Value::from(self.name.clone()),
            Value::Bool(self.case_insensitive),
            Value::Bool(self.descending),
            Value::Bool(self.numeric),
        ])
    }
}

/// Constructor arguments for a responder: two host callbacks plus an optional token.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponderSpec {
    pub result: CallbackId,
    pub fault: CallbackId,
    pub token: Value,
}

impl ResponderSpec {
    pub fn new(result: CallbackId, fault: CallbackId) -> Self {
        Self {
            result,
            fault,
            token: Value::Null,
        }
    }

    pub fn with_token(mut self, token: impl Into<Value>) -> Self {
        self.token = token.into();
        self
    }

    /// Host functions the responder dispatches to.
    pub fn callbacks(&self) -> [CallbackId; 2] {
        [self.result, self.fault]
    }

    pub fn args(&self) -> Args {
        Args::from_iter([
            Value::Callback(self.result),
            Value::Callback(self.fault),
            self.token.clone(),
        ])
    }
}
