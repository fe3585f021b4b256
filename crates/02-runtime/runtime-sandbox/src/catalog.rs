//! Messaging type catalog served by the sandbox type registry.

use target_abi::TypeDescriptor;

/// One registry entry: the descriptor plus the property each positional
/// constructor argument initialises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub descriptor: TypeDescriptor,
    pub ctor_params: Vec<String>,
}

impl CatalogEntry {
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            ctor_params: Vec::new(),
        }
    }

    pub fn with_ctor_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctor_params.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

const CHANNEL_TYPES: [&str; 8] = [
    "mx.messaging.channels::AMFChannel",
    "mx.messaging.channels::HTTPChannel",
    "mx.messaging.channels::SecureAMFChannel",
    "mx.messaging.channels::SecureHTTPChannel",
    "mx.messaging.channels::SecureStreamingAMFChannel",
    "mx.messaging.channels::SecureStreamingHTTPChannel",
    "mx.messaging.channels::StreamingAMFChannel",
    "mx.messaging.channels::StreamingHTTPChannel",
];

/// Returns the registry of the messaging library: responders, channel sets,
/// producers and consumers, every channel flavour, messages and collections.
pub fn messaging_catalog() -> Vec<CatalogEntry> {
    let mut entries = vec![
        CatalogEntry::new(
            TypeDescriptor::new("mx.rpc::AsyncResponder")
                .with_methods(["result", "fault"])
                .with_properties(["token"]),
        )
        .with_ctor_params(["resultFunction", "faultFunction", "token"]),
        CatalogEntry::new(
            TypeDescriptor::new("mx.messaging::ChannelSet")
                .with_methods(["addChannel", "removeChannel", "disconnectAll"])
                .with_properties(["channels", "connected"]),
        ),
        CatalogEntry::new(
            TypeDescriptor::new("mx.messaging::Producer")
                .with_methods(["connect", "disconnect", "send"])
                .with_properties(["destination", "channelSet", "connected", "subtopic"]),
        ),
        CatalogEntry::new(
            TypeDescriptor::new("mx.messaging::Consumer")
                .with_methods(["subscribe", "unsubscribe", "receive", "disconnect"])
                .with_properties(["destination", "channelSet", "subscribed", "selector"]),
        ),
    ];

    entries.extend(CHANNEL_TYPES.iter().map(|name| {
        CatalogEntry::new(
            TypeDescriptor::new(*name)
                .with_methods(["connect", "disconnect"])
                .with_properties(["id", "uri", "connected"]),
        )
        .with_ctor_params(["id", "uri"])
    }));

    entries.extend([
        CatalogEntry::new(
            TypeDescriptor::new("mx.messaging.messages::AsyncMessage").with_properties([
                "body",
                "headers",
                "destination",
                "messageId",
                "timestamp",
            ]),
        ),
        CatalogEntry::new(
            TypeDescriptor::new("mx.collections::ArrayCollection")
                .with_methods([
                    "addItem",
                    "getItemAt",
                    "removeItemAt",
                    "removeAll",
                    "refresh",
                    "toArray",
                ])
                .with_properties(["length", "sort"]),
        ),
        CatalogEntry::new(
            TypeDescriptor::new("mx.collections::Sort")
                .with_methods(["reverse"])
                .with_properties(["fields", "unique"]),
        ),
        CatalogEntry::new(
            TypeDescriptor::new("mx.collections::SortField")
                .with_methods(["reverse"])
                .with_properties(["name", "caseInsensitive", "descending", "numeric"]),
        )
        .with_ctor_params(["name", "caseInsensitive", "descending", "numeric"]),
    ]);

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique() {
        let catalog = messaging_catalog();
        let names: HashSet<_> = catalog.iter().map(CatalogEntry::name).collect();
        assert_eq!(names.len(), catalog.len());
        assert_eq!(catalog.len(), 16);
    }

    #[test]
    fn ctor_params_map_to_declared_properties() {
        for entry in messaging_catalog() {
            for param in &entry.ctor_params {
                if entry.name() == "mx.rpc::AsyncResponder" && param != "token" {
                    continue;
                }
                assert!(
                    entry.descriptor.has_property(param),
                    "{} ctor param {param} is not a property",
                    entry.name()
                );
            }
        }
    }
}
