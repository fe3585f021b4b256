//! Type registry binding: resolves every proxy class against the target's
//! type registry before any of them may be constructed.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};
use target_abi::TypeDescriptor;

use crate::classes::ProxyClass;
use crate::error::{BridgeError, BridgeResult};

/// Descriptors delivered by the registry layer, keyed by canonical name.
#[derive(Debug, Default)]
pub struct TypeCache {
    entries: HashMap<String, TypeDescriptor>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: TypeDescriptor) {
        self.entries.insert(descriptor.name.clone(), descriptor);
    }

    pub fn add_all(&mut self, descriptors: impl IntoIterator<Item = TypeDescriptor>) {
        for descriptor in descriptors {
            self.add(descriptor);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One bound descriptor per proxy class, indexed by [`ProxyClass::index`].
#[derive(Debug)]
pub struct BoundClasses {
    descriptors: Vec<TypeDescriptor>,
}

impl BoundClasses {
    pub fn descriptor(&self, class: ProxyClass) -> &TypeDescriptor {
        &self.descriptors[class.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProxyClass, &TypeDescriptor)> {
        ProxyClass::ALL.into_iter().zip(self.descriptors.iter())
    }
}

/// Resolves every class, in registry order, through `lookup`.
///
/// The first failure is returned and nothing is kept, so a caller either gets
/// the complete table or no table at all.
pub fn bind_all<F>(mut lookup: F) -> BridgeResult<BoundClasses>
where
    F: FnMut(&str) -> BridgeResult<TypeDescriptor>,
{
    let mut descriptors = Vec::with_capacity(ProxyClass::COUNT);
    for class in ProxyClass::ALL {
        let name = class.canonical_name();
        let descriptor = lookup(name).map_err(|err| {
            warn!("binder: failed to resolve {name}: {err}");
            match err {
                BridgeError::Target(_) => BridgeError::UnknownType(name.to_owned()),
                other => other,
            }
        })?;
        if descriptor.name != name {
            warn!("binder: lookup for {name} returned {}", descriptor.name);
            return Err(BridgeError::UnknownType(name.to_owned()));
        }
        descriptors.push(descriptor);
    }
    debug!("binder: bound {} classes", descriptors.len());
    Ok(BoundClasses { descriptors })
}

/// Holds the binding table once a cycle has completed.
#[derive(Debug, Default)]
pub struct Binder {
    bound: Option<Rc<BoundClasses>>,
}

impl Binder {
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    pub fn bound(&self) -> Option<Rc<BoundClasses>> {
        self.bound.clone()
    }

    /// Installs `table` unless a previous cycle already completed; returns the
    /// table in force afterwards.
    pub fn install(&mut self, table: BoundClasses) -> Rc<BoundClasses> {
        match &self.bound {
            Some(existing) => {
                debug!("binder: already bound, keeping the existing table");
                Rc::clone(existing)
            }
            None => {
                let table = Rc::new(table);
                self.bound = Some(Rc::clone(&table));
                table
            }
        }
    }
}
