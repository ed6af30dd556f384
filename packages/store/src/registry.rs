//! Process-wide registry mapping URI schemes to store constructors.

use std::collections::HashMap;
use std::sync::RwLock;

use lazy_static::lazy_static;
use url::Url;

use crate::{DocumentStore, Error};

/// A constructor turning a parsed connection URI into a store.
pub type StoreFactory = fn(&Url) -> Result<Box<dyn DocumentStore>, Error>;

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, StoreFactory>> = RwLock::new(HashMap::new());
}

/// Maps a URI scheme to a factory that creates stores for that scheme.
///
/// Backend crates expose a `register()` function that calls this once for
/// their scheme; call those (or the facade's `register_builtin_stores`)
/// during startup, before any [`new_store`] lookup. Schemes are never
/// unregistered.
///
/// # Panics
///
/// Panics if the scheme is already registered. Double registration is a
/// programming error, not a runtime condition.
pub fn register_store(scheme: &str, factory: StoreFactory) {
    // The guard is released before panicking so a caught double-register
    // panic cannot poison the registry for the rest of the process.
    let duplicate = {
        let mut schemes = REGISTRY.write().expect("store registry lock poisoned");
        if schemes.contains_key(scheme) {
            true
        } else {
            schemes.insert(scheme.to_string(), factory);
            false
        }
    };
    if duplicate {
        panic!("register_store called twice for scheme {:?}", scheme);
    }
}

/// Takes a connection URI for a storage system of some kind and returns a
/// store backed by that system, using the factory registered for the URI's
/// scheme.
pub fn new_store(uri: &str) -> Result<Box<dyn DocumentStore>, Error> {
    let parsed = Url::parse(uri).map_err(|err| Error::Uri {
        uri: uri.to_string(),
        message: err.to_string(),
    })?;

    let factory = {
        let schemes = REGISTRY.read().expect("store registry lock poisoned");
        schemes.get(parsed.scheme()).copied()
    };

    match factory {
        Some(factory) => factory(&parsed),
        None => Err(Error::UnknownScheme {
            scheme: parsed.scheme().to_string(),
        }),
    }
}
