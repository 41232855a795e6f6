//! The interception registry - which primitives are currently wrapped.
//!
//! Instead of ad hoc reassignment of global bindings, wrapping is governed
//! by an explicit registry: primitives are installed once at session start
//! and can be uninstalled at session end. A wrapper whose primitive is not
//! installed forwards calls unmodified even while tracing is active.

use std::collections::BTreeSet;

use parking_lot::RwLock;

/// Identifier of an interceptable asynchronous primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Primitive {
    /// Network-style one-shot asynchronous call.
    AsyncCall,

    /// Synchronous call wrapper.
    SyncCall,

    /// One-shot deferred callback (timeout).
    Timeout,

    /// Repeating deferred callback (interval).
    Interval,

    /// Event-listener registration.
    EventListener,

    /// Host-reported error ingestion.
    HostError,
}

impl Primitive {
    /// Every primitive the engine knows how to wrap.
    pub const ALL: [Primitive; 6] = [
        Primitive::AsyncCall,
        Primitive::SyncCall,
        Primitive::Timeout,
        Primitive::Interval,
        Primitive::EventListener,
        Primitive::HostError,
    ];
}

/// Thread-safe installed-set for interception.
#[derive(Debug, Default)]
pub struct Registry {
    installed: RwLock<BTreeSet<Primitive>>,
}

impl Registry {
    /// Create a registry with nothing installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every primitive installed.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for primitive in Primitive::ALL {
            registry.install(primitive);
        }
        registry
    }

    /// Install a primitive. Returns `false` if it was already installed.
    pub fn install(&self, primitive: Primitive) -> bool {
        self.installed.write().insert(primitive)
    }

    /// Uninstall a primitive. Returns `false` if it was not installed.
    pub fn uninstall(&self, primitive: Primitive) -> bool {
        self.installed.write().remove(&primitive)
    }

    /// Uninstall everything (session end).
    pub fn uninstall_all(&self) {
        self.installed.write().clear();
    }

    /// Whether a primitive is currently installed.
    pub fn is_installed(&self, primitive: Primitive) -> bool {
        self.installed.read().contains(&primitive)
    }

    /// The currently installed primitives, in stable order.
    pub fn installed(&self) -> Vec<Primitive> {
        self.installed.read().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_install_everything() {
        let registry = Registry::with_defaults();
        for primitive in Primitive::ALL {
            assert!(registry.is_installed(primitive));
        }
    }

    #[test]
    fn install_uninstall_round_trip() {
        let registry = Registry::new();
        assert!(!registry.is_installed(Primitive::Timeout));

        assert!(registry.install(Primitive::Timeout));
        assert!(!registry.install(Primitive::Timeout));
        assert!(registry.is_installed(Primitive::Timeout));

        assert!(registry.uninstall(Primitive::Timeout));
        assert!(!registry.uninstall(Primitive::Timeout));
        assert!(!registry.is_installed(Primitive::Timeout));
    }

    #[test]
    fn uninstall_all_reverses_session_install() {
        let registry = Registry::with_defaults();
        registry.uninstall_all();
        assert!(registry.installed().is_empty());
    }
}
