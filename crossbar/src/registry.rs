//! Immutable service registry built once at construction.
//!
//! A [`ServiceRegistry`] maps service names to [`ServiceEntry`] values and
//! supports multiplexing several logical services behind one endpoint. The
//! empty service name denotes the default/unqualified service, matching
//! the `method` (no colon) call form.
//!
//! The registry is read-only after construction: dispatch takes no locks,
//! and hot method registration is out of scope.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::descriptor::FunctionDescriptor;
use crate::error::RegistryError;

/// The introspection surface a generated service implementation exposes.
///
/// The IDL compiler emits one implementation of this trait per service
/// struct; each returned [`FunctionDescriptor`] closes over the
/// implementation object, so every registered descriptor is
/// implementation-backed by construction.
pub trait RpcService: Send + Sync {
    /// Produce one descriptor per declared remote method.
    fn function_table(self: Arc<Self>) -> Vec<FunctionDescriptor>;
}

/// One logical service: an immutable method-name → descriptor map plus
/// the implementation objects it was built from.
pub struct ServiceEntry {
    functions: HashMap<String, FunctionDescriptor>,
    implementations: Vec<Arc<dyn RpcService>>,
}

impl ServiceEntry {
    /// Build an entry by introspecting the given implementations.
    ///
    /// When several implementations declare the same method name under one
    /// service, the last registered descriptor wins; the collision is
    /// logged at `warn` since it usually indicates a wiring mistake.
    fn new(service: &str, implementations: Vec<Arc<dyn RpcService>>) -> Self {
        let mut functions = HashMap::new();
        for implementation in &implementations {
            for descriptor in Arc::clone(implementation).function_table() {
                let name = descriptor.name().to_string();
                if functions.insert(name.clone(), descriptor).is_some() {
                    warn!(
                        service = service,
                        method = %name,
                        "duplicate method registration, last one wins"
                    );
                }
            }
        }
        ServiceEntry {
            functions,
            implementations,
        }
    }

    /// Look up a method descriptor by its bare name. Exact match only.
    pub fn function(&self, method: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(method)
    }

    /// All registered descriptors, keyed by bare method name.
    pub fn functions(&self) -> &HashMap<String, FunctionDescriptor> {
        &self.functions
    }

    /// The implementation objects this entry was built from.
    pub fn implementations(&self) -> &[Arc<dyn RpcService>] {
        &self.implementations
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("function_count", &self.functions.len())
            .field("implementation_count", &self.implementations.len())
            .finish()
    }
}

/// Immutable mapping from service name to [`ServiceEntry`].
pub struct ServiceRegistry {
    entries: HashMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    /// Build a registry serving a single unqualified service.
    ///
    /// The implementation is registered under the empty service name, so
    /// calls address its methods without a `service:` prefix.
    pub fn single(implementation: Arc<dyn RpcService>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            String::new(),
            ServiceEntry::new("", vec![implementation]),
        );
        ServiceRegistry { entries }
    }

    /// Build a multiplexed registry from a service-name → implementations
    /// mapping.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Empty`] if the mapping contains no
    /// services at all.
    pub fn multiplexed(
        implementations: HashMap<String, Vec<Arc<dyn RpcService>>>,
    ) -> Result<Self, RegistryError> {
        if implementations.is_empty() {
            return Err(RegistryError::Empty);
        }
        let entries = implementations
            .into_iter()
            .map(|(name, impls)| {
                let entry = ServiceEntry::new(&name, impls);
                (name, entry)
            })
            .collect();
        Ok(ServiceRegistry { entries })
    }

    /// Look up a service entry by name. The empty string addresses the
    /// default/unqualified service.
    pub fn entry(&self, service: &str) -> Option<&ServiceEntry> {
        self.entries.get(service)
    }

    /// Read-only view of all services being served.
    pub fn entries(&self) -> &HashMap<String, ServiceEntry> {
        &self.entries
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("service_count", &self.entries.len())
            .finish()
    }
}
