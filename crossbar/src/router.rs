//! Flat method-name resolution.
//!
//! Incoming calls carry a single flat name of the form
//! `[service ":"] method`. The router splits it on the first colon,
//! resolves the service entry and then the function descriptor with exact
//! string matching, and rejects everything else with a single
//! `UnknownMethod` failure. The caller is deliberately not told whether
//! the service or the method part was wrong.

use tracing::warn;

use crate::descriptor::FunctionDescriptor;
use crate::error::DispatchError;
use crate::registry::{ServiceEntry, ServiceRegistry};

/// Split a flat method name into `(service, bare_method)`.
///
/// Splits on the first colon only, so nested names stay intact:
/// `"svcA:ns:foo"` resolves to service `"svcA"`, method `"ns:foo"`. A
/// name without a colon addresses the default service (empty name).
pub fn split_method_name(method: &str) -> (&str, &str) {
    match method.split_once(':') {
        Some((service, bare)) => (service, bare),
        None => ("", method),
    }
}

/// Resolve a flat method name against the registry.
///
/// Both lookups are O(1) amortized hash-map gets with exact,
/// case-sensitive matching.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownMethod`] when the service or the
/// method does not exist, and defensively for a descriptor that carries
/// no implementation (a registry-contract violation that must not crash
/// the server).
pub fn resolve<'a>(
    registry: &'a ServiceRegistry,
    method: &str,
) -> Result<(&'a ServiceEntry, &'a FunctionDescriptor), DispatchError> {
    let (service_name, bare_method) = split_method_name(method);

    let unknown = || DispatchError::UnknownMethod {
        method: method.to_string(),
    };

    let entry = registry.entry(service_name).ok_or_else(unknown)?;
    let descriptor = entry.function(bare_method).ok_or_else(unknown)?;

    if !descriptor.has_implementation() {
        // Should never happen given how entries are constructed.
        warn!(method = method, "descriptor without implementation reached the router");
        return Err(unknown());
    }

    Ok((entry, descriptor))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::descriptor::CallArgs;
    use crate::registry::RpcService;

    fn no_args(_raw: &[Value]) -> Result<CallArgs, DispatchError> {
        Ok(CallArgs::new(()))
    }

    struct FixedService {
        descriptors: Vec<&'static str>,
    }

    impl RpcService for FixedService {
        fn function_table(self: Arc<Self>) -> Vec<FunctionDescriptor> {
            self.descriptors
                .iter()
                .map(|name| {
                    FunctionDescriptor::blocking(*name, false, no_args, |_| Ok(Value::Null))
                })
                .collect()
        }
    }

    struct GhostService;

    impl RpcService for GhostService {
        fn function_table(self: Arc<Self>) -> Vec<FunctionDescriptor> {
            vec![FunctionDescriptor::without_implementation(
                "ghost", false, no_args,
            )]
        }
    }

    fn test_registry() -> ServiceRegistry {
        let mut implementations: HashMap<String, Vec<Arc<dyn RpcService>>> = HashMap::new();
        implementations.insert(
            String::new(),
            vec![Arc::new(FixedService {
                descriptors: vec!["ping"],
            })],
        );
        implementations.insert(
            "calc".to_string(),
            vec![Arc::new(FixedService {
                descriptors: vec!["add", "ns:scoped"],
            })],
        );
        ServiceRegistry::multiplexed(implementations).expect("registry")
    }

    #[test]
    fn test_split_with_service_prefix() {
        assert_eq!(split_method_name("svcA:foo"), ("svcA", "foo"));
    }

    #[test]
    fn test_split_without_colon_uses_default_service() {
        assert_eq!(split_method_name("foo"), ("", "foo"));
    }

    #[test]
    fn test_split_only_on_first_colon() {
        assert_eq!(split_method_name("svcA:ns:foo"), ("svcA", "ns:foo"));
    }

    #[test]
    fn test_resolve_default_service_method() {
        let registry = test_registry();
        let (_, descriptor) = resolve(&registry, "ping").expect("resolve ping");
        assert_eq!(descriptor.name(), "ping");
    }

    #[test]
    fn test_resolve_qualified_method() {
        let registry = test_registry();
        let (_, descriptor) = resolve(&registry, "calc:add").expect("resolve calc:add");
        assert_eq!(descriptor.name(), "add");
    }

    #[test]
    fn test_resolve_method_containing_colon() {
        let registry = test_registry();
        let (_, descriptor) = resolve(&registry, "calc:ns:scoped").expect("resolve nested");
        assert_eq!(descriptor.name(), "ns:scoped");
    }

    #[test]
    fn test_resolve_unknown_service() {
        let registry = test_registry();
        let error = resolve(&registry, "unknown:thing").expect_err("should fail");
        assert_eq!(
            error,
            DispatchError::UnknownMethod {
                method: "unknown:thing".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_unknown_method_in_known_service() {
        let registry = test_registry();
        let error = resolve(&registry, "calc:missing").expect_err("should fail");
        assert_eq!(
            error,
            DispatchError::UnknownMethod {
                method: "calc:missing".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_is_exact_match_only() {
        let registry = test_registry();
        // No prefix or fuzzy matching.
        assert!(resolve(&registry, "pin").is_err());
        assert!(resolve(&registry, "pingg").is_err());
        assert!(resolve(&registry, "Ping").is_err());
        assert!(resolve(&registry, "Calc:add").is_err());
    }

    #[test]
    fn test_resolve_unbacked_descriptor_reports_unknown() {
        let registry = ServiceRegistry::single(Arc::new(GhostService));
        let error = resolve(&registry, "ghost").expect_err("should fail");
        assert_eq!(
            error,
            DispatchError::UnknownMethod {
                method: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_returns_registered_descriptor_for_all_pairs() {
        let registry = test_registry();
        for (service, entry) in registry.entries() {
            for (name, _) in entry.functions() {
                let full = if service.is_empty() {
                    name.clone()
                } else {
                    format!("{}:{}", service, name)
                };
                let (resolved_entry, descriptor) =
                    resolve(&registry, &full).expect("registered pair resolves");
                assert_eq!(descriptor.name(), name);
                assert!(std::ptr::eq(resolved_entry, entry));
            }
        }
    }
}
