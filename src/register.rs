//! Router registration for RouteKit.

use std::sync::Arc;

use tracing::{info, warn};

use routekit_config::RegistryConfig;
use routekit_core::{ConsistencyMode, RegistryOptions, ServiceRegistry};
use routekit_protocols::error::RegistryError;

use crate::demo;

/// Registry options from the `[registry]` section.
pub(crate) fn registry_options(config: &RegistryConfig) -> RegistryOptions {
    let consistency = if config.consistency_checks_enabled() {
        ConsistencyMode::Enforce
    } else {
        ConsistencyMode::Skip
    };
    RegistryOptions::default()
        .with_consistency(consistency)
        .with_max_recursion_depth(config.max_recursion_depth)
}

/// Build an open registry with every demo router and the configured routable types.
///
/// The caller seals it.
pub(crate) fn build_registry(config: &RegistryConfig) -> Result<Arc<ServiceRegistry>, RegistryError> {
    let registry = Arc::new(ServiceRegistry::with_options(registry_options(config)));

    registry.register_routers(demo::demo_routers())?;

    for name in &config.routable {
        match demo::routable_type(name) {
            Some(destination) => registry.declare_routable_type(destination)?,
            None => warn!(name = %name, "Unknown routable type in configuration, ignoring"),
        }
    }

    info!(
        routers = registry.bindings().routers.len(),
        consistency = ?registry.options().consistency,
        "Demo routers registered"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use routekit_core::RegistrationPhase;

    #[test]
    fn test_registry_options_from_config() {
        let config = RegistryConfig {
            consistency_checks: Some(false),
            max_recursion_depth: 12,
            routable: Vec::new(),
        };
        let options = registry_options(&config);
        assert_eq!(options.consistency, ConsistencyMode::Skip);
        assert_eq!(options.max_recursion_depth, 12);
    }

    #[test]
    fn test_build_and_seal_demo_registry() {
        let config = RegistryConfig {
            consistency_checks: Some(true),
            routable: vec!["LoginServiceImpl".to_string(), "Unknown".to_string()],
            ..Default::default()
        };
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.phase(), RegistrationPhase::Open);

        let report = registry.seal().unwrap();
        assert!(report.is_consistent());
        assert_eq!(registry.bindings().routers, vec!["login", "token"]);
    }
}
