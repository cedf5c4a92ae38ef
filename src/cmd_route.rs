//! Route subcommand handlers for RouteKit.

use std::sync::Arc;

use tracing::{error, info};

use routekit_config::Config;
use routekit_core::{ConsistencyReport, ServiceRegistry};
use routekit_protocols::error::{ProtocolError, RegistryError, RouteError};
use routekit_protocols::RouteState;

use crate::cli::DemoService;
use crate::demo::{LoginModule, LoginService, PaymentService, TokenService};
use crate::register::build_registry;

/// Register, check and seal; print the consistency report.
pub(crate) fn check(config: &Config) -> Result<(), ProtocolError> {
    let registry = build_registry(&config.registry)?;

    let report = registry.check_consistency();
    print_report(&report);

    if !report.is_consistent() {
        return Err(RegistryError::ConsistencyCheckFailed {
            issues: report.error_messages(),
        }
        .into());
    }

    registry.seal()?;
    println!("Registry sealed: {} router(s).", registry.bindings().routers.len());
    Ok(())
}

/// Print the binding table of the sealed demo registry.
pub(crate) fn list(config: &Config, format: &str) -> Result<(), ProtocolError> {
    let registry = sealed_registry(config)?;
    let bindings = registry.bindings();

    if bindings.is_empty() {
        println!("No bindings registered.");
        return Ok(());
    }

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&bindings)?;
            println!("{}", json);
        }
        _ => {
            println!("{:<10} {:<24} {:<12} {:<10} {}", "KIND", "SUBJECT", "ROUTER", "EXCLUSIVE", "ALTERNATES");
            println!("{}", "-".repeat(80));
            for entry in &bindings.entries {
                let alternates = if entry.alternates.is_empty() {
                    "-".to_string()
                } else {
                    entry.alternates.join(", ")
                };
                println!(
                    "{:<10} {:<24} {:<12} {:<10} {}",
                    entry.kind.to_string(),
                    entry.subject,
                    entry.router,
                    if entry.exclusive { "yes" } else { "no" },
                    alternates
                );
            }
        }
    }

    Ok(())
}

/// Perform a route to a demo service and print the outcome.
pub(crate) async fn perform(
    config: &Config,
    service: DemoService,
    user: &str,
    remove: bool,
) -> Result<(), ProtocolError> {
    let registry = sealed_registry(config)?;

    registry.set_global_error_handler(|route, action, err| {
        error!(route = %route.id(), %action, error = %err, "Route failed");
        println!("[global] {} on {} failed: {} ({:?})", action, route.target(), err, err.code());
    });

    match service {
        DemoService::Login => perform_login(&registry, user, remove),
        DemoService::Token => perform_token(&registry, user).await,
        DemoService::Payment => perform_payment(&registry),
    }
}

fn perform_login(
    registry: &Arc<ServiceRegistry>,
    user: &str,
    remove: bool,
) -> Result<(), ProtocolError> {
    let request = registry.service::<dyn LoginService>();
    println!("Routing to LoginService (synchronous: {})", request.completes_synchronously());

    let user = user.to_string();
    let route = request.perform_with_configure_and_remove(
        move |configuration| {
            configuration
                .on_state_change(|from, to| println!("  {} -> {}", from, to))
                .on_success(move |destination| {
                    if let Some(login) = destination.view::<dyn LoginService>() {
                        match login.login(&user) {
                            Ok(session) => println!("Logged in: {}", session),
                            Err(e) => println!("Login rejected: {}", e),
                        }
                    }
                })
                .on_failure(|err| println!("Route failed: {}", err));
        },
        |removal| {
            removal.on_success(|| println!("Login destination removed."));
        },
    );

    let Some(route) = route else {
        return Err(RouteError::UnregisteredCapability("LoginService".to_string()).into());
    };
    if route.state() != RouteState::Completed {
        let error = route.error().unwrap_or_else(|| {
            RouteError::service_unavailable(route.router_name(), format!("route ended {}", route.state()))
        });
        return Err(error.into());
    }

    if let Some(module) = registry
        .module::<dyn LoginModule>()
        .make_destination()
        .and_then(|destination| destination.view::<dyn LoginModule>())
    {
        println!("Login module realm: {}", module.realm());
    }

    if remove {
        route.remove()?;
    }
    Ok(())
}

async fn perform_token(
    registry: &Arc<ServiceRegistry>,
    subject: &str,
) -> Result<(), ProtocolError> {
    let request = registry.service::<dyn TokenService>();
    println!("Routing to TokenService (synchronous: {})", request.completes_synchronously());

    let destination = request
        .make_destination_async(|destination| {
            info!(destination = destination.type_name(), "Preparing token issuer");
        })
        .await?;

    let issuer = destination.view::<dyn TokenService>().ok_or_else(|| {
        RouteError::service_unavailable("token", "destination has no TokenService view")
    })?;
    println!("Issued token: {}", issuer.issue(subject));
    Ok(())
}

fn perform_payment(registry: &Arc<ServiceRegistry>) -> Result<(), ProtocolError> {
    println!("Routing to PaymentService");
    match registry.service::<dyn PaymentService>().perform() {
        Some(route) => println!("Unexpected route: {:?}", route),
        None => println!("No router serves PaymentService."),
    }
    Ok(())
}

fn sealed_registry(config: &Config) -> Result<Arc<ServiceRegistry>, ProtocolError> {
    let registry = build_registry(&config.registry)?;
    let report = registry.seal()?;
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    Ok(registry)
}

fn print_report(report: &ConsistencyReport) {
    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("Consistency check passed.");
        return;
    }

    for issue in &report.errors {
        println!("error:   {}", issue);
    }
    for issue in &report.warnings {
        println!("warning: {}", issue);
    }
}
