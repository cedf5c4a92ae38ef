use super::*;
use std::sync::atomic::AtomicUsize;
use std::sync::mpsc;
use std::time::Duration;

use routekit_protocols::error::{ConstructionError, RegistryError};
use routekit_protocols::{RouteRegistrar, RoutableService, ServiceRoutable};

use crate::registry::{ConsistencyMode, RegistryOptions};
use crate::route::RouteRequest;

trait Mail: Send + Sync {
    fn unread(&self) -> usize;
}
impl ServiceRoutable for dyn Mail {}

trait Outgoing: Send + Sync {}
impl ServiceRoutable for dyn Outgoing {}

struct Inbox {
    unread: usize,
}
impl RoutableService for Inbox {}
impl Mail for Inbox {
    fn unread(&self) -> usize {
        self.unread
    }
}

struct Outbox;
impl RoutableService for Outbox {}
impl Outgoing for Outbox {}

struct Draft;
impl RoutableService for Draft {}

#[derive(Default)]
struct InboxRouter {
    built: AtomicUsize,
    removed: AtomicUsize,
    removable: bool,
    fail_removal: bool,
}

impl ServiceRouter for InboxRouter {
    fn name(&self) -> &str {
        "inbox"
    }

    fn register_routable_destination(
        &self,
        registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError> {
        registrar.register_service::<Inbox>()?;
        registrar.register_service_protocol::<dyn Mail>()
    }

    fn destination(
        &self,
        configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError> {
        self.built.fetch_add(1, Ordering::SeqCst);
        if configuration.param::<bool>("offline")? == Some(true) {
            return Ok(None);
        }
        let inbox = Arc::new(Inbox {
            unread: configuration.param("unread")?.unwrap_or(0),
        });
        Ok(Some(Destination::new(inbox.clone()).with_view::<dyn Mail>(inbox)))
    }

    fn default_configuration(&self, configuration: &mut ServiceRouteConfiguration) {
        configuration.set_param("unread", 3);
    }

    fn supports_removal(&self) -> bool {
        self.removable
    }

    fn remove_destination(
        &self,
        _destination: &Destination,
        _configuration: &RemoveConfiguration,
    ) -> Result<(), ConstructionError> {
        if self.fail_removal {
            return Err(ConstructionError::Failed("mailbox locked".to_string()));
        }
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Asynchronous router. `inline` reports from inside `construct`.
struct OutboxRouter {
    inline: bool,
}

impl ServiceRouter for OutboxRouter {
    fn name(&self) -> &str {
        "outbox"
    }

    fn register_routable_destination(
        &self,
        registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError> {
        registrar.register_service::<Outbox>()?;
        registrar.register_service_protocol::<dyn Outgoing>()
    }

    fn destination(
        &self,
        _configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError> {
        Ok(Some(Destination::new(Arc::new(Outbox))))
    }

    fn construct(&self, configuration: &ServiceRouteConfiguration, completion: ConstructionCompletion) {
        let destination = self.destination(configuration).ok().flatten();
        if self.inline {
            if let Some(destination) = destination {
                completion.deliver(destination);
            }
            return;
        }
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            match destination {
                Some(destination) => completion.deliver(destination),
                None => completion.unavailable("outbox missing"),
            }
        });
    }

    fn completes_synchronously(&self) -> bool {
        false
    }
}

/// Declares synchronous completion but keeps the completion for later.
#[derive(Default)]
struct StashingRouter {
    pending: Mutex<Option<ConstructionCompletion>>,
}

impl ServiceRouter for StashingRouter {
    fn name(&self) -> &str {
        "stash"
    }

    fn register_routable_destination(
        &self,
        registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError> {
        registrar.register_service::<Draft>()
    }

    fn destination(
        &self,
        _configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError> {
        Ok(Some(Destination::new(Arc::new(Draft))))
    }

    fn construct(&self, _configuration: &ServiceRouteConfiguration, completion: ConstructionCompletion) {
        *self.pending.lock() = Some(completion);
    }
}

/// Asynchronous router that loses its completion.
struct DroppingRouter;

impl ServiceRouter for DroppingRouter {
    fn name(&self) -> &str {
        "dropping"
    }

    fn register_routable_destination(
        &self,
        registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError> {
        registrar.register_service::<Draft>()
    }

    fn destination(
        &self,
        _configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError> {
        Ok(None)
    }

    fn construct(&self, _configuration: &ServiceRouteConfiguration, completion: ConstructionCompletion) {
        std::thread::spawn(move || drop(completion));
    }

    fn completes_synchronously(&self) -> bool {
        false
    }
}

fn sealed_with(options: RegistryOptions, routers: Vec<Arc<dyn ServiceRouter>>) -> Arc<ServiceRegistry> {
    let registry = Arc::new(ServiceRegistry::with_options(options));
    registry.register_routers(routers).unwrap();
    registry.seal().unwrap();
    registry
}

fn sealed(routers: Vec<Arc<dyn ServiceRouter>>) -> Arc<ServiceRegistry> {
    sealed_with(
        RegistryOptions::default().with_consistency(ConsistencyMode::Enforce),
        routers,
    )
}

fn count_global_errors(registry: &ServiceRegistry) -> Arc<Mutex<Vec<(RouteAction, RouteError)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    registry.set_global_error_handler(move |_route, action, error| {
        sink.lock().push((action, error.clone()));
    });
    seen
}

fn mail(registry: &Arc<ServiceRegistry>) -> RouteRequest {
    registry.service::<dyn Mail>()
}

#[test]
fn test_sync_route_walks_every_state() {
    let registry = sealed(vec![Arc::new(InboxRouter::default())]);
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let successes = Arc::new(AtomicUsize::new(0));

    let recorded = transitions.clone();
    let counter = successes.clone();
    let route = mail(&registry).route_with_configure(move |configuration| {
        configuration
            .on_state_change(move |from, to| recorded.lock().push((from, to)))
            .on_success(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
    });
    assert_eq!(route.state(), RouteState::Idle);

    route.perform().unwrap();

    assert_eq!(route.state(), RouteState::Completed);
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(
        *transitions.lock(),
        vec![
            (RouteState::Idle, RouteState::Resolving),
            (RouteState::Resolving, RouteState::Constructing),
            (RouteState::Constructing, RouteState::Preparing),
            (RouteState::Preparing, RouteState::Completed),
        ]
    );
    assert_eq!(route.router_name(), "inbox");
    assert!(route.completes_synchronously());
}

#[test]
fn test_router_defaults_then_caller_configuration() {
    let registry = sealed(vec![Arc::new(InboxRouter::default())]);

    let route = mail(&registry).perform().unwrap();
    let inbox = route.destination().unwrap().view::<dyn Mail>().unwrap();
    assert_eq!(inbox.unread(), 3);

    let route = mail(&registry)
        .perform_with_configure(|configuration| {
            configuration.set_param("unread", 7);
        })
        .unwrap();
    let inbox = route.destination().unwrap().view::<dyn Mail>().unwrap();
    assert_eq!(inbox.unread(), 7);
}

#[test]
fn test_unavailable_destination_fails_route() {
    let registry = sealed(vec![Arc::new(InboxRouter::default())]);
    let global = count_global_errors(&registry);
    let failures = Arc::new(AtomicUsize::new(0));

    let counter = failures.clone();
    let route = mail(&registry).route_with_configure(move |configuration| {
        configuration
            .set_param("offline", true)
            .on_failure(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .on_success(|_| panic!("offline inbox must not succeed"));
    });

    let error = route.perform().unwrap_err();
    assert!(matches!(error, RouteError::ServiceUnavailable { ref router, .. } if router == "inbox"));
    assert_eq!(route.state(), RouteState::Failed);
    assert!(route.destination().is_none());
    assert_eq!(failures.load(Ordering::SeqCst), 1);

    let global = global.lock();
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].0, RouteAction::Perform);
}

#[test]
fn test_declared_synchronous_router_that_never_reports() {
    let router = Arc::new(StashingRouter::default());
    let registry = sealed(vec![router.clone()]);

    let route = registry
        .destination::<Draft>()
        .route_with_configure(|configuration| {
            configuration.on_success(|_| panic!("late delivery must be ignored"));
        });
    let error = route.perform().unwrap_err();
    assert!(matches!(error, RouteError::ServiceUnavailable { .. }));
    assert_eq!(route.state(), RouteState::Failed);

    let completion = router.pending.lock().take().unwrap();
    completion.deliver(Destination::new(Arc::new(Draft)));
    assert_eq!(route.state(), RouteState::Failed);
    assert!(route.destination().is_none());
}

#[test]
fn test_async_inline_delivery_is_deferred() {
    let registry = sealed(vec![Arc::new(OutboxRouter { inline: true })]);
    let (tx, rx) = mpsc::channel();

    let tx = Mutex::new(tx);
    let route = registry
        .service::<dyn Outgoing>()
        .route_with_configure(move |configuration| {
            configuration.on_success(move |_| {
                let _ = tx.lock().send(std::thread::current().id());
            });
        });

    route.perform().unwrap();
    assert!(!route.completes_synchronously());

    let delivered_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(delivered_on, std::thread::current().id());
    assert_eq!(route.state(), RouteState::Completed);
    assert!(route.destination().unwrap().is::<Outbox>());
}

#[test]
fn test_async_delivery_from_worker_thread() {
    let registry = sealed(vec![Arc::new(OutboxRouter { inline: false })]);
    let (tx, rx) = mpsc::channel();

    let tx = Mutex::new(tx);
    let route = registry
        .service::<dyn Outgoing>()
        .perform_with_configure(move |configuration| {
            configuration.on_completion(move |result| {
                let _ = tx.lock().send(result.is_ok());
            });
        })
        .unwrap();

    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    assert_eq!(route.state(), RouteState::Completed);
}

#[test]
fn test_dropped_completion_fails_route() {
    let registry = sealed(vec![Arc::new(DroppingRouter)]);
    let global = count_global_errors(&registry);
    let (tx, rx) = mpsc::channel();

    let tx = Mutex::new(tx);
    let route = registry
        .destination::<Draft>()
        .perform_with_configure(move |configuration| {
            configuration.on_failure(move |error| {
                let _ = tx.lock().send(error.clone());
            });
        })
        .unwrap();

    let error = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(error.code(), routekit_protocols::ServiceRouteErrorCode::ServiceUnavailable);
    assert_eq!(route.state(), RouteState::Failed);
    assert_eq!(global.lock().len(), 1);
}

#[test]
fn test_second_perform_is_action_failed() {
    let router = Arc::new(InboxRouter::default());
    let registry = sealed(vec![router.clone()]);
    let global = count_global_errors(&registry);

    let completions = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::new(AtomicUsize::new(0));

    let completion_log = completions.clone();
    let failure_count = failures.clone();
    let route = mail(&registry)
        .perform_with_configure(move |configuration| {
            configuration
                .on_completion(move |result| completion_log.lock().push(result.is_ok()))
                .on_failure(move |_| {
                    failure_count.fetch_add(1, Ordering::SeqCst);
                });
        })
        .unwrap();
    let error = route.perform().unwrap_err();

    assert!(matches!(
        error,
        RouteError::ActionFailed {
            action: RouteAction::Perform,
            ..
        }
    ));
    assert_eq!(route.state(), RouteState::Completed);
    assert_eq!(router.built.load(Ordering::SeqCst), 1);
    assert_eq!(global.lock()[0].0, RouteAction::Perform);
    assert_eq!(*completions.lock(), vec![true]);
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert!(route.destination().is_some());
}

#[test]
fn test_reentrant_perform_is_infinite_recursion() {
    let registry = sealed(vec![Arc::new(InboxRouter::default())]);
    let global = count_global_errors(&registry);
    let slot: Arc<OnceLock<ServiceRoute>> = Arc::new(OnceLock::new());
    let nested = Arc::new(Mutex::new(None));

    let route_slot = slot.clone();
    let nested_result = nested.clone();
    let route = mail(&registry).route_with_configure(move |configuration| {
        configuration
            .prepare_destination(move |_| {
                if let Some(route) = route_slot.get() {
                    *nested_result.lock() = Some(route.perform());
                }
            })
            .on_success(|_| panic!("recursing route must not succeed"));
    });
    let _ = slot.set(route.clone());

    let error = route.perform().unwrap_err();
    assert!(matches!(error, RouteError::InfiniteRecursion(_)));
    assert_eq!(route.state(), RouteState::Failed);
    assert!(route.destination().is_none());
    assert!(matches!(
        nested.lock().take(),
        Some(Err(RouteError::InfiniteRecursion(_)))
    ));
    assert_eq!(global.lock().len(), 1);
}

#[test]
fn test_async_reentrant_perform_is_infinite_recursion() {
    for inline in [true, false] {
        let registry = sealed(vec![Arc::new(OutboxRouter { inline })]);
        let global = count_global_errors(&registry);
        let slot: Arc<OnceLock<ServiceRoute>> = Arc::new(OnceLock::new());
        let completions = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        let route_slot = slot.clone();
        let tx = Mutex::new(tx);
        let completion_count = completions.clone();
        let route = registry
            .service::<dyn Outgoing>()
            .route_with_configure(move |configuration| {
                configuration
                    .prepare_destination(move |_| {
                        if let Some(route) = route_slot.get() {
                            let _ = tx.lock().send(route.perform());
                        }
                    })
                    .on_completion(move |_| {
                        completion_count.fetch_add(1, Ordering::SeqCst);
                    });
            });
        let _ = slot.set(route.clone());

        route.perform().unwrap();

        let nested = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(
            matches!(nested, Err(RouteError::InfiniteRecursion(_))),
            "inline={inline}: {nested:?}"
        );
        assert_eq!(route.state(), RouteState::Failed);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(global.lock().len(), 1);
    }
}

fn perform_nested(request: &RouteRequest, depth: Arc<AtomicUsize>) -> Option<ServiceRoute> {
    let nested = request.clone();
    request.perform_with_configure(move |configuration| {
        configuration.prepare_destination(move |_| {
            depth.fetch_add(1, Ordering::SeqCst);
            perform_nested(&nested, depth.clone());
        });
    })
}

#[test]
fn test_nesting_beyond_limit_is_infinite_recursion() {
    let registry = sealed_with(
        RegistryOptions::default()
            .with_consistency(ConsistencyMode::Enforce)
            .with_max_recursion_depth(8),
        vec![Arc::new(InboxRouter::default())],
    );
    let global = count_global_errors(&registry);
    let depth = Arc::new(AtomicUsize::new(0));

    let route = perform_nested(&mail(&registry), depth.clone()).unwrap();

    assert_eq!(depth.load(Ordering::SeqCst), 8);
    assert_eq!(route.state(), RouteState::Completed);
    let global = global.lock();
    assert_eq!(global.len(), 1);
    assert!(matches!(global[0].1, RouteError::InfiniteRecursion(_)));
}

#[test]
fn test_remove_completed_route() {
    let router = Arc::new(InboxRouter {
        removable: true,
        ..Default::default()
    });
    let registry = sealed(vec![router.clone()]);
    let removed = Arc::new(AtomicUsize::new(0));

    let counter = removed.clone();
    let route = mail(&registry)
        .perform_with_configure_and_remove(
            |_| {},
            move |remove| {
                remove.on_success(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            },
        )
        .unwrap();

    route.remove().unwrap();
    assert_eq!(route.state(), RouteState::Removed);
    assert!(route.destination().is_none());
    assert_eq!(router.removed.load(Ordering::SeqCst), 1);
    assert_eq!(removed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_remove_unsupported() {
    let registry = sealed(vec![Arc::new(InboxRouter::default())]);
    let global = count_global_errors(&registry);

    let route = mail(&registry).perform().unwrap();
    let error = route.remove().unwrap_err();

    assert!(matches!(
        error,
        RouteError::ActionFailed {
            action: RouteAction::Remove,
            ..
        }
    ));
    assert_eq!(route.state(), RouteState::Completed);
    assert!(route.destination().is_some());
    assert_eq!(global.lock()[0].0, RouteAction::Remove);
}

#[test]
fn test_remove_idle_route() {
    let registry = sealed(vec![Arc::new(InboxRouter {
        removable: true,
        ..Default::default()
    })]);

    let route = mail(&registry).route_with_configure(|_| {});
    assert!(route.remove().is_err());
    assert_eq!(route.state(), RouteState::Idle);
}

#[test]
fn test_failed_removal() {
    let registry = sealed(vec![Arc::new(InboxRouter {
        removable: true,
        fail_removal: true,
        ..Default::default()
    })]);
    let failures = Arc::new(AtomicUsize::new(0));

    let route = mail(&registry).perform().unwrap();
    let counter = failures.clone();
    let error = route
        .remove_with_configure(move |remove| {
            remove.on_failure(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        })
        .unwrap_err();

    assert!(error.to_string().contains("mailbox locked"));
    assert_eq!(route.state(), RouteState::Failed);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unresolved_target_fails_route() {
    let registry = sealed(vec![Arc::new(InboxRouter::default())]);

    let route = registry
        .service::<dyn Outgoing>()
        .route_with_configure(|_| {});
    let error = route.perform().unwrap_err();

    assert!(matches!(error, RouteError::UnregisteredCapability(ref name) if name == "Outgoing"));
    assert_eq!(route.state(), RouteState::Failed);
    assert!(route.router().is_none());
    assert_eq!(route.router_name(), "service Outgoing");
}
