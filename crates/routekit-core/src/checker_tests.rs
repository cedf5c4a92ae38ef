use super::*;
use std::sync::Arc;

use routekit_protocols::error::{ConstructionError, RegistryError};
use routekit_protocols::{
    Destination, DestinationType, RoutableService, RouteBinding, RouteRegistrar, RouterId,
    ServiceProtocol, ServiceRouteConfiguration, ServiceRoutable, ServiceRouter,
};

struct EmptyRouter(&'static str);

impl ServiceRouter for EmptyRouter {
    fn name(&self) -> &str {
        self.0
    }

    fn register_routable_destination(
        &self,
        _registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError> {
        Ok(())
    }

    fn destination(
        &self,
        _configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError> {
        Ok(None)
    }
}

struct Mailbox;
impl RoutableService for Mailbox {}

struct Calendar;
impl RoutableService for Calendar {}

trait Agenda {}
impl ServiceRoutable for dyn Agenda {}

fn bind(table: &mut BindingTable, router: &str, destination: DestinationType) {
    table
        .bind(
            &RouterId::from(router),
            RouteBinding::Destination {
                destination,
                exclusive: false,
            },
        )
        .unwrap();
}

#[test]
fn test_empty_table_is_consistent() {
    let table = BindingTable::default();
    let report = ConsistencyChecker::new(&table).check();
    assert!(report.is_consistent());
    assert!(report.checked);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_missing_router_for_routable_type() {
    let mut table = BindingTable::default();
    table.insert_router(Arc::new(EmptyRouter("mail"))).unwrap();
    bind(&mut table, "mail", DestinationType::of::<Mailbox>());
    table.declare_routable(DestinationType::of::<Mailbox>());
    table.declare_routable(DestinationType::of::<Calendar>());

    let report = ConsistencyChecker::new(&table).check();
    assert!(!report.is_consistent());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].subject, "Calendar");
}

#[test]
fn test_router_without_destinations() {
    let mut table = BindingTable::default();
    table.insert_router(Arc::new(EmptyRouter("idle"))).unwrap();

    let report = ConsistencyChecker::new(&table).check();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].subject, "idle");
    assert!(report.error_messages()[0].contains("no destination type"));
}

#[test]
fn test_shared_type_is_a_warning() {
    let mut table = BindingTable::default();
    table.insert_router(Arc::new(EmptyRouter("a"))).unwrap();
    table.insert_router(Arc::new(EmptyRouter("b"))).unwrap();
    bind(&mut table, "a", DestinationType::of::<Mailbox>());
    bind(&mut table, "b", DestinationType::of::<Mailbox>());

    let report = ConsistencyChecker::new(&table).check();
    assert!(report.is_consistent());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("a is used by default"));
}

#[test]
fn test_skipped_report() {
    let report = ConsistencyReport::skipped();
    assert!(report.is_consistent());
    assert!(!report.checked);
}

#[test]
fn test_issue_display() {
    let issue = ConsistencyIssue::new("Mailbox", "declared routable but no router registered it");
    assert_eq!(
        issue.to_string(),
        "Mailbox: declared routable but no router registered it"
    );
}

#[test]
fn test_protocol_on_router_without_destinations() {
    let mut table = BindingTable::default();
    table.insert_router(Arc::new(EmptyRouter("idle"))).unwrap();
    table
        .bind(
            &RouterId::from("idle"),
            RouteBinding::ServiceProtocol(ServiceProtocol::of::<dyn Agenda>()),
        )
        .unwrap();

    let report = ConsistencyChecker::new(&table).check();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].subject, "service Agenda");
}
