//! Development-time consistency checker.
//!
//! Runs once when registration is sealed with [`ConsistencyMode::Enforce`](crate::ConsistencyMode).
//! Verifies that no registration was rejected, that every declared routable
//! type is served by a router and that every router actually bound a
//! destination type.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::registry::BindingTable;

/// A consistency problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyIssue {
    pub subject: String,
    pub message: String,
}

impl ConsistencyIssue {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Consistency check result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    pub errors: Vec<ConsistencyIssue>,
    pub warnings: Vec<ConsistencyIssue>,
    /// False when the check was skipped.
    pub checked: bool,
}

impl ConsistencyReport {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn is_consistent(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, issue: ConsistencyIssue) {
        self.errors.push(issue);
    }

    pub fn add_warning(&mut self, issue: ConsistencyIssue) {
        self.warnings.push(issue);
    }

    /// Error messages, for embedding in a registry error.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Consistency checker over a binding table.
pub struct ConsistencyChecker<'a> {
    table: &'a BindingTable,
}

impl<'a> ConsistencyChecker<'a> {
    pub(crate) fn new(table: &'a BindingTable) -> Self {
        Self { table }
    }

    /// Run every check.
    pub fn check(&self) -> ConsistencyReport {
        let mut report = ConsistencyReport {
            checked: true,
            ..Default::default()
        };

        self.check_rejections(&mut report);
        self.check_routable_types(&mut report);
        self.check_routers(&mut report);
        self.check_protocols(&mut report);
        self.check_shared_types(&mut report);

        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Consistency check finished"
        );
        report
    }

    fn check_rejections(&self, report: &mut ConsistencyReport) {
        for rejection in self.table.rejections() {
            report.add_error(ConsistencyIssue::new(
                rejection.router.as_str(),
                format!("registration rejected: {}", rejection.reason),
            ));
        }
    }

    fn check_routable_types(&self, report: &mut ConsistencyReport) {
        for destination in self.table.routable() {
            let served = self
                .table
                .destinations()
                .any(|(bound, binding)| bound == destination && !binding.routers.is_empty());
            if !served {
                report.add_error(ConsistencyIssue::new(
                    destination.short_name(),
                    "declared routable but no router registered it",
                ));
            }
        }
    }

    fn check_routers(&self, report: &mut ConsistencyReport) {
        let mut routers: Vec<_> = self.table.routers().map(|(id, _)| id).collect();
        routers.sort();

        for id in routers {
            if self.table.destination_count(id) == 0 {
                report.add_error(ConsistencyIssue::new(
                    id.as_str(),
                    "router registered no destination type",
                ));
            }
        }
    }

    fn check_protocols(&self, report: &mut ConsistencyReport) {
        let services = self
            .table
            .services()
            .map(|(protocol, router)| (format!("service {}", protocol), router));
        let modules = self
            .table
            .modules()
            .map(|(protocol, router)| (format!("module {}", protocol), router));

        let mut unserved: Vec<_> = services
            .chain(modules)
            .filter(|(_, router)| self.table.destination_count(router) == 0)
            .collect();
        unserved.sort();

        for (subject, router) in unserved {
            report.add_warning(ConsistencyIssue::new(
                subject,
                format!("bound to router {} which serves no destination type", router),
            ));
        }
    }

    fn check_shared_types(&self, report: &mut ConsistencyReport) {
        for (destination, binding) in self.table.destinations() {
            if binding.routers.len() > 1 {
                let default = binding
                    .default_router()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                report.add_warning(ConsistencyIssue::new(
                    destination.short_name(),
                    format!(
                        "served by {} routers, {} is used by default",
                        binding.routers.len(),
                        default
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "checker_tests.rs"]
mod tests;
