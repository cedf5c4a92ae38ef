//! Read-only listing of registry bindings.

use serde::Serialize;

use super::BindingTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    ServiceProtocol,
    ModuleProtocol,
    Destination,
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingKind::ServiceProtocol => f.write_str("service"),
            BindingKind::ModuleProtocol => f.write_str("module"),
            BindingKind::Destination => f.write_str("type"),
        }
    }
}

/// One binding in a [`BindingSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingEntry {
    pub kind: BindingKind,
    pub subject: String,
    pub router: String,
    pub exclusive: bool,
    /// Other routers serving the same destination type.
    pub alternates: Vec<String>,
}

/// Sorted snapshot of every binding in a registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BindingSnapshot {
    pub entries: Vec<BindingEntry>,
    pub routers: Vec<String>,
}

impl BindingSnapshot {
    pub(crate) fn from_table(table: &BindingTable) -> Self {
        let mut entries = Vec::new();

        for (protocol, router) in table.services() {
            entries.push(BindingEntry {
                kind: BindingKind::ServiceProtocol,
                subject: protocol.short_name().to_string(),
                router: router.to_string(),
                exclusive: false,
                alternates: Vec::new(),
            });
        }

        for (protocol, router) in table.modules() {
            entries.push(BindingEntry {
                kind: BindingKind::ModuleProtocol,
                subject: protocol.short_name().to_string(),
                router: router.to_string(),
                exclusive: false,
                alternates: Vec::new(),
            });
        }

        for (destination, binding) in table.destinations() {
            let mut routers = binding.routers.iter().map(|id| id.to_string());
            let Some(router) = routers.next() else {
                continue;
            };
            entries.push(BindingEntry {
                kind: BindingKind::Destination,
                subject: destination.short_name().to_string(),
                router,
                exclusive: binding.exclusive,
                alternates: routers.collect(),
            });
        }

        entries.sort_by(|a, b| (a.kind, &a.subject).cmp(&(b.kind, &b.subject)));

        let mut routers: Vec<String> = table.routers().map(|(id, _)| id.to_string()).collect();
        routers.sort();

        Self { entries, routers }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Router bound to `subject` for the given kind.
    pub fn router_for(&self, kind: BindingKind, subject: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind && entry.subject == subject)
            .map(|entry| entry.router.as_str())
    }
}
