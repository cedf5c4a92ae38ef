//! Registration lifecycle and registry options.

use serde::{Deserialize, Serialize};

/// Registration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RegistrationPhase {
    /// Routers may still be registered; nothing can be resolved.
    Open = 0,
    /// Bindings are frozen and readable without locking.
    Sealed = 1,
}

impl From<u8> for RegistrationPhase {
    fn from(v: u8) -> Self {
        match v {
            1 => RegistrationPhase::Sealed,
            _ => RegistrationPhase::Open,
        }
    }
}

/// How consistency errors are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Conflicting registrations are errors and `seal` runs the checker.
    Enforce,
    /// Conflicts are logged, the first binding wins, the checker never runs.
    Skip,
}

impl Default for ConsistencyMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ConsistencyMode::Enforce
        } else {
            ConsistencyMode::Skip
        }
    }
}

/// Registry options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryOptions {
    pub consistency: ConsistencyMode,
    /// Maximum nesting of performs on one thread before reporting infinite recursion.
    pub max_recursion_depth: usize,
}

impl RegistryOptions {
    pub fn with_consistency(mut self, consistency: ConsistencyMode) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            consistency: ConsistencyMode::default(),
            max_recursion_depth: 200,
        }
    }
}
