//! Route state and action types shared by routers and observers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Route state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RouteState {
    /// Created, not performed yet.
    Idle = 0,
    /// Looking up the router.
    Resolving = 1,
    /// Waiting for the router to construct the destination.
    Constructing = 2,
    /// Running the caller's preparation hook.
    Preparing = 3,
    /// Destination delivered.
    Completed = 4,
    /// Perform or remove failed.
    Failed = 5,
    /// Tearing the destination down.
    Removing = 6,
    /// Destination removed.
    Removed = 7,
}

impl RouteState {
    /// States a route can still move out of by itself.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            RouteState::Resolving
                | RouteState::Constructing
                | RouteState::Preparing
                | RouteState::Removing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RouteState::Failed | RouteState::Removed)
    }
}

impl From<u8> for RouteState {
    fn from(v: u8) -> Self {
        match v {
            0 => RouteState::Idle,
            1 => RouteState::Resolving,
            2 => RouteState::Constructing,
            3 => RouteState::Preparing,
            4 => RouteState::Completed,
            5 => RouteState::Failed,
            6 => RouteState::Removing,
            7 => RouteState::Removed,
            _ => RouteState::Failed,
        }
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteState::Idle => "idle",
            RouteState::Resolving => "resolving",
            RouteState::Constructing => "constructing",
            RouteState::Preparing => "preparing",
            RouteState::Completed => "completed",
            RouteState::Failed => "failed",
            RouteState::Removing => "removing",
            RouteState::Removed => "removed",
        };
        f.write_str(name)
    }
}

/// Route action an error is reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    Perform,
    Remove,
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteAction::Perform => f.write_str("perform"),
            RouteAction::Remove => f.write_str("remove"),
        }
    }
}

/// Unique route identifier, used for correlation in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(uuid::Uuid);

impl RouteId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RouteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
