//! One-shot construction completion handle.

use std::fmt;
use std::sync::Arc;

use crate::destination::Destination;
use crate::error::ConstructionError;

/// Result a router reports for a construction request.
#[derive(Debug, Clone)]
pub enum ConstructionOutcome {
    Delivered(Destination),
    Unavailable(String),
    Failed(ConstructionError),
}

/// Trait implemented by routes to receive construction outcomes.
pub trait CompletionSink: Send + Sync {
    fn complete(&self, outcome: ConstructionOutcome);
}

/// Handle a router reports construction through, exactly once.
///
/// The handle is `Send`, so a router may move it onto another thread or task
/// and report later. Dropping it without reporting counts as
/// [`ConstructionOutcome::Unavailable`].
pub struct ConstructionCompletion {
    sink: Option<Arc<dyn CompletionSink>>,
}

impl ConstructionCompletion {
    pub fn new(sink: Arc<dyn CompletionSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Report the constructed destination.
    pub fn deliver(mut self, destination: Destination) {
        self.finish(ConstructionOutcome::Delivered(destination));
    }

    /// Report that no destination could be produced.
    pub fn unavailable(mut self, reason: impl Into<String>) {
        self.finish(ConstructionOutcome::Unavailable(reason.into()));
    }

    /// Report a construction error.
    pub fn fail(mut self, error: ConstructionError) {
        self.finish(ConstructionOutcome::Failed(error));
    }

    fn finish(&mut self, outcome: ConstructionOutcome) {
        if let Some(sink) = self.sink.take() {
            sink.complete(outcome);
        }
    }
}

impl Drop for ConstructionCompletion {
    fn drop(&mut self) {
        self.finish(ConstructionOutcome::Unavailable(
            "construction completion dropped without a result".to_string(),
        ));
    }
}

impl fmt::Debug for ConstructionCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionCompletion")
            .field("pending", &self.sink.is_some())
            .finish()
    }
}
