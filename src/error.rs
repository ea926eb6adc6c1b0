//! The analyzer's error sum and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::warning::Warning;

/// Errors surfaced by [`Analyzer::analyze`](crate::analyzer::Analyzer::analyze)
/// and the document accessors.
///
/// Cancellation is deliberately a distinct variant rather than a kind of
/// failure, so callers can pattern-match it at every await-equivalent site.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// The caller's [`CancelToken`] was triggered.
    #[error("analysis cancelled")]
    Cancelled,

    /// A document-level failure carrying the warning that describes it.
    #[error("{0}")]
    Document(Warning),
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }

    /// The warning carried by a document failure, if any.
    pub fn warning(&self) -> Option<&Warning> {
        match self {
            AnalysisError::Document(warning) => Some(warning),
            AnalysisError::Cancelled => None,
        }
    }
}

impl From<Warning> for AnalysisError {
    fn from(warning: Warning) -> Self {
        AnalysisError::Document(warning)
    }
}

/// A cooperative cancellation handle.
///
/// Triggering the token makes in-flight `analyze` calls observing it return
/// [`AnalysisError::Cancelled`] at their next checkpoint. Producers that
/// already completed keep their results in the snapshot's cache, so a
/// concurrent non-cancelled analysis is unaffected.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisError, CancelToken};

    #[test]
    fn token_trips_once_cancelled() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check(), Err(AnalysisError::Cancelled)));
        assert!(token.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
