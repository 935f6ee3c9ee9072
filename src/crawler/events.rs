//! Run events and cooperative cancellation
//!
//! A run reports progress over an ordered, one-way channel: any number of
//! `Status` events followed by exactly one terminal event.

use crate::crawler::result::CrawlResult;
use crate::TrawlError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted while a run executes
#[derive(Debug)]
pub enum CrawlEvent {
    /// Human-readable state transition ("Fetching ...", "Extracting...")
    Status(String),
    /// Run completed; carries the full result
    Finished(CrawlResult),
    /// Run aborted; carries the cause
    Failed(TrawlError),
}

impl CrawlEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Failed(_))
    }
}

/// Shared flag checked before every page fetch
///
/// Setting it never interrupts a request already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Logs status text and forwards it to an optional listener
#[derive(Debug, Clone, Default)]
pub(crate) struct StatusReporter {
    tx: Option<UnboundedSender<CrawlEvent>>,
}

impl StatusReporter {
    pub(crate) fn new(tx: Option<UnboundedSender<CrawlEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn status(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{}", text);
        self.send(CrawlEvent::Status(text));
    }

    pub(crate) fn send(&self, event: CrawlEvent) {
        if let Some(tx) = &self.tx {
            // A listener that went away must not abort the run
            let _ = tx.send(event);
        }
    }
}
