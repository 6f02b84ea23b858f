// Communication channels for game automation
use super::types::AutomationEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Helper function to create the event channel. The bot thread holds the sink
/// and the caller drains the receiver.
pub fn create_automation_channels() -> (EventSink, mpsc::UnboundedReceiver<AutomationEvent>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (EventSink::new(event_tx), event_rx)
}

/// Sending half of the event channel. Sends never block, and a dropped
/// receiver is not an error for the bot.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AutomationEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<AutomationEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: AutomationEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Automation event dropped, receiver closed");
        }
    }

    pub fn log(&self, line: impl Into<String>) {
        self.send(AutomationEvent::Log(line.into()));
    }

    pub fn error(&self, line: impl Into<String>) {
        self.send(AutomationEvent::Error(line.into()));
    }
}

/// Shared stop flag, polled by the run loop at every step boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before a new run
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
