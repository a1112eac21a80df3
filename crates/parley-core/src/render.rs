//! Render sink seam
//!
//! The core never reads a rendered surface back. Each redisplay clears the sink and
//! rewrites the full projection; there is no incremental patching.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::errors::RenderError;
use crate::message::Message;

// ----------------------------------------------------------------------------
// Render Sink Trait
// ----------------------------------------------------------------------------

/// Destination for rendered messages (a terminal, a text widget, a test buffer)
pub trait RenderSink: Send {
    /// Remove all rendered content
    fn clear(&mut self) -> Result<(), RenderError>;

    /// Append one message after everything already rendered
    fn append(&mut self, message: &Message) -> Result<(), RenderError>;

    /// Called once after a full redisplay
    fn flush(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Rewrite `sink` with `messages`
///
/// Failures are logged and skipped so that one bad message cannot hide the rest.
/// Returns the number of messages the sink accepted.
pub fn render_all(sink: &mut dyn RenderSink, messages: &[Message]) -> usize {
    if let Err(e) = sink.clear() {
        warn!("Render sink failed to clear: {}", e);
    }

    let mut accepted = 0;
    for message in messages {
        match sink.append(message) {
            Ok(()) => accepted += 1,
            Err(e) => warn!("Render sink rejected message: {}", e),
        }
    }

    if let Err(e) = sink.flush() {
        warn!("Render sink failed to flush: {}", e);
    }
    accepted
}

// ----------------------------------------------------------------------------
// In-Memory Sink
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    lines: Vec<Message>,
    clears: usize,
    reject_remaining: usize,
}

/// Render sink that keeps rendered messages in memory
///
/// Clones share the same buffer, so one handle can be given to a session while another
/// inspects what was rendered.
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderSink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages currently rendered
    pub fn rendered(&self) -> Vec<Message> {
        self.state.lock().lines.clone()
    }

    /// Number of times the surface was cleared
    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }

    /// Reject the next `count` appends
    pub fn reject_next(&self, count: usize) {
        self.state.lock().reject_remaining = count;
    }
}

impl RenderSink for MemoryRenderSink {
    fn clear(&mut self) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.lines.clear();
        state.clears += 1;
        Ok(())
    }

    fn append(&mut self, message: &Message) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        if state.reject_remaining > 0 {
            state.reject_remaining -= 1;
            return Err(RenderError::Rejected {
                reason: "bad location".into(),
            });
        }
        state.lines.push(message.clone());
        Ok(())
    }
}
