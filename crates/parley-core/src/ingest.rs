//! Ingestion Loop
//!
//! Reads messages off a transport one at a time and feeds them to a [`ChatSession`].
//!
//! ## Lifecycle
//!
//! ```text
//! AwaitingStream ──► Running ──► Closing ──► Terminated
//!        │
//!        └──► Faulted ──► Terminated
//! ```
//!
//! - `AwaitingStream`: the stream may be wired up by a peer thread after the loop is
//!   built, so opening it can block. If it never shows up the loop faults and `run`
//!   returns [`IngestError::StreamUnavailable`]; the caller is expected to terminate
//!   the process with the failure's exit code.
//! - `Running`: each message is handed to [`ChatSession::receive`], which registers the
//!   author before re-rendering. End-of-data and read failures both end the loop; a
//!   failed read is logged and otherwise treated like a graceful close.
//! - `Closing`: the shared [`RunFlag`] is flipped to stopped (exactly once across all
//!   threads) and the transport is closed on a best-effort basis.
//!
//! A loop runs once: [`IngestionLoop::run`] consumes it.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::errors::{IngestError, StartupFailure, TransportError};
use crate::session::ChatSession;
use crate::transport::MessageSource;

// ----------------------------------------------------------------------------
// Run Flag
// ----------------------------------------------------------------------------

/// Session-wide "still running" signal shared by cooperating threads
///
/// [`stop`](Self::stop) is the only write and is a single compare-and-swap, so exactly
/// one caller ever observes the running → stopped transition. Reads are plain loads; a
/// reader may see a stale `true` for at most one more iteration.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// Create a flag in the running state
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Flip to stopped; returns `true` only for the caller that performed the flip
    pub fn stop(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Loop State
// ----------------------------------------------------------------------------

/// Ingestion loop lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IngestState {
    AwaitingStream = 0,
    Running = 1,
    Closing = 2,
    Faulted = 3,
    Terminated = 4,
}

impl IngestState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => IngestState::AwaitingStream,
            1 => IngestState::Running,
            2 => IngestState::Closing,
            3 => IngestState::Faulted,
            _ => IngestState::Terminated,
        }
    }
}

/// Read-only view of a loop's current state, usable from other threads
#[derive(Debug, Clone)]
pub struct StateWatch(Arc<AtomicU8>);

impl StateWatch {
    pub fn get(&self) -> IngestState {
        IngestState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Why the running phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The peer closed the stream gracefully
    EndOfData,
    /// A read failed (I/O error or undecodable payload)
    ReadFailed(String),
    /// Another thread stopped the session
    Stopped,
}

/// Summary of a completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Messages received and recorded
    pub messages_received: usize,
    /// Authors registered for the first time during this run
    pub new_participants: usize,
    pub end_reason: EndReason,
    /// Whether this loop performed the running → stopped flip
    pub stopped_run_flag: bool,
    /// Every state the loop passed through, in order
    pub transitions: Vec<IngestState>,
}

// ----------------------------------------------------------------------------
// Ingestion Loop
// ----------------------------------------------------------------------------

/// Drives a [`ChatSession`] from a blocking [`MessageSource`]
pub struct IngestionLoop {
    session: Arc<ChatSession>,
    run_flag: RunFlag,
    state: Arc<AtomicU8>,
    transitions: Vec<IngestState>,
}

impl IngestionLoop {
    pub fn new(session: Arc<ChatSession>, run_flag: RunFlag) -> Self {
        Self {
            session,
            run_flag,
            state: Arc::new(AtomicU8::new(IngestState::AwaitingStream as u8)),
            transitions: vec![IngestState::AwaitingStream],
        }
    }

    pub fn state(&self) -> IngestState {
        IngestState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Handle for observing the state while the loop runs on another thread
    pub fn watch(&self) -> StateWatch {
        StateWatch(Arc::clone(&self.state))
    }

    /// Open the stream with `open` and ingest until it ends
    ///
    /// Only a failure to open the stream is returned as an error. Everything after that
    /// ends in `Terminated` with an [`IngestReport`].
    pub fn run<S, F>(mut self, open: F) -> Result<IngestReport, IngestError>
    where
        S: MessageSource,
        F: FnOnce() -> Result<S, TransportError>,
    {
        let mut source = match open() {
            Ok(source) => source,
            Err(e) => {
                error!(
                    "{}: unable to get input stream: {}",
                    StartupFailure::ClientInputStream,
                    e
                );
                self.transition(IngestState::Faulted);
                self.transition(IngestState::Terminated);
                return Err(IngestError::StreamUnavailable {
                    failure: StartupFailure::ClientInputStream,
                    reason: e.to_string(),
                });
            }
        };

        self.transition(IngestState::Running);
        info!(local = self.session.local_name(), "Ingestion loop running");

        let mut messages_received = 0;
        let mut new_participants = 0;
        let end_reason = loop {
            if !self.run_flag.is_running() {
                break EndReason::Stopped;
            }

            match source.read_next() {
                Ok(Some(message)) => {
                    messages_received += 1;
                    if self.session.receive(message) {
                        new_participants += 1;
                    }
                }
                Ok(None) => {
                    debug!("Input stream reached end of data");
                    break EndReason::EndOfData;
                }
                Err(e) => {
                    warn!("Input stream read failed: {}", e);
                    break EndReason::ReadFailed(e.to_string());
                }
            }
        };

        self.transition(IngestState::Closing);
        let stopped_run_flag = self.run_flag.stop();
        if stopped_run_flag {
            info!("Changing run state to stopped");
        }
        Self::cleanup(&mut source);
        self.transition(IngestState::Terminated);

        info!(
            messages_received,
            new_participants,
            reason = ?end_reason,
            "Ingestion loop terminated"
        );
        Ok(IngestReport {
            messages_received,
            new_participants,
            end_reason,
            stopped_run_flag,
            transitions: self.transitions,
        })
    }

    fn cleanup<S: MessageSource>(source: &mut S) {
        debug!("Closing input stream");
        if let Err(e) = source.close() {
            warn!("Failed to close input stream: {}", e);
        }
    }

    fn transition(&mut self, next: IngestState) {
        debug!(from = ?self.state(), to = ?next, "Ingestion state transition");
        self.state.store(next as u8, Ordering::Release);
        self.transitions.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::message::Message;
    use crate::render::MemoryRenderSink;
    use crate::transport::pipe;
    use crate::types::Timestamp;

    fn session() -> Arc<ChatSession> {
        Arc::new(
            ChatSession::new(SessionConfig::for_participant("alice"), MemoryRenderSink::new())
                .unwrap(),
        )
    }

    #[test]
    fn test_run_flag_stops_once() {
        let flag = RunFlag::new();
        let sibling = flag.clone();
        assert!(flag.is_running());
        assert!(sibling.stop());
        assert!(!flag.stop());
        assert!(!flag.is_running());
    }

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            IngestState::AwaitingStream,
            IngestState::Running,
            IngestState::Closing,
            IngestState::Faulted,
            IngestState::Terminated,
        ] {
            assert_eq!(IngestState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_end_of_data_terminates() {
        let (mut writer, reader) = pipe();
        writer.send(Message::new("bob", "hi", Timestamp::new(1))).unwrap();
        writer.finish();

        let ingestion = IngestionLoop::new(session(), RunFlag::new());
        let watch = ingestion.watch();
        let report = ingestion.run(|| Ok(reader)).unwrap();

        assert_eq!(report.messages_received, 1);
        assert_eq!(report.new_participants, 1);
        assert_eq!(report.end_reason, EndReason::EndOfData);
        assert!(report.stopped_run_flag);
        assert_eq!(watch.get(), IngestState::Terminated);
    }

    #[test]
    fn test_stopped_flag_skips_reading() {
        let (_writer, reader) = pipe();
        let flag = RunFlag::new();
        flag.stop();

        let report = IngestionLoop::new(session(), flag)
            .run(|| Ok(reader))
            .unwrap();
        assert_eq!(report.end_reason, EndReason::Stopped);
        assert!(!report.stopped_run_flag);
        assert_eq!(report.messages_received, 0);
    }
}
