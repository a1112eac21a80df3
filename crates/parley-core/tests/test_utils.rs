//! Test utilities for Parley session core tests
//!
//! Scripted transports and recording sinks that make ingestion runs deterministic.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use parley_core::{CommandSink, Message, MessageSource, Timestamp, TransportError};

// ----------------------------------------------------------------------------
// Message Helpers
// ----------------------------------------------------------------------------

pub fn msg(author: &str, content: &str, ts: u64) -> Message {
    Message::new(author, content, Timestamp::new(ts))
}

pub fn notice(content: &str, ts: u64) -> Message {
    Message::notice(content, Timestamp::new(ts))
}

// ----------------------------------------------------------------------------
// Scripted Source
// ----------------------------------------------------------------------------

/// One scripted outcome of `read_next`
#[derive(Debug)]
pub enum Step {
    Deliver(Message),
    Fail(TransportError),
}

/// Transport that replays a fixed script, then reports end-of-data
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    closes: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    fail_close: bool,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            closes: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
            fail_close: false,
        }
    }

    /// Script that delivers `messages` in order
    pub fn delivering(messages: Vec<Message>) -> Self {
        Self::new(messages.into_iter().map(Step::Deliver).collect())
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Counter of `close` calls, readable after the source is consumed
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    /// Counter of `read_next` calls
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl MessageSource for ScriptedSource {
    fn read_next(&mut self) -> Result<Option<Message>, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(Step::Deliver(message)) => Ok(Some(message)),
            Some(Step::Fail(error)) => Err(error),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "socket already gone",
            )));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Recording Command Sink
// ----------------------------------------------------------------------------

/// Command sink that records every line; clones share the record
#[derive(Debug, Clone, Default)]
pub struct RecordingCommands {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl CommandSink for RecordingCommands {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}
