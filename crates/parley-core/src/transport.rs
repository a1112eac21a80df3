//! Transport seams and concrete transports
//!
//! Inbound traffic is a blocking stream of discrete [`Message`] values
//! ([`MessageSource`]); outbound traffic is plain text commands ([`CommandSink`]).
//! Provided implementations:
//!
//! - [`JsonLinesSource`]: one JSON-encoded message per line over any `BufRead`
//! - [`LineCommandSink`]: newline-terminated commands over any `Write`
//! - [`pipe`]: an in-process endpoint pair for a producer thread feeding the loop
//! - [`StreamSlot`]: hand-off cell for a stream that a peer thread attaches later

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvError, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::errors::TransportError;
use crate::message::Message;

// ----------------------------------------------------------------------------
// Transport Traits
// ----------------------------------------------------------------------------

/// Blocking source of inbound messages
pub trait MessageSource: Send {
    /// Block until the next message arrives
    ///
    /// `Ok(None)` is the end-of-data marker sent on graceful close.
    fn read_next(&mut self) -> Result<Option<Message>, TransportError>;

    /// Release the underlying resources
    fn close(&mut self) -> Result<(), TransportError>;
}

impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    fn read_next(&mut self) -> Result<Option<Message>, TransportError> {
        (**self).read_next()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}

/// Destination for outbound text commands
pub trait CommandSink: Send {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;
}

// ----------------------------------------------------------------------------
// JSON Lines Source
// ----------------------------------------------------------------------------

type Closer = Box<dyn FnOnce() -> io::Result<()> + Send>;

/// Reads one JSON-encoded [`Message`] per line
///
/// Blank lines are skipped, EOF is end-of-data and a line that does not decode is a
/// [`TransportError::Malformed`].
pub struct JsonLinesSource<R> {
    reader: Option<R>,
    on_close: Option<Closer>,
    buffer: String,
}

impl<R: BufRead + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            on_close: None,
            buffer: String::new(),
        }
    }

    /// Run `closer` when the source is closed, e.g. to shut down a socket half
    pub fn with_closer<F>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        self.on_close = Some(Box::new(closer));
        self
    }
}

impl<R: BufRead + Send> MessageSource for JsonLinesSource<R> {
    fn read_next(&mut self) -> Result<Option<Message>, TransportError> {
        let reader = self.reader.as_mut().ok_or(TransportError::Closed)?;
        loop {
            self.buffer.clear();
            if reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }

            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }
            trace!(bytes = line.len(), "Decoding inbound line");
            return serde_json::from_str(line).map(Some).map_err(Into::into);
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.reader = None;
        if let Some(closer) = self.on_close.take() {
            closer()?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Line Command Sink
// ----------------------------------------------------------------------------

/// Writes each command as one newline-terminated line, flushing immediately
pub struct LineCommandSink<W> {
    writer: W,
}

impl<W: Write + Send> LineCommandSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> CommandSink for LineCommandSink<W> {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// In-Process Pipe
// ----------------------------------------------------------------------------

type Frame = Result<Message, TransportError>;

/// Create a connected in-process endpoint pair
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (PipeWriter { tx: Some(tx) }, PipeReader { rx: Some(rx) })
}

/// Producer end of a [`pipe`]
#[derive(Debug)]
pub struct PipeWriter {
    tx: Option<Sender<Frame>>,
}

impl PipeWriter {
    /// Deliver a message to the reader
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        self.push(Ok(message))
    }

    /// Deliver a read failure to the reader
    pub fn fail(&self, error: TransportError) -> Result<(), TransportError> {
        self.push(Err(error))
    }

    /// Signal end-of-data; the reader sees it after draining queued messages
    pub fn finish(&mut self) {
        self.tx = None;
    }

    fn push(&self, frame: Frame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// Consumer end of a [`pipe`]
#[derive(Debug)]
pub struct PipeReader {
    rx: Option<Receiver<Frame>>,
}

impl MessageSource for PipeReader {
    fn read_next(&mut self) -> Result<Option<Message>, TransportError> {
        let rx = self.rx.as_ref().ok_or(TransportError::Closed)?;
        match rx.recv() {
            Ok(frame) => frame.map(Some),
            Err(RecvError) => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.rx = None;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Stream Slot
// ----------------------------------------------------------------------------

/// Hand-off cell for a stream that is attached after the consumer exists
///
/// A peer thread [`install`](Self::install)s the stream; the consumer
/// [`wait`](Self::wait)s for it with a deadline.
pub struct StreamSlot<S> {
    inner: Arc<SlotInner<S>>,
}

struct SlotInner<S> {
    stream: Mutex<SlotState<S>>,
    ready: Condvar,
}

enum SlotState<S> {
    Empty,
    Installed(S),
    Taken,
}

impl<S> StreamSlot<S> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                stream: Mutex::new(SlotState::Empty),
                ready: Condvar::new(),
            }),
        }
    }

    /// Attach the stream; returns `false` if one was already attached
    pub fn install(&self, stream: S) -> bool {
        let mut state = self.inner.stream.lock();
        if !matches!(*state, SlotState::Empty) {
            return false;
        }
        *state = SlotState::Installed(stream);
        self.inner.ready.notify_all();
        debug!("Input stream installed");
        true
    }

    /// Block until a stream is installed or `timeout` elapses
    pub fn wait(&self, timeout: Duration) -> Result<S, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.stream.lock();
        loop {
            match std::mem::replace(&mut *state, SlotState::Taken) {
                SlotState::Installed(stream) => return Ok(stream),
                SlotState::Taken => {
                    return Err(TransportError::Unavailable {
                        reason: "input stream already taken".into(),
                    })
                }
                SlotState::Empty => *state = SlotState::Empty,
            }

            if self.inner.ready.wait_until(&mut state, deadline).timed_out()
                && matches!(*state, SlotState::Empty)
            {
                return Err(TransportError::Unavailable {
                    reason: format!("no input stream attached within {:?}", timeout),
                });
            }
        }
    }
}

impl<S> Clone for StreamSlot<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Default for StreamSlot<S> {
    fn default() -> Self {
        Self::new()
    }
}
