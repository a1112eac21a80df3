//! Chat application
//!
//! [`ChatApp`] owns one connected session: the ingestion thread reading the server's
//! JSON-lines stream, and the foreground loop turning typed lines into commands.
//! [`replay`] runs the same core offline over a transcript file.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use parley_core::{
    render_all, ChatSession, IngestError, IngestReport, IngestionLoop, JsonLinesSource,
    LineCommandSink, MemoryRenderSink, Message, MessageSource, ParleyError, RunFlag,
    SortCriterion, StartupFailure, StreamSlot, Timestamp,
};

use crate::commands::{ChatCommand, Flow};
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::terminal::TerminalRenderSink;

/// Hook that unblocks the ingestion thread's pending read
pub type Interrupt = Box<dyn FnOnce() + Send>;

// ----------------------------------------------------------------------------
// Chat Application
// ----------------------------------------------------------------------------

/// A running chat session with its ingestion thread
pub struct ChatApp {
    session: Arc<ChatSession>,
    run_flag: RunFlag,
    ingestion: JoinHandle<std::result::Result<IngestReport, IngestError>>,
    interrupt: Option<Interrupt>,
}

impl ChatApp {
    /// Connect to the configured server and start ingesting
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let address = format!("{}:{}", config.server.host, config.server.port);
        let stream = open_connection(&address, config.connect_timeout()).map_err(|e| {
            startup_failure(StartupFailure::ClientConnection, format!("{}: {}", address, e))
        })?;
        info!(%address, "Connected");

        let outbound = stream
            .try_clone()
            .map_err(|e| startup_failure(StartupFailure::ClientOutputStream, e))?;
        let inbound = stream
            .try_clone()
            .map_err(|e| startup_failure(StartupFailure::ClientInputStream, e))?;

        let sink = TerminalRenderSink::stdout()
            .colored(config.terminal.colored_output)
            .clear_screen(config.terminal.clear_screen);
        let session = ChatSession::new(config.session.clone(), sink)
            .map_err(ParleyError::from)?
            .with_command_sink(LineCommandSink::new(outbound));

        let closer = stream
            .try_clone()
            .map_err(|e| startup_failure(StartupFailure::ClientInputStream, e))?;
        let source = JsonLinesSource::new(BufReader::new(inbound))
            .with_closer(move || closer.shutdown(Shutdown::Read));

        let interrupt: Interrupt = Box::new(move || {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("Socket already shut down: {}", e);
            }
        });

        Self::start(
            Arc::new(session),
            config.session.stream_wait_timeout(),
            Box::new(source),
            Some(interrupt),
        )
    }

    /// Spawn the ingestion thread and hand it `source`
    ///
    /// The thread starts waiting for its stream before the stream is installed, so a
    /// slow producer only costs up to `stream_wait`.
    pub fn start(
        session: Arc<ChatSession>,
        stream_wait: Duration,
        source: Box<dyn MessageSource>,
        interrupt: Option<Interrupt>,
    ) -> Result<Self> {
        let run_flag = RunFlag::new();
        let slot: StreamSlot<Box<dyn MessageSource>> = StreamSlot::new();

        let ingestion = IngestionLoop::new(Arc::clone(&session), run_flag.clone());
        let waiting = slot.clone();
        let notices = Arc::clone(&session);
        let stopper = run_flag.clone();
        let handle = thread::Builder::new()
            .name("parley-ingest".into())
            .spawn(move || {
                let outcome = ingestion.run(|| waiting.wait(stream_wait));
                announce_end(&notices, &stopper, &outcome);
                outcome
            })?;

        if !slot.install(source) {
            warn!("Input stream was already installed");
        }

        Ok(Self {
            session,
            run_flag,
            ingestion: handle,
            interrupt,
        })
    }

    pub fn session(&self) -> &Arc<ChatSession> {
        &self.session
    }

    /// Read commands from `input` until `/quit`, end of input or the server leaving
    ///
    /// Listings go to `out`. Failed commands are logged and the loop carries on.
    pub fn run<R: BufRead, W: Write>(self, input: R, out: &mut W) -> Result<IngestReport> {
        self.session.rerender();

        for line in input.lines() {
            let line = line?;
            if !self.run_flag.is_running() {
                info!("Session ended by the server");
                break;
            }

            let command = match line.parse::<ChatCommand>() {
                Ok(command) => command,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            match command.apply(&self.session, out) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => warn!("Command failed: {}", e),
            }
        }

        self.shutdown()
    }

    /// Say bye, stop the session and wait for the ingestion thread
    pub fn shutdown(mut self) -> Result<IngestReport> {
        if let Err(e) = self.session.quit() {
            warn!("Failed to send bye: {}", e);
        }
        if self.run_flag.stop() {
            info!("Changing run state to stopped");
        }
        if let Some(interrupt) = self.interrupt.take() {
            interrupt();
        }

        let outcome = self
            .ingestion
            .join()
            .map_err(|_| CliError::Operation("ingestion thread panicked".into()))?;
        Ok(outcome?)
    }
}

/// Tell the user when the session ended without them asking
///
/// The input loop only notices the stopped run flag after the next line, so the notice
/// says to press Enter. A stream that never arrived also stops the session.
fn announce_end(
    session: &ChatSession,
    run_flag: &RunFlag,
    outcome: &std::result::Result<IngestReport, IngestError>,
) {
    let text = match outcome {
        Ok(report) if report.stopped_run_flag => "Disconnected from server, press Enter to exit",
        Ok(_) => return,
        Err(_) => {
            run_flag.stop();
            "Input stream unavailable, press Enter to exit"
        }
    };
    warn!("{}", text);
    session.receive(Message::notice(text, Timestamp::now()));
}

fn open_connection(address: &str, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = io::Error::new(io::ErrorKind::NotFound, "address did not resolve");
    for addr in address.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

fn startup_failure(failure: StartupFailure, reason: impl std::fmt::Display) -> CliError {
    CliError::Startup {
        failure,
        reason: reason.to_string(),
    }
}

// ----------------------------------------------------------------------------
// Offline Replay
// ----------------------------------------------------------------------------

/// Ingest the transcript at `path` and print the resulting view to `out`
pub fn replay<W: Write + Send>(
    config: &AppConfig,
    path: &Path,
    sort: Option<SortCriterion>,
    only: &[String],
    out: &mut W,
) -> Result<IngestReport> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open transcript {}", path.display()))?;
    replay_from(config, BufReader::new(file), sort, only, out)
}

/// [`replay`] over any buffered reader
pub fn replay_from<R, W>(
    config: &AppConfig,
    reader: R,
    sort: Option<SortCriterion>,
    only: &[String],
    out: &mut W,
) -> Result<IngestReport>
where
    R: BufRead + Send,
    W: Write + Send,
{
    let session = Arc::new(
        ChatSession::new(config.session.clone(), MemoryRenderSink::new())
            .map_err(ParleyError::from)?,
    );
    let report = IngestionLoop::new(Arc::clone(&session), RunFlag::new())
        .run(|| Ok(JsonLinesSource::new(reader)))?;

    if let Some(criterion) = sort {
        session.sort_by(criterion);
    }
    if !only.is_empty() {
        let ranks = only.iter().filter_map(|name| {
            let rank = session.registry().index_of(name);
            if rank.is_none() {
                warn!(%name, "Unknown participant");
            }
            rank
        });
        session.set_selection(ranks.collect());
        session.set_filter(true);
    }

    let mut sink = TerminalRenderSink::new(out).colored(config.terminal.colored_output);
    render_all(&mut sink, &session.projection());
    Ok(report)
}
