//! Chat session
//!
//! [`ChatSession`] composes the registry, the message log, the ordering policy, the
//! filter flag and the selection snapshot, and owns the render and command sinks. It is
//! shared (`Arc`) between the ingestion thread and whatever thread drives the UI; every
//! administrative operation ends by re-rendering the full projection.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::errors::{ConfigError, TransportError};
use crate::log::MessageLog;
use crate::message::Message;
use crate::ordering::{OrderingPolicy, SortCriterion};
use crate::projector::{project, survives_removal, Selection};
use crate::registry::NameRegistry;
use crate::render::{render_all, RenderSink};
use crate::transport::CommandSink;

// ----------------------------------------------------------------------------
// Chat Session
// ----------------------------------------------------------------------------

/// Shared state of one connected chat session
pub struct ChatSession {
    config: SessionConfig,
    registry: NameRegistry,
    log: MessageLog,
    policy: OrderingPolicy,
    filter_enabled: AtomicBool,
    selection: RwLock<Selection>,
    sink: Mutex<Box<dyn RenderSink>>,
    commands: Mutex<Option<Box<dyn CommandSink>>>,
    bye_sent: AtomicBool,
}

impl ChatSession {
    /// Create a session rendering into `sink`
    ///
    /// The local participant is registered immediately.
    pub fn new<K>(config: SessionConfig, sink: K) -> Result<Self, ConfigError>
    where
        K: RenderSink + 'static,
    {
        Self::with_registry(config, sink, NameRegistry::new())
    }

    /// Create a session around a pre-built registry (typically one with listeners)
    pub fn with_registry<K>(
        config: SessionConfig,
        sink: K,
        registry: NameRegistry,
    ) -> Result<Self, ConfigError>
    where
        K: RenderSink + 'static,
    {
        config.validate()?;
        registry.add(&config.local_name);

        Ok(Self {
            policy: OrderingPolicy::by(config.initial_order),
            filter_enabled: AtomicBool::new(config.filter_enabled),
            registry,
            log: MessageLog::new(),
            selection: RwLock::new(Selection::new()),
            sink: Mutex::new(Box::new(sink)),
            commands: Mutex::new(None),
            bye_sent: AtomicBool::new(false),
            config,
        })
    }

    /// Attach the outbound command stream
    pub fn with_command_sink<C>(self, commands: C) -> Self
    where
        C: CommandSink + 'static,
    {
        *self.commands.lock() = Some(Box::new(commands));
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn local_name(&self) -> &str {
        &self.config.local_name
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn policy(&self) -> &OrderingPolicy {
        &self.policy
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled.load(Ordering::Acquire)
    }

    /// Current selection snapshot
    pub fn selection(&self) -> Selection {
        self.selection.read().clone()
    }

    /// Whether selection-based actions (filter, remove, kick) have anything to act on
    pub fn has_selection(&self) -> bool {
        !self.selection.read().is_empty()
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Record an inbound message and re-render
    ///
    /// The author is registered before the projection is computed, so the new message is
    /// already visible to the filter. Returns `true` if the author was new.
    pub fn receive(&self, message: Message) -> bool {
        let new_participant = match message.author() {
            Some(author) if !self.registry.contains(author) => self.registry.add(author),
            _ => false,
        };
        if new_participant {
            info!(author = message.author().unwrap_or_default(), "New participant");
        }

        self.log.append(message);
        self.rerender();
        new_participant
    }

    // ------------------------------------------------------------------------
    // Projection
    // ------------------------------------------------------------------------

    /// Messages that should currently be on screen
    pub fn projection(&self) -> Vec<Message> {
        let selection = self.selection.read();
        project(
            &self.log,
            &self.registry,
            &selection,
            self.filter_enabled(),
            &self.policy,
        )
    }

    /// Recompute the projection and rewrite the render sink
    ///
    /// The sink lock is held across computation and rendering so concurrent re-renders
    /// cannot leave an older projection on screen.
    pub fn rerender(&self) -> usize {
        let mut sink = self.sink.lock();
        let messages = self.projection();
        render_all(sink.as_mut(), &messages)
    }

    // ------------------------------------------------------------------------
    // Administrative Surface
    // ------------------------------------------------------------------------

    /// Replace the selection snapshot
    ///
    /// Only re-renders when the filter is on, since that is the only view it affects.
    pub fn set_selection(&self, selection: Selection) {
        debug!(selected = selection.len(), "Selection changed");
        *self.selection.write() = selection;
        if self.filter_enabled() {
            self.rerender();
        }
    }

    /// Remove every message from the log
    pub fn clear_messages(&self) {
        self.log.clear();
        self.rerender();
    }

    /// Drop the selected participants' messages from the log
    ///
    /// Authorless messages are dropped as well. Messages appended while the removal runs
    /// are filtered too, never discarded. Returns how many messages were removed.
    pub fn remove_selected(&self) -> usize {
        let selection = self.selection();
        let removed = self
            .log
            .retain(|message| survives_removal(&self.registry, &selection, message));
        info!(removed, "Removed messages of selected participants");
        self.rerender();
        removed
    }

    pub fn set_filter(&self, enabled: bool) {
        self.filter_enabled.store(enabled, Ordering::Release);
        debug!(enabled, "Selection filter toggled");
        self.rerender();
    }

    /// Flip the filter flag, returning the new value
    pub fn toggle_filter(&self) -> bool {
        let enabled = !self.filter_enabled.fetch_xor(true, Ordering::AcqRel);
        debug!(enabled, "Selection filter toggled");
        self.rerender();
        enabled
    }

    /// Sort by `criterion` alone
    pub fn sort_by(&self, criterion: SortCriterion) {
        self.policy.select_only(criterion);
        debug!(%criterion, "Sort order changed");
        self.rerender();
    }

    /// Ask the server to kick every selected participant except ourselves
    ///
    /// The registry is left alone; the server's own traffic decides who is gone.
    /// Returns the names a kick was sent for.
    pub fn kick_selected(&self) -> Result<Vec<String>, TransportError> {
        let targets: Vec<String> = self
            .selection
            .read()
            .ranks()
            .filter_map(|rank| self.registry.element_at(rank))
            .filter(|name| name != &self.config.local_name)
            .collect();

        for name in &targets {
            self.send_command(&format!("{} {}", self.config.kick_prefix, name))?;
        }
        info!(count = targets.len(), "Kick requested");
        Ok(targets)
    }

    /// Send a chat line; empty text is ignored and reported as `false`
    pub fn send_text(&self, text: &str) -> Result<bool, TransportError> {
        if text.is_empty() {
            return Ok(false);
        }
        self.send_command(text)?;
        Ok(true)
    }

    /// Send the bye command
    ///
    /// Only the first call sends anything; later calls return `Ok(false)`. Does not touch
    /// the render sink, so it still works while the UI is being torn down.
    pub fn quit(&self) -> Result<bool, TransportError> {
        if self.bye_sent.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        info!("Sending bye");
        self.send_command(&self.config.bye_command)?;
        Ok(true)
    }

    fn send_command(&self, line: &str) -> Result<(), TransportError> {
        let mut commands = self.commands.lock();
        let sink = commands.as_mut().ok_or_else(|| TransportError::Unavailable {
            reason: "no outbound command stream attached".into(),
        })?;
        sink.send_line(line).inspect_err(|e| {
            warn!("Failed to send command: {}", e);
        })
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("local_name", &self.config.local_name)
            .field("participants", &self.registry.size())
            .field("messages", &self.log.len())
            .field("filter_enabled", &self.filter_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryRenderSink;
    use crate::types::Timestamp;

    fn session() -> (ChatSession, MemoryRenderSink) {
        let sink = MemoryRenderSink::new();
        let session =
            ChatSession::new(SessionConfig::for_participant("alice"), sink.clone()).unwrap();
        (session, sink)
    }

    #[test]
    fn test_local_participant_registered() {
        let (session, _) = session();
        assert_eq!(session.registry().names(), vec!["alice"]);
    }

    #[test]
    fn test_receive_registers_and_renders() {
        let (session, sink) = session();
        assert!(session.receive(Message::new("bob", "hi", Timestamp::new(1))));
        assert!(!session.receive(Message::new("bob", "again", Timestamp::new(2))));
        assert!(!session.receive(Message::notice("notice", Timestamp::new(3))));
        assert_eq!(session.registry().size(), 2);
        assert_eq!(sink.rendered().len(), 3);
        assert_eq!(sink.clear_count(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SessionConfig::for_participant("");
        assert!(ChatSession::new(config, MemoryRenderSink::new()).is_err());
    }

    #[test]
    fn test_toggle_filter() {
        let (session, sink) = session();
        session.receive(Message::new("bob", "hi", Timestamp::new(1)));
        assert!(session.toggle_filter());
        assert!(sink.rendered().is_empty());
        assert!(!session.toggle_filter());
        assert_eq!(sink.rendered().len(), 1);
    }

    #[test]
    fn test_quit_without_command_stream_still_marks_sent() {
        let (session, _) = session();
        assert!(session.quit().is_err());
        assert!(!session.quit().unwrap());
    }
}
