//! Integration tests for the session's administrative surface
//!
//! Clearing, removal, filtering, sorting, kicking and quitting, observed through the
//! render sink and a recording command stream.

mod test_utils;

use parley_core::{
    ChatSession, MemoryRenderSink, Selection, SessionConfig, SortCriterion, TransportError,
};
use test_utils::{msg, notice, RecordingCommands};

fn session_with_commands() -> (ChatSession, MemoryRenderSink, RecordingCommands) {
    let sink = MemoryRenderSink::new();
    let commands = RecordingCommands::new();
    let session = ChatSession::new(SessionConfig::for_participant("carol"), sink.clone())
        .expect("valid config")
        .with_command_sink(commands.clone());
    (session, sink, commands)
}

fn seeded() -> (ChatSession, MemoryRenderSink, RecordingCommands) {
    let (session, sink, commands) = session_with_commands();
    session.receive(msg("bob", "zeta", 3));
    session.receive(msg("alice", "alpha", 1));
    session.receive(notice("server restarting", 2));
    session.receive(msg("dave", "mid", 4));
    session.receive(msg("bob", "beta", 5));
    (session, sink, commands)
}

fn select(session: &ChatSession, names: &[&str]) -> Selection {
    names
        .iter()
        .map(|name| session.registry().index_of(name).expect("registered"))
        .collect()
}

// ----------------------------------------------------------------------------
// Clearing and Removal
// ----------------------------------------------------------------------------

#[test]
fn test_clear_messages_keeps_participants() {
    let (session, sink, _) = seeded();
    let clears_before = sink.clear_count();

    session.clear_messages();

    assert!(session.log().is_empty());
    assert!(sink.rendered().is_empty());
    assert_eq!(sink.clear_count(), clears_before + 1);
    assert_eq!(session.registry().names(), vec!["alice", "bob", "carol", "dave"]);
}

#[test]
fn test_remove_selected_drops_author_and_notices() {
    let (session, sink, _) = seeded();
    session.set_selection(select(&session, &["bob"]));

    let removed = session.remove_selected();

    assert_eq!(removed, 3);
    let arrival: Vec<_> = session.log().snapshot().iter().cloned().collect();
    assert_eq!(arrival, vec![msg("alice", "alpha", 1), msg("dave", "mid", 4)]);
    assert_eq!(sink.rendered(), arrival);
    assert!(session.registry().contains("bob"));
}

#[test]
fn test_remove_with_empty_selection_only_drops_notices() {
    let (session, _, _) = seeded();
    assert!(!session.has_selection());

    assert_eq!(session.remove_selected(), 1);
    assert_eq!(session.log().len(), 4);
}

// ----------------------------------------------------------------------------
// Filtering and Sorting
// ----------------------------------------------------------------------------

#[test]
fn test_filter_shows_only_selected_authors() {
    let (session, sink, _) = seeded();
    session.set_selection(select(&session, &["alice", "dave"]));
    assert_eq!(sink.rendered().len(), 5, "selection alone does not re-render");

    session.set_filter(true);
    assert!(session.filter_enabled());
    assert_eq!(
        sink.rendered(),
        vec![msg("alice", "alpha", 1), msg("dave", "mid", 4)]
    );

    session.set_selection(select(&session, &["bob"]));
    assert_eq!(
        sink.rendered(),
        vec![msg("bob", "zeta", 3), msg("bob", "beta", 5)]
    );

    assert!(!session.toggle_filter());
    assert_eq!(sink.rendered().len(), 5);
}

#[test]
fn test_sort_by_reorders_rendered_view() {
    let (session, sink, _) = seeded();
    assert_eq!(sink.rendered()[0], msg("alice", "alpha", 1));

    session.sort_by(SortCriterion::Content);
    let contents: Vec<_> = sink
        .rendered()
        .iter()
        .map(|m| m.content().to_string())
        .collect();
    assert_eq!(
        contents,
        vec!["alpha", "beta", "mid", "server restarting", "zeta"]
    );

    session.sort_by(SortCriterion::Author);
    let authors: Vec<_> = sink
        .rendered()
        .iter()
        .map(|m| m.author().unwrap_or_default().to_string())
        .collect();
    assert_eq!(authors, vec!["", "alice", "bob", "bob", "dave"]);
    // Ties on author keep arrival order
    assert_eq!(sink.rendered()[2], msg("bob", "zeta", 3));

    assert!(session.policy().is_active(SortCriterion::Author));
    assert!(!session.policy().is_active(SortCriterion::Date));
}

#[test]
fn test_log_keeps_arrival_order_under_any_sort() {
    let (session, _, _) = seeded();
    session.sort_by(SortCriterion::Author);
    let arrival: Vec<_> = session.log().snapshot().iter().cloned().collect();
    assert_eq!(arrival[0], msg("bob", "zeta", 3));
    assert_eq!(arrival[4], msg("bob", "beta", 5));
}

// ----------------------------------------------------------------------------
// Outbound Commands
// ----------------------------------------------------------------------------

#[test]
fn test_kick_selected_skips_self_and_stale_ranks() {
    let (session, _, commands) = seeded();
    let selection: Selection = select(&session, &["bob", "carol", "dave"])
        .ranks()
        .chain([42])
        .collect();
    session.set_selection(selection);

    let kicked = session.kick_selected().unwrap();

    assert_eq!(kicked, vec!["bob", "dave"]);
    assert_eq!(commands.lines(), vec!["Kick bob", "Kick dave"]);
    assert_eq!(session.registry().size(), 4, "kick leaves the registry alone");
}

#[test]
fn test_kick_uses_configured_prefix() {
    let sink = MemoryRenderSink::new();
    let commands = RecordingCommands::new();
    let config = SessionConfig {
        kick_prefix: "/kick".into(),
        ..SessionConfig::for_participant("carol")
    };
    let session = ChatSession::new(config, sink)
        .unwrap()
        .with_command_sink(commands.clone());
    session.receive(msg("bob", "hi", 1));
    session.set_selection(select(&session, &["bob"]));

    session.kick_selected().unwrap();
    assert_eq!(commands.lines(), vec!["/kick bob"]);
}

#[test]
fn test_send_text_ignores_empty_lines() {
    let (session, _, commands) = session_with_commands();
    assert!(!session.send_text("").unwrap());
    assert!(session.send_text("hello room").unwrap());
    assert_eq!(commands.lines(), vec!["hello room"]);
}

#[test]
fn test_quit_sends_bye_once() {
    let (session, _, commands) = session_with_commands();
    assert!(session.quit().unwrap());
    assert!(!session.quit().unwrap());
    assert_eq!(commands.lines(), vec!["bye"]);
}

#[test]
fn test_commands_without_stream_are_unavailable() {
    let session =
        ChatSession::new(SessionConfig::for_participant("carol"), MemoryRenderSink::new())
            .unwrap();
    let err = session.send_text("anyone?").unwrap_err();
    assert!(matches!(err, TransportError::Unavailable { .. }));
}
