use super::*;
use crate::test_support::{chat_manager, credentials, drain, drain_updates};

const CHAT_ECHO: &str = r#"{"type":"chat","user_id":7,"username":"user7","message":"hi","timestamp":"2024-05-01T18:00:00Z"}"#;

fn messages(chat: &ChatSessionManager) -> Vec<(String, MessageOrigin)> {
    chat.snapshot()
        .messages()
        .map(|m| (m.text.clone(), m.origin))
        .collect()
}

// =============================================================
// open / auth handshake
// =============================================================

#[test]
fn open_connects_then_authenticates_on_ready() {
    let (chat, connector, mut events) = chat_manager();
    let mut updates = chat.subscribe();

    assert_eq!(chat.open(42, credentials(7)), OpenOutcome::Connecting);
    assert_eq!(chat.connection(), ConnectionState::Connecting);
    assert!(connector.log(0).sent.borrow().is_empty());

    connector.emit(0, ChannelEvent::Opened);
    drain(&chat, &mut events);

    assert_eq!(chat.connection(), ConnectionState::Open);
    assert_eq!(
        *connector.log(0).sent.borrow(),
        vec![r#"{"game_id":42,"user_id":7,"token":"tok-7"}"#.to_owned()]
    );
    let states: Vec<_> = drain_updates(&mut updates)
        .into_iter()
        .filter_map(|u| match u {
            ChatUpdate::Connection(state) => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![ConnectionState::Idle, ConnectionState::Connecting, ConnectionState::Open]
    );
}

#[test]
fn open_is_idempotent_for_the_same_game() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    assert_eq!(chat.open(42, credentials(7)), OpenOutcome::AlreadyActive);

    connector.emit(0, ChannelEvent::Opened);
    drain(&chat, &mut events);
    assert_eq!(chat.open(42, credentials(7)), OpenOutcome::AlreadyActive);

    assert_eq!(connector.connect_count(), 1);
    assert_eq!(connector.log(0).sent.borrow().len(), 1);
}

#[test]
fn opening_another_game_closes_the_first_session_before_connecting() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(1, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    drain(&chat, &mut events);

    assert_eq!(chat.open(2, credentials(7)), OpenOutcome::Connecting);

    assert!(connector.log(0).closed.get());
    assert_eq!(connector.connect_count(), 2);
    assert_eq!(chat.game_id(), Some(2));
    assert_eq!(chat.connection(), ConnectionState::Connecting);
}

#[test]
fn at_most_one_channel_is_ever_live() {
    let (chat, connector, _events) = chat_manager();
    for game in 1..=5 {
        chat.open(game, credentials(7));
    }
    let live = (0..connector.connect_count())
        .filter(|&i| !connector.log(i).closed.get())
        .count();
    assert_eq!(live, 1);
}

#[test]
fn connector_failure_sets_failed_without_handle() {
    let (chat, connector, _events) = chat_manager();
    connector.fail_next.set(true);

    let outcome = chat.open(42, credentials(7));

    assert!(matches!(outcome, OpenOutcome::Failed(ChannelError::Connect(_))));
    assert_eq!(chat.connection(), ConnectionState::Failed);
    assert_eq!(connector.connect_count(), 0);
    // A later explicit open may retry.
    assert_eq!(chat.open(42, credentials(7)), OpenOutcome::Connecting);
}

#[test]
fn auth_send_failure_fails_the_session() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.log(0).refuse.set(true);

    connector.emit(0, ChannelEvent::Opened);
    drain(&chat, &mut events);

    assert_eq!(chat.connection(), ConnectionState::Failed);
    assert!(connector.log(0).closed.get());
}

// =============================================================
// close
// =============================================================

#[test]
fn close_is_idempotent_and_unbinds() {
    let (chat, connector, _events) = chat_manager();
    chat.close();
    assert_eq!(chat.connection(), ConnectionState::Idle);

    chat.open(42, credentials(7));
    chat.close();
    chat.close();

    assert_eq!(chat.connection(), ConnectionState::Closed);
    assert!(connector.log(0).closed.get());
    assert_eq!(chat.game_id(), None);
}

#[test]
fn close_clears_the_transcript_for_live_subscribers() {
    let (chat, _connector, _events) = chat_manager();
    chat.open(42, credentials(7));
    chat.send("for game 42");
    let mut updates = chat.subscribe();
    drain_updates(&mut updates);

    chat.close();

    assert_eq!(
        drain_updates(&mut updates),
        vec![
            ChatUpdate::Connection(ConnectionState::Closed),
            ChatUpdate::Reset(Vec::new()),
        ]
    );
    assert_eq!(chat.snapshot().game_id, None);
    assert!(chat.snapshot().transcript.is_empty());

    chat.close();
    assert!(drain_updates(&mut updates).is_empty());
}

#[test]
fn events_from_a_closed_channel_are_ignored() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    chat.close();

    connector.emit(0, ChannelEvent::Opened);
    connector.emit_text(0, CHAT_ECHO);
    drain(&chat, &mut events);

    assert_eq!(chat.connection(), ConnectionState::Closed);
    assert!(chat.snapshot().transcript.is_empty());
    assert!(connector.log(0).sent.borrow().is_empty());
}

#[test]
fn stale_events_from_a_previous_game_do_not_touch_the_new_session() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(1, credentials(7));
    chat.open(2, credentials(7));

    connector.emit(0, ChannelEvent::Failed("reset".to_owned()));
    connector.emit(1, ChannelEvent::Opened);
    drain(&chat, &mut events);

    assert_eq!(chat.connection(), ConnectionState::Open);
    assert_eq!(chat.game_id(), Some(2));
}

// =============================================================
// inbound frames
// =============================================================

#[test]
fn server_chat_frames_append_confirmed_messages() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit_text(0, r#"{"type":"chat","user_id":8,"message":"yo"}"#);
    drain(&chat, &mut events);

    let snapshot = chat.snapshot();
    let message = snapshot.messages().next().expect("one message");
    assert_eq!(message.user_id, 8);
    assert_eq!(message.username, None);
    assert_eq!(message.origin, MessageOrigin::ServerConfirmed);
    assert_eq!(message.game_id, 42);
    assert!(!message.timestamp.is_empty());
}

#[test]
fn user_left_appends_a_notice_and_no_message() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit_text(0, r#"{"type":"user_left","user_id":8}"#);
    drain(&chat, &mut events);

    let snapshot = chat.snapshot();
    assert_eq!(snapshot.messages().count(), 0);
    assert_eq!(snapshot.notices().cloned().collect::<Vec<_>>(), vec![SystemNotice::user_left()]);
}

#[test]
fn user_joined_appends_a_notice() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit_text(0, r#"{"type":"user_joined","user_id":9}"#);
    drain(&chat, &mut events);

    assert_eq!(chat.snapshot().notices().count(), 1);
}

#[test]
fn server_error_frame_becomes_a_notice() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit_text(0, r#"{"type":"error","message":"Invalid authentication data"}"#);
    drain(&chat, &mut events);

    let notices: Vec<_> = chat.snapshot().notices().map(|n| n.text.clone()).collect();
    assert_eq!(notices, vec!["Chat error: Invalid authentication data".to_owned()]);
    assert_eq!(chat.connection(), ConnectionState::Open);
}

#[test]
fn ignored_and_undecodable_frames_leave_the_transcript_alone() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit_text(0, r#"{"type":"connected","game_id":42,"user_id":7}"#);
    connector.emit_text(0, r#"{"type":"typing","user_id":8}"#);
    connector.emit_text(0, r#"{"type":"reaction"}"#);
    connector.emit_text(0, "not json");
    drain(&chat, &mut events);

    assert!(chat.snapshot().transcript.is_empty());
    assert_eq!(chat.connection(), ConnectionState::Open);
}

#[test]
fn channel_failure_does_not_reconnect() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit(0, ChannelEvent::Failed("reset by peer".to_owned()));
    drain(&chat, &mut events);

    assert_eq!(chat.connection(), ConnectionState::Failed);
    assert_eq!(connector.connect_count(), 1);
}

#[test]
fn server_close_sets_closed() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit(0, ChannelEvent::Closed);
    drain(&chat, &mut events);

    assert_eq!(chat.connection(), ConnectionState::Closed);
    // Still bound: the transcript stays and sends fall back.
    assert_eq!(chat.game_id(), Some(42));
}

// =============================================================
// send
// =============================================================

#[test]
fn optimistic_send_and_echo_both_stay_in_the_transcript() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    drain(&chat, &mut events);

    assert_eq!(chat.send("hi"), SendOutcome::Transmitted);
    connector.emit_text(0, CHAT_ECHO);
    drain(&chat, &mut events);

    assert_eq!(
        messages(&chat),
        vec![
            ("hi".to_owned(), MessageOrigin::LocalOptimistic),
            ("hi".to_owned(), MessageOrigin::ServerConfirmed),
        ]
    );
    assert_eq!(
        connector.log(0).sent.borrow()[1],
        r#"{"type":"chat","game_id":42,"user_id":7,"message":"hi"}"#
    );
}

#[test]
fn blank_text_is_rejected() {
    let (chat, connector, _events) = chat_manager();
    chat.open(42, credentials(7));
    assert_eq!(chat.send("   \n"), SendOutcome::Empty);
    assert!(chat.snapshot().transcript.is_empty());
    assert!(connector.log(0).sent.borrow().is_empty());
}

#[test]
fn send_without_a_bound_game_does_nothing() {
    let (chat, _connector, _events) = chat_manager();
    assert_eq!(chat.send("hi"), SendOutcome::Unbound);
    assert!(chat.snapshot().transcript.is_empty());
}

#[test]
fn send_while_connecting_falls_back() {
    let (chat, connector, _events) = chat_manager();
    chat.open(42, credentials(7));

    let outcome = chat.send("  hi ");

    let SendOutcome::Fallback(pending) = outcome else {
        panic!("expected fallback, got {outcome:?}");
    };
    assert_eq!(pending.text, "hi");
    assert_eq!(pending.game_id, 42);
    assert_eq!(pending.generation, chat.generation());
    assert!(connector.log(0).sent.borrow().is_empty());
    assert_eq!(messages(&chat), vec![("hi".to_owned(), MessageOrigin::LocalOptimistic)]);
}

#[test]
fn refused_frame_fails_the_session_and_falls_back() {
    let (chat, connector, mut events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    drain(&chat, &mut events);
    connector.log(0).refuse.set(true);

    assert!(matches!(chat.send("hi"), SendOutcome::Fallback(_)));
    assert_eq!(chat.connection(), ConnectionState::Failed);
    assert_eq!(connector.connect_count(), 1);
}

#[test]
fn sends_append_in_call_order() {
    let (chat, _connector, _events) = chat_manager();
    chat.attach(42, credentials(7));
    chat.send("one");
    chat.send("two");
    let texts: Vec<_> = messages(&chat).into_iter().map(|(t, _)| t).collect();
    assert_eq!(texts, vec!["one".to_owned(), "two".to_owned()]);
}

// =============================================================
// attach / history / subscribe
// =============================================================

fn history(text: &str) -> ChatMessage {
    ChatMessage {
        id: Some(1),
        game_id: 42,
        user_id: 8,
        username: Some("user8".to_owned()),
        text: text.to_owned(),
        timestamp: "2024-05-01T18:00:00Z".to_owned(),
        origin: MessageOrigin::HistoryLoaded,
    }
}

#[test]
fn history_requires_a_matching_binding() {
    let (chat, _connector, _events) = chat_manager();
    assert!(!chat.replace_history(42, vec![history("old")]));

    chat.attach(42, credentials(7));
    assert!(!chat.replace_history(43, vec![history("other")]));
    assert!(chat.replace_history(42, vec![history("old")]));
    assert_eq!(messages(&chat), vec![("old".to_owned(), MessageOrigin::HistoryLoaded)]);
}

#[test]
fn attaching_another_game_clears_the_transcript() {
    let (chat, connector, _events) = chat_manager();
    chat.open(1, credentials(7));
    chat.send("for game one");

    chat.attach(2, credentials(7));

    assert!(chat.snapshot().transcript.is_empty());
    assert!(connector.log(0).closed.get());
    assert_eq!(chat.snapshot().game_id, Some(2));
}

#[test]
fn reload_is_dropped_after_the_generation_moves_on() {
    let (chat, _connector, _events) = chat_manager();
    chat.attach(42, credentials(7));
    let stale = chat.generation();
    chat.close();
    chat.attach(42, credentials(7));

    assert!(!chat.reload_history(stale, 42, vec![history("late")]));
    assert!(chat.snapshot().transcript.is_empty());
    assert!(!chat.report_error(stale, "late".to_owned()));
}

#[test]
fn new_subscribers_start_from_the_current_state() {
    let (chat, _connector, _events) = chat_manager();
    chat.attach(42, credentials(7));
    chat.send("hi");

    let mut updates = chat.subscribe();
    let first = drain_updates(&mut updates);

    assert_eq!(first.len(), 2);
    assert_eq!(first[0], ChatUpdate::Connection(ConnectionState::Idle));
    let ChatUpdate::Reset(entries) = &first[1] else {
        panic!("expected reset");
    };
    assert_eq!(entries.len(), 1);
}

#[test]
fn dropped_subscribers_are_pruned() {
    let (chat, _connector, _events) = chat_manager();
    let updates = chat.subscribe();
    drop(updates);
    chat.attach(42, credentials(7));
    chat.send("hi");
    assert!(chat.inner.borrow().subscribers.is_empty());
}

#[tokio::test]
async fn pump_applies_events_until_senders_are_gone() {
    let (chat, connector, events) = chat_manager();
    chat.open(42, credentials(7));
    connector.emit(0, ChannelEvent::Opened);
    connector.emit_text(0, r#"{"type":"user_joined"}"#);
    // Closing the queue lets the pump drain what is buffered and return.
    chat.inner.borrow().events.close_channel();

    pump_channel_events(chat.clone(), events).await;

    assert_eq!(chat.connection(), ConnectionState::Open);
    assert_eq!(chat.snapshot().notices().count(), 1);
}
