#![allow(dead_code)]

use super::client::{ClientEvent, RecordingClient};
use threadable_loader::ErrorKind;

/// Exactly one terminal callback, and nothing after it.
pub fn assert_single_terminal(client: &RecordingClient) {
    let events = client.events();
    assert_eq!(
        client.terminal_count(),
        1,
        "expected exactly one terminal callback, got {events:?}"
    );
    assert!(
        events.last().is_some_and(ClientEvent::is_terminal),
        "terminal callback was not last: {events:?}"
    );
    assert_eq!(client.callbacks_after_terminal(), 0);
}

pub fn assert_finished_with_body(client: &RecordingClient, body: &[u8]) {
    assert_single_terminal(client);
    assert_eq!(client.events().last(), Some(&ClientEvent::Finish));
    assert_eq!(client.body(), body);
}

pub fn assert_failed_with(client: &RecordingClient, kind: ErrorKind) -> String {
    assert_single_terminal(client);
    match client.events().last() {
        Some(ClientEvent::Fail(actual, message)) if *actual == kind => message.clone(),
        other => panic!("expected {kind:?} failure, got {other:?}"),
    }
}

pub fn assert_access_control_failure(client: &RecordingClient) -> String {
    assert_single_terminal(client);
    assert!(
        !client
            .events()
            .iter()
            .any(|event| matches!(event, ClientEvent::Response(_))),
        "response leaked before access control failure"
    );
    match client.events().last() {
        Some(ClientEvent::AccessControlFail(message)) => message.clone(),
        other => panic!("expected access control failure, got {other:?}"),
    }
}

pub fn assert_redirect_check_failure(client: &RecordingClient) {
    assert_single_terminal(client);
    assert_eq!(client.events().last(), Some(&ClientEvent::RedirectCheckFail));
}

pub fn assert_cancelled(client: &RecordingClient) {
    assert_failed_with(client, ErrorKind::Cancelled);
}
