use super::*;
use std::time::Duration;

#[tokio::test]
async fn wait_for_connection_returns_immediately_when_already_connected() {
    let state = ConnectionState::new();
    state.set_connected(true);
    tokio::time::timeout(Duration::from_millis(50), state.wait_for_connection())
        .await
        .expect("should not block");
}

#[tokio::test]
async fn wait_for_connection_blocks_until_set_connected_true() {
    let state = ConnectionState::new();
    assert!(!state.is_connected());

    let waiter_state = state.clone();
    let waiter = tokio::spawn(async move {
        waiter_state.wait_for_connection().await;
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    state.set_connected(true);
    tokio::time::timeout(Duration::from_millis(200), waiter)
        .await
        .expect("waiter should wake up")
        .unwrap();
}

#[tokio::test]
async fn false_to_false_transition_does_not_wake_waiters() {
    let state = ConnectionState::new();
    state.set_connected(false);
    assert!(!state.is_connected());
}

#[tokio::test]
async fn is_connected_reflects_current_value() {
    let state = ConnectionState::new();
    assert!(!state.is_connected());
    state.set_connected(true);
    assert!(state.is_connected());
    state.set_connected(false);
    assert!(!state.is_connected());
}
