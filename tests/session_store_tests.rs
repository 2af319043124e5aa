//! Session Store Tests
//!
//! Sliding-window retention, pagination and concurrent access through the
//! `SessionStore` trait object the runtime uses.

use parley::{LoadOptions, MemoryError, Message, SessionId, SessionStore, SlidingWindowMemory};
use std::num::NonZeroUsize;
use std::sync::Arc;

fn store(capacity: usize) -> Arc<dyn SessionStore> {
    Arc::new(SlidingWindowMemory::new(NonZeroUsize::new(capacity).unwrap()))
}

fn messages(n: usize) -> Vec<Message> {
    (0..n).map(|i| Message::user(format!("m{i}"))).collect()
}

fn id(value: &str) -> SessionId {
    SessionId::new(value).unwrap()
}

#[test]
fn test_overflow_keeps_last_capacity_messages() {
    let store = store(5);
    store.select(&id("s")).unwrap();
    store.append(messages(12)).unwrap();

    let loaded = store.load(LoadOptions::all()).unwrap();
    assert_eq!(loaded, messages(12)[7..].to_vec());
    assert_eq!(store.capacity().get(), 5);
}

#[test]
fn test_limit_and_offset_on_four_messages() {
    let store = store(100);
    store.select(&id("s")).unwrap();
    store.append(messages(4)).unwrap();

    let page = store
        .load(LoadOptions {
            limit: Some(2),
            offset: 2,
        })
        .unwrap();
    assert_eq!(page, messages(2));
}

#[test]
fn test_select_twice_is_idempotent() {
    let store = store(10);
    store.select(&id("s")).unwrap();
    store.append(messages(3)).unwrap();
    store.select(&id("s")).unwrap();
    store.select(&id("s")).unwrap();

    assert_eq!(store.load(LoadOptions::all()).unwrap(), messages(3));
}

#[test]
fn test_operations_before_select() {
    let store = store(10);
    assert!(store.load(LoadOptions::all()).unwrap().is_empty());
    assert_eq!(
        store.append(messages(1)),
        Err(MemoryError::SessionNotSelected)
    );
}

#[test]
fn test_switching_sessions_keeps_both_histories() {
    let store = store(10);
    store.select(&id("one")).unwrap();
    store.append(messages(2)).unwrap();
    store.select(&id("two")).unwrap();
    assert!(store.load(LoadOptions::all()).unwrap().is_empty());

    store.select(&id("one")).unwrap();
    assert_eq!(store.load(LoadOptions::all()).unwrap(), messages(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_across_sessions() {
    let store = store(1_000);
    let sessions: Vec<SessionId> = (0..4).map(|i| id(&format!("s{i}"))).collect();
    for session in &sessions {
        store.open(session).unwrap();
    }

    let mut tasks = Vec::new();
    for session in sessions.clone() {
        for writer in 0..4 {
            let store = Arc::clone(&store);
            let session = session.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    store
                        .append_session(&session, vec![Message::user(format!("{writer}:{i}"))])
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }

    for session in &sessions {
        let stored = store.load_session(session, LoadOptions::all()).unwrap();
        assert_eq!(stored.len(), 200);
    }
}
