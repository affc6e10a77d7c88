use srpc::payload::{CallReply, ReplyStatus};
use srpc::rpc::{CorrelationTable, RpcError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn request_ids_start_at_one_and_increase() {
    let table = CorrelationTable::new();

    assert_eq!(table.next_request_id(), 1);
    assert_eq!(table.next_request_id(), 2);
    assert_eq!(table.next_request_id(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_request_ids_are_unique() {
    let table = Arc::new(CorrelationTable::new());

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let table = Arc::clone(&table);
            tokio::spawn(async move {
                (0..100)
                    .map(|_| table.next_request_id())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for task in tasks {
        for id in task.await.expect("task panicked") {
            assert!(seen.insert(id), "duplicate request id {}", id);
        }
    }

    assert_eq!(seen.len(), 64 * 100);
}

#[tokio::test]
async fn completes_exactly_once() {
    let table = CorrelationTable::new();
    let id = table.next_request_id();
    let pending = table.register(id, 1).expect("register failed");

    assert!(table.complete(id, CallReply::success(b"first".to_vec())));
    assert!(!table.complete(id, CallReply::success(b"second".to_vec())));
    assert!(!table.fail(id, RpcError::Aborted));

    let reply = table
        .wait(pending, Duration::from_secs(1))
        .await
        .expect("wait failed");
    assert_eq!(reply.payload, b"first");
    assert_eq!(table.pending_count(), 0);
}

#[tokio::test]
async fn timeout_removes_entry_and_discards_late_reply() {
    let table = CorrelationTable::new();
    let id = table.next_request_id();
    let pending = table.register(id, 1).expect("register failed");

    let result = table.wait(pending, Duration::from_millis(20)).await;

    assert!(matches!(result, Err(RpcError::Timeout { request_id, .. }) if request_id == id));
    assert!(!table.is_pending(id));
    assert!(!table.complete(id, CallReply::success(Vec::new())));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let table = CorrelationTable::new();
    let _pending = table.register(5, 1).expect("register failed");

    assert!(matches!(
        table.register(5, 1),
        Err(RpcError::DuplicateRequestId(5))
    ));
}

#[tokio::test]
async fn fail_connection_only_touches_that_connection() {
    let table = CorrelationTable::new();
    let a = table.register(1, 10).expect("register failed");
    let b = table.register(2, 10).expect("register failed");
    let c = table.register(3, 20).expect("register failed");

    let failed = table.fail_connection(10, |_| RpcError::Aborted);

    assert_eq!(failed, 2);
    assert_eq!(table.pending_count(), 1);
    assert!(matches!(
        table.wait(a, Duration::from_secs(1)).await,
        Err(RpcError::Aborted)
    ));
    assert!(matches!(
        table.wait(b, Duration::from_secs(1)).await,
        Err(RpcError::Aborted)
    ));

    assert!(table.complete(3, CallReply::failure(ReplyStatus::Fault, "boom")));
    let reply = table
        .wait(c, Duration::from_secs(1))
        .await
        .expect("wait failed");
    assert_eq!(reply.status, ReplyStatus::Fault);
}

#[tokio::test]
async fn reply_from_another_task_wakes_waiter() {
    let table = Arc::new(CorrelationTable::new());
    let id = table.next_request_id();
    let pending = table.register(id, 1).expect("register failed");

    let completer = {
        let table = Arc::clone(&table);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            table.complete(id, CallReply::success(b"pong".to_vec()))
        })
    };

    let reply = table
        .wait(pending, Duration::from_secs(2))
        .await
        .expect("wait failed");

    assert_eq!(reply.payload, b"pong");
    assert!(completer.await.expect("task panicked"));
}
