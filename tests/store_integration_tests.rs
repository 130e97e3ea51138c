//! Database-backed store tests. Skipped unless `TEST_DATABASE_URL` points
//! at a PostgreSQL instance the tests may write to.

mod common;

use common::test_pool;
use httptask_core::error::{ErrorKind, TaskError};
use httptask_core::models::{Header, NewTask, Task, TaskState};
use httptask_core::store::{PgTaskStore, TaskStore};

fn new_task(headers: Vec<Header>) -> NewTask {
    NewTask {
        method: "GET".to_string(),
        url: "https://example.com/hook".to_string(),
        headers,
    }
}

#[tokio::test]
async fn test_create_and_lookup_round_trip() {
    let Some(pool) = test_pool().await else { return };
    let store = PgTaskStore::new(pool);

    let created = store
        .create(new_task(vec![Header::input("X-In", "request")]))
        .await
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.status, TaskState::New);

    let fetched = store
        .get_by_id_with_output_headers(created.id)
        .await
        .unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.method, "GET");
    assert_eq!(fetched.status, TaskState::New);
    assert_eq!(fetched.response_status_code, None);
    // Input headers are stored but never surfaced by this read.
    assert!(fetched.headers.is_empty());
}

#[tokio::test]
async fn test_lookup_returns_only_output_headers() {
    let Some(pool) = test_pool().await else { return };
    let store = PgTaskStore::new(pool);

    let created = store
        .create(new_task(vec![Header::input("X-In", "request")]))
        .await
        .unwrap();

    let done = Task {
        status: TaskState::Done,
        response_status_code: Some(200),
        response_length: Some(5),
        headers: vec![Header::output("content-type", "text/plain")],
        ..created
    };
    store.update_result(&done).await.unwrap();

    let fetched = store.get_by_id_with_output_headers(done.id).await.unwrap();
    assert_eq!(fetched.status, TaskState::Done);
    assert_eq!(fetched.response_status_code, Some(200));
    assert_eq!(fetched.response_length, Some(5));
    assert_eq!(fetched.headers.len(), 1);
    assert_eq!(fetched.headers[0].name, "content-type");
    assert_eq!(fetched.headers[0].value, "text/plain");
}

#[tokio::test]
async fn test_update_result_rolls_back_on_header_failure() {
    let Some(pool) = test_pool().await else { return };
    let store = PgTaskStore::new(pool);

    let created = store.create(new_task(vec![])).await.unwrap();

    // An empty header value violates the table check constraint, forcing
    // the transaction to fail after the status update already ran.
    let bad = Task {
        status: TaskState::Done,
        response_status_code: Some(200),
        response_length: Some(5),
        headers: vec![Header::output("x-ok", "fine"), Header::output("x-bad", "")],
        ..created
    };
    let err = store.update_result(&bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    // Nothing from the failed transaction is visible.
    let fetched = store.get_by_id_with_output_headers(bad.id).await.unwrap();
    assert_eq!(fetched.status, TaskState::New);
    assert_eq!(fetched.response_status_code, None);
    assert!(fetched.headers.is_empty());
}

#[tokio::test]
async fn test_mark_in_process_guards_terminal_tasks() {
    let Some(pool) = test_pool().await else { return };
    let store = PgTaskStore::new(pool);

    let created = store.create(new_task(vec![])).await.unwrap();

    assert!(store.mark_in_process(created.id).await.unwrap());
    let fetched = store
        .get_by_id_with_output_headers(created.id)
        .await
        .unwrap();
    assert_eq!(fetched.status, TaskState::InProcess);

    store
        .update_status(created.id, TaskState::Done)
        .await
        .unwrap();

    // Redelivered message: the task already finished, nothing moves.
    assert!(!store.mark_in_process(created.id).await.unwrap());
    let fetched = store
        .get_by_id_with_output_headers(created.id)
        .await
        .unwrap();
    assert_eq!(fetched.status, TaskState::Done);
}

#[tokio::test]
async fn test_missing_task_is_not_found_everywhere() {
    let Some(pool) = test_pool().await else { return };
    let store = PgTaskStore::new(pool);

    let missing = i64::MAX - 7;
    assert!(matches!(
        store.get_by_id_with_output_headers(missing).await,
        Err(TaskError::NotFound { .. })
    ));
    assert!(matches!(
        store.update_status(missing, TaskState::Error).await,
        Err(TaskError::NotFound { .. })
    ));
    assert!(matches!(
        store.mark_in_process(missing).await,
        Err(TaskError::NotFound { .. })
    ));
    assert!(matches!(
        store.update_result(&Task {
            id: missing,
            method: "GET".to_string(),
            url: "https://example.com".to_string(),
            status: TaskState::Done,
            response_status_code: Some(200),
            response_length: Some(0),
            headers: vec![],
        })
        .await,
        Err(TaskError::NotFound { .. })
    ));
    assert!(matches!(
        store.delete(missing).await,
        Err(TaskError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_cascades_headers() {
    let Some(pool) = test_pool().await else { return };
    let store = PgTaskStore::new(pool.clone());

    let created = store
        .create(new_task(vec![Header::input("X-In", "request")]))
        .await
        .unwrap();
    store.delete(created.id).await.unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT count(*) FROM headers WHERE task_id = $1")
        .bind(created.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
