//! End-to-end firing against a local webhook receiver and a SQLite host
//! table, checking that the host change commits or rolls back per policy.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use cdc_webhook_core::config::DispatchConfig;
use cdc_webhook_core::types::{CreateTrigger, Row, RowChange, Timing};
use cdc_webhook_core::Error;
use cdc_webhook_engine::{FiringOutcome, TriggerExecutor, TriggerRegistry, WebhookDispatcher};
use cdc_webhook_metadata::MetadataStore;
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct Receiver {
    status: AtomicU16,
    delay_ms: AtomicU64,
    received: Mutex<Vec<(HeaderMap, Value)>>,
}

impl Receiver {
    fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

async fn hook(
    State(receiver): State<Arc<Receiver>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    receiver.received.lock().unwrap().push((headers, body));
    let delay = receiver.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    StatusCode::from_u16(receiver.status.load(Ordering::SeqCst)).unwrap()
}

async fn start_receiver(status: u16) -> (SocketAddr, Arc<Receiver>) {
    let receiver = Arc::new(Receiver::default());
    receiver.status.store(status, Ordering::SeqCst);

    let app = Router::new()
        .route("/webhook", post(hook))
        .with_state(receiver.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, receiver)
}

struct Host {
    _dir: TempDir,
    pool: SqlitePool,
    executor: TriggerExecutor,
}

async fn host() -> Host {
    let dir = TempDir::new().unwrap();

    let meta_url = format!("sqlite://{}?mode=rwc", dir.path().join("meta.db").display());
    let store = MetadataStore::new(&meta_url).await.unwrap();
    let registry = TriggerRegistry::new(Arc::new(store), "public");
    let dispatcher = WebhookDispatcher::http(&DispatchConfig::default()).unwrap();

    let host_url = format!("sqlite://{}?mode=rwc", dir.path().join("host.db").display());
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&host_url)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE employees (name TEXT NOT NULL, salary INTEGER NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();

    Host {
        _dir: dir,
        pool,
        executor: TriggerExecutor::new(registry, dispatcher),
    }
}

impl Host {
    /// Insert a row inside a transaction, firing AFTER triggers before commit
    async fn insert_employee(&self, name: &str, salary: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await.unwrap();
        sqlx::query("INSERT INTO employees (name, salary) VALUES (?, ?)")
            .bind(name)
            .bind(salary)
            .execute(&mut *tx)
            .await
            .unwrap();

        let mut row = Row::new();
        row.insert("name".into(), json!(name));
        row.insert("salary".into(), json!(salary));
        let change = RowChange::insert(row);

        match self
            .executor
            .on_row_change("public", "employees", Timing::After, &change)
            .await
        {
            Ok(_) => {
                tx.commit().await.unwrap();
                Ok(())
            }
            Err(e) => {
                tx.rollback().await.unwrap();
                Err(e)
            }
        }
    }

    async fn employee_count(&self, name: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM employees WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .unwrap();
        count
    }
}

#[tokio::test]
async fn test_insert_is_delivered_and_committed() {
    let (addr, receiver) = start_receiver(200).await;
    let host = host().await;
    host.executor
        .registry()
        .register(CreateTrigger::new(
            "t1",
            "employees",
            ["INSERT"],
            format!("http://{}/webhook", addr),
        ))
        .await
        .unwrap();

    host.insert_employee("A", 1).await.unwrap();

    assert_eq!(host.employee_count("A").await, 1);
    let received = receiver.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].1,
        json!({
            "trigger": {"name": "t1"},
            "event": {"op": "INSERT", "data": {"old": null, "new": {"name": "A", "salary": 1}}}
        })
    );
    assert_eq!(
        received[0].0.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_exhausted_delivery_rolls_back_when_cancelling() {
    let (addr, receiver) = start_receiver(500).await;
    let host = host().await;
    host.executor
        .registry()
        .register(
            CreateTrigger::new("t1", "employees", ["INSERT"], format!("http://{}/webhook", addr))
                .retry_number(2)
                .retry_interval_ms(50)
                .cancel_on_failure(true),
        )
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let err = host.insert_employee("Should Fail", 70000).await.unwrap_err();

    assert!(err.aborts_transaction());
    assert!(err.to_string().contains("after 3 attempt(s)"));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(receiver.count(), 3);
    assert_eq!(host.employee_count("Should Fail").await, 0);
}

#[tokio::test]
async fn test_exhausted_delivery_commits_when_not_cancelling() {
    let (addr, receiver) = start_receiver(500).await;
    let host = host().await;
    host.executor
        .registry()
        .register(
            CreateTrigger::new("t1", "employees", ["INSERT"], format!("http://{}/webhook", addr))
                .retry_number(1)
                .retry_interval_ms(20),
        )
        .await
        .unwrap();

    host.insert_employee("Kept", 50000).await.unwrap();

    assert_eq!(receiver.count(), 2);
    assert_eq!(host.employee_count("Kept").await, 1);
}

#[tokio::test]
async fn test_private_trigger_sends_stored_headers() {
    let (addr, receiver) = start_receiver(204).await;
    let host = host().await;
    let registry = host.executor.registry();
    let url = format!("http://{}/webhook", addr);
    registry
        .register(
            CreateTrigger::new("t1", "employees", ["INSERT"], url.as_str())
                .header("X-API-Key", "test-key")
                .security("PRIVATE"),
        )
        .await
        .unwrap();

    let id = cdc_webhook_core::types::TriggerId::new("public", "employees", "t1");
    let ddl = registry.inspect(&id).await.unwrap().unwrap();
    assert!(!ddl.contains(&url));
    assert!(!ddl.contains("test-key"));

    host.insert_employee("Private", 1).await.unwrap();

    let received = receiver.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0.get("x-api-key").unwrap(), "test-key");
}

#[tokio::test]
async fn test_slow_endpoint_times_out_each_attempt() {
    let (addr, receiver) = start_receiver(200).await;
    receiver.delay_ms.store(1_000, Ordering::SeqCst);
    let host = host().await;
    let registry = host.executor.registry();
    registry
        .register(
            CreateTrigger::new("t1", "employees", ["INSERT"], format!("http://{}/webhook", addr))
                .timeout_ms(100)
                .retry_number(0),
        )
        .await
        .unwrap();

    let id = cdc_webhook_core::types::TriggerId::new("public", "employees", "t1");
    let mut row = Row::new();
    row.insert("name".into(), json!("Slow"));
    let outcome = host
        .executor
        .fire(&id, &RowChange::insert(row))
        .await
        .unwrap();

    match outcome {
        FiringOutcome::Failed { attempts, cause } => {
            assert_eq!(attempts, 1);
            assert!(cause.contains("timed out after 100ms"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}
