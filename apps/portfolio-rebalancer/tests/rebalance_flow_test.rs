//! End-to-end rebalance flow: HTTP submission, queue, consumer, store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use portfolio_rebalancer::application::services::{RebalanceConsumer, RebalanceIntake};
use portfolio_rebalancer::application::use_cases::RebalancePortfolioUseCase;
use portfolio_rebalancer::infrastructure::http::{AppState, create_router};
use portfolio_rebalancer::infrastructure::persistence::{
    InMemoryAllocationStore, InMemoryTransactionStore,
};
use portfolio_rebalancer::infrastructure::queue::InMemoryQueue;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

type Intake = RebalanceIntake<InMemoryAllocationStore, InMemoryTransactionStore, InMemoryQueue>;

struct Service {
    router: Router,
    intake: Arc<Intake>,
    queue: Arc<InMemoryQueue>,
    dead_letter: Arc<InMemoryQueue>,
}

fn service(max_attempts: u32) -> Service {
    let allocations = Arc::new(InMemoryAllocationStore::new());
    let transactions = Arc::new(InMemoryTransactionStore::new());
    let queue = Arc::new(InMemoryQueue::new());
    let dead_letter = Arc::new(InMemoryQueue::new());

    let intake = Arc::new(RebalanceIntake::new(
        RebalancePortfolioUseCase::new(Arc::clone(&allocations), Arc::clone(&transactions)),
        Arc::clone(&queue),
        dead_letter.clone(),
        max_attempts,
    ));
    let state = AppState::new(&allocations, &transactions, Arc::clone(&intake), "e2e");

    Service {
        router: create_router(state),
        intake,
        queue,
        dead_letter,
    }
}

impl Service {
    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Close the queue and let the consumer drain it.
    async fn drain(&self) -> u64 {
        self.queue.close();
        let consumer = RebalanceConsumer::new(
            Arc::clone(&self.intake),
            Arc::clone(&self.queue),
            Duration::from_millis(1),
        );
        tokio::time::timeout(Duration::from_secs(5), consumer.run(CancellationToken::new()))
            .await
            .expect("consumer should stop once the queue is drained")
    }
}

#[tokio::test]
async fn submitted_rebalance_is_recorded_after_consumption() {
    let svc = service(0);

    let (status, _) = svc
        .call(
            "POST",
            "/portfolio",
            Some(json!({
                "user_id": "u1",
                "allocation": {"stocks": 60, "bonds": 30, "gold": 10}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = svc
        .call(
            "POST",
            "/rebalance",
            Some(json!({
                "user_id": "u1",
                "new_allocation": {"stocks": 70, "bonds": 20, "gold": 10}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Success Rebalance User Portfolio");

    // Nothing is written until the consumer runs.
    let (_, list) = svc.call("GET", "/rebalance/list?userId=u1", None).await;
    assert_eq!(list, json!([]));

    assert_eq!(svc.drain().await, 1);

    let (status, list) = svc.call("GET", "/rebalance/list?userId=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);

    assert_eq!(list[0]["asset"], "bonds");
    assert_eq!(list[0]["action"], "BUY");
    assert_eq!(list[0]["rebalance_percent"], json!(10.0));
    assert_eq!(list[1]["asset"], "stocks");
    assert_eq!(list[1]["action"], "SELL");
    assert_eq!(list[1]["rebalance_percent"], json!(10.0));
    assert!(list.iter().all(|t| t["user_id"] == "u1"));
    assert!(list.iter().all(|t| t["id"].is_string()));
    assert_eq!(list[0]["created_at"], list[1]["created_at"]);

    // The allocation record is not advanced by a rebalance.
    let (_, portfolio) = svc.call("GET", "/portfolio?userId=u1", None).await;
    assert_eq!(portfolio["allocation"]["stocks"], json!(60.0));
}

#[tokio::test]
async fn rebalance_for_unknown_user_is_dropped() {
    let svc = service(0);

    let (status, _) = svc
        .call(
            "POST",
            "/rebalance",
            Some(json!({"user_id": "ghost", "new_allocation": {"gold": 100}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(svc.drain().await, 1);

    let (_, list) = svc.call("GET", "/rebalance/list?userId=ghost", None).await;
    assert_eq!(list, json!([]));
    assert!(svc.dead_letter.try_recv().is_none());
}

#[tokio::test]
async fn unchanged_allocation_records_nothing() {
    let svc = service(0);
    let allocation = json!({"stocks": 50, "bonds": 50});

    svc.call(
        "POST",
        "/portfolio",
        Some(json!({"user_id": "u2", "allocation": allocation})),
    )
    .await;
    svc.call(
        "POST",
        "/rebalance",
        Some(json!({"user_id": "u2", "new_allocation": allocation})),
    )
    .await;

    assert_eq!(svc.drain().await, 1);

    let (_, list) = svc.call("GET", "/rebalance/list?userId=u2", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn repeated_rebalances_append_to_the_log() {
    let svc = service(0);

    svc.call(
        "POST",
        "/portfolio",
        Some(json!({"user_id": "u3", "allocation": {"stocks": 100}})),
    )
    .await;
    for target in [80, 90] {
        svc.call(
            "POST",
            "/rebalance",
            Some(json!({"user_id": "u3", "new_allocation": {"stocks": target}})),
        )
        .await;
    }

    assert_eq!(svc.drain().await, 2);

    let (_, list) = svc.call("GET", "/rebalance/list?userId=u3", None).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|t| t["action"] == "BUY"));
    let mut magnitudes: Vec<f64> = list
        .iter()
        .map(|t| t["rebalance_percent"].as_f64().unwrap())
        .collect();
    magnitudes.sort_by(f64::total_cmp);
    assert_eq!(magnitudes, vec![10.0, 20.0]);
}
