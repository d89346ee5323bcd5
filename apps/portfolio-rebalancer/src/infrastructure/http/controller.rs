//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::de::DeserializeOwned;

use crate::application::ports::{AllocationStorePort, QueuePublisherPort, TransactionStorePort};
use crate::application::services::RebalanceIntake;
use crate::application::use_cases::{
    GetPortfolioUseCase, ListTransactionsUseCase, RegisterPortfolioUseCase,
};
use crate::domain::shared::UserId;
use crate::infrastructure::metrics::get_metrics_handle;

use super::request::{RegisterPortfolioRequest, SubmitRebalanceRequest, UserQuery};
use super::response::{ApiError, HealthResponse, RebalanceAcceptedResponse};

/// Application state shared across handlers.
pub struct AppState<A, T, P>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    /// Use case for registering portfolios.
    pub register_portfolio: Arc<RegisterPortfolioUseCase<A>>,
    /// Use case for reading portfolios.
    pub get_portfolio: Arc<GetPortfolioUseCase<A>>,
    /// Use case for listing transactions.
    pub list_transactions: Arc<ListTransactionsUseCase<T>>,
    /// Rebalance intake, used for submissions.
    pub intake: Arc<RebalanceIntake<A, T, P>>,
    /// Application version.
    pub version: String,
}

impl<A, T, P> AppState<A, T, P>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    /// Build the state from shared stores and the intake.
    pub fn new(
        allocation_store: &Arc<A>,
        transaction_store: &Arc<T>,
        intake: Arc<RebalanceIntake<A, T, P>>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            register_portfolio: Arc::new(RegisterPortfolioUseCase::new(Arc::clone(
                allocation_store,
            ))),
            get_portfolio: Arc::new(GetPortfolioUseCase::new(Arc::clone(allocation_store))),
            list_transactions: Arc::new(ListTransactionsUseCase::new(Arc::clone(
                transaction_store,
            ))),
            intake,
            version: version.into(),
        }
    }
}

impl<A, T, P> Clone for AppState<A, T, P>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    fn clone(&self) -> Self {
        Self {
            register_portfolio: Arc::clone(&self.register_portfolio),
            get_portfolio: Arc::clone(&self.get_portfolio),
            list_transactions: Arc::clone(&self.list_transactions),
            intake: Arc::clone(&self.intake),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<A, T, P>(state: AppState<A, T, P>) -> Router
where
    A: AllocationStorePort + 'static,
    T: TransactionStorePort + 'static,
    P: QueuePublisherPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/portfolio", post(register_portfolio).get(get_portfolio))
        .route("/rebalance", post(submit_rebalance))
        .route("/rebalance/list", get(list_transactions))
        .with_state(state)
}

/// Decode a JSON body, answering 400 on any failure.
fn decode_body<B: DeserializeOwned>(body: &Bytes) -> Result<B, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))
}

fn require_user(query: &UserQuery) -> Result<UserId, ApiError> {
    query
        .user_id()
        .ok_or_else(|| ApiError::bad_request("userId query parameter is required"))
}

/// Health check endpoint.
async fn health_check<A, T, P>(State(state): State<AppState<A, T, P>>) -> impl IntoResponse
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Prometheus metrics endpoint. Empty when the recorder is not installed.
async fn metrics() -> impl IntoResponse {
    let body = get_metrics_handle()
        .map(|handle| handle.render())
        .unwrap_or_default();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

/// Register portfolio endpoint.
async fn register_portfolio<A, T, P>(
    State(state): State<AppState<A, T, P>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    let request: RegisterPortfolioRequest = decode_body(&body)?;
    let portfolio = state
        .register_portfolio
        .execute(request.user_id, request.allocation)
        .await?;
    Ok((StatusCode::CREATED, Json(portfolio)))
}

/// Get portfolio endpoint.
async fn get_portfolio<A, T, P>(
    State(state): State<AppState<A, T, P>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    let user_id = require_user(&query)?;
    let portfolio = state.get_portfolio.execute(&user_id).await?;
    Ok(Json(portfolio))
}

/// Submit rebalance endpoint. Returns once the request is queued.
async fn submit_rebalance<A, T, P>(
    State(state): State<AppState<A, T, P>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    let request: SubmitRebalanceRequest = decode_body(&body)?;
    if request.user_id.is_blank() {
        return Err(ApiError::bad_request("user_id is required"));
    }
    request
        .new_allocation
        .check_weights()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let queued = state
        .intake
        .submit(request.user_id, request.new_allocation)
        .await?;

    Ok(Json(RebalanceAcceptedResponse {
        message: "Success Rebalance User Portfolio".to_string(),
        user_id: queued.user_id,
        created_at: queued.created_at,
    }))
}

/// List rebalance transactions endpoint.
async fn list_transactions<A, T, P>(
    State(state): State<AppState<A, T, P>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    A: AllocationStorePort,
    T: TransactionStorePort,
    P: QueuePublisherPort,
{
    let user_id = require_user(&query)?;
    let transactions = state.list_transactions.execute(&user_id).await?;
    Ok(Json(transactions))
}
