//! Stock management endpoints.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::query_cache::{QueryCache, QueryKey};
use super::request_gateway::RequestGateway;
use crate::application::dto::RequestDescriptor;
use crate::domain::entities::{
    AssignStockRequest, AuditLogsFilters, AuditLogsResponse, Department, MarkFaultyRequest,
    MutationResult, MyEquipmentItem, ReturnItemRequest, StockItem, Topic, UserOption,
};
use crate::domain::errors::{ApiError, ValidationError};

/// Stock listings go stale faster than reference data.
pub const STOCK_STALE_TIME: Duration = Duration::from_secs(120);

/// Typed access to the stock API.
///
/// Reads are served through the [`QueryCache`]; mutations go straight to the
/// [`RequestGateway`] and invalidate every stock-movement topic on success.
pub struct StockService {
    gateway: Arc<RequestGateway>,
    cache: Arc<QueryCache>,
    stale_time: Duration,
}

impl StockService {
    #[must_use]
    pub const fn new(gateway: Arc<RequestGateway>, cache: Arc<QueryCache>, stale_time: Duration) -> Self {
        Self {
            gateway,
            cache,
            stale_time,
        }
    }

    /// Lists stock, optionally for one department.
    ///
    /// # Errors
    /// Returns any gateway error.
    pub async fn stock(&self, department_id: Option<u64>) -> Result<Vec<StockItem>, ApiError> {
        let query: Vec<(String, String)> = department_id
            .map(|id| ("department_id".to_string(), id.to_string()))
            .into_iter()
            .collect();
        let params = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<String>();
        let descriptor = RequestDescriptor::get("/stock").with_query(query);

        self.cached(QueryKey::new(Topic::STOCK, params), STOCK_STALE_TIME, descriptor)
            .await
    }

    /// # Errors
    /// Returns any gateway error.
    pub async fn departments(&self) -> Result<Vec<Department>, ApiError> {
        self.cached(
            QueryKey::topic(Topic::DEPARTMENTS),
            self.stale_time,
            RequestDescriptor::get("/departments"),
        )
        .await
    }

    /// Equipment assigned to the logged-in user.
    ///
    /// # Errors
    /// Returns any gateway error.
    pub async fn my_equipment(&self) -> Result<Vec<MyEquipmentItem>, ApiError> {
        self.cached(
            QueryKey::topic(Topic::EQUIPMENT),
            self.stale_time,
            RequestDescriptor::get("/my-equipment"),
        )
        .await
    }

    /// # Errors
    /// Returns any gateway error.
    pub async fn users(&self) -> Result<Vec<UserOption>, ApiError> {
        self.cached(
            QueryKey::topic(Topic::USERS),
            self.stale_time,
            RequestDescriptor::get("/users"),
        )
        .await
    }

    /// # Errors
    /// Returns any gateway error.
    pub async fn audit_logs(&self, filters: &AuditLogsFilters) -> Result<AuditLogsResponse, ApiError> {
        let descriptor = RequestDescriptor::get("/audit/logs").with_query(filters.to_query());

        self.cached(
            QueryKey::new(Topic::AUDIT_LOGS, filters.cache_key()),
            self.stale_time,
            descriptor,
        )
        .await
    }

    /// # Errors
    /// Returns `ApiError::Validation` for an invalid request, else any gateway error.
    pub async fn assign_stock(&self, request: &AssignStockRequest) -> Result<MutationResult, ApiError> {
        request.validate()?;
        self.mutate(RequestDescriptor::post("/stock/assign").with_json(request)?)
            .await
    }

    /// # Errors
    /// Returns `ApiError::Validation` for an invalid request, else any gateway error.
    pub async fn return_item(&self, request: &ReturnItemRequest) -> Result<MutationResult, ApiError> {
        request.validate()?;
        self.mutate(RequestDescriptor::post("/stock/return").with_json(request)?)
            .await
    }

    /// # Errors
    /// Returns `ApiError::Validation` for an invalid request, else any gateway error.
    pub async fn mark_faulty(&self, request: &MarkFaultyRequest) -> Result<MutationResult, ApiError> {
        request.validate()?;
        self.mutate(RequestDescriptor::post("/stock/faulty").with_json(request)?)
            .await
    }

    /// # Errors
    /// Returns `ApiError::Validation` for a zero id, else any gateway error.
    pub async fn delete_stock(&self, item_id: u64) -> Result<MutationResult, ApiError> {
        if item_id == 0 {
            return Err(ValidationError::not_positive("item_id").into());
        }
        self.mutate(RequestDescriptor::delete(format!("/stock/delete/{item_id}")))
            .await
    }

    async fn cached<T>(
        &self,
        key: QueryKey,
        stale_time: Duration,
        descriptor: RequestDescriptor,
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
    {
        debug!(topic = %key.topic, path = %descriptor.path, "Reading");
        self.cache
            .get_or_fetch(key, stale_time, || self.gateway.request::<T>(&descriptor))
            .await
    }

    async fn mutate(&self, descriptor: RequestDescriptor) -> Result<MutationResult, ApiError> {
        let descriptor = descriptor.invalidating(Topic::stock_movement());
        let result = self
            .gateway
            .request::<Option<MutationResult>>(&descriptor)
            .await?
            .unwrap_or(MutationResult {
                success: true,
                message: None,
            });

        // Reads issued after this returns must refetch.
        for topic in &descriptor.invalidates {
            self.cache.invalidate_topic(topic);
        }

        info!(path = %descriptor.path, method = %descriptor.method, "Stock updated");
        Ok(result)
    }
}
