//! Application services.

pub mod auth_session;
pub mod invalidation_bridge;
pub mod query_cache;
pub mod request_gateway;
pub mod stock_service;

pub use auth_session::{AuthSession, SessionEvent};
pub use invalidation_bridge::CacheInvalidationBridge;
pub use query_cache::{CacheStats, QueryCache, QueryKey};
pub use request_gateway::RequestGateway;
pub use stock_service::StockService;
