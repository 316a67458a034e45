//! Application layer with services and DTOs.

/// Data transfer objects.
pub mod dto;
/// Session, request and cache services.
pub mod services;

pub use dto::{LoginRequest, LoginResponse, RefreshResponse, RequestDescriptor};
pub use services::{
    AuthSession, CacheInvalidationBridge, QueryCache, RequestGateway, SessionEvent, StockService,
};
