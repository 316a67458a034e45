//! Data transfer objects for the application layer.

mod auth_dto;
mod request_dto;

pub use auth_dto::{LoginRequest, LoginResponse, RefreshResponse};
pub use request_dto::RequestDescriptor;
