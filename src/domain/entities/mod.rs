//! Domain entities.

mod audit;
mod stock;
mod token;
mod topic;
mod user;

pub use audit::{AuditAction, AuditLog, AuditLogsFilters, AuditLogsResponse, DEFAULT_AUDIT_PAGE_SIZE};
pub use stock::{
    AssignStockRequest, Department, ItemCondition, MAX_REASON_LENGTH, MarkFaultyRequest,
    MutationResult, MyEquipmentItem, ReturnItemRequest, StockItem, StockStatus, UserOption,
};
pub use token::BearerToken;
pub use topic::{InvalidationEvent, Topic};
pub use user::{User, UserId};
