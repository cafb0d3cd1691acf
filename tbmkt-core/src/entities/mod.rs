pub mod job_lease;
pub mod order;
pub mod participant;
pub mod position;
pub mod processed_event;
pub mod sale;

use tbmkt_sdk::objects::{OrderKind as SdkOrderKind, OrderState as SdkOrderState};

/// Order side for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `tbmkt_sdk::objects::OrderKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
pub enum OrderType {
    #[sqlx(rename = "LISTING")]
    Listing,
    #[sqlx(rename = "BID")]
    Bid,
}

impl From<OrderType> for SdkOrderKind {
    fn from(value: OrderType) -> Self {
        match value {
            OrderType::Listing => SdkOrderKind::Listing,
            OrderType::Bid => SdkOrderKind::Bid,
        }
    }
}

impl From<SdkOrderKind> for OrderType {
    fn from(value: SdkOrderKind) -> Self {
        match value {
            SdkOrderKind::Listing => OrderType::Listing,
            SdkOrderKind::Bid => OrderType::Bid,
        }
    }
}

/// Order status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `tbmkt_sdk::objects::OrderState`. `Cancelled` is terminal for the
/// row but the row is retained; settlement removes rows outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
pub enum OrderStatus {
    #[sqlx(rename = "ACTIVE")]
    Active,
    #[sqlx(rename = "PROCESSING_CANCELLATION")]
    ProcessingCancellation,
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
}

impl From<OrderStatus> for SdkOrderState {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::Active => SdkOrderState::Active,
            OrderStatus::ProcessingCancellation => SdkOrderState::ProcessingCancellation,
            OrderStatus::Cancelled => SdkOrderState::Cancelled,
        }
    }
}

impl From<SdkOrderState> for OrderStatus {
    fn from(value: SdkOrderState) -> Self {
        match value {
            SdkOrderState::Active => OrderStatus::Active,
            SdkOrderState::ProcessingCancellation => OrderStatus::ProcessingCancellation,
            SdkOrderState::Cancelled => OrderStatus::Cancelled,
        }
    }
}
