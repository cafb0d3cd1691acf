//! JSON object definitions for the marketplace API and webhook feed.

pub mod cancellation;
pub mod order;
pub mod sale;
pub mod webhook;

pub use cancellation::{CancellationAck, CancellationRequest, CancellationTarget};
pub use order::{CreateOrderRequest, OrderKind, OrderRejection, OrderResponse, OrderState};
pub use sale::SaleResponse;
pub use webhook::{EventDelivery, MarketplaceEvent};
