use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Listing,
    Bid,
}

/// Order status as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Active,
    ProcessingCancellation,
    Cancelled,
}

/// `POST /marketplace/orders` request body.
///
/// The signature is opaque at this layer; it is stored and handed to
/// settlement tooling downstream, never interpreted by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub collection: String,
    pub currency: String,
    pub participant: String,
    pub chain_id: String,
    pub token_id: i64,
    pub amount: Decimal,
    /// Absolute expiry, unix seconds.
    pub expiry: i64,
    pub nonce: i64,
    pub signature: String,
}

/// A single order as returned by the read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub collection: String,
    pub currency: String,
    pub participant: String,
    pub chain_id: String,
    pub token_id: i64,
    pub amount: Decimal,
    /// Absolute expiry, unix seconds.
    pub expiry: i64,
    pub nonce: i64,
    pub status: OrderState,
    pub is_stale: bool,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Bound wallet of the traded position, when the read path joins it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Current owner of the traded position, when the read path joins it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_address: Option<String>,
}

/// Structured rejection body for refused order creations.
///
/// Each validation failure maps to a distinct code so a client can
/// explain to the user why the order was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejection {
    pub code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_order_request_round_trips_wire_names() {
        let json = r#"{
            "type": "LISTING",
            "collection": "0xabc",
            "currency": "0xdef",
            "participant": "0x123",
            "chainId": "0x1",
            "tokenId": 42,
            "amount": "10.5",
            "expiry": 1893456000,
            "nonce": 7,
            "signature": "0xsig"
        }"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.kind, OrderKind::Listing);
        assert_eq!(req.token_id, 42);
        assert_eq!(req.amount.to_string(), "10.5");

        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["type"], "LISTING");
        assert_eq!(back["chainId"], "0x1");
    }
}
