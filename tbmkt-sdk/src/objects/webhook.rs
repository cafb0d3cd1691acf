use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw webhook delivery envelope.
///
/// The delivery service guarantees only the source transaction hash
/// (the dedup key) and the chain id; everything else stays untyped
/// until the event ingestor decodes it. Receipts can arrive late,
/// repeated, or out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDelivery {
    pub chain_id: String,
    pub tx_hash: String,
    #[serde(flatten)]
    pub event: serde_json::Value,
}

/// Decoded marketplace event carried inside an [`EventDelivery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketplaceEvent {
    /// The participant cancelled an explicit set of order nonces.
    #[serde(rename_all = "camelCase")]
    OrdersCancelled {
        participant: String,
        nonces: Vec<i64>,
    },
    /// The participant invalidated every nonce below a threshold.
    #[serde(rename_all = "camelCase")]
    AllOrdersCancelled { participant: String, min_nonce: i64 },
    /// A position changed hands; the consumed order identifies itself
    /// by (participant ∈ {buyer, seller}, nonce, token id, collection).
    #[serde(rename_all = "camelCase")]
    PositionSold {
        buyer: String,
        seller: String,
        nonce: i64,
        token_id: i64,
        collection: String,
        currency: String,
        amount: Decimal,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_keeps_unknown_fields_for_later_decode() {
        let json = r#"{
            "chainId": "0x1",
            "txHash": "0xdead",
            "kind": "orders_cancelled",
            "participant": "0xab",
            "nonces": [4, 5]
        }"#;
        let delivery: EventDelivery = serde_json::from_str(json).unwrap();
        assert_eq!(delivery.tx_hash, "0xdead");

        let event: MarketplaceEvent = serde_json::from_value(delivery.event).unwrap();
        assert_eq!(
            event,
            MarketplaceEvent::OrdersCancelled {
                participant: "0xab".into(),
                nonces: vec![4, 5],
            }
        );
    }

    #[test]
    fn position_sold_decodes_amount() {
        let json = r#"{
            "kind": "position_sold",
            "buyer": "0xb",
            "seller": "0xs",
            "nonce": 3,
            "tokenId": 77,
            "collection": "0xc",
            "currency": "0xw",
            "amount": "12.25"
        }"#;
        let event: MarketplaceEvent = serde_json::from_str(json).unwrap();
        match event {
            MarketplaceEvent::PositionSold {
                token_id, amount, ..
            } => {
                assert_eq!(token_id, 77);
                assert_eq!(amount.to_string(), "12.25");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
