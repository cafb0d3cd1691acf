use serde::{Deserialize, Serialize};

/// Which orders a cancellation applies to.
///
/// Mirrors the two shapes of on-chain cancellation: an explicit nonce
/// list, or everything below a nonce threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CancellationTarget {
    #[serde(rename_all = "camelCase")]
    Nonces { nonces: Vec<i64> },
    #[serde(rename_all = "camelCase")]
    BelowNonce { below_nonce: i64 },
}

/// `POST /marketplace/orders/cancellations` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    pub chain_id: String,
    pub participant: String,
    #[serde(flatten)]
    pub target: CancellationTarget,
}

/// Acknowledgement for a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationAck {
    /// Orders moved into PROCESSING_CANCELLATION by this request.
    pub updated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_list_selector_parses() {
        let json = r#"{"chainId":"0x1","participant":"0xAb","nonces":[1,2,3]}"#;
        let req: CancellationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.target,
            CancellationTarget::Nonces {
                nonces: vec![1, 2, 3]
            }
        );
    }

    #[test]
    fn below_nonce_selector_parses() {
        let json = r#"{"chainId":"0x1","participant":"0xAb","belowNonce":9}"#;
        let req: CancellationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.target, CancellationTarget::BelowNonce { below_nonce: 9 });
    }
}
