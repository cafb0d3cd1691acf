use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A settled trade as returned by `GET /marketplace/sales`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: i64,
    pub chain_id: String,
    pub collection: String,
    pub currency: String,
    pub buyer: String,
    pub seller: String,
    pub token_id: i64,
    pub amount: Decimal,
    /// Settlement time, unix seconds.
    pub sale_date: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn sale_response_uses_wire_names() {
        let sale = SaleResponse {
            id: 9,
            chain_id: "0x1".to_owned(),
            collection: "0xabc".to_owned(),
            currency: "0xdef".to_owned(),
            buyer: "0xb".to_owned(),
            seller: "0xs".to_owned(),
            token_id: 42,
            amount: dec!(10.5),
            sale_date: 1893456000,
        };
        let json = serde_json::to_value(&sale).unwrap();
        assert_eq!(json["chainId"], "0x1");
        assert_eq!(json["tokenId"], 42);
        assert_eq!(json["saleDate"], 1893456000);
        assert_eq!(json["buyer"], "0xb");
    }
}
