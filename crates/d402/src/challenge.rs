use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::admission::DenialReason;
use crate::price::{decimal_u256, SigningDomain, TokenAsset, ToolPriceConfig};

/// A single entry in the `accepts` array of a 402 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedPayment {
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    pub asset: TokenAsset,
    pub domain: SigningDomain,
}

impl From<&ToolPriceConfig> for AcceptedPayment {
    fn from(price: &ToolPriceConfig) -> Self {
        Self {
            amount: price.amount,
            asset: price.asset.clone(),
            domain: price.domain.clone(),
        }
    }
}

/// The 402 response body.
///
/// `accepts` is empty only for `unknown_tool`, where there is no price to quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequiredBody {
    pub accepts: Vec<AcceptedPayment>,
    pub reason: DenialReason,
}

impl PaymentRequiredBody {
    pub fn new(price: Option<&ToolPriceConfig>, reason: DenialReason) -> Self {
        Self {
            accepts: price.map(AcceptedPayment::from).into_iter().collect(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn quotes_latest() -> ToolPriceConfig {
        ToolPriceConfig {
            tool_id: "quotes_latest".to_string(),
            amount: U256::from(1_000_000_000_000_000u64),
            asset: TokenAsset {
                address: "0x3e17730bb2ca51a8D5deD7E44c003A2e95a4d822"
                    .parse::<Address>()
                    .unwrap(),
                decimals: 6,
                network: "sepolia".to_string(),
            },
            domain: SigningDomain {
                name: "IATPWallet".to_string(),
                version: "1".to_string(),
            },
            description: Some("Quotes Latest".to_string()),
        }
    }

    #[test]
    fn test_body_shape_matches_wire_contract() {
        let body = PaymentRequiredBody::new(Some(&quotes_latest()), DenialReason::NoProof);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["reason"], "no_proof");
        let accepts = json["accepts"].as_array().unwrap();
        assert_eq!(accepts.len(), 1);

        let entry = &accepts[0];
        assert_eq!(entry["amount"], "1000000000000000");
        assert_eq!(
            entry["asset"]["address"].as_str().unwrap().to_lowercase(),
            "0x3e17730bb2ca51a8d5ded7e44c003a2e95a4d822"
        );
        assert_eq!(entry["asset"]["decimals"], 6);
        assert_eq!(entry["asset"]["network"], "sepolia");
        assert_eq!(entry["domain"]["name"], "IATPWallet");
        assert_eq!(entry["domain"]["version"], "1");

        // Exactly these keys: no tool id or description leaks into the challenge.
        let mut keys: Vec<_> = entry.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["amount", "asset", "domain"]);
    }

    #[test]
    fn test_unknown_tool_has_no_accepts() {
        let body = PaymentRequiredBody::new(None, DenialReason::UnknownTool);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["reason"], "unknown_tool");
        assert_eq!(json["accepts"], serde_json::json!([]));
    }
}
