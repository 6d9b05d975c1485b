use alloy::primitives::{Address, U256};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::D402Error;
use crate::price::decimal_u256;

/// Asset the payer claims to have paid in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofAsset {
    pub address: Address,
    pub network: String,
}

/// Caller-supplied payment proof (sent in the `X-PAYMENT` header, base64-encoded JSON).
///
/// The signature scheme is opaque to this crate; only the facilitator checks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    pub payer: Address,
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    pub asset: ProofAsset,
    pub signature: String,
    pub nonce: String,
    /// Unix timestamp (seconds) after which the proof is no longer valid.
    pub valid_before: u64,
}

/// Decode an `X-PAYMENT` header value into a [`PaymentProof`].
pub fn decode_payment_header(header_value: &str) -> Result<PaymentProof, D402Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(header_value.trim())
        .map_err(|e| D402Error::InvalidHeader(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| D402Error::InvalidHeader(format!("invalid JSON payload: {e}")))
}

/// Encode a proof for the `X-PAYMENT` header.
pub fn encode_payment_header(proof: &PaymentProof) -> Result<String, D402Error> {
    let json = serde_json::to_vec(proof)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaymentProof {
        PaymentProof {
            payer: Address::repeat_byte(0x11),
            amount: U256::from(1_000_000_000_000_000u64),
            asset: ProofAsset {
                address: Address::repeat_byte(0x22),
                network: "sepolia".to_string(),
            },
            signature: "0xdead".to_string(),
            nonce: "0x01".to_string(),
            valid_before: 1_900_000_000,
        }
    }

    #[test]
    fn test_decode_valid_header() {
        let encoded = encode_payment_header(&sample()).unwrap();
        let decoded = decode_payment_header(&encoded).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_wire_format_uses_decimal_amount_and_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["amount"], "1000000000000000");
        assert_eq!(json["validBefore"], 1_900_000_000u64);
        assert_eq!(json["asset"]["network"], "sepolia");
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_payment_header("not-valid-base64!!!").unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }

    #[test]
    fn test_decode_invalid_json() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"this is not json");
        let err = decode_payment_header(&encoded).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_decode_rejects_hex_amount() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["amount"] = serde_json::json!("0x10");
        let encoded = base64::engine::general_purpose::STANDARD.encode(json.to_string());
        assert!(decode_payment_header(&encoded).is_err());
    }
}
