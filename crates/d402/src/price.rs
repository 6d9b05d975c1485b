use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Token a tool is priced in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAsset {
    pub address: Address,
    pub decimals: u8,
    pub network: String,
}

/// EIP-712 domain a wallet signs the payment proof under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    pub name: String,
    pub version: String,
}

/// Validated payment requirement of a single tool.
///
/// Only produced by [`PriceRegistryBuilder::build`](crate::PriceRegistryBuilder::build),
/// so every instance has passed declaration validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPriceConfig {
    pub tool_id: String,
    /// Amount in the asset's smallest unit.
    #[serde(with = "decimal_u256")]
    pub amount: U256,
    pub asset: TokenAsset,
    pub domain: SigningDomain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Raw price declaration attached to a tool definition, validated at registry build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDeclaration {
    pub tool_id: String,
    pub amount: String,
    pub asset_address: String,
    pub decimals: u8,
    pub network: String,
    pub domain_name: String,
    pub domain_version: String,
    pub description: Option<String>,
}

impl ToolDeclaration {
    pub fn new(
        tool_id: impl Into<String>,
        amount: impl Into<String>,
        asset_address: impl Into<String>,
        decimals: u8,
        network: impl Into<String>,
        domain_name: impl Into<String>,
        domain_version: impl Into<String>,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            amount: amount.into(),
            asset_address: asset_address.into(),
            decimals,
            network: network.into(),
            domain_name: domain_name.into(),
            domain_version: domain_version.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Serde adapter writing `U256` as a base-10 integer string (`"1000000"`), not `0x`-hex.
pub mod decimal_u256 {
    use alloy::primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid integer amount '{raw}'")))
    }

    /// Parse a non-negative base-10 integer literal. Signs, decimals, whitespace and
    /// hex prefixes are rejected.
    pub fn parse(raw: &str) -> Option<U256> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_str_radix(raw, 10).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_serializes_as_decimal_string() {
        let config = ToolPriceConfig {
            tool_id: "quotes_latest".to_string(),
            amount: U256::from(1_000_000_000_000_000u64),
            asset: TokenAsset {
                address: Address::ZERO,
                decimals: 6,
                network: "sepolia".to_string(),
            },
            domain: SigningDomain {
                name: "IATPWallet".to_string(),
                version: "1".to_string(),
            },
            description: None,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["amount"], "1000000000000000");
        assert_eq!(json["toolId"], "quotes_latest");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn decimal_parse_rejects_non_integers() {
        assert_eq!(decimal_u256::parse("0"), Some(U256::ZERO));
        assert!(decimal_u256::parse("").is_none());
        assert!(decimal_u256::parse("-1").is_none());
        assert!(decimal_u256::parse("1.5").is_none());
        assert!(decimal_u256::parse("0x10").is_none());
        assert!(decimal_u256::parse(" 10").is_none());
    }

    #[test]
    fn decimal_parse_rejects_overflow() {
        let too_big = "9".repeat(80);
        assert!(decimal_u256::parse(&too_big).is_none());
    }
}
