//! Static catalogue of the market-data tools this gateway sells.
//!
//! Each entry maps a tool id to an upstream path and the query parameters the
//! upstream endpoint understands. Every tool is priced identically; the price
//! declarations are fed to [`PriceRegistryBuilder`] once at startup.
//!
//! Each upstream resource appears once, at its newest API version.

use d402::{ConfigError, PriceRegistry, PriceRegistryBuilder, ToolDeclaration};

/// Price of every catalogue tool, in the asset's smallest unit.
pub const TOOL_PRICE: &str = "1000000000000000";
pub const PAYMENT_ASSET: &str = "0x3e17730bb2ca51a8D5deD7E44c003A2e95a4d822";
pub const PAYMENT_ASSET_DECIMALS: u8 = 6;
pub const PAYMENT_NETWORK: &str = "sepolia";
pub const SIGNING_DOMAIN_NAME: &str = "IATPWallet";
pub const SIGNING_DOMAIN_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDefinition {
    pub id: &'static str,
    /// Path appended to the upstream base URL
    pub path: &'static str,
    pub description: &'static str,
    /// Query parameters forwarded upstream; anything else is refused
    pub params: &'static [&'static str],
}

impl ToolDefinition {
    pub fn accepts_param(&self, name: &str) -> bool {
        self.params.contains(&name)
    }

    pub fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration::new(
            self.id,
            TOOL_PRICE,
            PAYMENT_ASSET,
            PAYMENT_ASSET_DECIMALS,
            PAYMENT_NETWORK,
            SIGNING_DOMAIN_NAME,
            SIGNING_DOMAIN_VERSION,
        )
        .with_description(self.description)
    }
}

pub static TOOLS: &[ToolDefinition] = &[
    ToolDefinition {
        id: "content_latest",
        path: "/v1/content/latest",
        description: "Latest news and community content",
        params: &[
            "start", "limit", "id", "slug", "symbol", "news_type", "content_type", "category",
            "language",
        ],
    },
    ToolDefinition {
        id: "airdrops",
        path: "/v1/cryptocurrency/airdrops",
        description: "Upcoming, ongoing and ended airdrops",
        params: &["start", "limit", "status", "id", "slug", "symbol"],
    },
    ToolDefinition {
        id: "categories",
        path: "/v1/cryptocurrency/categories",
        description: "Cryptocurrency categories",
        params: &["start", "limit", "id", "slug", "symbol"],
    },
    ToolDefinition {
        id: "cryptocurrency_info",
        path: "/v2/cryptocurrency/info",
        description: "Static metadata for one or more cryptocurrencies",
        params: &["id", "slug", "symbol", "address", "skip_invalid", "aux"],
    },
    ToolDefinition {
        id: "cryptocurrency_map",
        path: "/v1/cryptocurrency/map",
        description: "Cryptocurrency id map",
        params: &["listing_status", "start", "limit", "sort", "symbol", "aux"],
    },
    ToolDefinition {
        id: "listings_latest",
        path: "/v1/cryptocurrency/listings/latest",
        description: "Latest market data for all active cryptocurrencies",
        params: &[
            "start", "limit", "price_min", "price_max", "market_cap_min", "market_cap_max",
            "volume_24h_min", "volume_24h_max", "circulating_supply_min", "circulating_supply_max",
            "percent_change_24h_min", "percent_change_24h_max", "convert", "convert_id", "sort",
            "sort_dir", "cryptocurrency_type", "tag", "aux",
        ],
    },
    ToolDefinition {
        id: "listings_new",
        path: "/v1/cryptocurrency/listings/new",
        description: "Most recently added cryptocurrencies",
        params: &["start", "limit", "convert", "convert_id", "sort_dir"],
    },
    ToolDefinition {
        id: "quotes_latest",
        path: "/v1/cryptocurrency/quotes/latest",
        description: "Quotes Latest",
        params: &["id", "slug", "symbol", "convert", "convert_id", "aux", "skip_invalid"],
    },
    ToolDefinition {
        id: "quotes_historical",
        path: "/v2/cryptocurrency/quotes/historical",
        description: "Historical quotes for one or more cryptocurrencies",
        params: &[
            "id", "symbol", "time_start", "time_end", "count", "interval", "convert", "convert_id",
            "aux", "skip_invalid",
        ],
    },
    ToolDefinition {
        id: "ohlcv_latest",
        path: "/v2/cryptocurrency/ohlcv/latest",
        description: "Latest OHLCV values",
        params: &["id", "symbol", "convert", "convert_id", "skip_invalid"],
    },
    ToolDefinition {
        id: "market_pairs_latest",
        path: "/v2/cryptocurrency/market-pairs/latest",
        description: "Active market pairs for a cryptocurrency",
        params: &[
            "id", "slug", "symbol", "start", "limit", "sort_dir", "sort", "aux", "matched_id",
            "matched_symbol", "category", "fee_type", "convert", "convert_id",
        ],
    },
    ToolDefinition {
        id: "trending_latest",
        path: "/v1/cryptocurrency/trending/latest",
        description: "Trending cryptocurrencies",
        params: &["start", "limit", "time_period", "convert", "convert_id"],
    },
    ToolDefinition {
        id: "trending_gainers_losers",
        path: "/v1/cryptocurrency/trending/gainers-losers",
        description: "Biggest gainers and losers",
        params: &[
            "start", "limit", "time_period", "convert", "convert_id", "sort", "sort_dir",
        ],
    },
    ToolDefinition {
        id: "exchange_info",
        path: "/v1/exchange/info",
        description: "Exchange metadata",
        params: &["id", "slug", "aux"],
    },
    ToolDefinition {
        id: "exchange_map",
        path: "/v1/exchange/map",
        description: "Exchange id map",
        params: &[
            "listing_status", "slug", "start", "limit", "sort", "aux", "crypto_id",
        ],
    },
    ToolDefinition {
        id: "exchange_listings_latest",
        path: "/v1/exchange/listings/latest",
        description: "Latest exchange listings",
        params: &[
            "start", "limit", "sort", "sort_dir", "market_type", "category", "aux", "convert",
            "convert_id",
        ],
    },
    ToolDefinition {
        id: "fiat_map",
        path: "/v1/fiat/map",
        description: "Fiat currency id map",
        params: &["start", "limit", "sort", "include_metals"],
    },
    ToolDefinition {
        id: "global_metrics_latest",
        path: "/v1/global-metrics/quotes/latest",
        description: "Latest global market metrics",
        params: &["convert", "convert_id"],
    },
    ToolDefinition {
        id: "price_conversion",
        path: "/v2/tools/price-conversion",
        description: "Convert an amount between currencies",
        params: &["amount", "id", "symbol", "time", "convert", "convert_id"],
    },
    ToolDefinition {
        id: "fear_and_greed_latest",
        path: "/v3/fear-and-greed/latest",
        description: "Latest fear and greed index",
        params: &[],
    },
    ToolDefinition {
        id: "fear_and_greed_historical",
        path: "/v3/fear-and-greed/historical",
        description: "Historical fear and greed index",
        params: &["start", "limit"],
    },
    ToolDefinition {
        id: "key_info",
        path: "/v1/key/info",
        description: "API key usage and plan limits",
        params: &[],
    },
];

pub fn find(id: &str) -> Option<&'static ToolDefinition> {
    TOOLS.iter().find(|t| t.id == id)
}

pub fn declarations() -> impl Iterator<Item = ToolDeclaration> {
    TOOLS.iter().map(ToolDefinition::declaration)
}

/// Build the price registry for the whole catalogue.
pub fn price_registry() -> Result<PriceRegistry, ConfigError> {
    PriceRegistryBuilder::new().register_all(declarations()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_builds_a_registry() {
        let registry = price_registry().unwrap();
        assert_eq!(registry.len(), TOOLS.len());
        for tool in TOOLS {
            assert!(registry.contains(tool.id), "{} missing from registry", tool.id);
        }
    }

    #[test]
    fn test_ids_and_paths_are_unique() {
        let ids: HashSet<_> = TOOLS.iter().map(|t| t.id).collect();
        let paths: HashSet<_> = TOOLS.iter().map(|t| t.path).collect();
        assert_eq!(ids.len(), TOOLS.len());
        assert_eq!(paths.len(), TOOLS.len());
        assert!(TOOLS.iter().all(|t| t.path.starts_with('/')));
    }

    #[test]
    fn test_one_api_version_per_resource() {
        let resources: HashSet<_> = TOOLS
            .iter()
            .map(|t| t.path.splitn(3, '/').nth(2).unwrap_or(t.path))
            .collect();
        assert_eq!(resources.len(), TOOLS.len());
    }

    #[test]
    fn test_quotes_latest_price() {
        let registry = price_registry().unwrap();
        let price = registry.get("quotes_latest").unwrap();
        assert_eq!(price.amount.to_string(), "1000000000000000");
        assert_eq!(price.asset.decimals, 6);
        assert_eq!(price.asset.network, "sepolia");
        assert_eq!(price.domain.name, "IATPWallet");
        assert_eq!(price.domain.version, "1");
    }

    #[test]
    fn test_find_and_params() {
        let tool = find("quotes_latest").unwrap();
        assert_eq!(tool.path, "/v1/cryptocurrency/quotes/latest");
        assert!(tool.accepts_param("symbol"));
        assert!(!tool.accepts_param("api_key"));
        assert!(find("nope").is_none());
    }
}
