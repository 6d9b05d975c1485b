use std::collections::HashMap;

use alloy::primitives::Address;

use crate::error::ConfigError;
use crate::price::{decimal_u256, SigningDomain, TokenAsset, ToolDeclaration, ToolPriceConfig};

/// Immutable map from tool id to its payment requirement.
///
/// Built once at startup and shared behind an `Arc`; there is no mutation
/// after [`PriceRegistryBuilder::build`], so concurrent readers need no lock.
#[derive(Debug, Default)]
pub struct PriceRegistry {
    tools: HashMap<String, ToolPriceConfig>,
}

impl PriceRegistry {
    /// Exact-match lookup.
    pub fn get(&self, tool_id: &str) -> Option<&ToolPriceConfig> {
        self.tools.get(tool_id)
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolPriceConfig> {
        self.tools.values()
    }
}

/// Collects tool declarations and validates them all in a single pass.
#[derive(Debug, Default)]
pub struct PriceRegistryBuilder {
    declarations: Vec<ToolDeclaration>,
}

impl PriceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a declaration. Validation is deferred to [`build`](Self::build).
    pub fn register(mut self, declaration: ToolDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Queue many declarations at once (e.g. a whole tool catalogue).
    pub fn register_all(mut self, declarations: impl IntoIterator<Item = ToolDeclaration>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    /// Validate every declaration and produce the registry.
    ///
    /// The first malformed declaration aborts the build.
    pub fn build(self) -> Result<PriceRegistry, ConfigError> {
        let mut tools = HashMap::with_capacity(self.declarations.len());

        for declaration in self.declarations {
            let config = validate(declaration)?;
            if tools.contains_key(&config.tool_id) {
                return Err(ConfigError::DuplicateTool(config.tool_id));
            }
            tools.insert(config.tool_id.clone(), config);
        }

        tracing::debug!(tools = tools.len(), "price registry built");
        Ok(PriceRegistry { tools })
    }
}

fn validate(declaration: ToolDeclaration) -> Result<ToolPriceConfig, ConfigError> {
    let tool = declaration.tool_id.trim().to_string();
    let invalid = |reason: String| ConfigError::InvalidPrice {
        tool: tool.clone(),
        reason,
    };

    if tool.is_empty() {
        return Err(invalid("tool id is empty".to_string()));
    }

    let amount = decimal_u256::parse(&declaration.amount).ok_or_else(|| {
        invalid(format!(
            "amount '{}' is not a non-negative integer literal",
            declaration.amount
        ))
    })?;

    let raw_address = declaration.asset_address.trim();
    if raw_address.is_empty() {
        return Err(invalid("asset contract address is empty".to_string()));
    }
    let address: Address = raw_address
        .parse()
        .map_err(|e| invalid(format!("asset contract address '{raw_address}': {e}")))?;

    if declaration.decimals == 0 {
        return Err(invalid("asset decimals must be positive".to_string()));
    }

    if declaration.network.trim().is_empty() {
        return Err(invalid("asset network is empty".to_string()));
    }

    if declaration.domain_name.trim().is_empty() {
        return Err(invalid("signing domain name is empty".to_string()));
    }

    Ok(ToolPriceConfig {
        tool_id: tool,
        amount,
        asset: TokenAsset {
            address,
            decimals: declaration.decimals,
            network: declaration.network.trim().to_string(),
        },
        domain: SigningDomain {
            name: declaration.domain_name,
            version: declaration.domain_version,
        },
        description: declaration.description,
    })
}
