use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    pub environment: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Memecoin price feed settings (DexScreener).
#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub contract_address: String,
    pub chain: String,
    pub dexscreener_url: String,
    pub cache_ttl_secs: u64,
}

/// NFT book metadata settings (PageDAO hub API).
#[derive(Debug, Deserialize, Clone)]
pub struct BookConfig {
    pub contract_address: String,
    pub chain: String,
    pub api_base_url: String,
    pub asset_type: String,
    pub cache_ttl_secs: u64,
    pub cover_image: String,
}

/// On-chain entitlement checks via JSON-RPC.
#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub nft_contract: String,
    pub token_contract: String,
    /// Minimum ERC-20 balance (raw units, decimal string) that grants access.
    pub min_token_balance: String,
    /// How long a stored entitlement check stays fresh before a re-check.
    pub entitlement_ttl_secs: u64,
}

/// Price-movement alerting for frame subscribers.
#[derive(Debug, Deserialize, Clone)]
pub struct AlertsConfig {
    pub enabled: bool,
    pub poll_secs: u64,
    pub change_threshold_pct: f64,
    /// Public base URL of this deployment, used in notification target links.
    pub frame_base_url: String,
}

/// Optional relays to external platforms. A relay is active only when its
/// credentials are present.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub discord_webhook_url: Option<String>,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LinksConfig {
    pub alexandria: String,
    pub personal_site: String,
    pub nounspace: String,
    pub buy: String,
    pub app: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrameConfig {
    pub runtime: RuntimeConfig,
    pub api: ApiConfig,
    pub db: DbConfig,
    pub token: TokenConfig,
    pub book: BookConfig,
    pub chain: ChainConfig,
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    pub links: LinksConfig,
}

impl FrameConfig {
    pub fn from_env() -> Result<Self> {
        // Load base config from `config/default.(toml|yaml|json)` relative to the
        // current working directory (the workspace root), then override with
        // `FRAME__...` environment variables.
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("FRAME").separator("__"))
            .build()?;

        settings.try_deserialize().map_err(Into::into)
    }
}
