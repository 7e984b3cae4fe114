use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::TokenConfig;
use crate::error::{Result, ServiceError};
use crate::models::TokenData;

pub const TOKEN_NAME: &str = "Network Superintelligence";

const PRICE_CACHE_KEY: &str = "nsi-price";

// DexScreener `GET /latest/dex/tokens/{address}` response, reduced to the
// fields we map.
#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    #[serde(default)]
    base_token: PairToken,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    price_change: PriceChange,
    #[serde(default)]
    liquidity: Liquidity,
    #[serde(default)]
    volume: Volume,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    pair_address: String,
    #[serde(default)]
    dex_id: String,
}

#[derive(Debug, Deserialize, Default)]
struct PairToken {
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Deserialize, Default)]
struct PriceChange {
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct Liquidity {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct Volume {
    #[serde(default)]
    h24: Option<f64>,
}

/// Fetches $NSI market data from DexScreener with a short-TTL cache. A single
/// attempt per call, no retries; any failure yields the static fallback
/// record instead of an error.
pub struct PriceClient {
    http: reqwest::Client,
    config: TokenConfig,
    cache: TtlCache<String, TokenData>,
}

impl PriceClient {
    pub fn new(http: reqwest::Client, config: TokenConfig) -> Self {
        let cache = TtlCache::new(Duration::from_secs(config.cache_ttl_secs));
        Self {
            http,
            config,
            cache,
        }
    }

    pub async fn fetch_token_data(&self) -> TokenData {
        if let Some(cached) = self.cache.get(&PRICE_CACHE_KEY.to_string()) {
            debug!("using cached token price data");
            return cached;
        }

        match self.fetch_fresh().await {
            Ok(data) => {
                self.cache.put(PRICE_CACHE_KEY.to_string(), data.clone());
                data
            }
            Err(err) => {
                warn!("token price fetch failed, using fallback data: {err}");
                fallback_token_data(&self.config.contract_address)
            }
        }
    }

    async fn fetch_fresh(&self) -> Result<TokenData> {
        let url = format!(
            "{}/latest/dex/tokens/{}",
            self.config.dexscreener_url, self.config.contract_address
        );

        let response: PairsResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let pairs = response.pairs.unwrap_or_default();
        let main_pair = pick_main_pair(pairs)
            .ok_or_else(|| ServiceError::UpstreamData("no valid pairs found for token".into()))?;

        Ok(map_pair(main_pair))
    }
}

/// The main pair is the one with the most USD liquidity.
fn pick_main_pair(pairs: Vec<Pair>) -> Option<Pair> {
    pairs.into_iter().max_by(|a, b| {
        a.liquidity
            .usd
            .unwrap_or(0.0)
            .total_cmp(&b.liquidity.usd.unwrap_or(0.0))
    })
}

fn map_pair(pair: Pair) -> TokenData {
    TokenData {
        symbol: pair.base_token.symbol,
        name: TOKEN_NAME.to_string(),
        price: pair.price_usd.unwrap_or_else(|| "0".to_string()),
        price_change24h: pair
            .price_change
            .h24
            .map(|v| v.to_string())
            .unwrap_or_else(|| "0".to_string()),
        liquidity: pair.liquidity.usd.unwrap_or(0.0).to_string(),
        volume24h: pair.volume.h24.unwrap_or(0.0).to_string(),
        market_cap: pair.fdv.unwrap_or(0.0).to_string(),
        pair_address: pair.pair_address,
        dex_id: pair.dex_id,
    }
}

pub fn fallback_token_data(contract_address: &str) -> TokenData {
    TokenData {
        symbol: "NSI".to_string(),
        name: TOKEN_NAME.to_string(),
        price: "0.00000123".to_string(),
        price_change24h: "5.2".to_string(),
        liquidity: "25000".to_string(),
        volume24h: "3500".to_string(),
        market_cap: "123000".to_string(),
        pair_address: contract_address.to_string(),
        dex_id: "baseswap".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> PairsResponse {
        serde_json::from_value(serde_json::json!({
            "pairs": [
                {
                    "baseToken": { "symbol": "NSI" },
                    "priceUsd": "0.00000200",
                    "priceChange": { "h24": -3.4 },
                    "liquidity": { "usd": 1500.0 },
                    "volume": { "h24": 90.0 },
                    "fdv": 200000.0,
                    "pairAddress": "0xminor",
                    "dexId": "uniswap"
                },
                {
                    "baseToken": { "symbol": "NSI" },
                    "priceUsd": "0.00000210",
                    "priceChange": { "h24": 5.1 },
                    "liquidity": { "usd": 48000.0 },
                    "volume": { "h24": 4200.0 },
                    "fdv": 250000.0,
                    "pairAddress": "0xmain",
                    "dexId": "baseswap"
                }
            ]
        }))
        .expect("sample response should deserialize")
    }

    #[test]
    fn test_pick_main_pair_by_liquidity() {
        let response = sample_response();
        let main = pick_main_pair(response.pairs.unwrap()).unwrap();

        assert_eq!(main.pair_address, "0xmain");
        assert_eq!(main.liquidity.usd, Some(48000.0));
    }

    #[test]
    fn test_map_pair_fields() {
        let response = sample_response();
        let data = map_pair(pick_main_pair(response.pairs.unwrap()).unwrap());

        assert_eq!(data.symbol, "NSI");
        assert_eq!(data.name, TOKEN_NAME);
        assert_eq!(data.price, "0.00000210");
        assert_eq!(data.price_change24h, "5.1");
        assert_eq!(data.liquidity, "48000");
        assert_eq!(data.market_cap, "250000");
        assert_eq!(data.dex_id, "baseswap");
    }

    #[test]
    fn test_empty_pairs_has_no_main_pair() {
        assert!(pick_main_pair(Vec::new()).is_none());
    }

    #[test]
    fn test_fallback_literals() {
        let data = fallback_token_data("0x1696688A7828E227E64953C371aC0B57d5974B55");

        assert_eq!(data.symbol, "NSI");
        assert_eq!(data.price, "0.00000123");
        assert_eq!(data.price_change24h, "5.2");
        assert_eq!(data.liquidity, "25000");
        assert_eq!(data.volume24h, "3500");
        assert_eq!(data.market_cap, "123000");
        assert_eq!(data.pair_address, "0x1696688A7828E227E64953C371aC0B57d5974B55");
        assert_eq!(data.dex_id, "baseswap");
    }

    #[test]
    fn test_pairs_missing_fields_still_deserialize() {
        let response: PairsResponse = serde_json::from_value(serde_json::json!({
            "pairs": [{ "baseToken": { "symbol": "NSI" } }]
        }))
        .unwrap();

        let data = map_pair(pick_main_pair(response.pairs.unwrap()).unwrap());
        assert_eq!(data.price, "0");
        assert_eq!(data.price_change24h, "0");
    }
}
