use chrono::Utc;
use ethers_core::types::{Address, U256};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::config::ChainConfig;
use crate::db;
use crate::error::{Result, ServiceError};
use crate::models::AssetStatus;

/// `balanceOf(address)` function selector, shared by ERC-721 and ERC-20.
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetAccess {
    pub has_nft: bool,
    pub has_token: bool,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Issues `eth_call` balance reads against the book NFT and $NSI token
/// contracts. Access requires owning at least one NFT or holding the
/// configured minimum token balance.
pub struct ChainClient {
    http: reqwest::Client,
    rpc_url: String,
    nft_contract: Address,
    token_contract: Address,
    min_token_balance: U256,
}

impl ChainClient {
    pub fn new(http: reqwest::Client, config: &ChainConfig) -> Result<Self> {
        let nft_contract = config
            .nft_contract
            .parse()
            .map_err(|_| ServiceError::BadRequest("invalid NFT contract address".into()))?;
        let token_contract = config
            .token_contract
            .parse()
            .map_err(|_| ServiceError::BadRequest("invalid token contract address".into()))?;
        let min_token_balance = U256::from_dec_str(&config.min_token_balance)
            .map_err(|_| ServiceError::BadRequest("invalid minimum token balance".into()))?;

        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            nft_contract,
            token_contract,
            min_token_balance,
        })
    }

    pub async fn check_entitlement(&self, owner: &str) -> Result<AssetAccess> {
        let owner: Address = owner
            .parse()
            .map_err(|_| ServiceError::BadRequest(format!("invalid wallet address: {owner}")))?;

        let (nft_balance, token_balance) = tokio::try_join!(
            self.balance_of(self.nft_contract, owner),
            self.balance_of(self.token_contract, owner)
        )?;

        Ok(derive_access(
            nft_balance,
            token_balance,
            self.min_token_balance,
        ))
    }

    async fn balance_of(&self, contract: Address, owner: Address) -> Result<U256> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": format!("0x{}", hex::encode(contract.as_bytes())),
                    "data": balance_of_calldata(owner),
                },
                "latest"
            ]
        });

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ServiceError::UpstreamData(format!(
                "rpc error {}: {}",
                err.code, err.message
            )));
        }

        let result = response
            .result
            .ok_or_else(|| ServiceError::UpstreamData("empty eth_call result".into()))?;
        parse_u256_hex(&result)
    }
}

fn balance_of_calldata(owner: Address) -> String {
    // 4-byte selector + 32-byte left-padded owner address.
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(owner.as_bytes());
    format!("0x{}", hex::encode(data))
}

fn parse_u256_hex(value: &str) -> Result<U256> {
    let trimmed = value.trim_start_matches("0x");
    if trimmed.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(trimmed, 16)
        .map_err(|_| ServiceError::UpstreamData(format!("unparseable eth_call result: {value}")))
}

fn derive_access(nft_balance: U256, token_balance: U256, min_token_balance: U256) -> AssetAccess {
    AssetAccess {
        has_nft: nft_balance > U256::zero(),
        has_token: token_balance >= min_token_balance,
    }
}

/// Returns the user's entitlement flags, re-checking the chain when the stored
/// row is missing or older than `max_age_secs`. With a usable stored row an
/// RPC failure degrades to the stored flags; with no row it fails closed.
pub async fn ensure_entitlement(
    pool: &PgPool,
    chain: &ChainClient,
    user_id: Uuid,
    wallet: &str,
    max_age_secs: u64,
) -> Result<AssetStatus> {
    let stored = db::get_asset_status(pool, user_id).await?;

    if let Some(status) = stored {
        let age = (Utc::now() - status.updated_at).num_seconds();
        if age >= 0 && (age as u64) < max_age_secs {
            return Ok(status);
        }

        return match chain.check_entitlement(wallet).await {
            Ok(access) => {
                db::upsert_asset_status(pool, user_id, access.has_nft, access.has_token).await
            }
            Err(err) => {
                warn!("entitlement re-check failed, keeping stored flags: {err}");
                Ok(status)
            }
        };
    }

    let access = chain.check_entitlement(wallet).await?;
    db::upsert_asset_status(pool, user_id, access.has_nft, access.has_token).await
}

/// Unconditional chain check and persist, used right after sign-in.
pub async fn refresh_entitlement(
    pool: &PgPool,
    chain: &ChainClient,
    user_id: Uuid,
    wallet: &str,
) -> Result<AssetStatus> {
    let access = chain.check_entitlement(wallet).await?;
    db::upsert_asset_status(pool, user_id, access.has_nft, access.has_token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_of_calldata_layout() {
        let owner: Address = "0x1696688A7828E227E64953C371aC0B57d5974B55"
            .parse()
            .unwrap();
        let calldata = balance_of_calldata(owner);

        // 0x + 4 selector bytes + 32 argument bytes.
        assert_eq!(calldata.len(), 2 + 2 * 36);
        assert!(calldata.starts_with("0x70a08231"));
        assert!(calldata.ends_with("1696688a7828e227e64953c371ac0b57d5974b55"));
        // The address is left-padded with zeroes.
        assert_eq!(&calldata[10..34], "000000000000000000000000");
    }

    #[test]
    fn test_parse_u256_hex() {
        assert_eq!(parse_u256_hex("0x0").unwrap(), U256::zero());
        assert_eq!(parse_u256_hex("0x").unwrap(), U256::zero());
        assert_eq!(
            parse_u256_hex("0x0000000000000000000000000000000000000000000000000000000000000001")
                .unwrap(),
            U256::one()
        );
        assert_eq!(parse_u256_hex("0x1a").unwrap(), U256::from(26u64));
        assert!(parse_u256_hex("0xzz").is_err());
    }

    #[test]
    fn test_derive_access_nft_only() {
        let access = derive_access(U256::one(), U256::zero(), U256::from(100_000u64));
        assert!(access.has_nft);
        assert!(!access.has_token);
    }

    #[test]
    fn test_derive_access_token_threshold() {
        let min = U256::from(100_000u64);

        let below = derive_access(U256::zero(), U256::from(99_999u64), min);
        assert!(!below.has_token);

        let exact = derive_access(U256::zero(), min, min);
        assert!(exact.has_token);
        assert!(!exact.has_nft);
    }
}
