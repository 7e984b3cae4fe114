use ethers_core::types::{Address, Signature};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::error::{Result, ServiceError};
use crate::models::User;

/// Message the wallet is asked to sign. No nonce is persisted; the embedded
/// timestamp is informational only.
pub fn generate_sign_message(address: &str, issued_at_ms: i64) -> String {
    format!("Sign this message to authenticate with INEVITABLE: {address} at {issued_at_ms}")
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse()
        .map_err(|_| ServiceError::BadRequest(format!("invalid wallet address: {address}")))
}

/// Canonical storage form of a wallet address: 0x-prefixed lowercase hex.
pub fn normalize_address(address: &str) -> Result<String> {
    let parsed = parse_address(address)?;
    Ok(format!("0x{}", hex::encode(parsed.as_bytes())))
}

/// Recovers the EIP-191 signer of `message` and compares it with the claimed
/// address. Comparison happens on the parsed address bytes, so casing of the
/// hex input does not matter.
pub fn verify_signature(address: &str, message: &str, signature: &str) -> Result<()> {
    let claimed = parse_address(address)?;

    let signature: Signature = signature
        .parse()
        .map_err(|_| ServiceError::InvalidSignature)?;
    let recovered = signature
        .recover(message)
        .map_err(|_| ServiceError::InvalidSignature)?;

    if recovered != claimed {
        return Err(ServiceError::InvalidSignature);
    }

    Ok(())
}

/// Opaque bearer token derived from the signature: hex SHA-256 digest.
pub fn derive_token(signature: &str) -> String {
    hex::encode(Sha256::digest(signature.as_bytes()))
}

/// Signs a wallet in. With a signature and message, the signature is verified
/// first and a fresh verification token is stored; a mismatch writes nothing.
/// Without them the user row is still created or touched (first-connect flow)
/// but no token is issued.
pub async fn authenticate(
    pool: &PgPool,
    address: &str,
    signature: Option<&str>,
    message: Option<&str>,
) -> Result<(User, Option<String>)> {
    let wallet = normalize_address(address)?;

    let token = match (signature, message) {
        (Some(signature), Some(message)) => {
            verify_signature(address, message, signature)?;
            Some(derive_token(signature))
        }
        _ => None,
    };

    let user = db::persist_authentication(pool, &wallet, token.as_deref()).await?;
    info!(wallet = %wallet, verified = token.is_some(), "wallet authenticated");

    Ok((user, token))
}

/// Resolves the user behind a presented wallet/token pair. Fails closed: any
/// missing credential or token mismatch yields `None`. The token is
/// re-validated against the stored row on every call.
pub async fn current_user(
    pool: &PgPool,
    wallet: Option<&str>,
    token: Option<&str>,
) -> Result<Option<User>> {
    let (Some(wallet), Some(token)) = (wallet, token) else {
        return Ok(None);
    };

    let wallet = match normalize_address(wallet) {
        Ok(wallet) => wallet,
        Err(_) => return Ok(None),
    };

    let Some(stored) = db::get_verification_token(pool, &wallet).await? else {
        return Ok(None);
    };
    if stored.token != token {
        return Ok(None);
    }

    db::get_user_by_wallet(pool, &wallet).await
}

/// Token-row check plus a `last_login` bump, for callers that only need to
/// know whether the stored credential still matches.
pub async fn refresh_authentication(pool: &PgPool, wallet: &str, token: &str) -> Result<bool> {
    let wallet = match normalize_address(wallet) {
        Ok(wallet) => wallet,
        Err(_) => return Ok(false),
    };

    let Some(stored) = db::get_verification_token(pool, &wallet).await? else {
        return Ok(false);
    };
    if stored.token != token {
        return Ok(false);
    }

    db::touch_last_login(pool, &wallet).await?;
    Ok(true)
}

/// Deletes the stored verification token. A missing row is not an error.
pub async fn sign_out(pool: &PgPool, wallet: &str, token: &str) -> Result<()> {
    let wallet = normalize_address(wallet)?;
    db::delete_verification_token(pool, &wallet, token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::k256::ecdsa::SigningKey;
    use ethers_core::types::U256;
    use ethers_core::utils::{hash_message, secret_key_to_address};

    fn signing_key(byte: u8) -> SigningKey {
        SigningKey::from_slice(&[byte; 32]).expect("valid test key")
    }

    fn sign_message(key: &SigningKey, message: &str) -> String {
        let digest = hash_message(message);
        let (sig, recovery_id) = key
            .sign_prehash_recoverable(digest.as_bytes())
            .expect("signing succeeds");

        let signature = Signature {
            r: U256::from_big_endian(sig.r().to_bytes().as_slice()),
            s: U256::from_big_endian(sig.s().to_bytes().as_slice()),
            v: u64::from(u8::from(recovery_id)) + 27,
        };
        format!("0x{}", hex::encode(signature.to_vec()))
    }

    fn address_of(key: &SigningKey) -> String {
        format!("0x{}", hex::encode(secret_key_to_address(key).as_bytes()))
    }

    #[test]
    fn test_sign_message_embeds_address_and_timestamp() {
        let message = generate_sign_message("0xabc", 1700000000000);
        assert_eq!(
            message,
            "Sign this message to authenticate with INEVITABLE: 0xabc at 1700000000000"
        );
    }

    #[test]
    fn test_valid_signature_verifies() {
        let key = signing_key(0x42);
        let address = address_of(&key);
        let message = generate_sign_message(&address, 1700000000000);
        let signature = sign_message(&key, &message);

        assert!(verify_signature(&address, &message, &signature).is_ok());
    }

    #[test]
    fn test_address_comparison_is_case_insensitive() {
        let key = signing_key(0x42);
        let address = address_of(&key).to_uppercase().replace("0X", "0x");
        let message = "hello INEVITABLE";
        let signature = sign_message(&key, message);

        assert!(verify_signature(&address, message, &signature).is_ok());
    }

    #[test]
    fn test_signature_from_other_key_is_rejected() {
        let signer = signing_key(0x42);
        let claimed = signing_key(0x07);
        let message = "hello INEVITABLE";
        let signature = sign_message(&signer, message);

        let err = verify_signature(&address_of(&claimed), message, &signature).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature));
    }

    #[test]
    fn test_malformed_signature_is_rejected() {
        let key = signing_key(0x42);
        let err = verify_signature(&address_of(&key), "msg", "0xnothex").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature));
    }

    #[test]
    fn test_derive_token_is_deterministic_sha256_hex() {
        let token = derive_token("0xsignature");
        assert_eq!(token, derive_token("0xsignature"));
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, derive_token("0xother"));
    }

    #[test]
    fn test_normalize_address_lowercases() {
        let normalized =
            normalize_address("0x1696688A7828E227E64953C371aC0B57d5974B55").unwrap();
        assert_eq!(normalized, "0x1696688a7828e227e64953c371ac0b57d5974b55");
    }

    #[test]
    fn test_normalize_address_rejects_garbage() {
        assert!(normalize_address("not-an-address").is_err());
    }
}
