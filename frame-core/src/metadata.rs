use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::BookConfig;
use crate::error::{Result, ServiceError};
use crate::models::{BookMetadata, CollectionInfo};

pub const DEFAULT_TOKEN_ID: &str = "1";

// PageDAO hub API wraps every payload in a `{success, data}` envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

/// Fetches NFT book metadata from the PageDAO hub API with a 1-hour cache.
/// Single attempt per call; failures yield static fallback payloads.
pub struct BookClient {
    http: reqwest::Client,
    config: BookConfig,
    metadata_cache: TtlCache<String, BookMetadata>,
    collection_cache: TtlCache<String, CollectionInfo>,
}

impl BookClient {
    pub fn new(http: reqwest::Client, config: BookConfig) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            http,
            config,
            metadata_cache: TtlCache::new(ttl),
            collection_cache: TtlCache::new(ttl),
        }
    }

    pub async fn fetch_book_metadata(&self, token_id: &str) -> BookMetadata {
        let cache_key = format!("book-{}-{}", self.config.contract_address, token_id);
        if let Some(cached) = self.metadata_cache.get(&cache_key) {
            debug!("using cached book metadata");
            return cached;
        }

        let url = format!(
            "{}/blockchain/{}/{}/metadata/{}?type={}",
            self.config.api_base_url,
            self.config.chain,
            self.config.contract_address,
            token_id,
            self.config.asset_type
        );

        match self.fetch_envelope::<BookMetadata>(&url).await {
            Ok(metadata) => {
                self.metadata_cache.put(cache_key, metadata.clone());
                metadata
            }
            Err(err) => {
                warn!("book metadata fetch failed, using fallback data: {err}");
                fallback_metadata()
            }
        }
    }

    pub async fn fetch_collection_info(&self) -> CollectionInfo {
        let cache_key = format!("collection-{}", self.config.contract_address);
        if let Some(cached) = self.collection_cache.get(&cache_key) {
            debug!("using cached collection metadata");
            return cached;
        }

        let url = format!(
            "{}/blockchain/{}/{}/info?type={}",
            self.config.api_base_url,
            self.config.chain,
            self.config.contract_address,
            self.config.asset_type
        );

        match self.fetch_envelope::<CollectionInfo>(&url).await {
            Ok(info) => {
                self.collection_cache.put(cache_key, info.clone());
                info
            }
            Err(err) => {
                warn!("collection info fetch failed, using fallback data: {err}");
                fallback_collection_info(&self.config.contract_address, &self.config.chain)
            }
        }
    }

    async fn fetch_envelope<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let envelope: ApiEnvelope<T> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !envelope.success {
            return Err(ServiceError::UpstreamData(
                "metadata API reported failure".into(),
            ));
        }

        envelope
            .data
            .ok_or_else(|| ServiceError::UpstreamData("metadata API returned no data".into()))
    }
}

pub fn fallback_metadata() -> BookMetadata {
    BookMetadata {
        title: "INEVITABLE: Distributed Cognition & Network Superintelligence".to_string(),
        description:
            "An exploration of distributed cognition and the future of network superintelligence."
                .to_string(),
        author: "EpicDylan".to_string(),
        image_uri: "https://epicdylan.com/inevitable-cover.jpg".to_string(),
        content_uri: "https://www.alexandriabooks.com/collection/inevitable".to_string(),
        additional_data: serde_json::json!({
            "publishedDate": "2023",
            "format": "Digital Book"
        }),
    }
}

pub fn fallback_collection_info(contract_address: &str, chain: &str) -> CollectionInfo {
    CollectionInfo {
        name: "INEVITABLE: Distributed Cognition & Network Superintelligence".to_string(),
        description:
            "An exploration of distributed cognition and the future of network superintelligence."
                .to_string(),
        creator: "EpicDylan".to_string(),
        image: "https://epicdylan.com/inevitable-cover.jpg".to_string(),
        contract_address: contract_address.to_string(),
        chain: chain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success_with_data() {
        let envelope: ApiEnvelope<BookMetadata> = serde_json::from_value(serde_json::json!({
            "success": true,
            "data": {
                "title": "INEVITABLE",
                "author": "EpicDylan",
                "imageURI": "https://example.com/cover.png"
            }
        }))
        .unwrap();

        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data.title, "INEVITABLE");
        assert_eq!(data.author, "EpicDylan");
        assert_eq!(data.image_uri, "https://example.com/cover.png");
        // Fields absent from the payload default to empty.
        assert_eq!(data.content_uri, "");
    }

    #[test]
    fn test_envelope_failure_flag() {
        let envelope: ApiEnvelope<BookMetadata> =
            serde_json::from_value(serde_json::json!({ "success": false })).unwrap();

        assert!(!envelope.success);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_fallback_metadata_literals() {
        let metadata = fallback_metadata();

        assert_eq!(
            metadata.title,
            "INEVITABLE: Distributed Cognition & Network Superintelligence"
        );
        assert_eq!(metadata.author, "EpicDylan");
        assert_eq!(metadata.image_uri, "https://epicdylan.com/inevitable-cover.jpg");
        assert_eq!(metadata.additional_data["format"], "Digital Book");
    }

    #[test]
    fn test_fallback_collection_info_carries_contract() {
        let info = fallback_collection_info("0x64E2", "base");

        assert_eq!(info.creator, "EpicDylan");
        assert_eq!(info.contract_address, "0x64E2");
        assert_eq!(info.chain, "base");
    }
}
