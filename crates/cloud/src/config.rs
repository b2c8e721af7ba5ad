use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub region: String,
    /// Single endpoint used for every service instead of the regional
    /// hostnames (SigV4 signing proxy or local emulator). Requests to it are
    /// sent unsigned, so `Clients::connect` refuses to start without one.
    pub gateway_url: Option<String>,
    pub request_timeout_secs: u64,
    pub storage: StorageConfig,
    pub identity: IdentityPoolConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Custom S3 endpoint. Falls back to `gateway_url`, then AWS.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub allow_http: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityPoolConfig {
    pub user_pool_id: String,
    pub client_id: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            gateway_url: None,
            request_timeout_secs: 60,
            storage: StorageConfig {
                backend: StorageBackend::S3,
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                allow_http: false,
            },
            identity: IdentityPoolConfig {
                user_pool_id: String::new(),
                client_id: String::new(),
            },
        }
    }
}

impl CloudConfig {
    /// Base URL for a service, e.g. `comprehend` or `bedrock-runtime`
    pub fn endpoint(&self, service: &str) -> String {
        match &self.gateway_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}.amazonaws.com", service, self.region),
        }
    }

    pub fn storage_endpoint(&self) -> Option<String> {
        self.storage.endpoint.clone().or_else(|| self.gateway_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regional_endpoint() {
        let config = CloudConfig::default();
        assert_eq!(
            config.endpoint("comprehend"),
            "https://comprehend.us-west-2.amazonaws.com"
        );
    }

    #[test]
    fn test_gateway_overrides_every_service() {
        let config = CloudConfig {
            gateway_url: Some("http://localhost:4566/".to_string()),
            ..CloudConfig::default()
        };
        assert_eq!(config.endpoint("states"), "http://localhost:4566");
        assert_eq!(config.storage_endpoint().as_deref(), Some("http://localhost:4566/"));
    }
}
