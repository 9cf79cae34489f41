use crate::errors::{EngineError, EngineResult};
use reqwest::Client;
use std::time::Duration;

/// Plain GET-JSON client for one public REST service. All methods return
/// Result, never panic.
#[derive(Clone)]
pub struct PublicApi {
    client: Client,
    base_url: String,
    service: &'static str,
}

impl PublicApi {
    pub fn new(service: &'static str, base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// GET `path` and decode the body. Non-2xx becomes `EngineError::Api`
    /// tagged with this service's name.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> EngineResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| EngineError::Parse(format!("GET {path}: {e}")))
    }
}

/// Builds `?k=v&...` from query parts; empty when there are none.
pub fn query_string(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!("?{}", parts.join("&"))
    }
}
