use crate::fetcher::traits::PriceFetcher;
use crate::model::{FetchError, HistoryRequest};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpFetcher {
    pub client: Client,
    pub base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) DrawdownSniper/0.1")
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn build_url(&self, req: &HistoryRequest) -> String {
        format!("{}/api/company/{}/chart/", self.base_url, req.symbol.trim())
    }
}

#[async_trait::async_trait]
impl PriceFetcher for HttpFetcher {
    async fn fetch(&self, req: &HistoryRequest) -> Result<String, FetchError> {
        let url = self.build_url(req);
        debug!("GET {} (metric={}, days={})", url, req.metric, req.days);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", req.metric.clone()),
                ("days", req.days.to_string()),
                ("consolidated", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Price history request for {} failed [{}]", req.symbol, status);
            return Err(FetchError::InvalidResponse(status.as_u16()));
        }

        response.text().await.map_err(|e| FetchError::Http(e.to_string()))
    }
}
