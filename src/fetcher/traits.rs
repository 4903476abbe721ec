use crate::model::{FetchError, HistoryRequest};

/// Source of raw chart payloads for a symbol.
#[async_trait::async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(&self, req: &HistoryRequest) -> Result<String, FetchError>;
}
