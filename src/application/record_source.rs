// Source trait for the raw tracking feed
use crate::error::LoadError;
use crate::infrastructure::record_mapper::RawRecord;
use async_trait::async_trait;

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;

    /// Fetch the whole feed once. No paging, no streaming.
    async fn fetch(&self) -> Result<Vec<RawRecord>, LoadError>;
}
