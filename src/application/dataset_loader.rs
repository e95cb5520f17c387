// Dataset loader - fetch once, normalize, hand over an immutable dataset
use crate::application::record_source::RecordSource;
use crate::domain::record::Record;
use crate::error::LoadError;
use crate::infrastructure::record_mapper::normalize_records;
use std::sync::Arc;

#[derive(Clone)]
pub struct DatasetLoader {
    source: Arc<dyn RecordSource>,
}

impl DatasetLoader {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    pub async fn load(&self) -> Result<Vec<Record>, LoadError> {
        let origin = self.source.describe();
        tracing::info!("Loading dataset from {}", origin);

        let raw = self.source.fetch().await?;
        let records = normalize_records(raw)?;
        if records.is_empty() {
            return Err(LoadError::Empty);
        }

        let participants: std::collections::BTreeSet<&str> =
            records.iter().map(|r| r.participant.as_str()).collect();
        tracing::info!(
            "Loaded {} records for {} participants from {}",
            records.len(),
            participants.len(),
            origin
        );
        Ok(records)
    }
}
