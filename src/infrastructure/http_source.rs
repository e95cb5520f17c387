// HTTP record source - one GET returning a JSON array of flat records
use crate::application::record_source::RecordSource;
use crate::error::LoadError;
use crate::infrastructure::record_mapper::RawRecord;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpRecordSource {
    url: String,
    timeout: Option<Duration>,
}

impl HttpRecordSource {
    pub fn new(url: String, timeout: Option<Duration>) -> Self {
        Self { url, timeout }
    }

    fn http_error(&self, source: reqwest::Error) -> LoadError {
        LoadError::Http {
            url: self.url.clone(),
            source,
        }
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, LoadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| self.http_error(e))?;

        let response = client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        if !response.status().is_success() {
            return Err(LoadError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        // Decode through serde_json so a malformed body reports as a decode error.
        let body = response.bytes().await.map_err(|e| self.http_error(e))?;
        let records: Vec<RawRecord> = serde_json::from_slice(&body)?;
        tracing::debug!("Fetched {} raw records from {}", records.len(), self.url);
        Ok(records)
    }
}
