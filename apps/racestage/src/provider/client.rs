//! HTTP client for the timing provider.

use super::records::{CourseData, SplitData, record_from_json};
use super::{ProviderError, RaceSource};
use async_trait::async_trait;
use racestage_core::ParticipantRecord;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

/// Detail columns requested alongside split times.
const RESULT_DETAILS: &str = "start,gender,status";

/// HTTP client that wraps calls to the provider API.
#[derive(Clone)]
pub struct RaceDataClient {
    http: reqwest::Client,
    base_url: String,
}

impl RaceDataClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConnectionFailed(format!("client setup: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// The provider base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and return the payload's single list.
    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("fetching {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionFailed(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16(), url));
        }

        let payload = resp
            .json::<Map<String, Value>>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("{url}: {e}")))?;

        let list = first_list(payload).ok_or_else(|| ProviderError::EmptyPayload(url.clone()))?;
        let items: Vec<T> = serde_json::from_value(list)
            .map_err(|e| ProviderError::ParseError(format!("{url}: {e}")))?;

        tracing::info!("parsed data at {}, got {} records", url, items.len());
        Ok(items)
    }
}

/// The value of the first key of a provider payload.
fn first_list(payload: Map<String, Value>) -> Option<Value> {
    payload.into_iter().next().map(|(_, v)| v)
}

#[async_trait]
impl RaceSource for RaceDataClient {
    async fn courses(&self) -> Result<Vec<CourseData>, ProviderError> {
        self.get_list("/info/json?setting=courses").await
    }

    async fn splits(&self, course: u32) -> Result<Vec<SplitData>, ProviderError> {
        self.get_list(&format!("/info/json?course={course}&setting=splits"))
            .await
    }

    async fn results(
        &self,
        course: u32,
        split_numbers: &[u32],
    ) -> Result<Vec<ParticipantRecord>, ProviderError> {
        let numbers = split_numbers
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path =
            format!("/result/json?course={course}&splitnr={numbers}&detail={RESULT_DETAILS}");

        let rows: Vec<Map<String, Value>> = self.get_list(&path).await?;
        Ok(rows.into_iter().map(record_from_json).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_list_takes_only_key() {
        let payload = json!({"Splits": [{"a": 1}]});
        let Value::Object(map) = payload else {
            unreachable!("literal is an object")
        };
        assert_eq!(first_list(map), Some(json!([{"a": 1}])));
    }

    #[test]
    fn first_list_of_empty_object_is_none() {
        assert_eq!(first_list(Map::new()), None);
    }

    #[test]
    fn client_keeps_base_url() {
        let client =
            RaceDataClient::new("http://localhost:5000/middleware", Duration::from_secs(1))
                .expect("client");
        assert_eq!(client.base_url(), "http://localhost:5000/middleware");
    }
}
