//! Kafka REST proxy transport.
//!
//! Produces to a topic through the Confluent REST proxy v2 API using the binary embedded
//! format: `POST {base}/topics/{topic}` with key and value base64-encoded.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, Url};
use serde_json::json;

use super::{EventTransport, PublishError};

const KAFKA_BINARY_V2: &str = "application/vnd.kafka.binary.v2+json";
const KAFKA_V2: &str = "application/vnd.kafka.v2+json";

pub struct KafkaRestTransport {
    client: Client,
    base_url: Url,
}

impl KafkaRestTransport {
    /// Build a transport for the proxy at `base_url`, bounding every request by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn topic_url(&self, topic: &str) -> String {
        format!(
            "{}/topics/{}",
            self.base_url.as_str().trim_end_matches('/'),
            topic
        )
    }
}

/// Request body for one keyed record.
fn produce_body(key: &str, payload: &[u8]) -> serde_json::Value {
    json!({
        "records": [{
            "key": general_purpose::STANDARD.encode(key.as_bytes()),
            "value": general_purpose::STANDARD.encode(payload),
        }]
    })
}

#[async_trait]
impl EventTransport for KafkaRestTransport {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let response = self
            .client
            .post(self.topic_url(topic))
            .header(reqwest::header::CONTENT_TYPE, KAFKA_BINARY_V2)
            .header(reqwest::header::ACCEPT, KAFKA_V2)
            .json(&produce_body(key, &payload))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
