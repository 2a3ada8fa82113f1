/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::configs::SearchConfig;
use crate::error::IndexerError;
use crate::hotel::HotelCreatedRecord;
use crate::index::{HotelDocument, IndexAck, IndexProjector};
use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::http::Url;
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::{BulkParts, Elasticsearch};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

/// Upserts one document per bulk request into an Elasticsearch compatible engine.
pub struct ElasticsearchProjector {
    client: Elasticsearch,
    index_name: String,
    endpoint: String,
}

impl ElasticsearchProjector {
    pub fn new(config: &SearchConfig) -> Result<Self, IndexerError> {
        let endpoint = config.endpoint();
        let url = Url::parse(&endpoint).map_err(|e| {
            IndexerError::InvalidConfiguration(format!("Invalid search host '{endpoint}': {e}"))
        })?;

        let transport = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .auth(Credentials::Basic(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(config.request_timeout()?)
            .build()
            .map_err(|e| IndexerError::IndexTransport(format!("Failed to build transport: {e}")))?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index_name: config.index_name.clone(),
            endpoint,
        })
    }

    pub async fn verify_connection(&self) -> Result<(), IndexerError> {
        let response = self.client.ping().send().await.map_err(|e| {
            IndexerError::IndexTransport(format!(
                "Failed to ping search engine at {}: {e}",
                self.endpoint
            ))
        })?;

        if response.status_code().is_success() {
            info!("Successfully connected to search engine at {}", self.endpoint);
        } else {
            warn!(
                "Search engine ping returned status: {}",
                response.status_code()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl IndexProjector for ElasticsearchProjector {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn project(&self, record: &HotelCreatedRecord) -> Result<IndexAck, IndexerError> {
        let document = HotelDocument::from(record);
        let body: Vec<JsonBody<Value>> = bulk_operations(&self.index_name, &record.id, &document)?
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                IndexerError::IndexTransport(format!("Failed to execute bulk request: {e}"))
            })?;

        let status = response.status_code();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(IndexerError::IndexTransport(format!(
                "Bulk indexing failed with status {status}: {error_text}"
            )));
        }

        let response_body: Value = response.json().await.map_err(|e| {
            IndexerError::IndexTransport(format!("Failed to parse bulk response: {e}"))
        })?;

        let ack = ack_from_bulk_response(&record.id, &response_body);
        debug!(
            hotel_id = %record.id,
            rejected = ack.is_rejected(),
            "Bulk upsert to index '{}' completed",
            self.index_name
        );
        Ok(ack)
    }
}

/// Action line and source line of a single-document bulk upsert.
fn bulk_operations(
    index_name: &str,
    document_id: &str,
    document: &HotelDocument,
) -> Result<Vec<Value>, IndexerError> {
    let source = serde_json::to_value(document).map_err(|e| {
        IndexerError::IndexTransport(format!("Failed to serialize document '{document_id}': {e}"))
    })?;

    Ok(vec![
        json!({
            "index": {
                "_index": index_name,
                "_id": document_id
            }
        }),
        source,
    ])
}

fn ack_from_bulk_response(document_id: &str, response_body: &Value) -> IndexAck {
    // Each item is keyed by its action name, e.g. {"index": {...}}.
    let item_error = response_body
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object)
        .and_then(|item| item.values().next())
        .and_then(|result| result.get("error"));

    match item_error {
        Some(error) => IndexAck::rejected(document_id, &error_reason(error)),
        None if response_body
            .get("errors")
            .and_then(Value::as_bool)
            .unwrap_or(false) =>
        {
            IndexAck::rejected(document_id, "bulk response reported errors without details")
        }
        None => IndexAck::accepted(document_id),
    }
}

fn error_reason(error: &Value) -> String {
    if let Some(reason) = error.as_str() {
        return reason.to_owned();
    }

    error
        .get("reason")
        .and_then(Value::as_str)
        .or_else(|| error.get("type").and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| error.to_string())
}
