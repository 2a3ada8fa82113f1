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

//! Projection of decoded records into the search index.

pub mod elasticsearch;
pub mod memory;

use crate::error::IndexerError;
use crate::hotel::HotelCreatedRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use self::elasticsearch::ElasticsearchProjector;
pub use memory::InMemoryIndex;

/// The search document stored under the hotel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDocument {
    pub name: String,
    pub city_name: String,
    pub price: i64,
    pub rating: i64,
    pub user_id: String,
    pub creation_date_time: String,
    pub file_name: String,
}

impl From<&HotelCreatedRecord> for HotelDocument {
    fn from(record: &HotelCreatedRecord) -> Self {
        HotelDocument {
            name: record.name.clone(),
            city_name: record.city_name.clone(),
            price: record.price,
            rating: record.rating,
            user_id: record.user_id.clone(),
            creation_date_time: record.canonical_creation_date_time(),
            file_name: record.file_name.clone(),
        }
    }
}

/// Outcome of a single-document upsert. A rejected document carries the
/// reason reported by the index; it is not an error of the call itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexAck {
    pub document_id: String,
    pub error: Option<String>,
}

impl IndexAck {
    pub fn accepted(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_owned(),
            error: None,
        }
    }

    pub fn rejected(document_id: &str, reason: &str) -> Self {
        Self {
            document_id: document_id.to_owned(),
            error: Some(reason.to_owned()),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.error.is_some()
    }
}

#[async_trait]
pub trait IndexProjector: Send + Sync {
    fn index_name(&self) -> &str;

    /// Upserts the record's document under `record.id`. Fails only when the
    /// index cannot be reached; document rejections are reported in the ack.
    async fn project(&self, record: &HotelCreatedRecord) -> Result<IndexAck, IndexerError>;
}
