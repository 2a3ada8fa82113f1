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

use crate::error::IndexerError;
use crate::hotel::HotelCreatedRecord;
use crate::index::{HotelDocument, IndexAck, IndexProjector};
use async_trait::async_trait;
use dashmap::DashMap;

/// Upsert-by-id document store kept in memory. Documents registered through
/// [`InMemoryIndex::reject`] are refused with the given reason, the way a
/// search engine reports a document-level bulk error.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    index_name: String,
    documents: DashMap<String, HotelDocument>,
    rejections: DashMap<String, String>,
}

impl InMemoryIndex {
    pub fn new(index_name: &str) -> Self {
        Self {
            index_name: index_name.to_owned(),
            ..Default::default()
        }
    }

    pub fn reject(&self, document_id: &str, reason: &str) {
        self.rejections
            .insert(document_id.to_owned(), reason.to_owned());
    }

    pub fn get(&self, document_id: &str) -> Option<HotelDocument> {
        self.documents
            .get(document_id)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl IndexProjector for InMemoryIndex {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn project(&self, record: &HotelCreatedRecord) -> Result<IndexAck, IndexerError> {
        if let Some(reason) = self.rejections.get(&record.id) {
            return Ok(IndexAck::rejected(&record.id, reason.value()));
        }

        self.documents
            .insert(record.id.clone(), HotelDocument::from(record));
        Ok(IndexAck::accepted(&record.id))
    }
}
