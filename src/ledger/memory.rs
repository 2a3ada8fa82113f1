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
use crate::ledger::EventLedger;
use async_trait::async_trait;
use dashmap::DashSet;

/// Process-local ledger. Markers are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryEventLedger {
    event_ids: DashSet<String>,
}

impl InMemoryEventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.event_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_ids.is_empty()
    }
}

#[async_trait]
impl EventLedger for InMemoryEventLedger {
    async fn has_processed(&self, event_id: &str) -> Result<bool, IndexerError> {
        Ok(self.event_ids.contains(event_id))
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), IndexerError> {
        self.event_ids.insert(event_id.to_owned());
        Ok(())
    }
}
