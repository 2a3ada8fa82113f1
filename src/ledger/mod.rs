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

//! Idempotency ledger keyed by transport message identifier.

pub mod memory;
pub mod postgres;

use crate::error::IndexerError;
use async_trait::async_trait;

pub use memory::InMemoryEventLedger;
pub use postgres::PostgresEventLedger;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Point lookup by exact message identifier.
    async fn has_processed(&self, event_id: &str) -> Result<bool, IndexerError>;

    /// Records the identifier. Recording an identifier twice is a no-op.
    async fn mark_processed(&self, event_id: &str) -> Result<(), IndexerError>;
}
