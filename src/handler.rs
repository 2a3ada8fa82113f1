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

use crate::configs::{FailurePolicy, HandlerConfig, LedgerMode};
use crate::error::IndexerError;
use crate::hotel;
use crate::index::IndexProjector;
use crate::ledger::EventLedger;
use crate::notification::{NotificationBatch, NotificationRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Per-invocation counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub received: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Counts accumulated over the lifetime of the process.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub invocations: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub failed: u64,
    pub last_invocation_at: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq, Eq)]
enum MessageOutcome {
    Indexed,
    Skipped,
    Rejected { hotel_id: String, reason: String },
}

pub struct HotelCreatedEventHandler {
    ledger: Arc<dyn EventLedger>,
    projector: Arc<dyn IndexProjector>,
    config: HandlerConfig,
    stats: Mutex<ProcessingStats>,
}

impl HotelCreatedEventHandler {
    pub fn new(
        ledger: Arc<dyn EventLedger>,
        projector: Arc<dyn IndexProjector>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            ledger,
            projector,
            config,
            stats: Mutex::new(ProcessingStats::default()),
        }
    }

    /// Parses a delivery envelope and processes it.
    pub async fn handle_raw(&self, body: &[u8]) -> Result<BatchReport, IndexerError> {
        let batch = NotificationBatch::parse(body)?;
        self.handle(&batch).await
    }

    /// Processes the batch sequentially in delivery order. Ledger and index
    /// transport failures abort the invocation; decode failures abort it only
    /// under [`FailurePolicy::FailFast`].
    pub async fn handle(&self, batch: &NotificationBatch) -> Result<BatchReport, IndexerError> {
        info!("Handler was invoked.");
        info!(records = batch.len(), "Found records in notification batch");

        let mut report = BatchReport {
            received: batch.len(),
            ..Default::default()
        };

        for record in &batch.records {
            let message_id = record.message_id();
            match self.process(record).await {
                Ok(MessageOutcome::Indexed) => report.indexed += 1,
                Ok(MessageOutcome::Skipped) => report.skipped += 1,
                Ok(MessageOutcome::Rejected { hotel_id, reason }) => {
                    error!(message_id, hotel_id = %hotel_id, "Server Error: {reason}");
                    report.rejected += 1;
                }
                Err(error)
                    if error.is_message_scoped()
                        && self.config.failure_policy == FailurePolicy::Isolate =>
                {
                    error!(message_id, "Failed to decode message, skipping it: {error}");
                    report.failed += 1;
                }
                Err(error) => {
                    error!(message_id, "Aborting batch: {error}");
                    report.failed += 1;
                    self.record_stats(&report).await;
                    return Err(error);
                }
            }
        }

        info!(
            received = report.received,
            indexed = report.indexed,
            skipped = report.skipped,
            rejected = report.rejected,
            failed = report.failed,
            "Processed notification batch into index '{}'",
            self.projector.index_name()
        );
        self.record_stats(&report).await;
        Ok(report)
    }

    async fn process(&self, record: &NotificationRecord) -> Result<MessageOutcome, IndexerError> {
        let message_id = record.message_id();
        let processed = self.ledger.has_processed(message_id).await?;

        match self.config.ledger_mode {
            LedgerMode::Guard if processed => {
                warn!(message_id, "Message was already processed, skipping it");
                return Ok(MessageOutcome::Skipped);
            }
            LedgerMode::Audit if !processed => self.ledger.mark_processed(message_id).await?,
            _ => {}
        }

        let hotel = hotel::decode(record.payload())?;
        debug!(message_id, hotel_id = %hotel.id, "Decoded hotel created notification");

        let ack = self.projector.project(&hotel).await?;

        if self.config.ledger_mode == LedgerMode::Guard {
            self.ledger.mark_processed(message_id).await?;
        }

        Ok(match ack.error {
            Some(reason) => MessageOutcome::Rejected {
                hotel_id: ack.document_id,
                reason,
            },
            None => MessageOutcome::Indexed,
        })
    }

    async fn record_stats(&self, report: &BatchReport) {
        let mut stats = self.stats.lock().await;
        stats.invocations += 1;
        stats.indexed += report.indexed as u64;
        stats.skipped += report.skipped as u64;
        stats.rejected += report.rejected as u64;
        stats.failed += report.failed as u64;
        stats.last_invocation_at = Some(Utc::now());
    }

    pub async fn stats(&self) -> ProcessingStats {
        self.stats.lock().await.clone()
    }

    pub async fn close(&self) {
        let stats = self.stats.lock().await;
        info!(
            "Hotel created event handler is closing. Stats: {} invocations, {} indexed, {} skipped, {} rejected, {} failed",
            stats.invocations, stats.indexed, stats.skipped, stats.rejected, stats.failed
        );
    }
}
