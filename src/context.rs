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

use crate::configs::{HandlerConfig, IndexerConfig, LedgerConfig, LedgerKind};
use crate::error::IndexerError;
use crate::handler::HotelCreatedEventHandler;
use crate::index::{ElasticsearchProjector, IndexProjector};
use crate::ledger::{EventLedger, InMemoryEventLedger, PostgresEventLedger};
use std::sync::Arc;
use tracing::{info, warn};

/// Clients created once per process and shared by every invocation.
#[derive(Clone)]
pub struct IndexerContext {
    pub handler: Arc<HotelCreatedEventHandler>,
}

impl IndexerContext {
    pub async fn init(config: &IndexerConfig) -> Result<Self, IndexerError> {
        let ledger = build_ledger(&config.ledger).await?;

        let projector = ElasticsearchProjector::new(&config.search)?;
        projector.verify_connection().await?;

        info!(
            "Initialized indexer context: ledger: {}, index: '{}', ledger mode: {}, failure policy: {}",
            config.ledger.kind,
            projector.index_name(),
            config.handler.ledger_mode,
            config.handler.failure_policy
        );
        Ok(Self::new(ledger, Arc::new(projector), config.handler))
    }

    pub fn new(
        ledger: Arc<dyn EventLedger>,
        projector: Arc<dyn IndexProjector>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            handler: Arc::new(HotelCreatedEventHandler::new(ledger, projector, config)),
        }
    }
}

async fn build_ledger(config: &LedgerConfig) -> Result<Arc<dyn EventLedger>, IndexerError> {
    match config.kind {
        LedgerKind::Memory => {
            warn!("Using the in-memory ledger, processed message markers will not survive a restart");
            Ok(Arc::new(InMemoryEventLedger::new()))
        }
        LedgerKind::Postgres => Ok(Arc::new(PostgresEventLedger::connect(config).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn given_memory_ledger_config_should_build_empty_ledger() {
        let ledger = build_ledger(&LedgerConfig::default()).await.unwrap();
        assert!(!ledger.has_processed("m-1").await.unwrap());
    }

    #[tokio::test]
    async fn given_postgres_ledger_without_connection_string_should_fail() {
        let config = LedgerConfig {
            kind: LedgerKind::Postgres,
            ..Default::default()
        };
        let error = build_ledger(&config).await.err().unwrap();
        assert!(matches!(error, IndexerError::InvalidConfiguration(_)));
    }
}
