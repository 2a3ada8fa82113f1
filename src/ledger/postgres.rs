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

use crate::configs::LedgerConfig;
use crate::error::IndexerError;
use crate::ledger::EventLedger;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};

/// Ledger stored in a PostgreSQL table with a single `"eventId"` primary key column.
#[derive(Debug)]
pub struct PostgresEventLedger {
    pool: Pool<Postgres>,
    table: String,
    exists_query: String,
    insert_query: String,
}

impl PostgresEventLedger {
    pub async fn connect(config: &LedgerConfig) -> Result<Self, IndexerError> {
        let connection_string = config.connection_string.as_deref().ok_or_else(|| {
            IndexerError::InvalidConfiguration(
                "ledger.connection_string is required for the postgres ledger".to_owned(),
            )
        })?;
        validate_table_name(&config.table)?;

        let max_connections = config.max_connections;
        let redacted = redact_connection_string(connection_string);
        info!("Connecting to PostgreSQL ledger with max {max_connections} connections: {redacted}");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await
            .map_err(|e| {
                IndexerError::LedgerUnavailable(format!("Failed to connect to PostgreSQL: {e}"))
            })?;

        sqlx::query("SELECT 1").execute(&pool).await.map_err(|e| {
            IndexerError::LedgerUnavailable(format!("Database connectivity test failed: {e}"))
        })?;

        let ledger = Self {
            pool,
            table: config.table.clone(),
            exists_query: exists_query(&config.table),
            insert_query: insert_query(&config.table),
        };

        if config.auto_create_table {
            ledger.ensure_table_exists().await?;
        }

        info!("Connected to PostgreSQL ledger table '{}'", ledger.table);
        Ok(ledger)
    }

    async fn ensure_table_exists(&self) -> Result<(), IndexerError> {
        sqlx::query(&create_table_query(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                IndexerError::LedgerUnavailable(format!(
                    "Failed to create table '{}': {e}",
                    self.table
                ))
            })?;

        info!("Ensured ledger table '{}' exists", self.table);
        Ok(())
    }
}

#[async_trait]
impl EventLedger for PostgresEventLedger {
    async fn has_processed(&self, event_id: &str) -> Result<bool, IndexerError> {
        sqlx::query_scalar::<_, bool>(&self.exists_query)
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                IndexerError::LedgerUnavailable(format!(
                    "Failed to look up event '{event_id}' in '{}': {e}",
                    self.table
                ))
            })
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), IndexerError> {
        let result = sqlx::query(&self.insert_query)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                IndexerError::LedgerUnavailable(format!(
                    "Failed to record event '{event_id}' in '{}': {e}",
                    self.table
                ))
            })?;

        if result.rows_affected() == 0 {
            debug!("Event '{event_id}' was already recorded in '{}'", self.table);
        }
        Ok(())
    }
}

pub(crate) fn validate_table_name(table: &str) -> Result<(), IndexerError> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid || table.len() > 63 {
        return Err(IndexerError::InvalidConfiguration(format!(
            "ledger table name '{table}' must be a plain SQL identifier"
        )));
    }
    Ok(())
}

fn create_table_query(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} (\"eventId\" TEXT PRIMARY KEY)")
}

fn exists_query(table: &str) -> String {
    format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE \"eventId\" = $1)")
}

fn insert_query(table: &str) -> String {
    format!("INSERT INTO {table} (\"eventId\") VALUES ($1) ON CONFLICT (\"eventId\") DO NOTHING")
}

fn redact_connection_string(conn_str: &str) -> String {
    if let Some(scheme_end) = conn_str.find("://") {
        let scheme = &conn_str[..scheme_end + 3];
        let rest = &conn_str[scheme_end + 3..];
        let preview: String = rest.chars().take(3).collect();
        return format!("{scheme}{preview}***");
    }
    let preview: String = conn_str.chars().take(3).collect();
    format!("{preview}***")
}
