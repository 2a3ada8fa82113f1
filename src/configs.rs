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
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use humantime::Duration as HumanDuration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use strum::Display;

pub const ENV_PREFIX: &str = "HOTEL_INDEXER";
pub const ENV_CONFIG_PATH: &str = "HOTEL_INDEXER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Deployment variables that override the `search` section.
const SEARCH_OVERRIDES: [(&str, &str); 4] = [
    ("host", "search.host"),
    ("userName", "search.username"),
    ("password", "search.password"),
    ("indexName", "search.index_name"),
];

const DEFAULT_REQUEST_TIMEOUT: &str = "30s";
const DEFAULT_LEDGER_TABLE: &str = "hotel_created_event_ids";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    pub search: SearchConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub handler: HandlerConfig,
    #[serde(default)]
    pub http: HttpApiConfig,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub index_name: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    #[default]
    #[strum(to_string = "memory")]
    Memory,
    #[strum(to_string = "postgres")]
    Postgres,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub kind: LedgerKind,
    pub connection_string: Option<String>,
    pub table: String,
    pub max_connections: u32,
    pub auto_create_table: bool,
}

/// How the ledger lookup affects processing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    /// Skip messages already recorded; record a message once its document was projected.
    #[default]
    #[strum(to_string = "guard")]
    Guard,
    /// Record unseen messages up front and process every message regardless.
    #[strum(to_string = "audit")]
    Audit,
}

/// What a decode failure does to the rest of the batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    #[strum(to_string = "isolate")]
    Isolate,
    #[strum(to_string = "fail_fast")]
    FailFast,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub ledger_mode: LedgerMode,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpApiConfig {
    pub address: String,
}

impl IndexerConfig {
    /// Loads the optional config file, then `HOTEL_INDEXER_*` variables, then
    /// the deployment variables `host`, `userName`, `password` and `indexName`.
    pub fn load(config_path: &str) -> Result<Self, IndexerError> {
        let vars = std::env::vars().collect::<HashMap<_, _>>();
        Self::load_from(config_path, &vars)
    }

    pub fn load_from(config_path: &str, vars: &HashMap<String, String>) -> Result<Self, IndexerError> {
        let prefixed = vars
            .iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX) && key.as_str() != ENV_CONFIG_PATH)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<HashMap<_, _>>();

        let mut builder: ConfigBuilder<DefaultState> = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(prefixed)),
            );

        for (variable, key) in SEARCH_OVERRIDES {
            builder = builder
                .set_override_option(key, vars.get(variable).cloned())
                .map_err(|e| IndexerError::InvalidConfiguration(e.to_string()))?;
        }

        let config: IndexerConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| {
                IndexerError::InvalidConfiguration(format!(
                    "{e}; the variables host, userName, password and indexName are required"
                ))
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IndexerError> {
        self.search.validate()?;
        self.ledger.validate()?;
        if self.http.address.trim().is_empty() {
            return Err(IndexerError::InvalidConfiguration(
                "http.address cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

impl SearchConfig {
    /// Hosts given without a scheme are reached over HTTPS on the default port.
    pub fn endpoint(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_owned()
        } else {
            format!("https://{host}")
        }
    }

    pub fn request_timeout(&self) -> Result<Duration, IndexerError> {
        HumanDuration::from_str(&self.request_timeout)
            .map(Duration::from)
            .map_err(|e| {
                IndexerError::InvalidConfiguration(format!(
                    "search.request_timeout '{}' is invalid: {e}",
                    self.request_timeout
                ))
            })
    }

    fn validate(&self) -> Result<(), IndexerError> {
        let required = [
            ("host", &self.host),
            ("userName", &self.username),
            ("password", &self.password),
            ("indexName", &self.index_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(IndexerError::InvalidConfiguration(format!(
                    "{name} cannot be empty"
                )));
            }
        }
        self.request_timeout()?;
        Ok(())
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("index_name", &self.index_name)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl LedgerConfig {
    fn validate(&self) -> Result<(), IndexerError> {
        if self.kind == LedgerKind::Postgres {
            if self
                .connection_string
                .as_deref()
                .is_none_or(|value| value.trim().is_empty())
            {
                return Err(IndexerError::InvalidConfiguration(
                    "ledger.connection_string is required for the postgres ledger".to_owned(),
                ));
            }
            crate::ledger::postgres::validate_table_name(&self.table)?;
            if self.max_connections == 0 {
                return Err(IndexerError::InvalidConfiguration(
                    "ledger.max_connections must be greater than 0".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            kind: LedgerKind::Memory,
            connection_string: None,
            table: DEFAULT_LEDGER_TABLE.to_owned(),
            max_connections: 5,
            auto_create_table: true,
        }
    }
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_owned(),
        }
    }
}

fn default_request_timeout() -> String {
    DEFAULT_REQUEST_TIMEOUT.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_FILE: &str = "does-not-exist/hotel-indexer";

    fn deployment_vars() -> HashMap<String, String> {
        HashMap::from([
            ("host".to_owned(), "search.example.com".to_owned()),
            ("userName".to_owned(), "indexer".to_owned()),
            ("password".to_owned(), "s3cret".to_owned()),
            ("indexName".to_owned(), "hotels".to_owned()),
        ])
    }

    #[test]
    fn given_deployment_variables_should_load_config_with_defaults() {
        let config = IndexerConfig::load_from(MISSING_FILE, &deployment_vars()).unwrap();

        assert_eq!(config.search.host, "search.example.com");
        assert_eq!(config.search.username, "indexer");
        assert_eq!(config.search.password, "s3cret");
        assert_eq!(config.search.index_name, "hotels");
        assert_eq!(config.search.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.ledger.kind, LedgerKind::Memory);
        assert_eq!(config.ledger.table, DEFAULT_LEDGER_TABLE);
        assert_eq!(config.handler.ledger_mode, LedgerMode::Guard);
        assert_eq!(config.handler.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.http.address, "127.0.0.1:8080");
    }

    #[test]
    fn given_missing_deployment_variable_should_fail_fast() {
        let mut vars = deployment_vars();
        vars.remove("indexName");

        let error = IndexerConfig::load_from(MISSING_FILE, &vars).unwrap_err();
        assert!(matches!(error, IndexerError::InvalidConfiguration(_)));
    }

    #[test]
    fn given_empty_deployment_variable_should_fail_fast() {
        let mut vars = deployment_vars();
        vars.insert("password".to_owned(), " ".to_owned());

        let error = IndexerConfig::load_from(MISSING_FILE, &vars).unwrap_err();
        assert!(
            matches!(&error, IndexerError::InvalidConfiguration(message) if message.contains("password"))
        );
    }

    #[test]
    fn given_prefixed_variables_should_configure_nested_sections() {
        let mut vars = deployment_vars();
        vars.insert("HOTEL_INDEXER_HANDLER__LEDGER_MODE".to_owned(), "audit".to_owned());
        vars.insert("HOTEL_INDEXER_HANDLER__FAILURE_POLICY".to_owned(), "fail_fast".to_owned());
        vars.insert("HOTEL_INDEXER_LEDGER__KIND".to_owned(), "postgres".to_owned());
        vars.insert(
            "HOTEL_INDEXER_LEDGER__CONNECTION_STRING".to_owned(),
            "postgres://indexer@localhost/ledger".to_owned(),
        );
        vars.insert("HOTEL_INDEXER_HTTP__ADDRESS".to_owned(), "0.0.0.0:9000".to_owned());

        let config = IndexerConfig::load_from(MISSING_FILE, &vars).unwrap();

        assert_eq!(config.handler.ledger_mode, LedgerMode::Audit);
        assert_eq!(config.handler.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.ledger.kind, LedgerKind::Postgres);
        assert_eq!(
            config.ledger.connection_string.as_deref(),
            Some("postgres://indexer@localhost/ledger")
        );
        assert_eq!(config.http.address, "0.0.0.0:9000");
    }

    #[test]
    fn given_postgres_ledger_without_connection_string_should_fail_fast() {
        let mut vars = deployment_vars();
        vars.insert("HOTEL_INDEXER_LEDGER__KIND".to_owned(), "postgres".to_owned());

        let error = IndexerConfig::load_from(MISSING_FILE, &vars).unwrap_err();
        assert!(
            matches!(&error, IndexerError::InvalidConfiguration(message) if message.contains("connection_string"))
        );
    }

    #[test]
    fn given_invalid_request_timeout_should_fail_fast() {
        let mut vars = deployment_vars();
        vars.insert("HOTEL_INDEXER_SEARCH__REQUEST_TIMEOUT".to_owned(), "whenever".to_owned());

        let error = IndexerConfig::load_from(MISSING_FILE, &vars).unwrap_err();
        assert!(matches!(error, IndexerError::InvalidConfiguration(_)));
    }

    #[test]
    fn given_host_with_scheme_should_keep_it() {
        let mut config = IndexerConfig::load_from(MISSING_FILE, &deployment_vars()).unwrap();
        assert_eq!(config.search.endpoint(), "https://search.example.com");

        config.search.host = "http://localhost:9200/".to_owned();
        assert_eq!(config.search.endpoint(), "http://localhost:9200");
    }

    #[test]
    fn given_search_config_debug_should_hide_password() {
        let config = IndexerConfig::load_from(MISSING_FILE, &deployment_vars()).unwrap();
        let printed = format!("{:?}", config.search);
        assert!(!printed.contains("s3cret"));
    }
}
