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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Invalid notification envelope: {0}")]
    Transport(String),
    #[error("Invalid hotel created payload: {0}")]
    Decode(String),
    #[error("Invalid creation date time '{value}': {reason}")]
    DateFormat { value: String, reason: String },
    #[error("Idempotency ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("Search index unavailable: {0}")]
    IndexTransport(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    /// Errors that concern a single message and leave the rest of the batch processable.
    pub fn is_message_scoped(&self) -> bool {
        matches!(self, IndexerError::Decode(_) | IndexerError::DateFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_decode_errors_should_be_message_scoped() {
        assert!(IndexerError::Decode("missing field `id`".to_owned()).is_message_scoped());
        assert!(
            IndexerError::DateFormat {
                value: "yesterday".to_owned(),
                reason: "not an ISO-8601 date-time".to_owned(),
            }
            .is_message_scoped()
        );
    }

    #[test]
    fn given_backend_errors_should_not_be_message_scoped() {
        assert!(!IndexerError::LedgerUnavailable("timeout".to_owned()).is_message_scoped());
        assert!(!IndexerError::IndexTransport("refused".to_owned()).is_message_scoped());
        assert!(!IndexerError::Transport("bad envelope".to_owned()).is_message_scoped());
    }
}
