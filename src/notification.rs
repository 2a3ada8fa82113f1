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

//! Inbound publish/subscribe delivery envelope.
//!
//! A delivery carries a batch of records, each wrapping one notification with
//! its transport message identifier and the serialized hotel payload:
//!
//! ```json
//! {"Records": [{"EventSource": "aws:sns", "Sns": {"MessageId": "...", "Message": "{...}"}}]}
//! ```

use crate::error::IndexerError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records")]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "EventSource", default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(rename = "Sns")]
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "MessageId")]
    pub message_id: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "TopicArn", default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(rename = "Timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl NotificationBatch {
    pub fn new(records: Vec<NotificationRecord>) -> Self {
        Self { records }
    }

    /// Parses a delivery envelope. Any malformed record fails the whole batch.
    pub fn parse(bytes: &[u8]) -> Result<Self, IndexerError> {
        let batch: NotificationBatch = serde_json::from_slice(bytes)
            .map_err(|error| IndexerError::Transport(error.to_string()))?;

        if let Some(position) = batch
            .records
            .iter()
            .position(|record| record.message_id().trim().is_empty())
        {
            return Err(IndexerError::Transport(format!(
                "record at position {position} has an empty message identifier"
            )));
        }

        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NotificationRecord {
    pub fn new(message_id: &str, message: &str) -> Self {
        Self {
            event_source: None,
            notification: Notification {
                message_id: message_id.to_owned(),
                message: message.to_owned(),
                topic: None,
                timestamp: None,
            },
        }
    }

    pub fn message_id(&self) -> &str {
        &self.notification.message_id
    }

    pub fn payload(&self) -> &[u8] {
        self.notification.message.as_bytes()
    }
}
