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

//! Projects "hotel created" notifications into a search index.
//!
//! Each delivered batch is processed sequentially: the message identifier is
//! checked against the idempotency [`ledger`], the payload is decoded into a
//! [`hotel::HotelCreatedRecord`], and the record is upserted into the search
//! [`index`] under the hotel id.

pub mod api;
pub mod configs;
pub mod context;
pub mod error;
pub mod handler;
pub mod hotel;
pub mod index;
pub mod ledger;
pub mod notification;

pub use configs::IndexerConfig;
pub use context::IndexerContext;
pub use error::IndexerError;
pub use handler::{BatchReport, HotelCreatedEventHandler, ProcessingStats};
pub use hotel::HotelCreatedRecord;
pub use notification::NotificationBatch;
