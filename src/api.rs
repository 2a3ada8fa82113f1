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
use crate::handler::{BatchReport, HotelCreatedEventHandler, ProcessingStats};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(handler: Arc<HotelCreatedEventHandler>) -> Router {
    Router::new()
        .route("/events", post(handle_events))
        .route("/stats", get(get_stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn handle_events(
    State(handler): State<Arc<HotelCreatedEventHandler>>,
    body: Bytes,
) -> Result<Json<BatchReport>, ApiError> {
    let report = handler.handle_raw(&body).await?;
    Ok(Json(report))
}

async fn get_stats(
    State(handler): State<Arc<HotelCreatedEventHandler>>,
) -> Json<ProcessingStats> {
    Json(handler.stats().await)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Maps invocation failures to statuses the delivering system acts on:
/// 5xx responses are redelivered, 4xx responses are not.
#[derive(Debug)]
pub struct ApiError(IndexerError);

impl From<IndexerError> for ApiError {
    fn from(error: IndexerError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            IndexerError::Transport(_) => StatusCode::BAD_REQUEST,
            IndexerError::Decode(_) | IndexerError::DateFormat { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IndexerError::LedgerUnavailable(_) | IndexerError::IndexTransport(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            IndexerError::InvalidConfiguration(_) | IndexerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_backend_errors_should_map_to_redeliverable_status() {
        let ledger = ApiError(IndexerError::LedgerUnavailable("down".to_owned()));
        let index = ApiError(IndexerError::IndexTransport("down".to_owned()));
        assert_eq!(ledger.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(index.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn given_malformed_input_should_map_to_client_error() {
        let envelope = ApiError(IndexerError::Transport("bad".to_owned()));
        let payload = ApiError(IndexerError::Decode("bad".to_owned()));
        assert_eq!(envelope.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(payload.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
