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

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use hotel_created_indexer::configs::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use hotel_created_indexer::{IndexerConfig, IndexerContext, IndexerError, api};
use mimalloc::MiMalloc;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Configuration file path, the extension is optional
    #[arg(long, env = ENV_CONFIG_PATH, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Accept delivered batches over HTTP (default)
    Serve,
    /// Process a single batch stored in a file and exit
    Invoke {
        #[arg(long)]
        event: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), IndexerError> {
    if let Ok(path) = dotenv() {
        eprintln!(
            "Loaded environment variables from .env file at path: {}",
            path.display()
        );
    }

    Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("INFO")))
        .init();

    let args = Args::parse();
    info!("Loading configuration from: {}", args.config);
    let config = IndexerConfig::load(&args.config).inspect_err(|e| {
        error!("Failed to load configuration: {e}");
    })?;

    let context = IndexerContext::init(&config).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, context).await,
        Command::Invoke { event } => invoke(event, context).await,
    }
}

async fn serve(config: &IndexerConfig, context: IndexerContext) -> Result<(), IndexerError> {
    let listener = tokio::net::TcpListener::bind(&config.http.address).await?;
    info!("Hotel created indexer is listening on: {}", listener.local_addr()?);

    axum::serve(listener, api::router(context.handler.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    context.handler.close().await;
    info!("Hotel created indexer stopped");
    Ok(())
}

async fn invoke(event: PathBuf, context: IndexerContext) -> Result<(), IndexerError> {
    info!("Processing batch from: {}", event.display());
    let body = tokio::fs::read(&event).await?;
    let result = context.handler.handle_raw(&body).await;
    context.handler.close().await;

    let report = result?;
    let output = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
    println!("{output}");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
