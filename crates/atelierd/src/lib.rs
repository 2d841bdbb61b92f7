//! Atelier fulfillment daemon
//!
//! Wires the configured backends into the mint saga and runs the
//! dispatcher until shutdown. Checkout and the admin surface are separate
//! services; they submit work through the same durable job records this
//! daemon recovers at startup, or through [`atelier::JobQueue`] when
//! embedded in-process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use atelier::{Dispatcher, LedgerMintClient, MintSaga, SagaConfig};
use atelier_common::database::DynFulfillmentStore;
use atelier_common::ledger::DynLedgerConnection;
use atelier_common::pin::DynMetadataPinner;
use atelier_common::CollectionId;
use atelier_fake_ledger::{FakeLedger, FakePinner};
use atelier_gateway::MintGateway;
use atelier_ipfs::IpfsPinner;
use atelier_memory_store::MemoryFulfillmentStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod config;

use crate::config::{LedgerBackend, PinBackend, Settings};

/// Initialize the tracing subscriber
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn setup_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn build_ledger_connection(settings: &Settings) -> Result<DynLedgerConnection> {
    match settings.ledger.backend {
        LedgerBackend::FakeLedger => {
            tracing::warn!("Using the fake ledger backend; mints are not real");
            Ok(Arc::new(FakeLedger::new()))
        }
        LedgerBackend::Gateway => {
            if settings.gateway.api_url.is_empty() {
                bail!("ledger backend is gateway but [gateway].api_url is not set");
            }
            let gateway = MintGateway::new(
                &settings.gateway.api_url,
                settings.gateway.api_key.clone(),
                Duration::from_secs(settings.ledger.call_timeout_secs),
            )?;
            Ok(Arc::new(gateway))
        }
    }
}

fn build_pinner(settings: &Settings) -> Result<DynMetadataPinner> {
    match settings.pinning.backend {
        PinBackend::FakePinner => {
            tracing::warn!("Using the fake pinning backend; metadata is not persisted");
            Ok(Arc::new(FakePinner::new()))
        }
        PinBackend::Ipfs => {
            if settings.pinning.api_url.is_empty() {
                bail!("pinning backend is ipfs but [pinning].api_url is not set");
            }
            let pinner = IpfsPinner::new(
                &settings.pinning.api_url,
                settings.pinning.token.clone(),
                &settings.pinning.gateway_url,
                Duration::from_secs(settings.pinning.timeout_secs),
            )?;
            Ok(Arc::new(pinner))
        }
    }
}

/// Run the daemon until ctrl-c
pub async fn run_atelierd(settings: &Settings) -> Result<()> {
    // The relational store lives behind the same traits; the in-memory
    // implementation backs the dev profile this binary ships with.
    let store: DynFulfillmentStore = Arc::new(MemoryFulfillmentStore::new());

    let connection = build_ledger_connection(settings)?;
    let pinner = build_pinner(settings)?;

    let client = LedgerMintClient::new(connection, settings.mint_client_config());
    let saga = MintSaga::new(
        Arc::clone(&store),
        client,
        pinner,
        SagaConfig {
            authenticity_collection: CollectionId::new(
                settings.ledger.authenticity_collection.clone(),
            ),
            ownership_collection: CollectionId::new(settings.ledger.ownership_collection.clone()),
            minted_by: settings.info.minted_by.clone(),
        },
    );

    let dispatcher = Dispatcher::new(store, Arc::new(saga), settings.dispatcher_config());
    let recovered = dispatcher.recover_pending_jobs().await?;
    tracing::info!(
        "atelierd starting: {} workers, {} jobs recovered",
        settings.queue.workers,
        recovered
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(err) => tracing::warn!("Could not listen for shutdown signal: {}", err),
            }
            shutdown.cancel();
        });
    }

    dispatcher.run(shutdown).await?;
    tracing::info!("atelierd stopped");
    Ok(())
}
