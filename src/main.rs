//! Provider Cache workload driver
//!
//! Builds a crypto provider cache from environment configuration, drives
//! concurrent get-or-create traffic through it and reports cache statistics.

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use provider_cache::provider::SignatureProvider;
use provider_cache::tasks::{spawn_workload, WorkloadSettings};
use provider_cache::{CacheFactory, Config};

/// Main entry point for the workload driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the provider cache through the factory
/// 4. Spawn workload workers
/// 5. Wait for the workers, or abort them on SIGINT/SIGTERM
/// 6. Report per-cache statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provider_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting provider cache workload");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: capacity={}, policy={}, workers={}, operations={}, key_space={}",
        config.cache.capacity(),
        config.cache.policy(),
        config.workers,
        config.operations_per_worker,
        config.key_space
    );

    let cache = CacheFactory::create::<SignatureProvider>(&config.cache)?;

    let settings = WorkloadSettings::from(&config);
    let handles: Vec<_> = (0..config.workers)
        .map(|worker| spawn_workload(cache.clone(), worker, settings))
        .collect();
    let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

    let workers = async {
        let mut lookups = 0;
        for handle in handles {
            match handle.await {
                Ok(report) => lookups += report.lookups,
                Err(err) if err.is_cancelled() => {}
                Err(err) => return Err(anyhow::Error::from(err)),
            }
        }
        Ok(lookups)
    };

    tokio::select! {
        result = workers => {
            info!("Workload complete: {} lookups", result?);
        }
        _ = shutdown_signal() => {
            for handle in &abort_handles {
                handle.abort();
            }
            warn!("Workload aborted");
        }
    }

    let stats = cache.stats();
    for (kind, stats) in [("signing", &stats.signing), ("verifying", &stats.verifying)] {
        info!(
            "{} cache: entries={}, hits={}, misses={}, evictions={}, hit_rate={:.3}",
            kind,
            stats.total_entries,
            stats.hits,
            stats.misses,
            stats.evictions,
            stats.hit_rate()
        );
    }
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping workload...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping workload...");
        }
    }
}
