use std::{sync::Arc, time::Duration};

use addresses_balance::BalanceBuilder;
use addresses_bus::TopicConsumer;
use addresses_cache::{CounterCache, RedisCounterCache};
use addresses_config::Settings;
use addresses_node::NodeClient;
use addresses_pipeline::{transformers, Loaders};
use addresses_reconcile::ReconcileIntervals;
use addresses_store::{PostgresStore, Store};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const LOADER_QUEUE_CAPACITY: usize = 1_000;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    init_logging();

    let settings = Settings::load()?;
    tracing::info!(name = %settings.name, network = %settings.network_name, "starting worker");

    let _metrics_handle = addresses_metrics::install_recorder();

    let store: Arc<dyn Store> = Arc::new(PostgresStore::connect(&settings.database_url).await?);
    let cache: Arc<dyn CounterCache> = Arc::new(RedisCounterCache::connect(&settings.redis_url).await?);
    let node = NodeClient::connect(&settings.icon_node_service_url)?;

    let loaders = Loaders::spawn(store.clone(), cache.clone(), LOADER_QUEUE_CAPACITY);

    spawn_transformer(
        &settings.kafka_broker_url,
        &settings.kafka_group_id,
        &settings.consumer_topic_blocks,
        loaders.clone(),
        transformers::blocks::run
    )?;
    spawn_transformer(
        &settings.kafka_broker_url,
        &settings.kafka_group_id,
        &settings.consumer_topic_transactions,
        loaders.clone(),
        transformers::transactions::run
    )?;
    spawn_transformer(
        &settings.kafka_broker_url,
        &settings.kafka_group_id,
        &settings.consumer_topic_logs,
        loaders.clone(),
        transformers::logs::run
    )?;
    spawn_transformer(
        &settings.kafka_broker_url,
        &settings.kafka_group_id,
        &settings.consumer_topic_contracts_processed,
        loaders.clone(),
        transformers::contracts::run
    )?;
    spawn_transformer(
        &settings.kafka_broker_url,
        &settings.kafka_group_id,
        &settings.consumer_topic_governance_preps_processed,
        loaders.clone(),
        transformers::governance_preps::run
    )?;

    tokio::spawn(BalanceBuilder::new(store.clone(), loaders.balance.clone()).run());

    addresses_reconcile::spawn(
        store,
        cache,
        node,
        loaders.address.clone(),
        ReconcileIntervals {
            balance: Duration::from_secs(settings.balance_routine_interval_seconds),
            transaction_count: Duration::from_secs(settings.transaction_count_routine_interval_seconds),
            address_count: Duration::from_secs(settings.address_count_routine_interval_seconds)
        }
    );

    tokio::spawn(serve_health_probe(settings.health_port));

    wait_for_shutdown().await;
    tracing::info!("worker shutting down");
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Connects one [`TopicConsumer`] and spawns its transformer loop (§4.2).
/// Every transformer aborts the process itself on a fatal error, so this
/// fire-and-forget `tokio::spawn` never needs to be joined.
fn spawn_transformer<F, Fut>(
    broker_url: &str,
    group_id: &str,
    topic: &str,
    loaders: Loaders,
    run: F
) -> eyre::Result<()>
where
    F: FnOnce(TopicConsumer, Loaders) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static
{
    let consumer = TopicConsumer::connect(broker_url, group_id, topic)?;
    tokio::spawn(run(consumer, loaders));
    Ok(())
}

/// A bare liveness probe (§2 supplement: `healthcheck.go`): accepts a
/// connection and writes a fixed 200 response, with no routing or
/// dependency checks. The REST query binary exposes the fuller health
/// surface; this one just proves the process is alive to a supervisor.
async fn serve_health_probe(port: u16) {
    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port, "health probe: failed to bind");
            return
        }
    };

    loop {
        let Ok((mut socket, _)) = listener.accept().await else { continue };
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let _ = socket.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nOK").await;
        });
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
