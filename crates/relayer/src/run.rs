use std::{sync::Arc, time::Duration};

use clap::Parser;
use relayer_chain::{EvmClient, JsonRpcEvmClient, JsonRpcUtxoClient, UtxoClient};
use relayer_observe::metrics::LivenessChecking;
use relayer_secrets::SecretCipher;
use tokio_util::sync::CancellationToken;

use crate::{arguments::Arguments, facade::RelayerFacade, shutdown};

/// Builds the facade, wiring in a `PostgresStateStore` when the binary was
/// built with the `persistence` feature and `--db-url` was supplied, and
/// restoring any in-flight swaps from it before the caller starts `run`.
async fn build_facade(
    args: &Arguments,
    evm: Arc<dyn EvmClient>,
    utxo: Arc<dyn UtxoClient>,
    secret_cipher: SecretCipher,
) -> Arc<RelayerFacade> {
    #[cfg(feature = "persistence")]
    if let Some(db_url) = &args.db_url {
        let pool = sqlx::PgPool::connect(db_url)
            .await
            .expect("failed to connect to db_url");
        let store = relayer_orders::PostgresStateStore::new(pool);
        store.ensure_schema().await.expect("failed to run swap_states migration");
        let facade = RelayerFacade::with_order_store(
            evm,
            utxo,
            args.monitor_config(),
            secret_cipher,
            args.secret_config(),
            args.auction_config(),
            args.order_config(),
            args.event_channel_capacity,
            Arc::new(store),
        );
        let restored = facade.restore().await.expect("failed to restore swap state from db_url");
        tracing::info!(restored, "restored in-flight swaps from db_url");
        return facade;
    }

    RelayerFacade::new(
        evm,
        utxo,
        args.monitor_config(),
        secret_cipher,
        args.secret_config(),
        args.auction_config(),
        args.order_config(),
        args.event_channel_capacity,
    )
}

#[derive(prometheus_metric_storage::MetricStorage)]
struct Metrics {
    /// Number of seconds the relayer process has been running for.
    seconds_alive: prometheus::IntGauge,
}

struct Liveness;

#[async_trait::async_trait]
impl LivenessChecking for Liveness {
    async fn is_alive(&self) -> bool {
        true
    }
}

pub async fn start(args: impl Iterator<Item = String>) {
    let args = Arguments::parse_from(args);
    relayer_observe::tracing::initialize(&args.log_filter, args.log_stderr_threshold);
    relayer_observe::panic_hook::install();
    tracing::info!("running relayer with validated arguments:\n{args}");
    relayer_observe::metrics::setup_registry(Some("relayer".into()), None);

    run(args).await;
}

/// Assumes tracing and the metrics registry have already been set up.
pub async fn run(args: Arguments) {
    let secret_cipher =
        SecretCipher::from_hex(&args.secret_cipher_key).expect("secret_cipher_key must be 32 bytes of hex");

    let evm = Arc::new(JsonRpcEvmClient::new(
        args.chain.evm_rpc_url.clone(),
        args.chain.rpc_timeout,
    ));
    let utxo = Arc::new(JsonRpcUtxoClient::new(
        args.chain.utxo_rpc_url.clone(),
        args.chain.rpc_timeout,
    ));

    let facade = build_facade(&args, evm, utxo, secret_cipher).await;

    let _metrics_server = relayer_observe::metrics::serve_metrics(Arc::new(Liveness), args.metrics_address);
    tokio::spawn(async {
        let start = std::time::Instant::now();
        let metrics = Metrics::instance(relayer_observe::metrics::get_storage_registry()).unwrap();
        loop {
            metrics.seconds_alive.set(start.elapsed().as_secs() as i64);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    });

    let cancel = CancellationToken::new();
    let mut facade_task = tokio::spawn(facade.run(cancel.clone()));

    tokio::select! {
        _ = shutdown::signal_handler() => {
            tracing::info!("shutting down the relayer");
        }
        result = &mut facade_task => {
            tracing::error!(?result, "relayer facade exited unexpectedly");
            return;
        }
    }

    cancel.cancel();
    if let Err(err) = facade_task.await {
        tracing::error!(?err, "relayer facade task panicked during shutdown");
    }
}
