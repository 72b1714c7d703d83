use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use reservoir::{
    ChainWorker, IndexMessage, Indexer, MemoryStore, PostgresClient, Pricing, Processor,
    RpcReader, Settings, Store,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to initialize logger")?;

    // Load configuration
    let settings =
        Settings::new().context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let reader = RpcReader::new(&settings.indexer.rpc_url)?;
    let pricing = Pricing::new(&settings.pricing).context("Invalid pricing configuration")?;

    match &settings.postgres {
        Some(postgres) => {
            let client = PostgresClient::new(postgres.clone())
                .await
                .context("Failed to initialize database connection")?;
            client.migrate().await.context("Failed to apply schema")?;
            run_indexer(settings, Indexer::new(reader, client, pricing)).await
        },
        None => {
            warn!("No postgres configured, state is kept in memory and lost on exit");
            run_indexer(settings, Indexer::new(reader, MemoryStore::new(), pricing)).await
        },
    }
}

async fn run_indexer<S: Store + Sync + 'static>(
    settings: Settings,
    indexer: Indexer<RpcReader, S>,
) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    let mut processor = Processor::new(indexer, settings.indexer.chain_id);
    let from_block = processor.resume_block(settings.indexer.start_block).await?;

    let (sender, receiver) = mpsc::channel::<IndexMessage>(settings.indexer.channel_capacity);
    let worker = ChainWorker::new(
        &settings.indexer,
        &settings.pools,
        settings.voting_escrow.as_deref(),
        sender,
    )?;

    // Either task stopping takes the whole pipeline down
    let worker_token = cancellation_token.clone();
    let worker_handle = tokio::spawn(async move {
        let result = worker.run(from_block, worker_token.child_token()).await;
        if let Err(e) = &result {
            error!("Chain worker failed: {:#}", e);
        }
        worker_token.cancel();
        result
    });

    let processor_token = cancellation_token.clone();
    let processor_handle = tokio::spawn(async move {
        let result = processor.run(receiver, processor_token.child_token()).await;
        if let Err(e) = &result {
            error!("Processor failed: {:#}", e);
        }
        processor_token.cancel();
        result
    });

    info!(
        "Indexer running for chain {} with {} pools. Press Ctrl+C to stop.",
        settings.indexer.chain_id,
        settings.pools.len()
    );

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
            _ = cancellation_token.cancelled() => {
                warn!("Pipeline stopped, shutting down");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = cancellation_token.cancelled() => {
                warn!("Pipeline stopped, shutting down");
            },
        };
    }

    // Cancel all running tasks
    info!("Finishing all tasks...");
    cancellation_token.cancel();

    info!("Waiting for chain worker to stop...");
    let worker_result = worker_handle.await.context("Chain worker task panicked")?;

    info!("Waiting for processor to stop...");
    let processor_result = processor_handle.await.context("Processor task panicked")?;

    // Exit non-zero on failure; the next run resumes from the last checkpoint
    processor_result?;
    worker_result?;

    info!("Indexer stopped");
    Ok(())
}
