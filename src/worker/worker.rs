use alloy::primitives::U256;
use anyhow::{Context, Result};
use hypersync_client::{
    net_types::{BlockField, LogField, LogFilter, Query},
    Client, ClientConfig, SerializationFormat, StreamConfig,
};
use log::info;
use rustc_hash::FxHashMap;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{IndexerSettings, PoolSettings},
    events::{ChainEvent, LockDeposit},
    utils::parse_address,
    worker::parser::{self, Emitters},
};

/// Interval for logging progress updates (10 seconds)
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Timeout for receiving data from HyperSync stream (5 minutes)
/// If no data is received within this time, reconnect the stream
const STREAM_RECV_TIMEOUT: Duration = Duration::from_secs(300);

/// Messages from the chain worker to the processor, in chain order.
#[derive(Debug)]
pub enum IndexMessage {
    Event(ChainEvent),
    Lock(LockDeposit),
    /// Every event below this block has been sent.
    Checkpoint(u64),
}

/// Log streamer for a single chain.
///
/// Streams the configured pools' (and voting escrow's) events from
/// HyperSync, decodes them and
/// forwards them, strictly in (block, log index) order, to the processor.
/// After each HyperSync batch a checkpoint marker follows the batch's events
/// on the same channel, so a checkpoint is only persisted once everything
/// before it has been applied.
pub struct ChainWorker {
    sender: mpsc::Sender<IndexMessage>,
    chain_id: u64,
    client: Arc<Client>,
    filters: LogFilter,
    emitters: Emitters,
    tip_poll_interval: Duration,
}

impl ChainWorker {
    pub fn new(
        config: &IndexerSettings,
        pools: &[PoolSettings],
        voting_escrow: Option<&str>,
        sender: mpsc::Sender<IndexMessage>,
    ) -> Result<Self> {
        let url = config
            .hypersync_url
            .parse()
            .context("Invalid HyperSync URL")?;

        let client_config = ClientConfig {
            serialization_format: SerializationFormat::CapnProto {
                should_cache_queries: false,
            },
            http_req_timeout_millis: 120_000,
            url,
            api_token: config.hypersync_bearer_token.clone(),
            max_num_retries: 5,
            ..Default::default()
        };

        let client =
            Arc::new(Client::new(client_config).context("Failed to create HyperSync client")?);

        let emitters = Emitters {
            pools: pools
                .iter()
                .map(|pool| Ok((parse_address(&pool.address)?, pool.shape)))
                .collect::<Result<FxHashMap<_, _>>>()?,
            voting_escrow: voting_escrow.map(parse_address).transpose()?,
        };

        let filters = LogFilter::all()
            .and_address(emitters.addresses().into_iter().map(|a| a.0 .0))?
            .and_topic0(parser::subscribed_topics())?;

        Ok(Self {
            sender,
            chain_id: config.chain_id,
            client,
            filters,
            emitters,
            tip_poll_interval: Duration::from_millis(config.tip_poll_interval_milliseconds),
        })
    }

    /// Stream from `from_block` until cancelled or the processor goes away.
    pub async fn run(&self, from_block: u64, cancellation_token: CancellationToken) -> Result<()> {
        let mut last_progress_log = Instant::now();
        let mut next_block = from_block;

        info!(
            "Chain {} streaming {} pools from block {}",
            self.chain_id,
            self.emitters.pools.len(),
            next_block
        );

        loop {
            // Check cancellation at the start of each loop
            if cancellation_token.is_cancelled() {
                info!(
                    "Worker for chain {} received cancellation signal",
                    self.chain_id
                );
                break;
            }

            let config = StreamConfig {
                ..Default::default()
            };

            let query = Query::new()
                .from_block(next_block)
                .where_logs(self.filters.clone())
                .select_block_fields([BlockField::Number, BlockField::Timestamp])
                .select_log_fields([
                    LogField::BlockNumber,
                    LogField::TransactionHash,
                    LogField::LogIndex,
                    LogField::Address,
                    LogField::Data,
                    LogField::Topic0,
                    LogField::Topic1,
                    LogField::Topic2,
                    LogField::Topic3,
                ]);

            let mut stream = self.client.stream(query, config).await?;

            loop {
                let received = tokio::select! {
                    _ = cancellation_token.cancelled() => return Ok(()),
                    received = tokio::time::timeout(STREAM_RECV_TIMEOUT, stream.recv()) => received,
                };
                let Some(res) = received.map_err(|_| {
                    anyhow::anyhow!("Stream recv timeout after {:?}", STREAM_RECV_TIMEOUT)
                })?
                else {
                    break;
                };
                let res = res.context("Stream error")?;

                // Get block timestamps for the log batch
                let block_timestamps: FxHashMap<u64, u64> = res
                    .data
                    .blocks
                    .iter()
                    .flatten()
                    .filter_map(|b| {
                        let n = b.number?;
                        let t = U256::from_be_slice(b.timestamp.as_ref()?).to::<u64>();
                        Some((n, t))
                    })
                    .collect();

                let messages = parser::parse_logs(
                    res.data.logs.into_iter().flatten(),
                    &block_timestamps,
                    &self.emitters,
                );

                for message in messages {
                    self.forward(message, &cancellation_token).await?;
                }

                next_block = res.next_block;
                self.forward(IndexMessage::Checkpoint(next_block), &cancellation_token)
                    .await?;

                // Log progress every PROGRESS_LOG_INTERVAL seconds to reduce noise
                if last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                    info!("Chain {} streamed to block {}", self.chain_id, next_block);
                    last_progress_log = Instant::now();
                }
            }

            // Caught up with the tip, poll again later
            tokio::select! {
                _ = cancellation_token.cancelled() => {},
                _ = tokio::time::sleep(self.tip_poll_interval) => {},
            }
        }

        Ok(())
    }

    /// Hand a message to the processor. A closed channel is only an error
    /// when we are not shutting down.
    async fn forward(
        &self,
        message: IndexMessage,
        cancellation_token: &CancellationToken,
    ) -> Result<()> {
        if self.sender.send(message).await.is_err() && !cancellation_token.is_cancelled() {
            return Err(anyhow::anyhow!(
                "Processor for chain {} stopped",
                self.chain_id
            ));
        }
        Ok(())
    }
}
