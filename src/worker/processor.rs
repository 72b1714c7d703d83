use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    chain::ChainReader,
    db::{models::SyncCheckpoint, Store},
    engine::Indexer,
    worker::IndexMessage,
};

/// Single consumer of the event stream.
///
/// Applies events one at a time in arrival order and persists checkpoints
/// as they pass through. Any failure stops the processor: the checkpoint is
/// left before the failing event so it is redelivered on restart.
pub struct Processor<R: ChainReader, S: Store> {
    indexer: Indexer<R, S>,
    chain_id: u64,
}

impl<R: ChainReader, S: Store> Processor<R, S> {
    pub fn new(indexer: Indexer<R, S>, chain_id: u64) -> Self {
        Self { indexer, chain_id }
    }

    /// Block to resume streaming from: the stored checkpoint, else `start_block`.
    pub async fn resume_block(&mut self, start_block: u64) -> Result<u64> {
        let checkpoint = self
            .indexer
            .store_mut()
            .load::<SyncCheckpoint>(&self.chain_id.to_string())
            .await
            .context("Failed to load sync checkpoint")?;

        Ok(match checkpoint {
            Some(checkpoint) => {
                info!(
                    "Resuming chain {} from checkpoint block {} (saved {})",
                    self.chain_id, checkpoint.next_block, checkpoint.updated_at
                );
                checkpoint.next_block
            },
            None => start_block,
        })
    }

    pub async fn run(
        &mut self,
        mut receiver: mpsc::Receiver<IndexMessage>,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        loop {
            let message = tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Processor for chain {} received cancellation signal", self.chain_id);
                    break;
                },
                message = receiver.recv() => message,
            };

            let Some(message) = message else {
                warn!("Event stream for chain {} closed", self.chain_id);
                break;
            };

            match message {
                IndexMessage::Event(event) => self.indexer.handle_event(&event).await?,
                IndexMessage::Lock(deposit) => self.indexer.handle_lock_deposit(&deposit).await?,
                IndexMessage::Checkpoint(block) => {
                    let checkpoint = SyncCheckpoint::new(self.chain_id, block);
                    self.indexer
                        .store_mut()
                        .upsert(&checkpoint)
                        .await
                        .with_context(|| {
                            format!(
                                "Critical: Failed to update checkpoint for chain {}",
                                self.chain_id
                            )
                        })?;
                },
            }
        }

        Ok(())
    }

    pub fn indexer(&self) -> &Indexer<R, S> {
        &self.indexer
    }
}
