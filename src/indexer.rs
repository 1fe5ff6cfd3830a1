// Ingestion Worker
//
// A single sequential loop: probe the chain tip, index the gap one height at
// a time, then tail-poll for new blocks. Transient failures retry the same
// height after a fixed backoff; no height is ever skipped and every height
// commits atomically.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::IndexerConfig;
use crate::error::{Error, Result};
use crate::normalize::{lenient_i64, normalize_events, tx_hash_hex, NormalizedEvent};
use crate::rpc::RpcClient;
use crate::store::{BlockRow, EventRow, EventSource, Store, TxRow, META_CHAIN_ID};

/// Fixed retry delay after a transient failure.
const BACKOFF: Duration = Duration::from_secs(2);

pub struct Indexer {
    cfg: IndexerConfig,
    store: Store,
    rpc: RpcClient,
}

enum Tick {
    /// One height committed; the tip at probe time.
    Indexed { latest: i64 },
    /// Caught up; nothing to do until the next poll.
    Tail,
}

impl Indexer {
    pub fn new(cfg: IndexerConfig, store: Store, rpc: RpcClient) -> Self {
        Self { cfg, store, rpc }
    }

    /// Open the store and RPC client described by the config.
    pub async fn connect(cfg: IndexerConfig) -> Result<Self> {
        let store = Store::open(&cfg.db_path).await?;
        let rpc = RpcClient::new(&cfg.rpc_url, cfg.request_timeout)?;
        Ok(Self { cfg, store, rpc })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run until `cancel` fires. Transient errors retry forever on the same
    /// height; fatal ones (chain identity, store invariants) return.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut next = loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match self.init().await {
                Ok(next) => break next,
                Err(e) if e.is_fatal() => {
                    error!("indexer cannot start: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("ERROR: {}", e);
                    pause(&cancel, BACKOFF).await;
                }
            }
        };

        info!(
            db = %self.store.path(),
            rpc = %self.rpc.base_url(),
            start = next,
            "indexer starting"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }
            if next < 1 {
                next = 1;
            }
            match self.tick(next).await {
                Ok(Tick::Indexed { latest }) => {
                    info!(height = next, latest, "indexed height");
                    next += 1;
                }
                Ok(Tick::Tail) => pause(&cancel, self.cfg.poll_interval).await,
                Err(e) if e.is_fatal() => {
                    error!("indexer stopping: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("ERROR: {}", e);
                    pause(&cancel, BACKOFF).await;
                }
            }
        }

        info!("indexer stopped");
        Ok(())
    }

    /// Fetch `/status`, enforce the chain-identity guard, record the chain
    /// id on first observation, and choose the first height to index.
    async fn init(&self) -> Result<i64> {
        let status = self.rpc.status().await?;
        if let Some(live) = status.chain_id {
            match self.store.meta_get(META_CHAIN_ID).await? {
                Some(stored) if stored != live => {
                    return Err(Error::ChainIdMismatch { stored, live });
                }
                Some(_) => {}
                None => self.store.meta_set(META_CHAIN_ID, &live).await?,
            }
            info!(chain_id = %live, "chain identity");
        }

        let next = match self.cfg.start_height {
            Some(h) => h,
            None => match self.store.last_indexed_height().await? {
                Some(last) => last + 1,
                None => 1,
            },
        };
        Ok(next.max(1))
    }

    async fn tick(&self, next: i64) -> Result<Tick> {
        let status = self.rpc.status().await?;
        let latest = status.latest_height;
        if next > latest {
            return Ok(Tick::Tail);
        }
        self.index_height(next).await?;
        self.store.set_last_indexed_height(next).await?;
        Ok(Tick::Indexed { latest })
    }

    /// Fetch, normalize, and atomically commit one height.
    pub async fn index_height(&self, height: i64) -> Result<()> {
        let block = self.rpc.block(height).await?;
        let results = self.rpc.block_results(height).await?;

        let mut events: Vec<EventRow> = Vec::new();
        let mut event_index: i64 = 0;

        // Block-scope events first, in fixed bucket order. Within a bucket
        // the RPC order is kept.
        let buckets = [
            (EventSource::BeginBlock, &results.begin_block_events),
            (EventSource::EndBlock, &results.end_block_events),
            (EventSource::FinalizeBlock, &results.finalize_block_events),
        ];
        for (source, bucket) in buckets {
            for ev in normalize_events(bucket.as_ref()) {
                events.push(EventRow {
                    tx_hash: None,
                    source,
                    event_index,
                    event_type: ev.event_type.clone(),
                    attributes_json: serde_json::to_string(&ev.attributes)?,
                });
                event_index += 1;
            }
        }

        // Tx rows and their events, in block order, continuing the counter.
        let mut txs: Vec<TxRow> = Vec::with_capacity(block.txs.len());
        for (i, tx_b64) in block.txs.iter().enumerate() {
            let tx_hash = tx_hash_hex(tx_b64);
            let res = results.txs_results.get(i);
            let tx_events = normalize_events(res.and_then(|r| r.events.as_ref()));

            let events_value: Vec<serde_json::Value> =
                tx_events.iter().map(NormalizedEvent::to_value).collect();
            txs.push(TxRow {
                tx_hash: tx_hash.clone(),
                tx_index: i as i64,
                code: res.and_then(|r| lenient_i64(r.code.as_ref())),
                gas_wanted: res.and_then(|r| lenient_i64(r.gas_wanted.as_ref())),
                gas_used: res.and_then(|r| lenient_i64(r.gas_used.as_ref())),
                tx_b64: tx_b64.clone(),
                raw_log: res.and_then(|r| r.log.clone()),
                events_json: serde_json::to_string(&events_value)?,
            });

            for ev in tx_events {
                events.push(EventRow {
                    tx_hash: Some(tx_hash.clone()),
                    source: EventSource::Tx,
                    event_index,
                    event_type: ev.event_type.clone(),
                    attributes_json: serde_json::to_string(&ev.attributes)?,
                });
                event_index += 1;
            }
        }

        // tx_count follows the block's own tx list even if txs_results
        // disagrees about the length.
        let row = BlockRow {
            height,
            time: block.time,
            proposer_address: block.proposer_address,
            block_id_hash: block.block_id_hash,
            tx_count: block.txs.len() as i64,
            block_json: serde_json::to_string(&block.raw)?,
            results_json: serde_json::to_string(&results.raw)?,
        };

        self.store.write_height(&row, &txs, &events).await
    }
}

/// Sleep that returns early on cancellation.
async fn pause(cancel: &CancellationToken, dur: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(dur) => {}
    }
}
