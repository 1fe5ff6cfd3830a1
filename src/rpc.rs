// CometBFT JSON-RPC Client
//
// Only the three read calls the pipeline needs. Each response is kept as the
// raw document (stored verbatim for forensic replay) with a typed view
// deserialized on top for field extraction; every field is optional so a
// sparse document degrades to absent values instead of a decode failure.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    client: reqwest::Client,
}

/// `/status` extract: live chain identity and tip height.
#[derive(Debug, Clone)]
pub struct ChainStatus {
    pub chain_id: Option<String>,
    pub latest_height: i64,
}

/// `/block` extract plus the verbatim document.
#[derive(Debug, Clone)]
pub struct BlockDoc {
    pub raw: Value,
    pub time: Option<String>,
    pub proposer_address: Option<String>,
    pub block_id_hash: Option<String>,
    /// Raw transactions, base64 as served.
    pub txs: Vec<String>,
}

/// `/block_results` extract plus the verbatim document. Event buckets stay
/// as raw JSON for the normalizer.
#[derive(Debug, Clone)]
pub struct BlockResultsDoc {
    pub raw: Value,
    pub begin_block_events: Option<Value>,
    pub end_block_events: Option<Value>,
    pub finalize_block_events: Option<Value>,
    pub txs_results: Vec<TxResultView>,
}

/// Per-transaction execution result. `code` and the gas fields are kept as
/// raw JSON: older nodes serialize them as numbers, newer ones as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxResultView {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub gas_wanted: Option<Value>,
    #[serde(default)]
    pub gas_used: Option<Value>,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub events: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusView {
    #[serde(default)]
    result: Option<StatusResult>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusResult {
    #[serde(default)]
    node_info: Option<NodeInfoView>,
    #[serde(default)]
    sync_info: Option<SyncInfoView>,
}

#[derive(Debug, Default, Deserialize)]
struct NodeInfoView {
    #[serde(default)]
    network: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SyncInfoView {
    #[serde(default)]
    latest_block_height: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockView {
    #[serde(default)]
    result: Option<BlockResult>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockResult {
    #[serde(default)]
    block_id: Option<BlockIdView>,
    #[serde(default)]
    block: Option<BlockBodyView>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockIdView {
    #[serde(default)]
    hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockBodyView {
    #[serde(default)]
    header: Option<HeaderView>,
    #[serde(default)]
    data: Option<BlockDataView>,
}

#[derive(Debug, Default, Deserialize)]
struct HeaderView {
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    proposer_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockDataView {
    #[serde(default)]
    txs: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockResultsView {
    #[serde(default)]
    result: Option<BlockResultsResult>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockResultsResult {
    #[serde(default)]
    begin_block_events: Option<Value>,
    #[serde(default)]
    end_block_events: Option<Value>,
    #[serde(default)]
    finalize_block_events: Option<Value>,
    #[serde(default)]
    txs_results: Option<Vec<TxResultView>>,
}

impl RpcClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// `GET /status`
    pub async fn status(&self) -> Result<ChainStatus> {
        let doc = self.get_json("/status", &[]).await?;
        let view: StatusView = serde_json::from_value(doc)?;
        let result = view.result.unwrap_or_default();
        let chain_id = result.node_info.unwrap_or_default().network;
        let latest_height = result
            .sync_info
            .unwrap_or_default()
            .latest_block_height
            .and_then(|h| h.parse().ok())
            .unwrap_or(0);
        Ok(ChainStatus { chain_id, latest_height })
    }

    /// `GET /block?height=H`
    pub async fn block(&self, height: i64) -> Result<BlockDoc> {
        let doc = self
            .get_json("/block", &[("height", height.to_string())])
            .await?;
        let view: BlockView = serde_json::from_value(doc.clone())?;
        let result = view.result.unwrap_or_default();
        let body = result.block.unwrap_or_default();
        let header = body.header.unwrap_or_default();
        Ok(BlockDoc {
            raw: doc,
            time: header.time,
            proposer_address: header.proposer_address,
            block_id_hash: result.block_id.unwrap_or_default().hash,
            txs: body.data.unwrap_or_default().txs.unwrap_or_default(),
        })
    }

    /// `GET /block_results?height=H`
    pub async fn block_results(&self, height: i64) -> Result<BlockResultsDoc> {
        let doc = self
            .get_json("/block_results", &[("height", height.to_string())])
            .await?;
        let view: BlockResultsView = serde_json::from_value(doc.clone())?;
        let result = view.result.unwrap_or_default();
        Ok(BlockResultsDoc {
            raw: doc,
            begin_block_events: result.begin_block_events,
            end_block_events: result.end_block_events,
            finalize_block_events: result.finalize_block_events,
            txs_results: result.txs_results.unwrap_or_default(),
        })
    }
}
