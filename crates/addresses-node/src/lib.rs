//! Client for the remote node the reconciliation routines consult as an
//! external source of truth (§4.5, §6): `icx_getBalance` for liquid ICX,
//! and `icx_call` against the governance score for staked ICX
//! (`getStake`). Grounded in `icon_node_service.go`: same two RPCs, same
//! governance contract address, same "non-200 or unparseable body is an
//! error" behavior, reimplemented over a real JSON-RPC client crate
//! instead of a hand-rolled `net/http` payload string.

use jsonrpsee::{
    core::{client::ClientT, params::ObjectParams},
    http_client::{HttpClient, HttpClientBuilder}
};
use serde::Deserialize;
use thiserror::Error;

/// `cx0000000000000000000000000000000000000000`, the governance score
/// every ICON node exposes `getStake` on.
pub const GOVERNANCE_CONTRACT_ADDRESS: &str = "cx0000000000000000000000000000000000000000";

#[derive(Debug, Error)]
pub enum NodeRpcError {
    #[error("node RPC transport error: {0}")]
    Transport(#[from] jsonrpsee::core::ClientError),
    #[error("node RPC response missing expected `{0}` field")]
    UnexpectedResponseShape(&'static str)
}

#[derive(Debug, Deserialize)]
struct StakeResult {
    stake: String
}

/// A thin client over the remote node's JSON-RPC surface. Cheap to clone
/// (the underlying `HttpClient` is reference-counted internally).
#[derive(Clone)]
pub struct NodeClient {
    inner: HttpClient
}

impl NodeClient {
    pub fn connect(rpc_url: &str) -> Result<Self, NodeRpcError> {
        let inner = HttpClientBuilder::default().build(rpc_url)?;
        Ok(Self { inner })
    }

    /// Liquid ICX balance for `public_key`, as a hex-encoded quantity.
    pub async fn get_balance(&self, public_key: &str) -> Result<String, NodeRpcError> {
        let mut params = ObjectParams::new();
        params.insert("address", public_key)?;
        let result: String = self.inner.request("icx_getBalance", params).await?;
        Ok(result)
    }

    /// Staked ICX for `public_key`, read via `icx_call` against the
    /// governance score's `getStake` method.
    pub async fn get_staked_balance(&self, public_key: &str) -> Result<String, NodeRpcError> {
        let mut params = ObjectParams::new();
        params.insert("to", GOVERNANCE_CONTRACT_ADDRESS)?;
        params.insert("dataType", "call")?;
        params.insert(
            "data",
            serde_json::json!({
                "method": "getStake",
                "params": { "address": public_key }
            })
        )?;

        let result: StakeResult = self.inner.request("icx_call", params).await.map_err(|err| {
            tracing::warn!(%public_key, error = %err, "icx_call getStake failed");
            NodeRpcError::Transport(err)
        })?;
        Ok(result.stake)
    }
}
