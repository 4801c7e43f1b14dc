//! JSON-RPC 2.0 client for a remote aggregator

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokenwire_types::{
    ClientSignature, Commitment, DataHash, InclusionProof, PublicKey, RequestId,
};
use tracing::debug;

use crate::client::{AggregatorClient, ProofResponse, SubmitOutcome};
use crate::error::{AggregatorError, AggregatorResult};

const JSONRPC_VERSION: &str = "2.0";
const STATUS_SUCCESS: &str = "SUCCESS";
const STATUS_REQUEST_ID_EXISTS: &str = "REQUEST_ID_EXISTS";

/// Connection settings for a remote aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Aggregator endpoint
    #[serde(default = "default_url")]
    pub url: String,

    /// Sent as `Authorization: Bearer <key>` when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitParams<'a> {
    request_id: &'a RequestId,
    state_hash: &'a DataHash,
    public_key: &'a PublicKey,
    signature: &'a ClientSignature,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofParams<'a> {
    request_id: &'a RequestId,
}

/// Aggregator reached over HTTP
pub struct JsonRpcAggregator {
    client: Client,
    base_url: String,
    next_id: AtomicU64,
}

impl JsonRpcAggregator {
    pub fn new(config: &AggregatorConfig) -> AggregatorResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| AggregatorError::Config(format!("invalid API key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> AggregatorResult<Option<R>> {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "Aggregator call");

        let response = self.client.post(&self.base_url).json(&request).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AggregatorResult<Option<R>> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AggregatorError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let envelope: RpcResponse<R> = serde_json::from_slice(&body)?;
        if let Some(error) = envelope.error {
            return Err(AggregatorError::Server {
                code: error.code,
                message: error.message,
            });
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl AggregatorClient for JsonRpcAggregator {
    async fn submit(&self, commitment: &Commitment) -> AggregatorResult<SubmitOutcome> {
        let params = SubmitParams {
            request_id: commitment.request_id(),
            state_hash: commitment.state_hash(),
            public_key: commitment.public_key(),
            signature: commitment.signature(),
        };
        let result: Option<SubmitResult> = self.call("submit_commitment", params).await?;
        let result = result
            .ok_or_else(|| AggregatorError::Protocol("submit_commitment returned null".into()))?;

        match result.status.as_str() {
            STATUS_SUCCESS => Ok(SubmitOutcome::Accepted),
            STATUS_REQUEST_ID_EXISTS => Ok(SubmitOutcome::Duplicate),
            other => Err(AggregatorError::Rejected(other.to_string())),
        }
    }

    async fn query_proof(&self, request_id: &RequestId) -> AggregatorResult<ProofResponse> {
        let result: Option<InclusionProof> = self
            .call("get_inclusion_proof", ProofParams { request_id })
            .await?;
        Ok(match result {
            Some(proof) => ProofResponse::Found(proof),
            None => ProofResponse::NotFound,
        })
    }
}
