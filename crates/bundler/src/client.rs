use crate::{
    error::BundlerError,
    jsonrpc::{JsonRpcRequest, JsonRpcResponse},
};
use aa_sdk_primitives::{
    constants::bundler::{
        MIN_WAIT_RECEIPT_INTERVAL_MS, WAIT_RECEIPT_INTERVAL_MS, WAIT_RECEIPT_TIMEOUT_SECS,
    },
    UserOperationGasEstimation, UserOperationHash, UserOperationReceipt, UserOperationRequest,
};
use async_trait::async_trait;
use ethers::types::Address;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// JSON-RPC API of an ERC-4337 bundler
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Submits the signed user operation (`eth_sendUserOperation`)
    async fn send_user_operation(
        &self,
        uo: &UserOperationRequest,
    ) -> Result<UserOperationHash, BundlerError>;

    /// Estimates the gas limits of the user operation (`eth_estimateUserOperationGas`)
    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperationRequest,
    ) -> Result<UserOperationGasEstimation, BundlerError>;

    /// Receipt of the user operation, `None` if it is not included yet
    /// (`eth_getUserOperationReceipt`)
    async fn get_user_operation_receipt(
        &self,
        hash: &UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, BundlerError>;

    /// Entry points supported by the bundler (`eth_supportedEntryPoints`)
    async fn supported_entry_points(&self) -> Result<Vec<Address>, BundlerError>;
}

/// Bundler client over HTTP
#[derive(Debug)]
pub struct BundlerClient {
    http: reqwest::Client,
    url: String,
    entry_point: Address,
    id: AtomicU64,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl BundlerClient {
    /// Creates a client submitting user operations for `entry_point` to the bundler at `url`
    pub fn new(url: impl Into<String>, entry_point: Address) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            entry_point,
            id: AtomicU64::new(0),
            poll_interval: Duration::from_millis(WAIT_RECEIPT_INTERVAL_MS),
            wait_timeout: Duration::from_secs(WAIT_RECEIPT_TIMEOUT_SECS),
        }
    }

    /// Interval between two receipt queries in [BundlerClient::wait_for_user_operation]
    ///
    /// Intervals shorter than one millisecond (including zero) are raised to one millisecond.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(MIN_WAIT_RECEIPT_INTERVAL_MS));
        self
    }

    /// Deadline of [BundlerClient::wait_for_user_operation]
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    /// Sends a JSON-RPC request and decodes its result
    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<Option<R>, BundlerError>
    where
        P: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        let id = self.id.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("Sending {method} (id {id}) to the bundler {}", self.url);

        let body = self
            .http
            .post(&self.url)
            .json(&JsonRpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|err| BundlerError::Transport { method, inner: err.to_string() })?
            .bytes()
            .await
            .map_err(|err| BundlerError::Transport { method, inner: err.to_string() })?;

        let response: JsonRpcResponse<R> = serde_json::from_slice(&body)
            .map_err(|err| BundlerError::Decode { method, inner: err.to_string() })?;

        match response.error {
            Some(error) => Err(BundlerError::Rpc { method, error }),
            None => Ok(response.result),
        }
    }

    /// Polls the receipt of the user operation until it is available
    ///
    /// Fails with [BundlerError::ReceiptNotFound] once the wait timeout elapses and with
    /// [BundlerError::Cancelled] as soon as `cancel` is triggered.
    pub async fn wait_for_user_operation(
        &self,
        hash: &UserOperationHash,
        cancel: &CancellationToken,
    ) -> Result<UserOperationReceipt, BundlerError> {
        let poll = async {
            let mut ticker =
                interval_at(Instant::now() + self.poll_interval, self.poll_interval);
            loop {
                ticker.tick().await;
                debug!("Querying receipt of user operation {hash}");
                match self.get_user_operation_receipt(hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => continue,
                    Err(err) => return Err(err),
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Waiting for user operation {hash} cancelled");
                Err(BundlerError::Cancelled { hash: *hash })
            }
            _ = sleep(self.wait_timeout) => {
                warn!("No receipt for user operation {hash} after {:?}", self.wait_timeout);
                Err(BundlerError::ReceiptNotFound { hash: *hash })
            }
            res = poll => res,
        }
    }
}

#[async_trait]
impl Bundler for BundlerClient {
    async fn send_user_operation(
        &self,
        uo: &UserOperationRequest,
    ) -> Result<UserOperationHash, BundlerError> {
        const METHOD: &str = "eth_sendUserOperation";
        let hash = self
            .call::<_, UserOperationHash>(METHOD, (uo, self.entry_point))
            .await?
            .ok_or(BundlerError::EmptyResult { method: METHOD })?;
        info!("User operation {hash} sent to the bundler");
        Ok(hash)
    }

    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperationRequest,
    ) -> Result<UserOperationGasEstimation, BundlerError> {
        const METHOD: &str = "eth_estimateUserOperationGas";
        self.call(METHOD, (uo, self.entry_point))
            .await?
            .ok_or(BundlerError::EmptyResult { method: METHOD })
    }

    async fn get_user_operation_receipt(
        &self,
        hash: &UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, BundlerError> {
        self.call("eth_getUserOperationReceipt", [hash]).await
    }

    async fn supported_entry_points(&self) -> Result<Vec<Address>, BundlerError> {
        const METHOD: &str = "eth_supportedEntryPoints";
        self.call(METHOD, Vec::<()>::new())
            .await?
            .ok_or(BundlerError::EmptyResult { method: METHOD })
    }
}
