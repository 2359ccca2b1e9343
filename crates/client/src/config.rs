//! Client configuration

use crate::error::ClientError;
use aa_sdk_primitives::{
    constants::bundler::{WAIT_RECEIPT_INTERVAL_MS, WAIT_RECEIPT_TIMEOUT_SECS},
    RoundRobinRotator, SignerRotator, ValidityWindow,
};
use ethers::{
    signers::LocalWallet,
    types::{Address, U256},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, str::FromStr, time::Duration};

/// How the validity window of a paymaster sponsorship is chosen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "camelCase")]
pub enum ValidityPolicy {
    /// Same window for every sponsorship
    Fixed(ValidityWindow),
    /// Window starting when the user operation is filled and lasting `valid_for` seconds
    #[serde(rename_all = "camelCase")]
    FromNow { valid_for: u64 },
}

impl Default for ValidityPolicy {
    fn default() -> Self {
        Self::Fixed(ValidityWindow::default())
    }
}

impl ValidityPolicy {
    /// Validity window of a sponsorship requested at `now` (unix timestamp in seconds)
    pub fn resolve(&self, now: u64) -> ValidityWindow {
        match self {
            Self::Fixed(window) => *window,
            Self::FromNow { valid_for } => ValidityWindow::starting_at(now, *valid_for),
        }
    }
}

/// Verifying paymaster sponsoring the user operations
#[derive(Clone, Debug)]
pub struct PaymasterConfig {
    pub address: Address,
    /// Off-chain signers trusted by the paymaster, used in turns
    pub signers: SignerRotator,
    pub validity: ValidityPolicy,
    /// Overrides the paymaster verification gas limit of the user operation
    pub verification_gas_limit: Option<U256>,
    /// Overrides the paymaster post-op gas limit of the user operation
    pub post_op_gas_limit: Option<U256>,
}

impl PaymasterConfig {
    pub fn new(address: Address, signers: impl IntoIterator<Item = LocalWallet>) -> Self {
        Self {
            address,
            signers: signers.into_iter().collect(),
            validity: ValidityPolicy::default(),
            verification_gas_limit: None,
            post_op_gas_limit: None,
        }
    }

    pub fn validity(mut self, validity: ValidityPolicy) -> Self {
        self.validity = validity;
        self
    }

    pub fn verification_gas_limit(mut self, gas: U256) -> Self {
        self.verification_gas_limit = Some(gas);
        self
    }

    pub fn post_op_gas_limit(mut self, gas: U256) -> Self {
        self.post_op_gas_limit = Some(gas);
        self
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Ethereum execution client
    pub node_url: String,
    pub bundler_url: String,
    /// Interval between two receipt queries while waiting for a user operation
    pub poll_interval: Duration,
    /// How long to wait for the receipt of a user operation
    pub wait_timeout: Duration,
    pub entry_point: Address,
    pub account_factory: Address,
    pub paymaster: Option<PaymasterConfig>,
    /// Signer of direct `handleOps` transactions and their beneficiary
    pub executor: Option<LocalWallet>,
}

impl Config {
    pub fn new(
        node_url: impl Into<String>,
        bundler_url: impl Into<String>,
        entry_point: Address,
        account_factory: Address,
    ) -> Self {
        Self {
            node_url: node_url.into(),
            bundler_url: bundler_url.into(),
            poll_interval: Duration::from_millis(WAIT_RECEIPT_INTERVAL_MS),
            wait_timeout: Duration::from_secs(WAIT_RECEIPT_TIMEOUT_SECS),
            entry_point,
            account_factory,
            paymaster: None,
            executor: None,
        }
    }

    pub fn paymaster(mut self, paymaster: PaymasterConfig) -> Self {
        self.paymaster = Some(paymaster);
        self
    }

    pub fn executor(mut self, executor: LocalWallet) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }
}

/// Paymaster section of [ConfigFile]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterFile {
    pub address: Address,
    #[serde(default)]
    pub validity: ValidityPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_op_gas_limit: Option<U256>,
}

fn default_poll_interval_ms() -> u64 {
    WAIT_RECEIPT_INTERVAL_MS
}

fn default_wait_timeout_ms() -> u64 {
    WAIT_RECEIPT_TIMEOUT_SECS * 1000
}

/// Non-secret part of [Config] as stored in a JSON file
///
/// Private keys are never read from this file; they are passed to [ConfigFile::into_config].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub node_url: String,
    pub bundler_url: String,
    pub entry_point: Address,
    pub account_factory: Address,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<PaymasterFile>,
}

impl ConfigFile {
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        serde_json::from_str(json).map_err(|err| ClientError::Config { inner: err.to_string() })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|err| ClientError::Config {
            inner: format!("{}: {err}", path.display()),
        })?;
        Self::from_json(&json)
    }

    /// Builds the [Config] with the given hex-encoded private keys
    ///
    /// # Arguments
    /// * `paymaster_keys` - Signers of the paymaster, ignored without a paymaster section
    /// * `executor_key` - Signer of direct `handleOps` transactions
    pub fn into_config<'a>(
        self,
        paymaster_keys: impl IntoIterator<Item = &'a str>,
        executor_key: Option<&str>,
    ) -> Result<Config, ClientError> {
        if self.poll_interval_ms == 0 {
            return Err(ClientError::Config { inner: "pollIntervalMs must be positive".into() });
        }

        let mut config = Config::new(
            self.node_url,
            self.bundler_url,
            self.entry_point,
            self.account_factory,
        )
        .poll_interval(Duration::from_millis(self.poll_interval_ms))
        .wait_timeout(Duration::from_millis(self.wait_timeout_ms));

        if let Some(paymaster) = self.paymaster {
            let signers = paymaster_keys
                .into_iter()
                .map(parse_wallet)
                .collect::<Result<Vec<_>, _>>()?;
            config.paymaster = Some(PaymasterConfig {
                address: paymaster.address,
                signers: RoundRobinRotator::new(signers),
                validity: paymaster.validity,
                verification_gas_limit: paymaster.verification_gas_limit,
                post_op_gas_limit: paymaster.post_op_gas_limit,
            });
        }

        if let Some(key) = executor_key {
            config.executor = Some(parse_wallet(key)?);
        }

        Ok(config)
    }
}

/// Parses a hex-encoded private key
pub fn parse_wallet(key: &str) -> Result<LocalWallet, ClientError> {
    LocalWallet::from_str(key.trim_start_matches("0x"))
        .map_err(|_| ClientError::Config { inner: "invalid private key".into() })
}
