use aa_sdk_bundler::BundlerError;
use aa_sdk_contracts::ContractCallError;
use aa_sdk_primitives::UserOperationError;
use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// User operation has no sender
    #[error("sender address is empty")]
    EmptySender,

    /// Paymaster is configured but none of its signers is
    #[error("no paymaster signer available")]
    NoPaymasterSigner,

    /// Ethereum node error
    #[error("provider error in {function}: {inner}")]
    Provider {
        /// The provider call that failed
        function: &'static str,
        /// The inner error message
        inner: String,
    },

    /// Invalid configuration
    #[error("config error: {inner}")]
    Config {
        /// The inner error message
        inner: String,
    },

    /// Contract call error
    #[error(transparent)]
    Contract(#[from] ContractCallError),

    /// Bundler error
    #[error(transparent)]
    Bundler(#[from] BundlerError),

    /// Encoding or signing error
    #[error(transparent)]
    UserOperation(#[from] UserOperationError),
}
