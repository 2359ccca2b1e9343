use crate::jsonrpc::RpcErrorObject;
use aa_sdk_primitives::UserOperationHash;
use thiserror::Error;

/// Bundler client errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BundlerError {
    /// Request could not be sent or the response could not be read
    #[error("{method}: transport error: {inner}")]
    Transport {
        /// JSON-RPC method
        method: &'static str,
        /// The inner error message
        inner: String,
    },

    /// Response is not a valid JSON-RPC response
    #[error("{method}: decode error: {inner}")]
    Decode {
        /// JSON-RPC method
        method: &'static str,
        /// The inner error message
        inner: String,
    },

    /// Bundler returned an error object
    #[error("{method}: error from bundler: {error}")]
    Rpc {
        /// JSON-RPC method
        method: &'static str,
        /// Error returned by the bundler
        error: RpcErrorObject,
    },

    /// Response carries neither a result nor an error
    #[error("{method}: empty result")]
    EmptyResult {
        /// JSON-RPC method
        method: &'static str,
    },

    /// No receipt was returned before the deadline
    #[error("no receipt found for user operation {hash}")]
    ReceiptNotFound {
        /// Hash of the user operation
        hash: UserOperationHash,
    },

    /// Waiting for the receipt was cancelled
    #[error("waiting for user operation {hash} was cancelled")]
    Cancelled {
        /// Hash of the user operation
        hash: UserOperationHash,
    },
}
