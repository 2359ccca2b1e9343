use crate::gen::entry_point_api::{EntryPointAPIErrors, FailedOp};
use ethers::{
    abi::AbiDecode,
    prelude::ContractError,
    providers::{JsonRpcError, Middleware, MiddlewareError, ProviderError},
    types::Bytes,
};
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

/// Errors of calls to the entry point, the account factory and the account
#[derive(Debug, Error, Clone)]
pub enum ContractCallError {
    /// Entry point rejected a user operation
    #[error("{function}: {op}")]
    FailedOp {
        /// Called function
        function: &'static str,
        /// Decoded revert
        op: FailedOp,
    },

    /// execution reverted
    #[error("{function}: execution reverted: {reason}")]
    ExecutionReverted {
        /// Called function
        function: &'static str,
        /// Revert reason
        reason: String,
    },

    /// Provider error
    #[error("{function}: provider error: {inner}")]
    Provider {
        /// Called function
        function: &'static str,
        /// The inner error message
        inner: String,
    },

    /// ABI error
    #[error("{function}: abi error: {inner}")]
    ABI {
        /// Called function
        function: &'static str,
        /// The inner error message
        inner: String,
    },

    /// Data decoding error
    #[error("{function}: decode error: {inner}")]
    Decode {
        /// Called function
        function: &'static str,
        /// The inner error message
        inner: String,
    },

    /// Transaction was sent but never mined
    #[error("{function}: transaction dropped")]
    Dropped {
        /// Called function
        function: &'static str,
    },
}

impl ContractCallError {
    /// Function whose call failed
    pub fn function(&self) -> &'static str {
        match *self {
            Self::FailedOp { function, .. } |
            Self::ExecutionReverted { function, .. } |
            Self::Provider { function, .. } |
            Self::ABI { function, .. } |
            Self::Decode { function, .. } |
            Self::Dropped { function } => function,
        }
    }

    pub fn from_contract_error<M: Middleware>(function: &'static str, err: ContractError<M>) -> Self {
        match err {
            ContractError::DecodingError(e) => Self::Decode { function, inner: e.to_string() },
            ContractError::AbiError(e) => Self::ABI { function, inner: e.to_string() },
            ContractError::MiddlewareError { e } => Self::from_middleware_error::<M>(function, e),
            ContractError::ProviderError { e } => Self::from_provider_error(function, &e),
            ContractError::Revert(data) => Self::from_revert_data(function, data),
            _ => Self::Provider { function, inner: err.to_string() },
        }
    }

    pub fn from_provider_error(function: &'static str, err: &ProviderError) -> Self {
        match err {
            ProviderError::JsonRpcClientError(e) => match e.as_error_response() {
                Some(rpc_err) => Self::from_json_rpc_error(function, rpc_err),
                None => Self::Provider {
                    function,
                    inner: format!("unknown json-rpc client error: {e:?}"),
                },
            },
            ProviderError::HTTPError(e) => {
                Self::Provider { function, inner: format!("HTTP error: {e:?}") }
            }
            _ => Self::Provider { function, inner: format!("unknown provider error: {err:?}") },
        }
    }

    pub fn from_middleware_error<M: Middleware>(function: &'static str, err: M::Error) -> Self {
        if let Some(rpc_err) = err.as_error_response() {
            return Self::from_json_rpc_error(function, rpc_err);
        }

        if let Some(provider_err) = err.as_provider_error() {
            return Self::from_provider_error(function, provider_err);
        }

        Self::Provider { function, inner: format!("middleware error: {err:?}") }
    }

    /// Nodes return the revert data either as a hex string or embedded into a message
    pub fn from_json_rpc_error(function: &'static str, err: &JsonRpcError) -> Self {
        let data = match err.data {
            Some(serde_json::Value::String(ref data)) => data,
            Some(ref other) => {
                return Self::Decode {
                    function,
                    inner: format!("json-rpc return data is not a string: {other:?}"),
                }
            }
            None => return Self::Provider { function, inner: err.message.clone() },
        };

        let hex = Regex::new(r"0x[0-9a-fA-F]+").ok().and_then(|re| re.find(data));
        match hex.map(|hex| Bytes::from_str(hex.as_str())) {
            Some(Ok(bytes)) => Self::from_revert_data(function, bytes),
            Some(Err(e)) => Self::Decode {
                function,
                inner: format!("string {data:?} could not be converted to bytes: {e:?}"),
            },
            None => Self::Decode { function, inner: format!("hex string not found in {data:?}") },
        }
    }

    pub fn from_revert_data(function: &'static str, data: Bytes) -> Self {
        match EntryPointAPIErrors::decode(data.as_ref()) {
            Ok(EntryPointAPIErrors::FailedOp(op)) => Self::FailedOp { function, op },
            Ok(EntryPointAPIErrors::FailedOpWithRevert(op)) => Self::FailedOp {
                function,
                op: FailedOp { op_index: op.op_index, reason: op.reason },
            },
            Ok(EntryPointAPIErrors::RevertString(reason)) => {
                Self::ExecutionReverted { function, reason }
            }
            Err(e) => match decode_revert_string(&data) {
                Some(reason) => Self::ExecutionReverted { function, reason },
                None => Self::Decode {
                    function,
                    inner: format!("revert data {data} can't be decoded: {e:?}"),
                },
            },
        }
    }
}

// ethers-rs could not handle `require (true, "reason")` or `revert("test failed")` well in this
// case revert with `require` error would ends up with error event signature `0x08c379a0`
// we need to handle it manually
pub fn decode_revert_string(data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (error_sig, reason) = data.split_at(4);
    if error_sig == [0x08, 0xc3, 0x79, 0xa0] {
        <String as AbiDecode>::decode(reason).ok()
    } else {
        None
    }
}
