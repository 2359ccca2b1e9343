use crate::constants::paymaster::DATA_OFFSET;
use thiserror::Error;

/// Errors raised while encoding, hashing or signing user operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserOperationError {
    /// `paymasterAndData` does not contain the fixed paymaster prefix
    #[error("paymasterAndData is {len} bytes long, expected at least {} bytes", DATA_OFFSET)]
    PaymasterAndDataTooShort {
        /// Actual length of `paymasterAndData`
        len: usize,
    },

    /// Value does not fit into the ABI type it is encoded as
    #[error("{name} value {value} does not fit into uint{bits}")]
    ValueOutOfRange {
        /// Name of the encoded field
        name: &'static str,
        /// Rejected value
        value: u64,
        /// Width of the ABI type
        bits: usize,
    },

    /// Underlying signing primitive failed
    #[error("signing error: {inner}")]
    Signing {
        /// The inner error message
        inner: String,
    },
}
