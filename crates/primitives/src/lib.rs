//! Account abstraction (ERC-4337) primitive types
//!
//! This crate contains the user operation types for entry point v0.7, the canonical packing and
//! hashing rules, the verifying paymaster codec, message signing and the signer rotator.

pub mod constants;
mod error;
pub mod paymaster;
pub mod rotator;
mod signer;
mod user_operation;
pub mod utils;

pub use error::UserOperationError;
pub use paymaster::ValidityWindow;
pub use rotator::{RoundRobinRotator, Rotator, SignerRotator};
pub use signer::{sign_message, sign_user_operation};
pub use user_operation::{
    PackedUserOperation, UserOperation, UserOperationGasEstimation, UserOperationHash,
    UserOperationReceipt, UserOperationRequest, UserOperationTransactionReceipt,
};
pub use utils::get_address;
