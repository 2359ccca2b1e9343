//! Account abstraction (ERC-4337) client
//!
//! [Client] fills, signs and sponsors user operations of simple accounts and submits them either
//! to a bundler or directly to the entry point.

pub mod cache;
mod client;
pub mod config;
mod error;

pub use aa_sdk_contracts::{create_account_call_data, execute_batch_call_data, execute_call_data};
pub use cache::{AccountKey, AddressCache, LruAddressCache};
pub use client::Client;
pub use config::{Config, ConfigFile, PaymasterConfig, ValidityPolicy};
pub use error::ClientError;

pub use aa_sdk_bundler as bundler;
pub use aa_sdk_contracts as contracts;
pub use aa_sdk_primitives as primitives;
