//! Client of the ERC-4337 bundler JSON-RPC API

mod client;
mod error;
pub mod jsonrpc;

pub use client::{Bundler, BundlerClient};
pub use error::BundlerError;
pub use jsonrpc::RpcErrorObject;
