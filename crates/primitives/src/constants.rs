//! Account abstraction (ERC-4337)-related constants

/// Entry point smart contract
pub mod entry_point {
    /// Address of the canonical entry point smart contract
    pub const ADDRESS: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";
    /// Version of the entry point smart contract
    pub const VERSION: &str = "0.7.0";
}

/// Defaults used when building a new user operation
pub mod user_operation {
    pub const CALL_GAS_LIMIT: u64 = 2_000_000;
    pub const VERIFICATION_GAS_LIMIT: u64 = 200_000;
    pub const PRE_VERIFICATION_GAS: u64 = 20_000;
    pub const MAX_FEE_PER_GAS: u64 = 25_000_000_000;
    pub const MAX_PRIORITY_FEE_PER_GAS: u64 = 1_000_000;
    pub const PAYMASTER_VERIFICATION_GAS_LIMIT: u64 = 300_000;
    pub const PAYMASTER_POST_OP_GAS_LIMIT: u64 = 100;
}

/// Verifying paymaster layout of `paymasterAndData`
pub mod paymaster {
    /// Offset of the paymaster verification gas limit (right after the paymaster address)
    pub const VALIDATION_GAS_OFFSET: usize = 20;
    /// Offset of the paymaster post-op gas limit
    pub const POST_OP_GAS_OFFSET: usize = 36;
    /// Offset of the paymaster-specific data
    pub const DATA_OFFSET: usize = 52;
    /// Length of an ECDSA signature (r, s, v)
    pub const SIGNATURE_LENGTH: usize = 65;
    /// Largest value representable by the `uint48` validity bounds
    pub const MAX_UINT48: u64 = (1 << 48) - 1;
    /// Default `validUntil`, far enough in the future to never expire in practice
    pub const DEFAULT_VALID_UNTIL: u64 = i32::MAX as u64;
    /// Default `validAfter`
    pub const DEFAULT_VALID_AFTER: u64 = 0;
}

/// Bundler JSON-RPC client
pub mod bundler {
    /// JSON-RPC protocol version
    pub const JSONRPC_VERSION: &str = "2.0";
    /// Default interval between two receipt queries (in milliseconds)
    pub const WAIT_RECEIPT_INTERVAL_MS: u64 = 2_000;
    /// Shortest interval between two receipt queries (in milliseconds)
    pub const MIN_WAIT_RECEIPT_INTERVAL_MS: u64 = 1;
    /// Default deadline when waiting for a receipt (in seconds)
    pub const WAIT_RECEIPT_TIMEOUT_SECS: u64 = 30;
}
