//! Packed user operation (the form consumed by the entry point v0.7)

use super::UserOperationHash;
use crate::utils::unpack_uint128;
use ethers::{
    abi::AbiEncode,
    contract::{EthAbiCodec, EthAbiType},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};

/// Packed user operation
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedUserOperation {
    /// Sender of the user operation
    pub sender: Address,

    /// Nonce (anti replay protection)
    pub nonce: U256,

    /// Factory address followed by the factory call data (empty if the account is deployed)
    pub init_code: Bytes,

    /// The data that is passed to the sender during the main execution call
    pub call_data: Bytes,

    /// Verification gas limit (high 16 bytes) and call gas limit (low 16 bytes)
    pub account_gas_limits: H256,

    /// The amount of gas to pay bundler to compensate for the pre-verification execution and
    /// calldata
    pub pre_verification_gas: U256,

    /// Max priority fee per gas (high 16 bytes) and max fee per gas (low 16 bytes)
    pub gas_fees: H256,

    /// Paymaster address, its two gas limits and paymaster-specific data (can be empty)
    pub paymaster_and_data: Bytes,

    /// Data passed to the account along with the nonce during the verification step
    pub signature: Bytes,
}

/// Packed user operation without signature, dynamic fields replaced by their hashes (helper for
/// hashing)
#[derive(EthAbiCodec, EthAbiType)]
struct PackedUserOperationNoSignature {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: H256,
    pub call_data: H256,
    pub account_gas_limits: H256,
    pub pre_verification_gas: U256,
    pub gas_fees: H256,
    pub paymaster_and_data: H256,
}

impl From<&PackedUserOperation> for PackedUserOperationNoSignature {
    fn from(value: &PackedUserOperation) -> Self {
        Self {
            sender: value.sender,
            nonce: value.nonce,
            init_code: keccak256(&value.init_code).into(),
            call_data: keccak256(&value.call_data).into(),
            account_gas_limits: value.account_gas_limits,
            pre_verification_gas: value.pre_verification_gas,
            gas_fees: value.gas_fees,
            paymaster_and_data: keccak256(&value.paymaster_and_data).into(),
        }
    }
}

impl PackedUserOperation {
    /// ABI-encodes the user operation without signature (used for calculating the hash)
    pub fn pack_without_signature(&self) -> Bytes {
        PackedUserOperationNoSignature::from(self).encode().into()
    }

    /// Hash of the user operation not bound to an entry point or chain
    pub fn inner_hash(&self) -> H256 {
        keccak256(self.pack_without_signature()).into()
    }

    /// Calculates the hash of the user operation.
    ///
    /// `keccak256(abi.encode(inner_hash, entry_point, chain_id))`
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> UserOperationHash {
        keccak256(
            [
                self.inner_hash().as_bytes().to_vec(),
                entry_point.encode(),
                U256::from(chain_id).encode(),
            ]
            .concat(),
        )
        .into()
    }

    /// Verification gas limit and call gas limit
    pub fn account_gas_limits(&self) -> (U256, U256) {
        unpack_uint128(self.account_gas_limits.as_bytes())
    }

    /// Max priority fee per gas and max fee per gas
    pub fn gas_fees(&self) -> (U256, U256) {
        unpack_uint128(self.gas_fees.as_bytes())
    }
}
