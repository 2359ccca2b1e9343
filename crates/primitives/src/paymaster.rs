//! Verifying paymaster codec
//!
//! A verifying paymaster sponsors a user operation if `paymasterData` carries its validity window
//! and a signature of a trusted off-chain signer over [paymaster_hash].

use crate::{
    constants::paymaster::{
        DATA_OFFSET, DEFAULT_VALID_AFTER, DEFAULT_VALID_UNTIL, MAX_UINT48, SIGNATURE_LENGTH,
        VALIDATION_GAS_OFFSET,
    },
    get_address, PackedUserOperation, UserOperationError,
};
use ethers::{
    abi::{encode, Token},
    types::{Bytes, H256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};

/// Placeholder signature used while the real paymaster signature is not known yet
pub const EMPTY_SIGNATURE: [u8; SIGNATURE_LENGTH] = [0u8; SIGNATURE_LENGTH];

/// Time window (unix timestamps in seconds) in which a sponsorship is valid
///
/// `valid_until == 0` means the sponsorship never expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    pub valid_until: u64,
    pub valid_after: u64,
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self { valid_until: DEFAULT_VALID_UNTIL, valid_after: DEFAULT_VALID_AFTER }
    }
}

impl ValidityWindow {
    pub fn new(valid_until: u64, valid_after: u64) -> Self {
        Self { valid_until, valid_after }
    }

    /// Window without an upper bound
    pub fn unbounded() -> Self {
        Self { valid_until: 0, valid_after: 0 }
    }

    /// Window starting at `now` and lasting `valid_for` seconds
    pub fn starting_at(now: u64, valid_for: u64) -> Self {
        Self { valid_until: now.saturating_add(valid_for), valid_after: now }
    }

    /// Checks that both bounds fit into `uint48`
    pub fn check(&self) -> Result<(), UserOperationError> {
        for (name, value) in [("validUntil", self.valid_until), ("validAfter", self.valid_after)] {
            if value > MAX_UINT48 {
                return Err(UserOperationError::ValueOutOfRange { name, value, bits: 48 });
            }
        }
        Ok(())
    }

    fn tokens(&self) -> [Token; 2] {
        [Token::Uint(self.valid_until.into()), Token::Uint(self.valid_after.into())]
    }
}

/// Calculates the hash the paymaster signer has to sign in order to sponsor the user operation
///
/// `paymasterAndData` must already contain the paymaster address and both gas limits.
pub fn paymaster_hash(
    uo: &PackedUserOperation,
    chain_id: u64,
    validity: &ValidityWindow,
) -> Result<H256, UserOperationError> {
    let paymaster = match get_address(&uo.paymaster_and_data) {
        Some(paymaster) if uo.paymaster_and_data.len() >= DATA_OFFSET => paymaster,
        _ => {
            return Err(UserOperationError::PaymasterAndDataTooShort {
                len: uo.paymaster_and_data.len(),
            })
        }
    };
    validity.check()?;

    // the verifying paymaster reads both gas limits as one word
    let paymaster_gas =
        U256::from_big_endian(&uo.paymaster_and_data[VALIDATION_GAS_OFFSET..DATA_OFFSET]);

    let [valid_until, valid_after] = validity.tokens();
    let encoded = encode(&[
        Token::Address(uo.sender),
        Token::Uint(uo.nonce),
        Token::FixedBytes(keccak256(&uo.init_code).to_vec()),
        Token::FixedBytes(keccak256(&uo.call_data).to_vec()),
        Token::FixedBytes(uo.account_gas_limits.as_bytes().to_vec()),
        Token::Uint(paymaster_gas),
        Token::Uint(uo.pre_verification_gas),
        Token::FixedBytes(uo.gas_fees.as_bytes().to_vec()),
        Token::Uint(chain_id.into()),
        Token::Address(paymaster),
        valid_until,
        valid_after,
    ]);

    Ok(keccak256(encoded).into())
}

/// Encodes `paymasterData`: `abi.encode(uint48 validUntil, uint48 validAfter) ++ signature`
pub fn encode_paymaster_data(
    validity: &ValidityWindow,
    signature: &[u8],
) -> Result<Bytes, UserOperationError> {
    validity.check()?;
    Ok([encode(&validity.tokens()), signature.to_vec()].concat().into())
}

/// Splits `paymasterData` into the validity window and the signature
pub fn decode_paymaster_data(data: &[u8]) -> Option<(ValidityWindow, Bytes)> {
    if data.len() < 64 {
        return None;
    }
    let bound = |word: &[u8]| {
        let value = U256::from_big_endian(word);
        (value <= U256::from(MAX_UINT48)).then(|| value.as_u64())
    };
    Some((
        ValidityWindow { valid_until: bound(&data[..32])?, valid_after: bound(&data[32..64])? },
        Bytes::from(data[64..].to_vec()),
    ))
}
