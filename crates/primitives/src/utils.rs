//! ABI packing helpers
//!
//! Entry point v0.7 squeezes pairs of gas values into single 32-byte words and prefixes
//! `paymasterAndData`/`initCode` with the address of the entity they belong to. These helpers
//! produce (and take apart) that layout.

use crate::constants::paymaster::{DATA_OFFSET, VALIDATION_GAS_OFFSET};
use ethers::types::{Address, Bytes, U256};

/// If possible, parses address from the first 20 bytes
pub fn get_address(buf: &[u8]) -> Option<Address> {
    if buf.len() >= 20 {
        Some(Address::from_slice(&buf[0..20]))
    } else {
        None
    }
}

/// Left-pads `value` to 16 big-endian bytes.
///
/// # Panics
/// If `value` does not fit into 128 bits. Gas values wider than that cannot be represented by the
/// entry point and indicate a bug in the caller.
pub fn to_uint128_bytes(value: U256) -> [u8; 16] {
    assert!(value.bits() <= 128, "value {value} does not fit into 128 bits");
    value.low_u128().to_be_bytes()
}

/// Packs two uint128 into one 32-byte word, `a` in the high-order half
pub fn pack_uint128(a: U256, b: U256) -> [u8; 32] {
    let mut res = [0u8; 32];
    res[..16].copy_from_slice(&to_uint128_bytes(a));
    res[16..].copy_from_slice(&to_uint128_bytes(b));
    res
}

/// Unpacks two uint128 from bytes
pub fn unpack_uint128(buf: &[u8]) -> (U256, U256) {
    (U256::from_big_endian(&buf[0..16]), U256::from_big_endian(&buf[16..32]))
}

/// Builds `paymasterAndData`: paymaster (20 bytes) | verification gas limit (16 bytes) | post-op
/// gas limit (16 bytes) | paymaster data
pub fn pack_paymaster_and_data(
    paymaster: Address,
    paymaster_verification_gas_limit: U256,
    paymaster_post_op_gas_limit: U256,
    paymaster_data: &[u8],
) -> Bytes {
    let mut buf = Vec::with_capacity(DATA_OFFSET + paymaster_data.len());
    buf.extend_from_slice(paymaster.as_bytes());
    buf.extend_from_slice(&pack_uint128(
        paymaster_verification_gas_limit,
        paymaster_post_op_gas_limit,
    ));
    buf.extend_from_slice(paymaster_data);
    buf.into()
}

/// Splits `paymasterAndData` into paymaster, verification gas limit, post-op gas limit and data
pub fn unpack_paymaster_and_data(buf: &[u8]) -> Option<(Address, U256, U256, Bytes)> {
    if buf.len() < DATA_OFFSET {
        return None;
    }
    let (paymaster_verification_gas_limit, paymaster_post_op_gas_limit) =
        unpack_uint128(&buf[VALIDATION_GAS_OFFSET..DATA_OFFSET]);
    Some((
        Address::from_slice(&buf[..VALIDATION_GAS_OFFSET]),
        paymaster_verification_gas_limit,
        paymaster_post_op_gas_limit,
        Bytes::from(buf[DATA_OFFSET..].to_vec()),
    ))
}

/// Builds `initCode` from the factory and its call data (empty without a factory)
pub fn pack_factory_data(factory: Address, factory_data: &[u8]) -> Bytes {
    if factory.is_zero() {
        Bytes::default()
    } else {
        [factory.as_bytes(), factory_data].concat().into()
    }
}

/// Splits `initCode` into the factory and its call data
pub fn unpack_factory_data(init_code: &[u8]) -> Option<(Address, Bytes)> {
    get_address(init_code).map(|factory| (factory, Bytes::from(init_code[20..].to_vec())))
}
