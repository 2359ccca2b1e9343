//! Message and user operation signing

use crate::{PackedUserOperation, UserOperationError, UserOperationHash};
use ethers::{
    signers::Signer,
    types::{Address, Bytes, Signature},
};

/// Signs `message` as an Ethereum signed message (EIP-191)
///
/// The recovery id of the returned signature is 27 or 28.
pub async fn sign_message<S: Signer>(
    signer: &S,
    message: &[u8],
) -> Result<Signature, UserOperationError> {
    signer
        .sign_message(message)
        .await
        .map_err(|err| UserOperationError::Signing { inner: err.to_string() })
}

/// Signs the hash of the packed user operation
///
/// # Returns
/// * `(Bytes, UserOperationHash)` - The 65-byte signature (r, s, v) and the signed hash
pub async fn sign_user_operation<S: Signer>(
    uo: &PackedUserOperation,
    entry_point: &Address,
    chain_id: u64,
    signer: &S,
) -> Result<(Bytes, UserOperationHash), UserOperationError> {
    let hash = uo.hash(entry_point, chain_id);
    let signature = sign_message(signer, hash.as_bytes()).await?;
    Ok((signature.to_vec().into(), hash))
}
