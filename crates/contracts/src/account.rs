//! Simple account factory and simple account

pub use super::gen::{
    simple_account_api::{ExecuteBatchCall, ExecuteCall, SimpleAccountAPI},
    simple_account_factory_api::{CreateAccountCall, SimpleAccountFactoryAPI},
};
use crate::error::ContractCallError;
use ethers::{
    abi::AbiEncode,
    providers::Middleware,
    types::{Address, Bytes, TransactionReceipt, U256},
};
use std::sync::Arc;
use tracing::trace;

/// Simple account factory contract
#[derive(Clone)]
pub struct AccountFactory<M: Middleware + 'static> {
    address: Address,
    factory_api: SimpleAccountFactoryAPI<M>,
}

impl<M: Middleware + 'static> AccountFactory<M> {
    pub fn new(eth_client: Arc<M>, address: Address) -> Self {
        Self { address, factory_api: SimpleAccountFactoryAPI::new(address, eth_client) }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Counterfactual address of the account owned by `owner`
    pub async fn get_address(&self, owner: Address, salt: U256) -> Result<Address, ContractCallError> {
        self.factory_api
            .get_address(owner, salt)
            .call()
            .await
            .map_err(|err| ContractCallError::from_contract_error("getAddress", err))
    }

    /// Deploys the account owned by `owner` and waits for the transaction to be mined
    pub async fn create_account(
        &self,
        owner: Address,
        salt: U256,
    ) -> Result<TransactionReceipt, ContractCallError> {
        let call = self.factory_api.create_account(owner, salt);
        let tx = call
            .send()
            .await
            .map_err(|err| ContractCallError::from_contract_error("createAccount", err))?;
        trace!("createAccount transaction sent: {:?}", tx.tx_hash());
        tx.await
            .map_err(|err| ContractCallError::from_provider_error("createAccount", &err))?
            .ok_or(ContractCallError::Dropped { function: "createAccount" })
    }
}

/// Factory call data deploying the account owned by `owner`
pub fn create_account_call_data(owner: Address, salt: U256) -> Bytes {
    CreateAccountCall { owner, salt }.encode().into()
}

/// Account call data executing a single call
pub fn execute_call_data(dest: Address, value: U256, func: Bytes) -> Bytes {
    ExecuteCall { dest, value, func }.encode().into()
}

/// Account call data transferring `values[i]` to `dests[i]`
///
/// # Panics
/// If `dests` and `values` differ in length.
pub fn execute_batch_call_data(dests: Vec<Address>, values: Vec<U256>) -> Bytes {
    assert_eq!(
        dests.len(),
        values.len(),
        "dest and value length mismatch: {} != {}",
        dests.len(),
        values.len()
    );
    let func = vec![Bytes::default(); dests.len()];
    ExecuteBatchCall { dest: dests, value: values, func }.encode().into()
}
