pub use super::gen::entry_point_api::{
    EntryPointAPI, PackedUserOperation as PackedUserOperationAbi,
};
use crate::error::ContractCallError;
use aa_sdk_primitives::{PackedUserOperation, UserOperationHash};
use ethers::{
    providers::Middleware,
    types::{Address, TransactionReceipt, H256, U256},
};
use std::sync::Arc;
use tracing::trace;

impl From<PackedUserOperation> for PackedUserOperationAbi {
    fn from(uo: PackedUserOperation) -> Self {
        Self {
            sender: uo.sender,
            nonce: uo.nonce,
            init_code: uo.init_code,
            call_data: uo.call_data,
            account_gas_limits: uo.account_gas_limits.into(),
            pre_verification_gas: uo.pre_verification_gas,
            gas_fees: uo.gas_fees.into(),
            paymaster_and_data: uo.paymaster_and_data,
            signature: uo.signature,
        }
    }
}

impl From<PackedUserOperationAbi> for PackedUserOperation {
    fn from(uo: PackedUserOperationAbi) -> Self {
        Self {
            sender: uo.sender,
            nonce: uo.nonce,
            init_code: uo.init_code,
            call_data: uo.call_data,
            account_gas_limits: uo.account_gas_limits.into(),
            pre_verification_gas: uo.pre_verification_gas,
            gas_fees: uo.gas_fees.into(),
            paymaster_and_data: uo.paymaster_and_data,
            signature: uo.signature,
        }
    }
}

/// Entry point v0.7 contract
#[derive(Clone)]
pub struct EntryPoint<M: Middleware + 'static> {
    eth_client: Arc<M>,
    address: Address,
    entry_point_api: EntryPointAPI<M>,
}

impl<M: Middleware + 'static> EntryPoint<M> {
    pub fn new(eth_client: Arc<M>, address: Address) -> Self {
        let entry_point_api = EntryPointAPI::new(address, eth_client.clone());
        Self { eth_client, address, entry_point_api }
    }

    pub fn entry_point_api(&self) -> &EntryPointAPI<M> {
        &self.entry_point_api
    }

    pub fn eth_client(&self) -> Arc<M> {
        self.eth_client.clone()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Nonce of the `sender` in the nonce sequence `key`
    pub async fn get_nonce(&self, sender: &Address, key: U256) -> Result<U256, ContractCallError> {
        self.entry_point_api
            .get_nonce(*sender, key)
            .call()
            .await
            .map_err(|err| ContractCallError::from_contract_error("getNonce", err))
    }

    /// Deposit of the `account` in the entry point
    pub async fn balance_of(&self, account: &Address) -> Result<U256, ContractCallError> {
        self.entry_point_api
            .balance_of(*account)
            .call()
            .await
            .map_err(|err| ContractCallError::from_contract_error("balanceOf", err))
    }

    /// Hash of the user operation as calculated by the contract
    pub async fn get_user_op_hash(
        &self,
        uo: PackedUserOperation,
    ) -> Result<UserOperationHash, ContractCallError> {
        self.entry_point_api
            .get_user_op_hash(uo.into())
            .call()
            .await
            .map(UserOperationHash::from)
            .map_err(|err| ContractCallError::from_contract_error("getUserOpHash", err))
    }

    /// Sends `handleOps` and returns the transaction hash without waiting for it to be mined
    pub async fn handle_ops(
        &self,
        uos: Vec<PackedUserOperation>,
        beneficiary: Address,
    ) -> Result<H256, ContractCallError> {
        let call = self
            .entry_point_api
            .handle_ops(uos.into_iter().map(Into::into).collect(), beneficiary);
        let tx = call
            .send()
            .await
            .map_err(|err| ContractCallError::from_contract_error("handleOps", err))?;
        trace!("handleOps transaction sent: {:?}", tx.tx_hash());
        Ok(tx.tx_hash())
    }

    /// Sends `handleAtomicOps` and returns the transaction hash without waiting for it to be mined
    pub async fn handle_atomic_ops(
        &self,
        uos: Vec<PackedUserOperation>,
        beneficiary: Address,
    ) -> Result<H256, ContractCallError> {
        let call = self
            .entry_point_api
            .handle_atomic_ops(uos.into_iter().map(Into::into).collect(), beneficiary);
        let tx = call
            .send()
            .await
            .map_err(|err| ContractCallError::from_contract_error("handleAtomicOps", err))?;
        trace!("handleAtomicOps transaction sent: {:?}", tx.tx_hash());
        Ok(tx.tx_hash())
    }

    /// Deposits `amount` for the `account` and waits for the transaction to be mined
    pub async fn deposit_to(
        &self,
        account: Address,
        amount: U256,
    ) -> Result<TransactionReceipt, ContractCallError> {
        let call = self.entry_point_api.deposit_to(account).value(amount);
        let tx = call
            .send()
            .await
            .map_err(|err| ContractCallError::from_contract_error("depositTo", err))?;
        trace!("depositTo transaction sent: {:?}", tx.tx_hash());
        tx.await
            .map_err(|err| ContractCallError::from_provider_error("depositTo", &err))?
            .ok_or(ContractCallError::Dropped { function: "depositTo" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{
        abi::AbiEncode,
        providers::{MockProvider, Provider},
    };

    fn entry_point(provider: Provider<MockProvider>) -> EntryPoint<Provider<MockProvider>> {
        EntryPoint::new(
            Arc::new(provider),
            "0x0000000071727De22E5E9d8BAf0edAc6f37da032".parse().unwrap(),
        )
    }

    #[test]
    fn packed_user_operation_abi_conversion() {
        let uo = PackedUserOperation {
            sender: Address::random(),
            nonce: 3.into(),
            init_code: vec![1, 2, 3].into(),
            call_data: vec![4, 5].into(),
            account_gas_limits: H256::random(),
            pre_verification_gas: 21_000.into(),
            gas_fees: H256::random(),
            paymaster_and_data: vec![6; 52].into(),
            signature: vec![7; 65].into(),
        };
        let abi: PackedUserOperationAbi = uo.clone().into();
        assert_eq!(abi.account_gas_limits, uo.account_gas_limits.to_fixed_bytes());
        assert_eq!(PackedUserOperation::from(abi), uo);
    }

    #[tokio::test]
    async fn get_nonce() -> eyre::Result<()> {
        let (provider, mock) = Provider::mocked();
        mock.push::<String, _>(U256::from(5).encode_hex())?;

        let nonce = entry_point(provider).get_nonce(&Address::random(), 0.into()).await?;
        assert_eq!(nonce, 5.into());
        Ok(())
    }

    #[tokio::test]
    async fn get_user_op_hash_matches_local_hash() -> eyre::Result<()> {
        let (provider, mock) = Provider::mocked();
        let entry_point = entry_point(provider);
        let uo = PackedUserOperation {
            sender: "0x9406Cc6185a346906296840746125a0E44976454".parse()?,
            nonce: 1.into(),
            call_data: vec![0xb6, 0x1d, 0x27, 0xf6].into(),
            pre_verification_gas: 50_000.into(),
            signature: vec![1; 65].into(),
            ..Default::default()
        };
        let local = uo.hash(&entry_point.address(), 80001);
        mock.push::<String, _>(format!("{:?}", local.0))?;

        let hash = entry_point.get_user_op_hash(uo).await?;
        assert_eq!(hash, local);
        Ok(())
    }

    #[tokio::test]
    async fn balance_of() -> eyre::Result<()> {
        let (provider, mock) = Provider::mocked();
        mock.push::<String, _>(U256::exp10(17).encode_hex())?;

        let deposit = entry_point(provider).balance_of(&Address::random()).await?;
        assert_eq!(deposit, U256::exp10(17));
        Ok(())
    }

    #[tokio::test]
    async fn get_nonce_revert() -> eyre::Result<()> {
        let (provider, mock) = Provider::mocked();
        mock.push_response(ethers::providers::MockResponse::Error(
            serde_json::from_value(serde_json::json!({
                "code": 3,
                "message": "execution reverted",
                "data": "0x08c379a00000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000001841413934206761732076616c756573206f766572666c6f770000000000000000",
            }))?,
        ));

        let err = entry_point(provider).get_nonce(&Address::random(), 0.into()).await.unwrap_err();
        assert_eq!(err.function(), "getNonce");
        assert_eq!(err.to_string(), "getNonce: execution reverted: AA94 gas values overflow");
        Ok(())
    }
}
