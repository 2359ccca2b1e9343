use crate::{
    cache::{AccountKey, AddressCache},
    config::{Config, PaymasterConfig},
    error::ClientError,
};
use aa_sdk_bundler::{Bundler, BundlerClient};
use aa_sdk_contracts::{create_account_call_data, AccountFactory, EntryPoint};
use aa_sdk_primitives::{
    paymaster::{encode_paymaster_data, paymaster_hash, EMPTY_SIGNATURE},
    sign_message, sign_user_operation, PackedUserOperation, Rotator, UserOperation,
    UserOperationGasEstimation, UserOperationHash, UserOperationReceipt, UserOperationRequest,
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Bytes, TransactionReceipt, H256, U256},
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

type SignerClient<M> = SignerMiddleware<Arc<M>, LocalWallet>;

/// Account abstraction client
///
/// Builds, signs and submits user operations of simple accounts, optionally sponsored by a
/// verifying paymaster.
pub struct Client<M: Middleware + 'static> {
    config: Config,
    chain_id: u64,
    eth_client: Arc<M>,
    entry_point: EntryPoint<M>,
    factory: AccountFactory<M>,
    bundler: BundlerClient,
    cache: Option<Arc<dyn AddressCache>>,
}

impl Client<Provider<Http>> {
    /// Connects to the Ethereum node of the config and fetches its chain id
    pub async fn new(
        config: Config,
        cache: Option<Arc<dyn AddressCache>>,
    ) -> Result<Self, ClientError> {
        let provider = Provider::<Http>::try_from(config.node_url.as_str())
            .map_err(|err| ClientError::Provider {
                function: "connect",
                inner: err.to_string(),
            })?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|err| ClientError::Provider {
                function: "get_chainid",
                inner: err.to_string(),
            })?;
        info!("Connected to {} (chain id {chain_id})", config.node_url);
        Ok(Self::with_provider(config, Arc::new(provider), chain_id.as_u64(), cache))
    }
}

impl<M: Middleware + 'static> Client<M> {
    pub fn with_provider(
        config: Config,
        eth_client: Arc<M>,
        chain_id: u64,
        cache: Option<Arc<dyn AddressCache>>,
    ) -> Self {
        let entry_point = EntryPoint::new(eth_client.clone(), config.entry_point);
        let factory = AccountFactory::new(eth_client.clone(), config.account_factory);
        let bundler = BundlerClient::new(config.bundler_url.clone(), config.entry_point)
            .with_poll_interval(config.poll_interval)
            .with_wait_timeout(config.wait_timeout);
        Self { config, chain_id, eth_client, entry_point, factory, bundler, cache }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn entry_point(&self) -> &EntryPoint<M> {
        &self.entry_point
    }

    pub fn bundler(&self) -> &BundlerClient {
        &self.bundler
    }

    /// Address of the simple account owned by `owner`
    pub async fn get_account(&self, owner: Address, salt: U256) -> Result<Address, ClientError> {
        let key = AccountKey::new(owner, salt);
        if let Some(address) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            return Ok(address);
        }

        let address = self.factory.get_address(owner, salt).await?;
        if let Some(cache) = &self.cache {
            if cache.set(key, address) {
                trace!("Account address cache is full, least recently used entry evicted");
            }
        }
        Ok(address)
    }

    pub async fn get_account_balance(&self, account: Address) -> Result<U256, ClientError> {
        self.eth_client
            .get_balance(account, None)
            .await
            .map_err(|err| ClientError::Provider {
                function: "get_balance",
                inner: err.to_string(),
            })
    }

    /// Whether there is code at `address`
    pub async fn is_account_deployed(&self, address: Address) -> Result<bool, ClientError> {
        let code = self
            .eth_client
            .get_code(address, None)
            .await
            .map_err(|err| ClientError::Provider {
                function: "get_code",
                inner: err.to_string(),
            })?;
        Ok(!code.is_empty())
    }

    /// Completes the user operation and signs it
    ///
    /// Fetches the nonce if it is not set, attaches the account factory data if the sender is
    /// not deployed yet and gets the sponsorship of the configured paymaster. The factory data
    /// deploys an account owned by `signer`.
    ///
    /// # Returns
    /// * `(UserOperation, UserOperationHash)` - The signed user operation and its hash
    pub async fn fill_and_sign<S: Signer>(
        &self,
        mut uo: UserOperation,
        signer: &S,
    ) -> Result<(UserOperation, UserOperationHash), ClientError> {
        if uo.sender.is_zero() {
            return Err(ClientError::EmptySender);
        }

        if uo.nonce.is_none() {
            uo.nonce = Some(self.entry_point.get_nonce(&uo.sender, uo.salt).await?);
        }

        if self.is_account_deployed(uo.sender).await? {
            uo.factory = Address::zero();
            uo.factory_data = Bytes::default();
            uo.init_code = Bytes::default();
        } else {
            debug!("Account {:?} is not deployed, attaching factory data", uo.sender);
            uo.factory = self.config.account_factory;
            uo.factory_data = create_account_call_data(signer.address(), uo.salt);
        }

        if let Some(paymaster) = &self.config.paymaster {
            self.sponsor(&mut uo, paymaster).await?;
        }

        let (signature, hash) = self.sign_user_operation(&uo.pack(), signer).await?;
        uo.signature = signature;
        trace!("User operation {hash} signed: {uo:?}");

        Ok((uo, hash))
    }

    /// Sets the paymaster fields of the user operation, signed by the next paymaster signer
    async fn sponsor(
        &self,
        uo: &mut UserOperation,
        paymaster: &PaymasterConfig,
    ) -> Result<(), ClientError> {
        let signer = paymaster.signers.next().ok_or(ClientError::NoPaymasterSigner)?;

        uo.paymaster = paymaster.address;
        if let Some(gas) = paymaster.verification_gas_limit {
            uo.paymaster_verification_gas_limit = gas;
        }
        if let Some(gas) = paymaster.post_op_gas_limit {
            uo.paymaster_post_op_gas_limit = gas;
        }

        let validity = paymaster.validity.resolve(unix_now());
        uo.paymaster_data = encode_paymaster_data(&validity, &EMPTY_SIGNATURE)?;
        let hash = paymaster_hash(&uo.pack(), self.chain_id, &validity)?;

        let signature = sign_message(&signer, hash.as_bytes()).await?;
        uo.paymaster_data = encode_paymaster_data(&validity, &signature.to_vec())?;
        debug!("User operation sponsored by {:?} (signer {:?})", uo.paymaster, signer.address());

        Ok(())
    }

    /// Signs the packed user operation for the configured entry point and chain
    pub async fn sign_user_operation<S: Signer>(
        &self,
        uo: &PackedUserOperation,
        signer: &S,
    ) -> Result<(Bytes, UserOperationHash), ClientError> {
        Ok(sign_user_operation(uo, &self.config.entry_point, self.chain_id, signer).await?)
    }

    /// Hash of the user operation after [Client::fill_and_sign]
    pub async fn user_operation_hash<S: Signer>(
        &self,
        uo: UserOperation,
        signer: &S,
    ) -> Result<UserOperationHash, ClientError> {
        let (_, hash) = self.fill_and_sign(uo, signer).await?;
        Ok(hash)
    }

    /// Fills, signs and sends the user operation to the bundler
    pub async fn send_user_operation<S: Signer>(
        &self,
        uo: UserOperation,
        signer: &S,
    ) -> Result<UserOperationHash, ClientError> {
        let (uo, _) = self.fill_and_sign(uo, signer).await?;
        let hash = self.bundler.send_user_operation(&UserOperationRequest::from(&uo)).await?;
        Ok(hash)
    }

    pub async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperation,
    ) -> Result<UserOperationGasEstimation, ClientError> {
        Ok(self.bundler.estimate_user_operation_gas(&UserOperationRequest::from(uo)).await?)
    }

    pub async fn get_user_operation_receipt(
        &self,
        hash: &UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, ClientError> {
        Ok(self.bundler.get_user_operation_receipt(hash).await?)
    }

    pub async fn supported_entry_points(&self) -> Result<Vec<Address>, ClientError> {
        Ok(self.bundler.supported_entry_points().await?)
    }

    /// Waits for the receipt of the user operation, see [BundlerClient::wait_for_user_operation]
    pub async fn wait_for_user_operation(
        &self,
        hash: &UserOperationHash,
        cancel: &CancellationToken,
    ) -> Result<UserOperationReceipt, ClientError> {
        Ok(self.bundler.wait_for_user_operation(hash, cancel).await?)
    }

    /// Entry point whose transactions are signed by the executor, and the executor address
    ///
    /// # Panics
    /// If no executor signer is configured.
    fn executor_entry_point(&self) -> (EntryPoint<SignerClient<M>>, Address) {
        let Some(executor) = self.config.executor.clone() else {
            panic!("executor signer is not configured");
        };
        let beneficiary = executor.address();
        let signer =
            SignerMiddleware::new(self.eth_client.clone(), executor.with_chain_id(self.chain_id));
        (EntryPoint::new(Arc::new(signer), self.config.entry_point), beneficiary)
    }

    /// Sends the user operations directly to the entry point (`handleOps`), paid by the executor
    ///
    /// # Returns
    /// * `(Vec<H256>, H256)` - Hashes of the packed user operations without their signatures
    ///   and the transaction hash
    ///
    /// # Panics
    /// If no executor signer is configured.
    pub async fn handle_ops(
        &self,
        uos: Vec<PackedUserOperation>,
    ) -> Result<(Vec<H256>, H256), ClientError> {
        let (entry_point, beneficiary) = self.executor_entry_point();
        let hashes = uos.iter().map(PackedUserOperation::inner_hash).collect();
        let tx_hash = entry_point.handle_ops(uos, beneficiary).await?;
        info!("handleOps sent in transaction {tx_hash:?}");
        Ok((hashes, tx_hash))
    }

    /// Same as [Client::handle_ops] with `handleAtomicOps`
    ///
    /// # Panics
    /// If no executor signer is configured.
    pub async fn handle_atomic_ops(
        &self,
        uos: Vec<PackedUserOperation>,
    ) -> Result<(Vec<H256>, H256), ClientError> {
        let (entry_point, beneficiary) = self.executor_entry_point();
        let hashes = uos.iter().map(PackedUserOperation::inner_hash).collect();
        let tx_hash = entry_point.handle_atomic_ops(uos, beneficiary).await?;
        info!("handleAtomicOps sent in transaction {tx_hash:?}");
        Ok((hashes, tx_hash))
    }

    /// Deposits `amount` for `to` in the entry point, paid by the next paymaster signer
    pub async fn prefund(
        &self,
        to: Address,
        amount: U256,
    ) -> Result<TransactionReceipt, ClientError> {
        let signer = self
            .config
            .paymaster
            .as_ref()
            .and_then(|paymaster| paymaster.signers.next())
            .ok_or(ClientError::NoPaymasterSigner)?;
        let client =
            SignerMiddleware::new(self.eth_client.clone(), signer.with_chain_id(self.chain_id));
        let receipt = EntryPoint::new(Arc::new(client), self.config.entry_point)
            .deposit_to(to, amount)
            .await?;
        info!("Deposited {amount} for {to:?} in transaction {:?}", receipt.transaction_hash);
        Ok(receipt)
    }

    /// Deploys the simple account owned by `owner`, paid by `signer`
    pub async fn deploy_account(
        &self,
        signer: LocalWallet,
        owner: Address,
        salt: U256,
    ) -> Result<TransactionReceipt, ClientError> {
        let client =
            SignerMiddleware::new(self.eth_client.clone(), signer.with_chain_id(self.chain_id));
        let receipt = AccountFactory::new(Arc::new(client), self.config.account_factory)
            .create_account(owner, salt)
            .await?;
        info!("Account of {owner:?} deployed in transaction {:?}", receipt.transaction_hash);
        Ok(receipt)
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::LruAddressCache, config::ValidityPolicy};
    use aa_sdk_primitives::{paymaster::decode_paymaster_data, ValidityWindow};
    use ethers::{abi::AbiEncode, providers::MockProvider, types::Signature};

    const OWNER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const PAYMASTER_KEYS: [&str; 2] = [
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    ];
    const CHAIN_ID: u64 = 80001;

    fn config() -> Config {
        Config::new(
            "http://127.0.0.1:8545",
            "http://127.0.0.1:3000",
            "0x0000000071727De22E5E9d8BAf0edAc6f37da032".parse().unwrap(),
            "0x91E60e0613810449d098b0b5Ec8b51A0FE8c8985".parse().unwrap(),
        )
    }

    fn wallet(key: &str) -> LocalWallet {
        key.parse().unwrap()
    }

    fn client(
        config: Config,
        cache: Option<Arc<dyn AddressCache>>,
    ) -> (Client<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (Client::with_provider(config, Arc::new(provider), CHAIN_ID, cache), mock)
    }

    fn user_operation() -> UserOperation {
        UserOperation::with_defaults(
            "0x9406Cc6185a346906296840746125a0E44976454".parse().unwrap(),
            Bytes::from(vec![0xb6, 0x1d, 0x27, 0xf6]),
            U256::zero(),
        )
    }

    fn recover(signature: &[u8], hash: H256) -> Address {
        Signature::try_from(signature).unwrap().recover(hash.as_bytes().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn get_account_is_cached() -> eyre::Result<()> {
        let cache: Arc<dyn AddressCache> = Arc::new(LruAddressCache::default());
        let (client, mock) = client(config(), Some(cache.clone()));
        let account = Address::random();
        mock.push::<String, _>(account.encode_hex())?;

        let owner = wallet(OWNER_KEY).address();
        assert_eq!(client.get_account(owner, 0.into()).await?, account);
        // no response is left in the mock, a second call would fail
        assert_eq!(client.get_account(owner, 0.into()).await?, account);
        assert_eq!(cache.get(&AccountKey::new(owner, 0.into())), Some(account));
        assert!(client.get_account(owner, 1.into()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn get_account_without_cache() -> eyre::Result<()> {
        let (client, mock) = client(config(), None);
        let account = Address::random();
        mock.push::<String, _>(account.encode_hex())?;
        mock.push::<String, _>(account.encode_hex())?;

        let owner = Address::random();
        assert_eq!(client.get_account(owner, 0.into()).await?, account);
        assert_eq!(client.get_account(owner, 0.into()).await?, account);
        assert!(client.get_account(owner, 0.into()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn fill_and_sign_deployed_account() -> eyre::Result<()> {
        let (client, mock) = client(config(), None);
        mock.push::<String, _>("0x6080604052".to_string())?;
        let signer = wallet(OWNER_KEY);

        let uo = user_operation()
            .nonce(Some(3.into()))
            .factory(Address::random())
            .factory_data(vec![1, 2, 3].into());
        let (uo, hash) = client.fill_and_sign(uo, &signer).await?;

        assert_eq!(uo.nonce, Some(3.into()));
        assert!(uo.factory.is_zero());
        assert!(uo.pack().init_code.is_empty());
        assert!(uo.pack().paymaster_and_data.is_empty());
        assert_eq!(hash, uo.hash(&client.config().entry_point, CHAIN_ID));
        assert_eq!(uo.signature.len(), 65);
        assert_eq!(recover(&uo.signature, hash.0), signer.address());
        Ok(())
    }

    #[tokio::test]
    async fn fill_and_sign_undeployed_account() -> eyre::Result<()> {
        let (client, mock) = client(config(), None);
        // responses are served last in, first out
        mock.push::<String, _>("0x".to_string())?;
        mock.push::<String, _>(U256::from(7).encode_hex())?;
        let signer = wallet(OWNER_KEY);

        let (uo, hash) = client.fill_and_sign(user_operation().salt(5.into()), &signer).await?;

        assert_eq!(uo.nonce, Some(7.into()));
        assert_eq!(uo.factory, client.config().account_factory);
        assert_eq!(uo.factory_data, create_account_call_data(signer.address(), 5.into()));
        assert_eq!(&uo.pack().init_code[..20], client.config().account_factory.as_bytes());
        assert_eq!(recover(&uo.signature, hash.0), signer.address());
        Ok(())
    }

    #[tokio::test]
    async fn fill_and_sign_with_paymaster() -> eyre::Result<()> {
        let paymaster_address = Address::random();
        let config = config().paymaster(
            PaymasterConfig::new(paymaster_address, PAYMASTER_KEYS.map(wallet))
                .post_op_gas_limit(50_000.into()),
        );
        let (client, mock) = client(config, None);
        mock.push::<String, _>("0x6080604052".to_string())?;
        mock.push::<String, _>("0x6080604052".to_string())?;
        let signer = wallet(OWNER_KEY);

        for key in PAYMASTER_KEYS {
            let (uo, hash) =
                client.fill_and_sign(user_operation().nonce(Some(0.into())), &signer).await?;
            assert_eq!(uo.paymaster, paymaster_address);
            assert_eq!(uo.paymaster_post_op_gas_limit, 50_000.into());
            assert_eq!(uo.paymaster_verification_gas_limit, 300_000.into());

            let (validity, paymaster_signature) =
                decode_paymaster_data(&uo.paymaster_data).expect("valid paymaster data");
            assert_eq!(validity, ValidityWindow::default());
            assert_eq!(paymaster_signature.len(), 65);

            let unsigned = uo
                .clone()
                .paymaster_data(encode_paymaster_data(&validity, &EMPTY_SIGNATURE)?);
            let sponsorship = paymaster_hash(&unsigned.pack(), CHAIN_ID, &validity)?;
            assert_eq!(recover(&paymaster_signature, sponsorship), wallet(key).address());

            assert_eq!(recover(&uo.signature, hash.0), signer.address());
        }
        Ok(())
    }

    #[tokio::test]
    async fn paymaster_validity_from_now() -> eyre::Result<()> {
        let config = config().paymaster(
            PaymasterConfig::new(Address::random(), [wallet(PAYMASTER_KEYS[0])])
                .validity(ValidityPolicy::FromNow { valid_for: 600 }),
        );
        let (client, mock) = client(config, None);
        mock.push::<String, _>("0x6080604052".to_string())?;

        let before = unix_now();
        let (uo, _) =
            client.fill_and_sign(user_operation().nonce(Some(0.into())), &wallet(OWNER_KEY)).await?;
        let (validity, _) =
            decode_paymaster_data(&uo.paymaster_data).expect("valid paymaster data");
        assert!(validity.valid_after >= before);
        assert_eq!(validity.valid_until, validity.valid_after + 600);
        Ok(())
    }

    #[tokio::test]
    async fn empty_sender() {
        let (client, _) = client(config(), None);
        let uo = user_operation().sender(Address::zero());
        let err = client.fill_and_sign(uo, &wallet(OWNER_KEY)).await.unwrap_err();
        assert!(matches!(err, ClientError::EmptySender));
    }

    #[tokio::test]
    async fn paymaster_without_signers() -> eyre::Result<()> {
        let config = config().paymaster(PaymasterConfig::new(Address::random(), Vec::new()));
        let (client, mock) = client(config, None);
        mock.push::<String, _>("0x6080604052".to_string())?;

        let err = client
            .fill_and_sign(user_operation().nonce(Some(0.into())), &wallet(OWNER_KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoPaymasterSigner));
        Ok(())
    }

    #[tokio::test]
    async fn provider_error_names_the_call() {
        // no response is queued in the mock
        let (client, _) = client(config(), None);

        let err = client.is_account_deployed(Address::random()).await.unwrap_err();
        assert!(matches!(err, ClientError::Provider { function: "get_code", .. }));
        assert!(err.to_string().starts_with("provider error in get_code: "));

        let err = client.get_account_balance(Address::random()).await.unwrap_err();
        assert!(matches!(err, ClientError::Provider { function: "get_balance", .. }));
    }

    #[tokio::test]
    async fn prefund_without_paymaster() {
        let (client, _) = client(config(), None);
        let err = client.prefund(Address::random(), 1.into()).await.unwrap_err();
        assert!(matches!(err, ClientError::NoPaymasterSigner));
    }

    #[tokio::test]
    #[should_panic(expected = "executor signer is not configured")]
    async fn handle_ops_without_executor() {
        let (client, _) = client(config(), None);
        let _ = client.handle_ops(vec![user_operation().nonce(Some(0.into())).pack()]).await;
    }
}
