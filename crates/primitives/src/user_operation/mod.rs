//! Basic transaction type for account abstraction (ERC-4337)

mod hash;
mod packed;
mod request;

use crate::{
    constants::user_operation::{
        CALL_GAS_LIMIT, MAX_FEE_PER_GAS, MAX_PRIORITY_FEE_PER_GAS, PAYMASTER_POST_OP_GAS_LIMIT,
        PAYMASTER_VERIFICATION_GAS_LIMIT, PRE_VERIFICATION_GAS, VERIFICATION_GAS_LIMIT,
    },
    utils::{pack_factory_data, pack_paymaster_and_data, pack_uint128},
};
use ethers::types::{Address, Bloom, Bytes, Log, H256, U256, U64};
pub use hash::UserOperationHash;
pub use packed::PackedUserOperation;
pub use request::UserOperationRequest;
use serde::{Deserialize, Serialize};

/// User operation
///
/// The verbose form of the operation as it is built by the user. Use [UserOperation::pack] to get
/// the form consumed by the entry point (and signed by the account owner).
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Sender of the user operation
    pub sender: Address,

    /// Nonce (anti replay protection), fetched from the entry point if not set
    pub nonce: Option<U256>,

    /// The data that is passed to the sender during the main execution call
    pub call_data: Bytes,

    /// The amount of gas to allocate for the main execution call
    pub call_gas_limit: U256,

    /// The amount of gas to allocate for the verification step
    pub verification_gas_limit: U256,

    /// The amount of gas to pay bundler to compensate for the pre-verification execution and
    /// calldata
    pub pre_verification_gas: U256,

    /// Maximum fee per gas (similar to EIP-1559)
    pub max_fee_per_gas: U256,

    /// Maximum priority fee per gas (similar to EIP-1559)
    pub max_priority_fee_per_gas: U256,

    /// Data passed to the account along with the nonce during the verification step
    pub signature: Bytes,

    /// Paymaster sponsoring the operation (zero address if there is none)
    pub paymaster: Address,

    /// Paymaster-specific data
    pub paymaster_data: Bytes,

    /// The amount of gas to allocate for the paymaster validation
    pub paymaster_verification_gas_limit: U256,

    /// The amount of gas to allocate for the paymaster post-op call
    pub paymaster_post_op_gas_limit: U256,

    /// Factory deploying the account (zero address if the account is deployed)
    pub factory: Address,

    /// Call data for the factory
    pub factory_data: Bytes,

    /// Raw init code, used only when no factory is set
    pub init_code: Bytes,

    /// Salt used to derive the account address
    pub salt: U256,
}

impl UserOperation {
    /// Creates a user operation populated with the default gas values
    pub fn with_defaults(sender: Address, call_data: Bytes, salt: U256) -> Self {
        Self {
            sender,
            call_data,
            salt,
            call_gas_limit: CALL_GAS_LIMIT.into(),
            verification_gas_limit: VERIFICATION_GAS_LIMIT.into(),
            pre_verification_gas: PRE_VERIFICATION_GAS.into(),
            max_fee_per_gas: MAX_FEE_PER_GAS.into(),
            max_priority_fee_per_gas: MAX_PRIORITY_FEE_PER_GAS.into(),
            paymaster_verification_gas_limit: PAYMASTER_VERIFICATION_GAS_LIMIT.into(),
            paymaster_post_op_gas_limit: PAYMASTER_POST_OP_GAS_LIMIT.into(),
            ..Default::default()
        }
    }

    /// Packs the user operation into the entry point v0.7 representation
    ///
    /// # Panics
    /// If the nonce is not set or a gas value does not fit into 128 bits.
    pub fn pack(&self) -> PackedUserOperation {
        let Some(nonce) = self.nonce else {
            panic!("user operation nonce must be set before packing (sender {:?})", self.sender);
        };

        let init_code = if self.factory.is_zero() {
            self.init_code.clone()
        } else {
            pack_factory_data(self.factory, &self.factory_data)
        };

        let paymaster_and_data = if self.paymaster.is_zero() {
            Bytes::default()
        } else {
            pack_paymaster_and_data(
                self.paymaster,
                self.paymaster_verification_gas_limit,
                self.paymaster_post_op_gas_limit,
                &self.paymaster_data,
            )
        };

        PackedUserOperation {
            sender: self.sender,
            nonce,
            init_code,
            call_data: self.call_data.clone(),
            account_gas_limits: pack_uint128(self.verification_gas_limit, self.call_gas_limit)
                .into(),
            pre_verification_gas: self.pre_verification_gas,
            gas_fees: pack_uint128(self.max_priority_fee_per_gas, self.max_fee_per_gas).into(),
            paymaster_and_data,
            signature: self.signature.clone(),
        }
    }

    /// Calculates the hash of the user operation
    ///
    /// # Panics
    /// Same as [UserOperation::pack].
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> UserOperationHash {
        self.pack().hash(entry_point, chain_id)
    }

    /// Overwrites the sender
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// Overwrites the nonce
    pub fn nonce(mut self, nonce: Option<U256>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Overwrites the call data
    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.call_data = call_data;
        self
    }

    /// Overwrites the call gas limit
    pub fn call_gas_limit(mut self, call_gas_limit: U256) -> Self {
        self.call_gas_limit = call_gas_limit;
        self
    }

    /// Overwrites the verification gas limit
    pub fn verification_gas_limit(mut self, verification_gas_limit: U256) -> Self {
        self.verification_gas_limit = verification_gas_limit;
        self
    }

    /// Overwrites the pre-verification gas
    pub fn pre_verification_gas(mut self, pre_verification_gas: U256) -> Self {
        self.pre_verification_gas = pre_verification_gas;
        self
    }

    /// Overwrites the max fee per gas
    pub fn max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
        self.max_fee_per_gas = max_fee_per_gas;
        self
    }

    /// Overwrites the max priority fee per gas
    pub fn max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
        self.max_priority_fee_per_gas = max_priority_fee_per_gas;
        self
    }

    /// Overwrites the signature
    pub fn signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }

    /// Overwrites the paymaster
    pub fn paymaster(mut self, paymaster: Address) -> Self {
        self.paymaster = paymaster;
        self
    }

    /// Overwrites the paymaster data
    pub fn paymaster_data(mut self, paymaster_data: Bytes) -> Self {
        self.paymaster_data = paymaster_data;
        self
    }

    /// Overwrites the paymaster verification gas limit
    pub fn paymaster_verification_gas_limit(mut self, gas: U256) -> Self {
        self.paymaster_verification_gas_limit = gas;
        self
    }

    /// Overwrites the paymaster post-op gas limit
    pub fn paymaster_post_op_gas_limit(mut self, gas: U256) -> Self {
        self.paymaster_post_op_gas_limit = gas;
        self
    }

    /// Overwrites the factory
    pub fn factory(mut self, factory: Address) -> Self {
        self.factory = factory;
        self
    }

    /// Overwrites the factory data
    pub fn factory_data(mut self, factory_data: Bytes) -> Self {
        self.factory_data = factory_data;
        self
    }

    /// Overwrites the legacy init code
    pub fn init_code(mut self, init_code: Bytes) -> Self {
        self.init_code = init_code;
        self
    }

    /// Overwrites the salt
    pub fn salt(mut self, salt: U256) -> Self {
        self.salt = salt;
        self
    }
}

/// Transaction receipt embedded in [UserOperationReceipt]
///
/// Bundlers differ in which fields they return, so everything except the logs is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserOperationTransactionReceipt {
    pub transaction_hash: Option<H256>,
    pub transaction_index: Option<U64>,
    pub block_hash: Option<H256>,
    pub block_number: Option<U64>,
    pub from: Option<Address>,
    pub cumulative_gas_used: Option<U256>,
    pub gas_used: Option<U256>,
    pub effective_gas_price: Option<U256>,
    pub logs: Vec<Log>,
    pub logs_bloom: Option<Bloom>,
    pub status: Option<U64>,
}

/// Receipt of the user operation (returned from the RPC endpoint eth_getUserOperationReceipt)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    #[serde(rename = "userOpHash")]
    pub user_operation_hash: UserOperationHash,
    pub sender: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    pub nonce: U256,
    pub success: bool,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(rename = "receipt", default)]
    pub tx_receipt: UserOperationTransactionReceipt,
}

/// Gas estimations for user operation (returned from the RPC endpoint eth_estimateUserOperationGas)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserOperationGasEstimation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::unpack_paymaster_and_data;

    fn transfer_op() -> UserOperation {
        UserOperation::default()
            .sender("0x9c5754De1443984659E1b3a8d1931D83475ba29C".parse().unwrap())
            .nonce(Some(1.into()))
            .call_data("0xb61d27f60000000000000000000000009c5754de1443984659e1b3a8d1931d83475ba29c00000000000000000000000000000000000000000000000000005af3107a400000000000000000000000000000000000000000000000000000000000000000600000000000000000000000000000000000000000000000000000000000000000".parse().unwrap())
            .call_gas_limit(33_100.into())
            .verification_gas_limit(60_624.into())
            .pre_verification_gas(44_056.into())
            .max_fee_per_gas(1_695_000_030_u64.into())
            .max_priority_fee_per_gas(1_695_000_000.into())
            .signature("0x37540ca4f91a9f08993ba4ebd4b7473902f69864c98951f9db8cb47b78764c1a13ad46894a96dc0cad68f9207e49b4dbb897f25f47f040cec2a636a8201c1cd71b".parse().unwrap())
    }

    #[test]
    fn with_defaults() {
        let uo = UserOperation::with_defaults(Address::random(), Bytes::default(), 7.into());
        assert_eq!(uo.nonce, None);
        assert_eq!(uo.salt, 7.into());
        assert_eq!(uo.call_gas_limit, 2_000_000.into());
        assert_eq!(uo.verification_gas_limit, 200_000.into());
        assert_eq!(uo.pre_verification_gas, 20_000.into());
        assert_eq!(uo.max_fee_per_gas, 25_000_000_000_u64.into());
        assert_eq!(uo.max_priority_fee_per_gas, 1_000_000.into());
        assert_eq!(uo.paymaster_verification_gas_limit, 300_000.into());
        assert_eq!(uo.paymaster_post_op_gas_limit, 100.into());
    }

    #[test]
    fn pack_is_deterministic() {
        let uo = transfer_op();
        assert_eq!(uo.pack(), uo.pack());
        assert_eq!(uo.pack().pack_without_signature(), uo.clone().pack().pack_without_signature());
    }

    #[test]
    fn pack_transfer() {
        let packed = transfer_op().pack();
        assert_eq!(packed.nonce, 1.into());
        assert!(packed.init_code.is_empty());
        assert!(packed.paymaster_and_data.is_empty());
        assert_eq!(packed.account_gas_limits(), (60_624.into(), 33_100.into()));
        assert_eq!(packed.gas_fees(), (1_695_000_000.into(), 1_695_000_030_u64.into()));
        assert_eq!(
            transfer_op().hash(
                &"0x0000000071727De22E5E9d8BAf0edAc6f37da032".parse().unwrap(),
                1
            ),
            "0x87c11723e79cb8593e80d67864c53f3cbdba0458fc7ddc6cc8512e61b3c65b86"
                .parse::<H256>()
                .unwrap()
                .into()
        );
    }

    #[test]
    fn pack_factory_and_paymaster() {
        let factory: Address = "0xD421D8470b577f6A64992132D04906EfE51F1dE3".parse().unwrap();
        let paymaster: Address = "0xe7db0C105Ac75A493B0413046417e48594360542".parse().unwrap();
        let uo = transfer_op()
            .factory(factory)
            .factory_data("0x5fbfb9cf".parse().unwrap())
            .init_code("0xffff".parse().unwrap())
            .paymaster(paymaster)
            .paymaster_verification_gas_limit(300_000.into())
            .paymaster_post_op_gas_limit(100.into())
            .paymaster_data("0xabcd".parse().unwrap());
        let packed = uo.pack();

        assert_eq!(packed.init_code.len(), 24);
        assert_eq!(&packed.init_code[..20], factory.as_bytes());
        assert_eq!(&packed.init_code[20..], &[0x5f, 0xbf, 0xb9, 0xcf]);

        let (addr, verification, post_op, data) =
            unpack_paymaster_and_data(&packed.paymaster_and_data).unwrap();
        assert_eq!(addr, paymaster);
        assert_eq!(verification, 300_000.into());
        assert_eq!(post_op, 100.into());
        assert_eq!(data.to_vec(), vec![0xab, 0xcd]);
    }

    #[test]
    fn pack_legacy_init_code() {
        let packed = transfer_op().init_code("0xffff".parse().unwrap()).pack();
        assert_eq!(packed.init_code.to_vec(), vec![0xff, 0xff]);
    }

    #[test]
    #[should_panic(expected = "nonce must be set")]
    fn pack_without_nonce() {
        transfer_op().nonce(None).pack();
    }

    #[test]
    fn receipt_tolerates_missing_fields() {
        let receipt: UserOperationReceipt = serde_json::from_value(serde_json::json!({
            "userOpHash": "0x95418c07086df02ff6bc9e8bdc150b380cb761beecc098630440bcec6e862702",
            "sender": "0x9c5754de1443984659e1b3a8d1931d83475ba29c",
            "nonce": "0x1",
            "success": true,
            "actualGasCost": "0x2a",
            "actualGasUsed": "0x15",
            "receipt": {
                "transactionHash": "0x5c9a2b2ec8a6ed1fc3b6dd9c1e1e3ad0d2e9d0dbe36c9e1c4a2f27b5d2ca7a70",
                "blockNumber": "0x10"
            }
        }))
        .unwrap();

        assert!(receipt.success);
        assert_eq!(receipt.paymaster, None);
        assert_eq!(receipt.actual_gas_cost, 42.into());
        assert!(receipt.logs.is_empty());
        assert_eq!(receipt.tx_receipt.block_number, Some(16.into()));
        assert_eq!(receipt.tx_receipt.gas_used, None);
    }

    #[test]
    fn gas_estimation_partial() {
        let estimation: UserOperationGasEstimation = serde_json::from_value(serde_json::json!({
            "preVerificationGas": "0xac18",
            "callGasLimit": "0x814c"
        }))
        .unwrap();
        assert_eq!(estimation.pre_verification_gas, Some(44_056.into()));
        assert_eq!(estimation.call_gas_limit, Some(33_100.into()));
        assert_eq!(estimation.verification_gas_limit, None);
        assert_eq!(estimation.max_fee_per_gas, None);
    }
}
