//! User operation request (the JSON body sent to the bundler)

use super::UserOperation;
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// User operation with all fields being optional; unset fields are not serialized
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
}

fn non_zero(address: Address) -> Option<Address> {
    (!address.is_zero()).then_some(address)
}

fn non_empty(bytes: &Bytes) -> Option<Bytes> {
    (!bytes.is_empty()).then(|| bytes.clone())
}

impl From<&UserOperation> for UserOperationRequest {
    fn from(uo: &UserOperation) -> Self {
        let paymaster = non_zero(uo.paymaster);
        Self {
            sender: non_zero(uo.sender),
            nonce: uo.nonce,
            call_data: non_empty(&uo.call_data),
            call_gas_limit: Some(uo.call_gas_limit),
            verification_gas_limit: Some(uo.verification_gas_limit),
            pre_verification_gas: Some(uo.pre_verification_gas),
            max_fee_per_gas: Some(uo.max_fee_per_gas),
            max_priority_fee_per_gas: Some(uo.max_priority_fee_per_gas),
            signature: non_empty(&uo.signature),
            paymaster,
            paymaster_data: paymaster.and_then(|_| non_empty(&uo.paymaster_data)),
            paymaster_verification_gas_limit: paymaster
                .map(|_| uo.paymaster_verification_gas_limit),
            paymaster_post_op_gas_limit: paymaster.map(|_| uo.paymaster_post_op_gas_limit),
            factory: non_zero(uo.factory),
            factory_data: non_zero(uo.factory).and_then(|_| non_empty(&uo.factory_data)),
        }
    }
}

impl From<UserOperationRequest> for UserOperation {
    fn from(request: UserOperationRequest) -> Self {
        Self {
            sender: request.sender.unwrap_or_default(),
            nonce: request.nonce,
            call_data: request.call_data.unwrap_or_default(),
            call_gas_limit: request.call_gas_limit.unwrap_or_default(),
            verification_gas_limit: request.verification_gas_limit.unwrap_or_default(),
            pre_verification_gas: request.pre_verification_gas.unwrap_or_default(),
            max_fee_per_gas: request.max_fee_per_gas.unwrap_or_default(),
            max_priority_fee_per_gas: request.max_priority_fee_per_gas.unwrap_or_default(),
            signature: request.signature.unwrap_or_default(),
            paymaster: request.paymaster.unwrap_or_default(),
            paymaster_data: request.paymaster_data.unwrap_or_default(),
            paymaster_verification_gas_limit: request
                .paymaster_verification_gas_limit
                .unwrap_or_default(),
            paymaster_post_op_gas_limit: request.paymaster_post_op_gas_limit.unwrap_or_default(),
            factory: request.factory.unwrap_or_default(),
            factory_data: request.factory_data.unwrap_or_default(),
            ..Default::default()
        }
    }
}
