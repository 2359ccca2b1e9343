//! Account abstraction (ERC-4337) smart contract interfaces

pub mod account;
pub mod entry_point;
mod error;
mod gen;

pub use account::{
    create_account_call_data, execute_batch_call_data, execute_call_data, AccountFactory,
};
pub use entry_point::EntryPoint;
pub use error::{decode_revert_string, ContractCallError};
pub use gen::entry_point_api::FailedOp;
