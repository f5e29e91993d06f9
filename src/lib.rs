//! # eosio-evm-client
//!
//! A Rust client library for the eosio.evm bridge: an EVM that runs inside a
//! host-chain smart contract. The library builds and serializes embedded-VM
//! transactions, relays them through the bridge contract's actions, reads EVM
//! state back out of the contract's tables, and drives deployed Solidity
//! contracts through their ABI.
//!
//! ## Features
//! - Legacy-RLP transaction assembly with EIP-155 signing or host-account
//!   authentication (zeroed-signature relays)
//! - Dual-channel results: the host receipt plus the EVM receipt recovered
//!   from the contract's console output
//! - Read-only calls via the contract's assert-with-output convention
//! - Data-driven contract bindings loaded from Solidity ABI JSON
//! - Typed reads of the bridge's `account` and `accountstate` tables
//!
//! Host-side transaction signing stays behind the [`ActionSubmitter`] trait;
//! bring whatever wallet integration the deployment uses.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use eosio_evm_client::{
//!     ApiConfig, CallOptions, DynSolValue, EosEvmClient, HttpTableReader, U256,
//! };
//! # use eosio_evm_client::{ActionSubmitter, HostAction, LedgerError};
//! # struct Wallet;
//! # #[async_trait::async_trait]
//! # impl ActionSubmitter for Wallet {
//! #     async fn transact(
//! #         &self,
//! #         _actions: Vec<HostAction>,
//! #     ) -> Result<serde_json::Value, LedgerError> {
//! #         unimplemented!()
//! #     }
//! # }
//! # const ERC20_ABI: &str = "[]";
//! # const ERC20_BYTECODE: &str = "";
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::default();
//!     let tables = Arc::new(HttpTableReader::new(&config.endpoint));
//!     let client = Arc::new(EosEvmClient::new(
//!         config,
//!         Arc::new(Wallet),
//!         tables,
//!         &["0x4646464646464646464646464646464646464646464646464646464646464646"],
//!     )?);
//!
//!     // Fund the relaying account's EVM balance and pick a sender address.
//!     client.deposit("evmuser", "1.0000 EOS", "").await?;
//!     let sender = *client.keys().addresses().next().unwrap();
//!
//!     // Deploy a token and move some of it.
//!     let token = Arc::clone(&client).contract("evmuser", ERC20_ABI, ERC20_BYTECODE)?;
//!     let opts = CallOptions { sender: Some(sender), ..Default::default() };
//!     token.deploy(
//!         &[DynSolValue::String("FIRE Token".into())],
//!         opts.clone(),
//!     ).await?;
//!     token.invoke(
//!         "transfer",
//!         &[
//!             DynSolValue::Address("0x3535353535353535353535353535353535353535".parse()?),
//!             DynSolValue::Uint(U256::from(100u64), 256),
//!         ],
//!         opts,
//!     ).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod contract;
pub mod errors;
pub mod host;
pub mod keys;
pub mod transport;
pub mod tx;
pub mod types;

pub use api::EosEvmClient;
pub use config::ApiConfig;
pub use contract::{CallOptions, ContractBinding, ContractOutput};
pub use errors::BridgeError;
pub use host::HostApi;
pub use keys::KeyRegistry;
pub use transport::{
    ActionSubmitter, Authorization, HostAction, HttpTableReader, LedgerError, TableQuery,
    TableReader, TableRows,
};
pub use tx::TxParams;
pub use types::{
    parse_quantity, Account, AccountStateRow, Address, DynSolValue, EvmLog, EvmReceipt,
    EvmResponse, B256, U256,
};
