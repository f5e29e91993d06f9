// Session object tying the key registry, the host transport, and the
// contract dispatcher together.

use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, U256};
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::contract::ContractBinding;
use crate::errors::BridgeError;
use crate::host::HostApi;
use crate::keys::KeyRegistry;
use crate::transport::{ActionSubmitter, TableReader};
use crate::tx::{self, TxParams};
use crate::types::{parse_quantity, strip_hex_prefix, Account, EvmResponse};

pub struct EosEvmClient<S, T> {
    config: ApiConfig,
    host: HostApi<S, T>,
    keys: KeyRegistry,
}

impl<S: ActionSubmitter, T: TableReader> EosEvmClient<S, T> {
    pub fn new<K: AsRef<str>>(
        config: ApiConfig,
        submitter: Arc<S>,
        tables: Arc<T>,
        eth_private_keys: &[K],
    ) -> Result<Self, BridgeError> {
        let keys = KeyRegistry::new(eth_private_keys)?;
        let host = HostApi::new(config.clone(), submitter, tables);
        Ok(Self { config, host, keys })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn host(&self) -> &HostApi<S, T> {
        &self.host
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    // Load a contract binding from Solidity ABI JSON and creation bytecode.
    // A pre-deployed address from the config binds it immediately.
    pub fn contract(
        self: Arc<Self>,
        account: &str,
        abi_json: &str,
        bytecode_hex: &str,
    ) -> Result<ContractBinding<S, T>, BridgeError> {
        let abi: JsonAbi = serde_json::from_str(abi_json)?;
        let bytecode = alloy::hex::decode(strip_hex_prefix(bytecode_hex))?;
        let bound = self.config.bound_address;
        Ok(ContractBinding::new(self, account, abi, bytecode, bound))
    }

    // Build the hex wire form of an embedded-VM transaction. The nonce comes
    // from the sender's on-chain account row; without a sender it is 0.
    pub async fn create_eth_tx(&self, params: TxParams) -> Result<String, BridgeError> {
        let nonce = match params.sender {
            Some(sender) => self.host.get_nonce(sender).await?,
            None => 0,
        };
        let tx = tx::assemble(nonce, self.config.chain_id, &params);

        if params.sign {
            let sender = params.sender.ok_or(BridgeError::SignatureWithoutSender)?;
            let signer = self.keys.signer_for(sender)?;
            debug!(%sender, nonce, "signing transaction with registry key");
            tx::sign_and_encode(tx, signer)
        } else {
            Ok(tx::encode_unsigned(&tx))
        }
    }

    // Build and relay in one step. Unsigned transactions claim the sender on
    // the action; signed ones carry their origin in the signature.
    pub async fn send_transaction(
        &self,
        account: &str,
        params: TxParams,
    ) -> Result<EvmResponse, BridgeError> {
        let claimed = if params.sign { None } else { params.sender };
        let tx = self.create_eth_tx(params).await?;
        self.host.raw(account, &tx, claimed).await
    }

    // Value transfer between two EVM addresses, denominated in the host
    // token. The quantity is validated and scaled exactly before anything
    // is relayed.
    pub async fn transfer(
        &self,
        account: &str,
        sender: Address,
        to: Address,
        quantity: &str,
        raw_sign: bool,
    ) -> Result<EvmResponse, BridgeError> {
        let units = parse_quantity(
            quantity,
            &self.config.token_symbol,
            self.config.token_precision,
        )?;
        self.send_transaction(
            account,
            TxParams {
                sender: Some(sender),
                to: Some(to),
                value: Some(U256::from(units)),
                sign: raw_sign,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn create_address(&self, account: &str, salt: &str) -> Result<Value, BridgeError> {
        self.host.create(account, salt).await
    }

    pub async fn deposit(
        &self,
        from: &str,
        quantity: &str,
        memo: &str,
    ) -> Result<Value, BridgeError> {
        self.host.deposit(from, quantity, memo).await
    }

    pub async fn withdraw(&self, account: &str, quantity: &str) -> Result<Value, BridgeError> {
        self.host.withdraw(account, quantity).await
    }

    pub async fn clear_all(&self) -> Result<Value, BridgeError> {
        self.host.clear_all().await
    }

    pub async fn get_account(&self, address: Address) -> Result<Account, BridgeError> {
        self.host.get_account(address).await
    }

    pub async fn get_all_accounts(&self, limit: u32) -> Result<Vec<Account>, BridgeError> {
        self.host.get_all_accounts(limit).await
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256, BridgeError> {
        self.host.get_balance(address).await
    }

    pub async fn get_nonce(&self, address: Address) -> Result<u64, BridgeError> {
        self.host.get_nonce(address).await
    }

    pub async fn get_storage_at(&self, address: Address, key: U256) -> Result<U256, BridgeError> {
        self.host.get_storage_at(address, key).await
    }

    pub async fn get_code(&self, address: Address) -> Result<Vec<u8>, BridgeError> {
        self.host.get_code(address).await
    }
}
