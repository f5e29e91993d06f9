// Thin owned layer over the host ledger: bridge-contract actions, dual
// receipt demultiplexing, and typed table reads.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::{
    ApiConfig, ACCOUNT_STATE_TABLE, ACCOUNT_TABLE, BY_ADDRESS_INDEX_POSITION,
    CONSOLE_OUTPUT_PREFIX, EXPECTED_ASSERTION_ERROR_CODE, SHA256_KEY_TYPE,
};
use crate::errors::BridgeError;
use crate::transport::{ActionSubmitter, Authorization, HostAction, TableQuery, TableReader};
use crate::types::{
    address_hex, strip_hex_prefix, Account, AccountStateRow, EvmReceipt, EvmResponse,
};

pub struct HostApi<S, T> {
    submitter: Arc<S>,
    tables: Arc<T>,
    config: ApiConfig,
}

impl<S: ActionSubmitter, T: TableReader> HostApi<S, T> {
    pub fn new(config: ApiConfig, submitter: Arc<S>, tables: Arc<T>) -> Self {
        Self {
            submitter,
            tables,
            config,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    // Submit actions through the external signer/broadcaster. Failures are
    // logged for diagnosis and propagated unchanged.
    pub async fn transact(&self, actions: Vec<HostAction>) -> Result<Value, BridgeError> {
        debug!(count = actions.len(), "submitting host actions");
        self.submitter.transact(actions).await.map_err(|e| {
            error!(code = e.code, "host ledger rejected submission: {e}");
            BridgeError::Ledger(e)
        })
    }

    // Relay a serialized transaction through the bridge contract's `raw`
    // action. `sender` names the claimed origin for unsigned transactions;
    // the relaying host account vouches for it.
    pub async fn raw(
        &self,
        account: &str,
        tx_hex: &str,
        sender: Option<Address>,
    ) -> Result<EvmResponse, BridgeError> {
        let action = HostAction::new(
            &self.config.evm_contract,
            "raw",
            relay_data(tx_hex, sender),
            Authorization::active(account),
        );

        let eos = self.transact(vec![action]).await?;
        let eth = match parse_console_receipt(&eos) {
            Ok(receipt) => Some(receipt),
            Err(reason) => {
                warn!(%reason, "could not recover the evm receipt from console output; is contract console enabled on this node?");
                None
            }
        };
        Ok(EvmResponse { eth, eos })
    }

    // Read-only relay through the bridge contract's `call` action. The
    // contract reverts on purpose with the output embedded in the assert
    // message; anything else means the convention could not be applied.
    pub async fn call(
        &self,
        account: &str,
        tx_hex: &str,
        sender: Option<Address>,
    ) -> Result<Vec<u8>, BridgeError> {
        let action = HostAction::new(
            &self.config.evm_contract,
            "call",
            relay_data(tx_hex, sender),
            Authorization::active(account),
        );

        debug!("submitting read-only call action");
        match self.submitter.transact(vec![action]).await {
            Ok(_) => Err(BridgeError::DiagnosticsDisabled {
                reason: "call action succeeded without carrying output".to_string(),
            }),
            Err(err) if err.code == EXPECTED_ASSERTION_ERROR_CODE => {
                let output = err
                    .details
                    .iter()
                    .find_map(|d| d.strip_prefix(CONSOLE_OUTPUT_PREFIX))
                    .ok_or_else(|| BridgeError::DiagnosticsDisabled {
                        reason: format!(
                            "assertion carried no {CONSOLE_OUTPUT_PREFIX:?} detail message"
                        ),
                    })?;
                let cleaned: String = output.split_whitespace().collect();
                Ok(alloy::hex::decode(strip_hex_prefix(&cleaned))?)
            }
            Err(err) => Err(BridgeError::DiagnosticsDisabled {
                reason: format!("unexpected ledger error code {}: {}", err.code, err.message),
            }),
        }
    }

    // Derive a fresh EVM address for a host account from an arbitrary salt.
    // The derivation itself lives in the bridge contract.
    pub async fn create(&self, account: &str, salt: &str) -> Result<Value, BridgeError> {
        let action = HostAction::new(
            &self.config.evm_contract,
            "create",
            json!({ "account": account, "data": salt }),
            Authorization::active(account),
        );
        self.transact(vec![action]).await
    }

    // Move bridged balance back out to the host account's token balance.
    pub async fn withdraw(&self, account: &str, quantity: &str) -> Result<Value, BridgeError> {
        let action = HostAction::new(
            &self.config.evm_contract,
            "withdraw",
            json!({ "to": account, "quantity": quantity }),
            Authorization::active(account),
        );
        self.transact(vec![action]).await
    }

    // Deposit is a host-native token transfer to the bridge account; no
    // nonce or signature concerns on this side.
    pub async fn deposit(
        &self,
        from: &str,
        quantity: &str,
        memo: &str,
    ) -> Result<Value, BridgeError> {
        let action = HostAction::new(
            &self.config.token_contract,
            "transfer",
            json!({
                "from": from,
                "to": self.config.evm_contract,
                "quantity": quantity,
                "memo": memo,
            }),
            Authorization::active(from),
        );
        self.transact(vec![action]).await
    }

    // Test-only full state reset, authorized by the bridge account itself.
    pub async fn clear_all(&self) -> Result<Value, BridgeError> {
        let action = HostAction::new(
            &self.config.evm_contract,
            "clearall",
            json!({}),
            Authorization::active(&self.config.evm_contract),
        );
        self.transact(vec![action]).await
    }

    // Fetch the account row for an address via the by-address secondary
    // index. Bounded range scans can hand back a neighbouring row, so the
    // returned address is checked against the query exactly.
    pub async fn get_account(&self, address: Address) -> Result<Account, BridgeError> {
        let hex_addr = address_hex(address);
        let padded = format!("{}{}", "0".repeat(24), hex_addr);

        let rows = self
            .tables
            .get_table_rows(TableQuery {
                code: self.config.evm_contract.clone(),
                scope: self.config.evm_contract.clone(),
                table: ACCOUNT_TABLE.to_string(),
                key_type: SHA256_KEY_TYPE.to_string(),
                index_position: BY_ADDRESS_INDEX_POSITION,
                lower_bound: padded.clone(),
                upper_bound: padded,
                limit: 1,
                ..Default::default()
            })
            .await
            .map_err(BridgeError::Ledger)?;

        let row = rows
            .rows
            .into_iter()
            .next()
            .ok_or(BridgeError::AccountNotFound { address })?;
        let account: Account = serde_json::from_value(row)?;
        if !account.address.eq_ignore_ascii_case(&hex_addr) {
            return Err(BridgeError::AccountNotFound { address });
        }
        Ok(account)
    }

    // Primary-index scan over all EVM accounts known to the bridge.
    pub async fn get_all_accounts(&self, limit: u32) -> Result<Vec<Account>, BridgeError> {
        let rows = self
            .tables
            .get_table_rows(TableQuery {
                code: self.config.evm_contract.clone(),
                scope: self.config.evm_contract.clone(),
                table: ACCOUNT_TABLE.to_string(),
                limit,
                ..Default::default()
            })
            .await
            .map_err(BridgeError::Ledger)?;

        rows.rows
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(BridgeError::Json))
            .collect()
    }

    // Current nonce for an address. An address with no account row has
    // nonce 0: it simply has not sent anything yet.
    pub async fn get_nonce(&self, address: Address) -> Result<u64, BridgeError> {
        match self.get_account(address).await {
            Ok(account) => Ok(account.nonce),
            Err(BridgeError::AccountNotFound { .. }) => Ok(0),
            Err(err) => Err(err),
        }
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256, BridgeError> {
        let account = self.get_account(address).await?;
        let units =
            account.balance_units(&self.config.token_symbol, self.config.token_precision)?;
        Ok(U256::from(units))
    }

    // Storage slot lookup. A missing account is an error; a missing slot
    // reads as zero.
    pub async fn get_storage_at(&self, address: Address, key: U256) -> Result<U256, BridgeError> {
        let account = self.get_account(address).await?;
        let key_hex = alloy::hex::encode(key.to_be_bytes::<32>());

        let rows = self
            .tables
            .get_table_rows(TableQuery {
                code: self.config.evm_contract.clone(),
                scope: account.index.to_string(),
                table: ACCOUNT_STATE_TABLE.to_string(),
                key_type: SHA256_KEY_TYPE.to_string(),
                index_position: BY_ADDRESS_INDEX_POSITION,
                lower_bound: key_hex.clone(),
                upper_bound: key_hex.clone(),
                limit: 1,
                ..Default::default()
            })
            .await
            .map_err(BridgeError::Ledger)?;

        let Some(row) = rows.rows.into_iter().next() else {
            return Ok(U256::ZERO);
        };
        let slot: AccountStateRow = serde_json::from_value(row)?;
        if !slot.key.eq_ignore_ascii_case(&key_hex) {
            return Ok(U256::ZERO);
        }
        U256::from_str_radix(strip_hex_prefix(&slot.value), 16)
            .map_err(|e| BridgeError::Receipt(format!("storage value {:?}: {e}", slot.value)))
    }

    pub async fn get_code(&self, address: Address) -> Result<Vec<u8>, BridgeError> {
        self.get_account(address).await?.code_bytes()
    }
}

// The bridge contract's `sender` parameter is an optional; when no sender is
// claimed the field is left out entirely rather than sent as null.
fn relay_data(tx_hex: &str, sender: Option<Address>) -> Value {
    let mut data = json!({ "tx": strip_hex_prefix(tx_hex) });
    if let Some(sender) = sender {
        data["sender"] = json!(address_hex(sender));
    }
    data
}

fn parse_console_receipt(result: &Value) -> Result<EvmReceipt, String> {
    let console = result
        .pointer("/processed/action_traces/0/console")
        .and_then(Value::as_str)
        .ok_or_else(|| "no console output in the action trace".to_string())?;
    serde_json::from_str(console).map_err(|e| e.to_string())
}
