// Configuration and protocol constants for the eosio.evm bridge

use alloy::primitives::Address;

// Gas price inside the embedded VM is fixed by the bridge contract, not
// market-driven.
pub const DEFAULT_GAS_PRICE: u128 = 1;

// 2,000,000 units, enough for contract deployment in the default config.
pub const DEFAULT_GAS_LIMIT: u64 = 0x1E_8480;

pub const DEFAULT_CHAIN_ID: u64 = 1;

// The bridge contract denominates EVM value in subunits of the host chain's
// native token: 1.0000 EOS == 10_000 value units.
pub const DEFAULT_TOKEN_SYMBOL: &str = "EOS";
pub const DEFAULT_TOKEN_PRECISION: u32 = 4;
pub const DEFAULT_TOKEN_CONTRACT: &str = "eosio.token";

// On-chain tables kept by the bridge contract. `account` is scoped to the
// contract itself; `accountstate` is scoped per account index.
pub const ACCOUNT_TABLE: &str = "account";
pub const ACCOUNT_STATE_TABLE: &str = "accountstate";

// Secondary index used for address and storage-key lookups: a sha256 key at
// index position 2, holding the value zero-padded on the left to 32 bytes.
pub const BY_ADDRESS_INDEX_POSITION: u32 = 2;
pub const SHA256_KEY_TYPE: &str = "sha256";

// Read-only `call` actions return their output by asserting with the result
// embedded in the error message. The node reports such asserts with this
// error code (eosio_assert_message_exception) and carries the output in a
// detail message behind this prefix. Both values are part of the bridge
// contract's external interface and may differ between contract versions.
pub const EXPECTED_ASSERTION_ERROR_CODE: u64 = 3_050_003;
pub const CONSOLE_OUTPUT_PREFIX: &str = "pending console output: ";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    // Host chain HTTP endpoint, e.g. "http://127.0.0.1:8888"
    pub endpoint: String,
    // Chain id baked into the embedded VM's transaction encoding
    pub chain_id: u64,
    // Host account the bridge contract is deployed to
    pub evm_contract: String,
    // Host account of the native token contract (deposit path)
    pub token_contract: String,
    // Expected currency for value transfers
    pub token_symbol: String,
    pub token_precision: u32,
    // Pre-bound EVM contract address, if already deployed
    pub bound_address: Option<Address>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8888".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            evm_contract: "eosio.evm".to_string(),
            token_contract: DEFAULT_TOKEN_CONTRACT.to_string(),
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            token_precision: DEFAULT_TOKEN_PRECISION,
            bound_address: None,
        }
    }
}
