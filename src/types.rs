// Common types and re-exports

use serde::Deserialize;
use serde_json::Value;

use crate::errors::BridgeError;

pub use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256},
};

// Row of the bridge contract's `account` table.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub index: u64,
    // 40 lowercase hex characters, no 0x prefix
    pub address: String,
    // Linked host account name, empty if none
    #[serde(default)]
    pub account: String,
    // Asset string, e.g. "0.0001 EOS"
    pub balance: String,
    pub nonce: u64,
    // Hex-encoded contract code, empty for non-contract accounts
    #[serde(default)]
    pub code: String,
}

impl Account {
    // Balance in the embedded VM's integer value units.
    pub fn balance_units(&self, symbol: &str, precision: u32) -> Result<u64, BridgeError> {
        parse_quantity(&self.balance, symbol, precision)
    }

    pub fn code_bytes(&self) -> Result<Vec<u8>, BridgeError> {
        Ok(alloy::hex::decode(strip_hex_prefix(&self.code))?)
    }
}

// Row of the per-account `accountstate` table.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountStateRow {
    pub index: u64,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvmLog {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

// Receipt emitted by the bridge contract on its diagnostic console channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvmReceipt {
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<u64>,
    pub nonce: Option<u64>,
    pub v: Option<u64>,
    pub r: Option<String>,
    pub s: Option<String>,
    pub created_address: Option<String>,
    pub gas_used: Option<u64>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u64>,
    pub logs: Vec<EvmLog>,
    pub output: Option<String>,
    pub errors: Vec<String>,
    pub transaction_hash: Option<String>,
}

impl EvmReceipt {
    // Address of a newly created contract, if this receipt records a deploy.
    pub fn created_address(&self) -> Result<Option<Address>, BridgeError> {
        let Some(hex_addr) = self.created_address.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let bytes = alloy::hex::decode(strip_hex_prefix(hex_addr))?;
        if bytes.len() != Address::len_bytes() {
            return Err(BridgeError::Receipt(format!(
                "createdAddress {hex_addr:?} is not a 20-byte address"
            )));
        }
        Ok(Some(Address::from_slice(&bytes)))
    }
}

// Dual-channel relay result. The host receipt is always present; the EVM
// receipt is recovered opportunistically from console output and is None when
// the node has contract console disabled.
#[derive(Debug, Clone)]
pub struct EvmResponse {
    pub eth: Option<EvmReceipt>,
    pub eos: Value,
}

pub(crate) fn strip_hex_prefix(value: &str) -> &str {
    value.strip_prefix("0x").unwrap_or(value)
}

// Lowercase hex rendering used on the wire, no 0x prefix.
pub(crate) fn address_hex(address: Address) -> String {
    alloy::hex::encode(address.as_slice())
}

// Parse a decimal asset quantity like "1.0000 EOS" into integer subunits.
// The symbol must match and the fractional part must not exceed the token's
// precision; missing fractional digits are padded.
pub fn parse_quantity(quantity: &str, symbol: &str, precision: u32) -> Result<u64, BridgeError> {
    let invalid = |reason: &str| BridgeError::InvalidQuantity {
        quantity: quantity.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = quantity.split_whitespace();
    let amount = parts.next().ok_or_else(|| invalid("missing amount"))?;
    let quantity_symbol = parts.next().ok_or_else(|| invalid("missing symbol"))?;
    if parts.next().is_some() {
        return Err(invalid("expected \"<amount> <symbol>\""));
    }
    if quantity_symbol != symbol {
        return Err(invalid(&format!("expected symbol {symbol}")));
    }

    let (integral, fraction) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if fraction.len() > precision as usize {
        return Err(invalid(&format!("at most {precision} decimal places allowed")));
    }
    if integral.is_empty() && fraction.is_empty() {
        return Err(invalid("missing amount"));
    }
    if !integral.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid("amount must be an unsigned decimal"));
    }

    let scale = 10u64
        .checked_pow(precision)
        .ok_or_else(|| invalid(&format!("precision {precision} out of range")))?;
    let whole: u64 = if integral.is_empty() {
        0
    } else {
        integral.parse().map_err(|_| invalid("amount out of range"))?
    };
    let frac: u64 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().map_err(|_| invalid("amount out of range"))?
    };
    // fraction.len() <= precision was checked above, so this cannot overflow
    // past the scale itself
    let frac = frac * 10u64.pow(precision - fraction.len() as u32);

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| invalid("amount out of range"))
}
