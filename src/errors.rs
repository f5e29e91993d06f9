// Error types for bridge operations

use alloy::primitives::Address;

use crate::transport::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{expected} arguments expected for {function} ({names:?}), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
        names: Vec<String>,
    },

    #[error("function {name} is not present in the loaded abi")]
    UnknownFunction { name: String },

    #[error("no contract address bound yet: deploy first or bind one with set_address")]
    UnboundContract,

    #[error("mutating call to {function} requires an explicit sender in CallOptions")]
    MissingSender { function: String },

    #[error("no signing key registered for address {address}")]
    MissingKey { address: Address },

    #[error("signature requested but no sender address was provided")]
    SignatureWithoutSender,

    #[error("no account row found for address {address}")]
    AccountNotFound { address: Address },

    #[error("could not extract call output: {reason}; the node may have contract console disabled")]
    DiagnosticsDisabled { reason: String },

    #[error("invalid quantity {quantity:?}: {reason}")]
    InvalidQuantity { quantity: String, reason: String },

    #[error("abi: {0}")]
    Abi(#[from] alloy::dyn_abi::Error),

    #[error("invalid hex: {0}")]
    Hex(#[from] alloy::hex::FromHexError),

    #[error("signer: {0}")]
    Signer(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("malformed host response: {0}")]
    Receipt(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
