// Registry of raw EVM signing keys, indexed by their derived address

use std::collections::HashMap;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::errors::BridgeError;
use crate::types::strip_hex_prefix;

// Built once at session construction; keys are never rotated afterwards.
pub struct KeyRegistry {
    keys: HashMap<Address, PrivateKeySigner>,
}

impl KeyRegistry {
    // Accepts 32-byte hex private keys, with or without a 0x prefix. The
    // address for each key is derived from the key material itself.
    pub fn new<K: AsRef<str>>(private_keys: &[K]) -> Result<Self, BridgeError> {
        let mut keys = HashMap::with_capacity(private_keys.len());
        for raw in private_keys {
            let bytes = alloy::hex::decode(strip_hex_prefix(raw.as_ref()))?;
            let signer = PrivateKeySigner::from_slice(&bytes)
                .map_err(|e| BridgeError::Signer(e.to_string()))?;
            keys.insert(signer.address(), signer);
        }
        Ok(Self { keys })
    }

    pub fn signer_for(&self, address: Address) -> Result<&PrivateKeySigner, BridgeError> {
        self.keys
            .get(&address)
            .ok_or(BridgeError::MissingKey { address })
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.keys.keys()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
