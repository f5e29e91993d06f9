// Embedded-VM transaction assembly and encoding.
//
// The wire format is the 9-field legacy RLP list the bridge contract decodes:
// (nonce, gasPrice, gasLimit, to, value, data, v, r, s). Unsigned relays use
// the EIP-155 signing form (v = chain id, r = s = 0), which the contract
// recognizes by the zeroed signature and authenticates via the relaying host
// account instead.

use alloy::consensus::{SignableTransaction, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::config::{DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE};
use crate::errors::BridgeError;

#[derive(Debug, Clone, Default)]
pub struct TxParams {
    // Sender address; its on-chain nonce is resolved before building
    pub sender: Option<Address>,
    // Absent destination signals contract creation
    pub to: Option<Address>,
    pub data: Vec<u8>,
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    // Sign with the sender's registry key instead of relying on host
    // account authorization
    pub sign: bool,
}

pub(crate) fn assemble(nonce: u64, chain_id: u64, params: &TxParams) -> TxLegacy {
    TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price: DEFAULT_GAS_PRICE,
        gas_limit: params.gas_limit.unwrap_or(DEFAULT_GAS_LIMIT),
        to: match params.to {
            Some(address) => TxKind::Call(address),
            None => TxKind::Create,
        },
        value: params.value.unwrap_or(U256::ZERO),
        input: params.data.clone().into(),
    }
}

// Hex encoding of the unsigned wire form, no 0x prefix.
pub(crate) fn encode_unsigned(tx: &TxLegacy) -> String {
    let mut buf = Vec::new();
    tx.encode_for_signing(&mut buf);
    alloy::hex::encode(buf)
}

// Sign with the given key and return the hex of the signed wire form. The
// caller is responsible for looking the key up by the sender address, which
// ties signer identity to the stated sender.
pub(crate) fn sign_and_encode(
    tx: TxLegacy,
    signer: &PrivateKeySigner,
) -> Result<String, BridgeError> {
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| BridgeError::Signer(e.to_string()))?;
    let signed = tx.into_signed(signature);
    Ok(alloy::hex::encode(signed.encoded_2718()))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    // The worked example from EIP-155: nonce 9, gas price 20 gwei, gas limit
    // 21000, value 1 ether, chain id 1, key 0x4646...46.
    fn eip155_example() -> TxLegacy {
        TxLegacy {
            chain_id: Some(1),
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(
                Address::from_str("0x3535353535353535353535353535353535353535").unwrap(),
            ),
            value: U256::from(1_000_000_000_000_000_000u64),
            input: Default::default(),
        }
    }

    #[test]
    fn unsigned_encoding_matches_eip155_signing_data() {
        let tx = eip155_example();
        assert_eq!(
            encode_unsigned(&tx),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
    }

    #[test]
    fn signed_encoding_matches_eip155_reference() {
        let key = "4646464646464646464646464646464646464646464646464646464646464646";
        let signer = PrivateKeySigner::from_slice(&alloy::hex::decode(key).unwrap()).unwrap();

        let encoded = sign_and_encode(eip155_example(), &signer).unwrap();
        assert_eq!(
            encoded,
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn defaults_are_the_protocol_constants() {
        let tx = assemble(0, 1, &TxParams::default());
        assert_eq!(tx.gas_price, DEFAULT_GAS_PRICE);
        assert_eq!(tx.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.to, TxKind::Create);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let to = Address::from_str("0x3535353535353535353535353535353535353535").unwrap();
        let params = TxParams {
            to: Some(to),
            value: Some(U256::from(7u64)),
            gas_limit: Some(100_000),
            ..Default::default()
        };
        let tx = assemble(3, 1, &params);
        assert_eq!(tx.nonce, 3);
        assert_eq!(tx.to, TxKind::Call(to));
        assert_eq!(tx.value, U256::from(7u64));
        assert_eq!(tx.gas_limit, 100_000);
    }
}
