// Data-driven contract dispatcher: a loaded ABI plus creation bytecode,
// bound to at most one deployed address at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Constructor, Event, Function, JsonAbi, StateMutability};
use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use crate::api::EosEvmClient;
use crate::errors::BridgeError;
use crate::transport::{ActionSubmitter, TableReader};
use crate::tx::TxParams;
use crate::types::EvmResponse;

// Per-invocation overrides. `sender` is mandatory for anything that mutates
// state; `raw_sign` switches from host-account authentication to a signature
// with the sender's registry key.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub sender: Option<Address>,
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    pub raw_sign: bool,
}

// Read-only invocations come back decoded; mutating ones as the relay result.
#[derive(Debug)]
pub enum ContractOutput {
    Call(Vec<DynSolValue>),
    Transaction(EvmResponse),
}

pub struct ContractBinding<S, T> {
    client: Arc<EosEvmClient<S, T>>,
    // Host account that relays this binding's actions
    account: String,
    functions: HashMap<String, Function>,
    constructor: Option<Constructor>,
    events: Vec<Event>,
    bytecode: Vec<u8>,
    // None until deployed or bound explicitly; written only after a deploy
    // relay has resolved
    address: Mutex<Option<Address>>,
}

impl<S: ActionSubmitter, T: TableReader> ContractBinding<S, T> {
    pub(crate) fn new(
        client: Arc<EosEvmClient<S, T>>,
        account: &str,
        abi: JsonAbi,
        bytecode: Vec<u8>,
        address: Option<Address>,
    ) -> Self {
        // Overloads collapse onto one descriptor per name; the last
        // declaration wins.
        let functions = abi
            .functions
            .iter()
            .filter_map(|(name, overloads)| {
                overloads.last().map(|f| (name.clone(), f.clone()))
            })
            .collect();

        Self {
            client,
            account: account.to_string(),
            functions,
            constructor: abi.constructor,
            events: abi.events.into_values().flatten().collect(),
            bytecode,
            address: Mutex::new(address),
        }
    }

    pub fn address(&self) -> Option<Address> {
        *self.address.lock().expect("address lock poisoned")
    }

    // Bind to an already-deployed contract.
    pub fn set_address(&self, address: Address) {
        *self.address.lock().expect("address lock poisoned") = Some(address);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // Invoke an ABI function by name. Validation (name, arity, binding) all
    // happens before anything touches the network. View and pure functions
    // run through the read-only channel and decode their output; everything
    // else relays a state-mutating transaction.
    pub async fn invoke(
        &self,
        name: &str,
        args: &[DynSolValue],
        opts: CallOptions,
    ) -> Result<ContractOutput, BridgeError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| BridgeError::UnknownFunction {
                name: name.to_string(),
            })?;
        if function.inputs.len() != args.len() {
            return Err(BridgeError::Arity {
                function: name.to_string(),
                expected: function.inputs.len(),
                actual: args.len(),
                names: function.inputs.iter().map(|p| p.name.clone()).collect(),
            });
        }
        // Captured once, so a concurrent rebind cannot split one invocation
        // across two addresses.
        let to = self.address().ok_or(BridgeError::UnboundContract)?;
        let data = function.abi_encode_input(args)?;

        if matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            debug!(function = name, "dispatching read-only call");
            let tx = self
                .client
                .create_eth_tx(TxParams {
                    sender: opts.sender,
                    to: Some(to),
                    data,
                    gas_limit: opts.gas_limit,
                    ..Default::default()
                })
                .await?;
            let output = self.client.host().call(&self.account, &tx, opts.sender).await?;
            let values = if output.is_empty() {
                Vec::new()
            } else {
                function.abi_decode_output(&output)?
            };
            return Ok(ContractOutput::Call(values));
        }

        let sender = opts.sender.ok_or_else(|| BridgeError::MissingSender {
            function: name.to_string(),
        })?;
        debug!(function = name, %sender, signed = opts.raw_sign, "dispatching transaction");
        let tx = self
            .client
            .create_eth_tx(TxParams {
                sender: Some(sender),
                to: Some(to),
                data,
                value: opts.value,
                gas_limit: opts.gas_limit,
                sign: opts.raw_sign,
            })
            .await?;
        // A signed transaction carries its own origin; claiming one too
        // would let the two disagree.
        let claimed = (!opts.raw_sign).then_some(sender);
        let response = self.client.host().raw(&self.account, &tx, claimed).await?;
        Ok(ContractOutput::Transaction(response))
    }

    // Deploy the creation bytecode, appending ABI-encoded constructor
    // arguments. On a receipt naming the created address the binding moves
    // to it; without one (console disabled) the caller binds manually.
    pub async fn deploy(
        &self,
        args: &[DynSolValue],
        opts: CallOptions,
    ) -> Result<EvmResponse, BridgeError> {
        let sender = opts.sender.ok_or_else(|| BridgeError::MissingSender {
            function: "constructor".to_string(),
        })?;

        let mut payload = self.bytecode.clone();
        match &self.constructor {
            Some(ctor) => {
                if ctor.inputs.len() != args.len() {
                    return Err(BridgeError::Arity {
                        function: "constructor".to_string(),
                        expected: ctor.inputs.len(),
                        actual: args.len(),
                        names: ctor.inputs.iter().map(|p| p.name.clone()).collect(),
                    });
                }
                payload.extend(ctor.abi_encode_input(args)?);
            }
            None if !args.is_empty() => {
                return Err(BridgeError::Arity {
                    function: "constructor".to_string(),
                    expected: 0,
                    actual: args.len(),
                    names: Vec::new(),
                });
            }
            None => {}
        }

        let tx = self
            .client
            .create_eth_tx(TxParams {
                sender: Some(sender),
                to: None,
                data: payload,
                value: opts.value,
                gas_limit: opts.gas_limit,
                sign: opts.raw_sign,
            })
            .await?;
        let claimed = (!opts.raw_sign).then_some(sender);
        let response = self.client.host().raw(&self.account, &tx, claimed).await?;

        if let Some(receipt) = &response.eth {
            if let Some(address) = receipt.created_address()? {
                info!(%address, "contract deployed, binding to the created address");
                self.set_address(address);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ApiConfig, CONSOLE_OUTPUT_PREFIX, EXPECTED_ASSERTION_ERROR_CODE};
    use crate::transport::{
        LedgerError, MockActionSubmitter, MockTableReader, TableRows,
    };
    use alloy::dyn_abi::DynSolType;
    use serde_json::json;
    use std::str::FromStr;

    const ERC20_ABI: &str = r#"[
        {"type":"constructor","stateMutability":"nonpayable","inputs":[
            {"name":"name_","type":"string"},
            {"name":"symbol_","type":"string"},
            {"name":"decimals_","type":"uint8"},
            {"name":"supply_","type":"uint256"}]},
        {"type":"function","name":"balanceOf","stateMutability":"view",
            "inputs":[{"name":"owner","type":"address"}],
            "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"decimals","stateMutability":"view",
            "inputs":[],"outputs":[{"name":"","type":"uint8"}]},
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
            "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
            "outputs":[{"name":"","type":"bool"}]},
        {"type":"event","name":"Transfer","anonymous":false,"inputs":[
            {"name":"from","type":"address","indexed":true},
            {"name":"to","type":"address","indexed":true},
            {"name":"value","type":"uint256","indexed":false}]}
    ]"#;

    const SENDER: &str = "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F";
    const CONTRACT: &str = "0xdc04977a2078c8ffdf086d618d1f961b6c546222";

    fn binding(
        submitter: MockActionSubmitter,
        tables: MockTableReader,
    ) -> ContractBinding<MockActionSubmitter, MockTableReader> {
        let client = Arc::new(
            EosEvmClient::new(
                ApiConfig::default(),
                Arc::new(submitter),
                Arc::new(tables),
                &[] as &[&str],
            )
            .unwrap(),
        );
        client.contract("evmuser", ERC20_ABI, "600160005260206000f3").unwrap()
    }

    fn some_args() -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(Address::from_str(SENDER).unwrap()),
            DynSolValue::Uint(U256::from(10u64), 256),
        ]
    }

    #[tokio::test]
    async fn unknown_function_is_rejected_before_any_network_call() {
        let contract = binding(MockActionSubmitter::new(), MockTableReader::new());
        let err = contract.invoke("mint", &[], CallOptions::default()).await.unwrap_err();
        assert!(matches!(err, BridgeError::UnknownFunction { name } if name == "mint"));
    }

    #[tokio::test]
    async fn arity_mismatch_names_the_parameters() {
        let contract = binding(MockActionSubmitter::new(), MockTableReader::new());

        let short = contract
            .invoke("transfer", &some_args()[..1], CallOptions::default())
            .await
            .unwrap_err();
        match short {
            BridgeError::Arity { function, expected, actual, names } => {
                assert_eq!(function, "transfer");
                assert_eq!((expected, actual), (2, 1));
                assert_eq!(names, ["to", "amount"]);
            }
            other => panic!("expected arity error, got {other:?}"),
        }

        let mut long = some_args();
        long.push(DynSolValue::Bool(true));
        let err = contract.invoke("transfer", &long, CallOptions::default()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Arity { actual: 3, .. }));
    }

    #[tokio::test]
    async fn unbound_contract_is_rejected() {
        let contract = binding(MockActionSubmitter::new(), MockTableReader::new());
        let err = contract
            .invoke("transfer", &some_args(), CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnboundContract));
    }

    #[tokio::test]
    async fn mutating_call_requires_a_sender() {
        let contract = binding(MockActionSubmitter::new(), MockTableReader::new());
        contract.set_address(Address::from_str(CONTRACT).unwrap());

        let err = contract
            .invoke("transfer", &some_args(), CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingSender { function } if function == "transfer"));
    }

    #[tokio::test]
    async fn view_call_decodes_console_output() {
        let mut submitter = MockActionSubmitter::new();
        submitter
            .expect_transact()
            .withf(|actions| {
                let action = &actions[0];
                // 4-byte selector of balanceOf(address) rides in the payload
                action.name == "call"
                    && action.data["tx"].as_str().unwrap().contains("70a08231")
            })
            .returning(|_| {
                Err(LedgerError {
                    code: EXPECTED_ASSERTION_ERROR_CODE,
                    name: "eosio_assert_message_exception".to_string(),
                    message: "eosio_assert_message assertion failure".to_string(),
                    details: vec![format!(
                        "{CONSOLE_OUTPUT_PREFIX}00000000000000000000000000000000000000000000000000000000000f4240"
                    )],
                })
            });

        let contract = binding(submitter, MockTableReader::new());
        contract.set_address(Address::from_str(CONTRACT).unwrap());

        let owner = DynSolValue::Address(Address::from_str(SENDER).unwrap());
        let output = contract
            .invoke("balanceOf", &[owner], CallOptions::default())
            .await
            .unwrap();
        match output {
            ContractOutput::Call(values) => {
                assert_eq!(values, vec![DynSolValue::Uint(U256::from(1_000_000u64), 256)]);
            }
            other => panic!("expected decoded call output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_view_calls_return_identical_values() {
        let mut submitter = MockActionSubmitter::new();
        submitter.expect_transact().times(2).returning(|_| {
            Err(LedgerError {
                code: EXPECTED_ASSERTION_ERROR_CODE,
                name: "eosio_assert_message_exception".to_string(),
                message: "eosio_assert_message assertion failure".to_string(),
                details: vec![format!(
                    "{CONSOLE_OUTPUT_PREFIX}00000000000000000000000000000000000000000000000000000000000f4240"
                )],
            })
        });

        let contract = binding(submitter, MockTableReader::new());
        contract.set_address(Address::from_str(CONTRACT).unwrap());
        let owner = DynSolValue::Address(Address::from_str(SENDER).unwrap());

        let mut decoded = Vec::new();
        for _ in 0..2 {
            match contract
                .invoke("balanceOf", &[owner.clone()], CallOptions::default())
                .await
                .unwrap()
            {
                ContractOutput::Call(values) => decoded.push(values),
                other => panic!("expected decoded call output, got {other:?}"),
            }
        }
        assert_eq!(decoded[0], decoded[1]);
        assert_eq!(decoded[0], vec![DynSolValue::Uint(U256::from(1_000_000u64), 256)]);
    }

    #[tokio::test]
    async fn view_call_with_empty_output_decodes_to_no_values() {
        let mut submitter = MockActionSubmitter::new();
        submitter.expect_transact().returning(|_| {
            Err(LedgerError {
                code: EXPECTED_ASSERTION_ERROR_CODE,
                name: "eosio_assert_message_exception".to_string(),
                message: "eosio_assert_message assertion failure".to_string(),
                details: vec![CONSOLE_OUTPUT_PREFIX.to_string()],
            })
        });

        let contract = binding(submitter, MockTableReader::new());
        contract.set_address(Address::from_str(CONTRACT).unwrap());

        let output = contract
            .invoke("decimals", &[], CallOptions::default())
            .await
            .unwrap();
        match output {
            ContractOutput::Call(values) => assert!(values.is_empty()),
            other => panic!("expected decoded call output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mutating_call_relays_through_raw() {
        let mut tables = MockTableReader::new();
        tables.expect_get_table_rows().returning(|_| {
            Ok(TableRows {
                rows: vec![json!({
                    "index": 1,
                    "address": "9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f",
                    "account": "evmuser",
                    "balance": "1.0000 EOS",
                    "nonce": 7,
                    "code": ""
                })],
                ..Default::default()
            })
        });

        let mut submitter = MockActionSubmitter::new();
        submitter
            .expect_transact()
            .withf(|actions| {
                let action = &actions[0];
                action.name == "raw"
                    && action.data["sender"]
                        == json!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f")
                    && action.data["tx"].as_str().unwrap().contains("a9059cbb")
            })
            .returning(|_| {
                Ok(json!({
                    "transaction_id": "t1",
                    "processed": { "action_traces": [{ "console": "{\"status\":\"1\"}" }] }
                }))
            });

        let contract = binding(submitter, tables);
        contract.set_address(Address::from_str(CONTRACT).unwrap());

        let opts = CallOptions {
            sender: Some(Address::from_str(SENDER).unwrap()),
            ..Default::default()
        };
        let output = contract.invoke("transfer", &some_args(), opts).await.unwrap();
        assert!(matches!(output, ContractOutput::Transaction(r) if r.eth.is_some()));
    }

    #[tokio::test]
    async fn deploy_binds_the_created_address() {
        let mut tables = MockTableReader::new();
        tables
            .expect_get_table_rows()
            .returning(|_| Ok(TableRows::default()));

        let mut submitter = MockActionSubmitter::new();
        submitter
            .expect_transact()
            .withf(|actions| actions[0].name == "raw")
            .returning(|_| {
                Ok(json!({
                    "transaction_id": "t2",
                    "processed": { "action_traces": [{
                        "console": "{\"status\":\"1\",\"createdAddress\":\"dc04977a2078c8ffdf086d618d1f961b6c546222\"}"
                    }]}
                }))
            });

        let contract = binding(submitter, tables);
        assert!(contract.address().is_none());

        let args = vec![
            DynSolValue::String("FIRE Token".to_string()),
            DynSolValue::String("FIRE".to_string()),
            DynSolValue::Uint(U256::from(4u64), 8),
            DynSolValue::Uint(U256::from(1_000_000u64), 256),
        ];
        let opts = CallOptions {
            sender: Some(Address::from_str(SENDER).unwrap()),
            ..Default::default()
        };
        let response = contract.deploy(&args, opts).await.unwrap();

        assert!(response.eth.is_some());
        assert_eq!(contract.address(), Some(Address::from_str(CONTRACT).unwrap()));
    }

    #[tokio::test]
    async fn deploy_checks_constructor_arity() {
        let contract = binding(MockActionSubmitter::new(), MockTableReader::new());
        let opts = CallOptions {
            sender: Some(Address::from_str(SENDER).unwrap()),
            ..Default::default()
        };
        let err = contract.deploy(&[], opts).await.unwrap_err();
        assert!(matches!(err, BridgeError::Arity { expected: 4, actual: 0, .. }));
    }

    #[test]
    fn transfer_selector_matches_reference() {
        let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
        let transfer = abi.functions.get("transfer").and_then(|v| v.last()).unwrap();
        assert_eq!(transfer.selector().as_slice(), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn constructor_arguments_round_trip() {
        let abi: JsonAbi = serde_json::from_str(ERC20_ABI).unwrap();
        let ctor = abi.constructor.unwrap();

        let args = vec![
            DynSolValue::String("FIRE Token".to_string()),
            DynSolValue::String("FIRE".to_string()),
            DynSolValue::Uint(U256::from(4u64), 8),
            DynSolValue::Uint(U256::from(1_000_000u64), 256),
        ];
        let encoded = ctor.abi_encode_input(&args).unwrap();

        let ty = DynSolType::parse("(string,string,uint8,uint256)").unwrap();
        let decoded = ty.abi_decode_params(&encoded).unwrap();
        assert_eq!(decoded, DynSolValue::Tuple(args));
    }
}
