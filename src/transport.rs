// Host chain transport: the action-submission seam and the table-query API

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authorization {
    pub actor: String,
    pub permission: String,
}

impl Authorization {
    // Standard active-permission authorization for a single actor.
    pub fn active(actor: &str) -> Vec<Self> {
        vec![Self {
            actor: actor.to_string(),
            permission: "active".to_string(),
        }]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostAction {
    pub account: String,
    pub name: String,
    pub data: Value,
    pub authorization: Vec<Authorization>,
}

impl HostAction {
    pub fn new(account: &str, name: &str, data: Value, authorization: Vec<Authorization>) -> Self {
        Self {
            account: account.to_string(),
            name: name.to_string(),
            data,
            authorization,
        }
    }
}

// Structured rejection from the host ledger, mirroring the node's error body.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{name}: {message} (code {code})")]
pub struct LedgerError {
    pub code: u64,
    pub name: String,
    pub message: String,
    pub details: Vec<String>,
}

impl LedgerError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            name: "transport".to_string(),
            message: message.into(),
            details: Vec::new(),
        }
    }

    // Parse a nodeos-style error body:
    // { "error": { "code": .., "name": .., "what": .., "details": [{ "message": .. }] } }
    pub fn from_chain_error(body: &Value) -> Option<Self> {
        let error = body.get("error")?;
        Some(Self {
            code: error.get("code").and_then(Value::as_u64).unwrap_or(0),
            name: error
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            message: error
                .get("what")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            details: error
                .get("details")
                .and_then(Value::as_array)
                .map(|details| {
                    details
                        .iter()
                        .filter_map(|d| d.get("message").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

// Signs and broadcasts a host transaction wrapping the given actions, using
// the ledger's standard envelope (bounded validity window). Host-side key
// management lives entirely behind this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionSubmitter: Send + Sync {
    async fn transact(&self, actions: Vec<HostAction>) -> Result<Value, LedgerError>;
}

// Parameters for a (possibly secondary-indexed) table scan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableQuery {
    pub json: bool,
    pub code: String,
    pub scope: String,
    pub table: String,
    pub key_type: String,
    pub index_position: u32,
    pub lower_bound: String,
    pub upper_bound: String,
    pub limit: u32,
    pub reverse: bool,
    pub show_payer: bool,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            json: true,
            code: String::new(),
            scope: String::new(),
            table: String::new(),
            key_type: "i64".to_string(),
            index_position: 1,
            lower_bound: String::new(),
            upper_bound: String::new(),
            limit: 10,
            reverse: false,
            show_payer: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRows {
    pub rows: Vec<Value>,
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub next_key: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableReader: Send + Sync {
    async fn get_table_rows(&self, query: TableQuery) -> Result<TableRows, LedgerError>;
}

// Table reads need no signing, so the library speaks this endpoint natively.
pub struct HttpTableReader {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTableReader {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TableReader for HttpTableReader {
    async fn get_table_rows(&self, query: TableQuery) -> Result<TableRows, LedgerError> {
        let url = format!(
            "{}/v1/chain/get_table_rows",
            self.endpoint.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(|e| LedgerError::transport(format!("get_table_rows request failed: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::transport(format!("get_table_rows returned no json: {e}")))?;

        if !status.is_success() {
            return Err(LedgerError::from_chain_error(&body)
                .unwrap_or_else(|| LedgerError::transport(format!("http status {status}"))));
        }

        serde_json::from_value(body)
            .map_err(|e| LedgerError::transport(format!("unexpected get_table_rows shape: {e}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn chain_error_body_is_parsed() {
        let body = json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 3050003,
                "name": "eosio_assert_message_exception",
                "what": "eosio_assert_message assertion failure",
                "details": [
                    { "message": "assertion failure with message: something" },
                    { "message": "pending console output: deadbeef" }
                ]
            }
        });

        let err = LedgerError::from_chain_error(&body).unwrap();
        assert_eq!(err.code, 3050003);
        assert_eq!(err.name, "eosio_assert_message_exception");
        assert_eq!(err.details.len(), 2);
        assert_eq!(err.details[1], "pending console output: deadbeef");
    }

    #[test]
    fn chain_error_requires_error_object() {
        assert!(LedgerError::from_chain_error(&json!({"ok": true})).is_none());
    }

    #[test]
    fn table_query_defaults_match_node_expectations() {
        let query = TableQuery::default();
        assert!(query.json);
        assert_eq!(query.key_type, "i64");
        assert_eq!(query.index_position, 1);
        assert_eq!(query.limit, 10);

        let encoded = serde_json::to_value(&query).unwrap();
        assert_eq!(encoded["json"], json!(true));
        assert_eq!(encoded["reverse"], json!(false));
    }
}
