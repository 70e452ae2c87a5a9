use serde_json::json;

/// A JSON-RPC request or response body. The gateway never looks inside it
/// beyond logging the method name; object key order is preserved.
pub type Envelope = serde_json::Value;

/// `ledger` at the latest validated ledger.
pub fn ledger_envelope() -> Envelope {
    json!({
        "method": "ledger",
        "params": [{ "ledger_index": "validated" }],
    })
}

/// `account_info` for `address` at the latest validated ledger.
pub fn account_info_envelope(address: &str) -> Envelope {
    json!({
        "method": "account_info",
        "params": [{ "account": address, "ledger_index": "validated" }],
    })
}
