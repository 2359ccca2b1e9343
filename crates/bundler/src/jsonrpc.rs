//! JSON-RPC 2.0 envelope used by the bundler endpoints

use aa_sdk_primitives::constants::bundler::JSONRPC_VERSION;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// JSON-RPC request
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P> JsonRpcRequest<'a, P> {
    pub fn new(id: u64, method: &'a str, params: P) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id, method, params }
    }
}

/// JSON-RPC response; exactly one of `result` and `error` is meaningful
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// Error returned by the bundler
///
/// Bundlers return either a bare string or a `{code, message}` object; both decode into this
/// type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RpcErrorObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl<'de> Deserialize<'de> for RpcErrorObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorFields {
            #[serde(default)]
            code: Option<i64>,
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            data: Option<serde_json::Value>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Message(String),
            Object(ErrorFields),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Message(message) => Self { message: Some(message), ..Default::default() },
            Repr::Object(ErrorFields { code, message, data }) => Self { code, message, data },
        })
    }
}

impl fmt::Display for RpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "code: {code}, message: {message}"),
            (Some(code), None) => write!(f, "code: {code}"),
            (None, Some(message)) => write!(f, "message: {message}"),
            (None, None) => write!(f, "unknown error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope() {
        let request = JsonRpcRequest::new(7, "eth_supportedEntryPoints", Vec::<()>::new());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_supportedEntryPoints", "params": []})
        );
    }

    #[test]
    fn error_as_string_and_object() {
        let from_string: JsonRpcResponse<String> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": "AA21 didn't pay prefund"
        }))
        .unwrap();
        let from_object: JsonRpcResponse<String> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32500, "message": "AA21 didn't pay prefund"}
        }))
        .unwrap();

        let from_string = from_string.error.unwrap();
        let from_object = from_object.error.unwrap();
        assert_eq!(from_string.message, from_object.message);
        assert_eq!(from_string.code, None);
        assert_eq!(from_object.code, Some(-32500));
        assert_eq!(from_string.to_string(), "message: AA21 didn't pay prefund");
        assert_eq!(from_object.to_string(), "code: -32500, message: AA21 didn't pay prefund");
    }

    #[test]
    fn null_result() {
        let response: JsonRpcResponse<String> =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 3, "result": null})).unwrap();
        assert_eq!(response.id, Some(3));
        assert!(response.result.is_none());
        assert!(response.error.is_none());
    }
}
