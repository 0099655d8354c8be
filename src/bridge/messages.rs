// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/bridge/messages.rs
// Version: 1.0.0
//
// This file defines the JSON envelope exchanged with WebSocket clients.
// Pool payloads travel inside it untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames a client may send to the bridge
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open the session's pool connection, e.g. `stratum+tcp://host:port`
    Connect { pool: String },
    /// Opaque pool payload to forward
    MiningSubmit { data: Value },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> String {
        // Plain strings and JSON values, serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Frames the bridge sends to a client
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The pool connection is open
    Connected { session: String },
    /// One line received from the pool
    PoolData { data: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }

    pub fn to_json(&self) -> String {
        // Only string fields, serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Render a submit payload as the single line written to the pool.
///
/// Strings are sent as-is; any other JSON value is serialized compactly.
pub fn submit_payload_line(data: &Value) -> String {
    match data {
        Value::String(raw) => raw.trim_end_matches(['\r', '\n']).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_frames() {
        let connect = ClientMessage::parse(r#"{"type":"connect","pool":"stratum+tcp://127.0.0.1:9999"}"#).unwrap();
        assert_eq!(
            connect,
            ClientMessage::Connect {
                pool: "stratum+tcp://127.0.0.1:9999".to_string()
            }
        );

        let submit = ClientMessage::parse(r#"{"type":"mining_submit","data":{"id":100,"method":"submit"}}"#).unwrap();
        assert_eq!(
            submit,
            ClientMessage::MiningSubmit {
                data: json!({"id": 100, "method": "submit"})
            }
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_frames() {
        assert!(ClientMessage::parse(r#"{"type":"subscribe"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"connect"}"#).is_err());
        assert!(ClientMessage::parse("garbage").is_err());
    }

    #[test]
    fn server_frames_use_type_tag() {
        let frame = ServerMessage::PoolData { data: "{\"id\":1}".to_string() }.to_json();
        assert_eq!(frame, r#"{"type":"pool_data","data":"{\"id\":1}"}"#);
        let frame = ServerMessage::error("Invalid pool URL").to_json();
        assert_eq!(frame, r#"{"type":"error","message":"Invalid pool URL"}"#);
    }

    #[test]
    fn submit_payload_rendering() {
        assert_eq!(submit_payload_line(&json!("{\"id\":5}\n")), "{\"id\":5}");
        assert_eq!(submit_payload_line(&json!({"id": 5})), "{\"id\":5}");
    }
}
