//! Worker message protocol
//!
//! Requests and responses exchanged with the isolated verification worker.
//! Inside the process they travel as typed enums; at the boundary they are
//! JSON objects tagged by `type`:
//!
//! - `{"type":"VERIFY","payload":{"command":..,"vfsSnapshot":{..},"sessionId":..}}`
//! - `{"type":"PING"}`
//! - `{"type":"READY"}`, `{"type":"PONG"}`
//! - `{"type":"LOG","level":..,"message":..}`
//! - `{"type":"VERIFY_COMPLETE","sessionId":..,"success":..,"output"|"error":..}`
//! - `{"type":"ERROR","error":..}`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Path → content map handed to the worker instead of the live store
pub type VfsSnapshot = BTreeMap<String, String>;

/// Payload of a verification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayload {
    /// Command string, e.g. `lint:src/ui/panel.js`
    pub command: String,
    /// Files visible to the worker
    pub vfs_snapshot: VfsSnapshot,
    /// Correlation id echoed back in `VERIFY_COMPLETE`
    pub session_id: String,
}

/// Messages sent to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    /// Run one verification command
    Verify(VerifyPayload),
    /// Liveness probe
    Ping,
}

/// Severity of a worker log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Messages emitted by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerResponse {
    /// Worker finished booting
    Ready,
    /// Reply to `Ping`
    Pong,
    /// Diagnostic output
    Log { level: LogLevel, message: String },
    /// A verification finished
    #[serde(rename_all = "camelCase")]
    VerifyComplete {
        session_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Worker-level failure not tied to one request
    Error { error: String },
}

impl WorkerRequest {
    /// Encode for the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the wire
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl WorkerResponse {
    /// Encode for the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the wire
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Parsed `verb:argument` verification command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyCommand {
    /// `test:<path>`
    Test(String),
    /// `lint:<path>`
    Lint(String),
    /// `type-check:<path>`
    TypeCheck(String),
    /// `eval:<code>`
    Eval(String),
}

/// Command string with an unknown verb or no colon
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised verification command: {0}")]
pub struct UnknownCommand(pub String);

impl VerifyCommand {
    /// Verb prefix used on the wire
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Test(_) => "test",
            Self::Lint(_) => "lint",
            Self::TypeCheck(_) => "type-check",
            Self::Eval(_) => "eval",
        }
    }

    /// Argument after the colon
    #[must_use]
    pub fn argument(&self) -> &str {
        match self {
            Self::Test(a) | Self::Lint(a) | Self::TypeCheck(a) | Self::Eval(a) => a,
        }
    }
}

impl fmt::Display for VerifyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.verb(), self.argument())
    }
}

impl FromStr for VerifyCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, arg) = s
            .split_once(':')
            .ok_or_else(|| UnknownCommand(s.to_string()))?;
        let arg = arg.trim().to_string();
        match verb.trim() {
            "test" => Ok(Self::Test(arg)),
            "lint" => Ok(Self::Lint(arg)),
            "type-check" => Ok(Self::TypeCheck(arg)),
            "eval" => Ok(Self::Eval(arg)),
            _ => Err(UnknownCommand(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verify_request_wire_shape() {
        let req = WorkerRequest::Verify(VerifyPayload {
            command: "lint:a.js".into(),
            vfs_snapshot: BTreeMap::from([("a.js".to_string(), "x".to_string())]),
            session_id: "01H".into(),
        });
        let json: serde_json::Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "VERIFY",
                "payload": {
                    "command": "lint:a.js",
                    "vfsSnapshot": {"a.js": "x"},
                    "sessionId": "01H"
                }
            })
        );
    }

    #[test]
    fn ping_wire_shape() {
        assert_eq!(WorkerRequest::Ping.to_json().unwrap(), r#"{"type":"PING"}"#);
    }

    #[test]
    fn decodes_verify_complete_with_error() {
        let msg = WorkerResponse::from_json(
            r#"{"type":"VERIFY_COMPLETE","sessionId":"abc","success":false,"error":"boom"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            WorkerResponse::VerifyComplete {
                session_id: "abc".into(),
                success: false,
                output: None,
                error: Some("boom".into()),
            }
        );
    }

    #[test]
    fn decodes_log_and_error() {
        assert_eq!(
            WorkerResponse::from_json(r#"{"type":"LOG","level":"warn","message":"slow"}"#).unwrap(),
            WorkerResponse::Log {
                level: LogLevel::Warn,
                message: "slow".into()
            }
        );
        assert_eq!(
            WorkerResponse::from_json(r#"{"type":"ERROR","error":"oom"}"#).unwrap(),
            WorkerResponse::Error { error: "oom".into() }
        );
        assert_eq!(
            WorkerResponse::from_json(r#"{"type":"READY"}"#).unwrap(),
            WorkerResponse::Ready
        );
    }

    #[test]
    fn unknown_message_type_fails() {
        assert!(WorkerResponse::from_json(r#"{"type":"HELLO"}"#).is_err());
    }

    #[test]
    fn command_parsing() {
        assert_eq!(
            "type-check:src/a.ts".parse::<VerifyCommand>().unwrap(),
            VerifyCommand::TypeCheck("src/a.ts".into())
        );
        assert_eq!(
            "eval: 1 + 1".parse::<VerifyCommand>().unwrap(),
            VerifyCommand::Eval("1 + 1".into())
        );
        assert!("format:a.js".parse::<VerifyCommand>().is_err());
        assert!("lint".parse::<VerifyCommand>().is_err());
        assert_eq!(VerifyCommand::Lint("a.js".into()).to_string(), "lint:a.js");
    }
}
