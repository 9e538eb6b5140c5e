//! JSON-RPC frame inspection
//!
//! The pipeline never rewrites payloads; it only peeks at each line to
//! maintain the request registry and emit traffic records. Malformed JSON
//! yields no peek and the line is forwarded untouched.

use serde_json::Value;

/// Which way a frame is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientToServer => "client→server",
            Self::ServerToClient => "server→client",
        }
    }
}

/// The observable shape of one JSON-RPC frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePeek {
    /// Request/response correlation id, absent for notifications.
    pub id: Option<Value>,
    pub method: Option<String>,
    pub has_params: bool,
    pub has_result: bool,
    pub has_error: bool,
}

impl FramePeek {
    /// Inspect one line. `None` when the line is not a JSON object.
    pub fn parse(line: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(line).ok()?;
        let object = value.as_object()?;
        Some(Self {
            id: object.get("id").filter(|id| !id.is_null()).cloned(),
            method: object
                .get("method")
                .and_then(Value::as_str)
                .map(str::to_string),
            has_params: object.contains_key("params"),
            has_result: object.contains_key("result"),
            has_error: object.contains_key("error"),
        })
    }

    /// A request carries a method and an id.
    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    /// A notification carries a method but no id.
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// A response carries a result or error for an id.
    pub fn is_response(&self) -> bool {
        self.method.is_none() && (self.has_result || self.has_error)
    }
}
