use std::io::{self, Write};

use serde::Serialize;

#[derive(Serialize)]
struct JsonRpcResponse<'a> {
    jsonrpc: &'a str,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct JsonRpcNotification<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: serde_json::Value,
}

/// Writes one JSON-RPC message per line to a sink, stdout by default.
pub struct NdjsonTransport<W: Write = io::Stdout> {
    out: W,
}

impl Default for NdjsonTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NdjsonTransport {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> NdjsonTransport<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        });
    }

    pub fn write_error(
        &mut self,
        id: u64,
        code: i32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcErrorBody {
                code,
                message: message.into(),
                data,
            }),
        });
    }

    pub fn write_notification(&mut self, method: &str, params: serde_json::Value) {
        self.write_line(&JsonRpcNotification {
            jsonrpc: "2.0",
            method,
            params,
        });
    }

    fn write_line(&mut self, value: &impl Serialize) {
        let line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to serialize: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            tracing::error!("Failed to write message: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(transport: NdjsonTransport<Vec<u8>>) -> Vec<serde_json::Value> {
        let bytes = transport.into_inner();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn one_message_per_line() {
        let mut t = NdjsonTransport::with_writer(Vec::new());
        t.write_response(1, serde_json::json!({ "revision": 3 }));
        t.write_error(2, -32601, "Unknown method: nope", None);
        t.write_notification("preview/updated", serde_json::json!({ "revision": 3 }));

        let msgs = lines(t);
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0]["result"]["revision"], 3);
        assert!(msgs[0].get("error").is_none());
        assert_eq!(msgs[1]["error"]["code"], -32601);
        assert!(msgs[1]["error"].get("data").is_none());
        assert_eq!(msgs[2]["method"], "preview/updated");
        assert!(msgs[2].get("id").is_none());
    }
}
