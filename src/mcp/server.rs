//! MCP server over newline-delimited JSON-RPC.
//!
//! The read loop parses each line and spawns one task per request. Responses
//! funnel through a channel into a single writer task, so concurrent calls
//! never interleave their output.

use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::codec;
use super::dispatch::Dispatcher;
use super::protocol::{
    JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolCallResult, ToolDefinition,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};
use crate::types::{Error, Result};

const RESPONSE_BUFFER: usize = 64;

const LIST_FUNCTIONS_DESCRIPTION: &str = "Lists all available Braze API write functions \
with their descriptions and parameters.";

const CALL_FUNCTION_DESCRIPTION: &str = "Call a specific Braze API write function with the \
provided parameters. Use list_functions to see available options. Parameters may be an object \
or a JSON string that parses to an object.";

/// The two tools advertised over `tools/list`.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_functions",
            description: LIST_FUNCTIONS_DESCRIPTION,
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "call_function",
            description: CALL_FUNCTION_DESCRIPTION,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "function_name": {
                        "type": "string",
                        "description": "Name of the function to call",
                    },
                    "parameters": {
                        "type": ["object", "string", "null"],
                        "description": "Parameters for the function, as an object or JSON string",
                    },
                },
                "required": ["function_name"],
            }),
        },
    ]
}

/// Stdio MCP server.
#[derive(Debug)]
pub struct McpServer {
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the read loop when cancelled.
    ///
    /// Cancelling drops any read still waiting on the input stream, so the
    /// loop exits without waiting for another line to arrive.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Serve until EOF or cancellation. In-flight requests finish and their
    /// responses are written before this returns.
    ///
    /// A line longer than [`codec::MAX_LINE_BYTES`] is answered with a parse
    /// error and skipped without buffering the rest of it.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_BUFFER);
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut in_flight = JoinSet::new();
        tracing::info!(tools = self.dispatcher.registry().len(), "MCP server ready");

        loop {
            let line = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("MCP server shutting down");
                    break;
                }
                line = codec::read_line(&mut reader) => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("stdin closed");
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    tracing::warn!("Unreadable input line: {}", e);
                    if codec::is_line_too_large(&e) {
                        tokio::select! {
                            _ = self.cancel.cancelled() => break,
                            skipped = codec::skip_line(&mut reader) => { skipped?; }
                        }
                    }
                    let resp = JsonRpcResponse::failure(Value::Null, PARSE_ERROR, "parse error");
                    if tx.send(resp).await.is_err() {
                        break;
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match parse_request(&line) {
                Ok(request) => {
                    let dispatcher = self.dispatcher.clone();
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        if let Some(resp) = handle_request(&dispatcher, request).await {
                            // Receiver only closes when the writer failed.
                            let _ = tx.send(resp).await;
                        }
                    });
                }
                Err(resp) => {
                    if tx.send(resp).await.is_err() {
                        break;
                    }
                }
            }

            // Reap finished tasks so the set does not grow unbounded.
            while in_flight.try_join_next().is_some() {}
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Request task failed: {}", e);
            }
        }
        drop(tx);

        writer_task
            .await
            .map_err(|e| Error::internal(format!("writer task failed: {}", e)))?
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(resp) = rx.recv().await {
        let line = serde_json::to_string(&resp)?;
        codec::write_line(&mut writer, &line).await?;
    }
    Ok(())
}

/// Decode one line, or produce the error response for it.
fn parse_request(line: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line)
        .map_err(|_| JsonRpcResponse::failure(Value::Null, PARSE_ERROR, "parse error"))?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|_| JsonRpcResponse::failure(id.clone(), INVALID_REQUEST, "invalid request"))?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::failure(
            id,
            INVALID_REQUEST,
            "invalid json-rpc version",
        ));
    }
    Ok(request)
}

/// Handle one request. Notifications get no response.
pub async fn handle_request(
    dispatcher: &Dispatcher,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let Some(id) = request.id else {
        match request.method.as_str() {
            "notifications/initialized" => tracing::info!("Client initialized"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
        return None;
    };
    tracing::debug!(method = %request.method, %id, "request");

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({"tools": tool_definitions()})),
        "tools/call" => call_tool(dispatcher, id, request.params).await,
        _ => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "method not found"),
    };
    Some(response)
}

async fn call_tool(dispatcher: &Dispatcher, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let call: ToolCallParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
        Ok(call) => call,
        Err(_) => return JsonRpcResponse::failure(id, INVALID_PARAMS, "invalid tool params"),
    };

    let payload = match call.name.as_str() {
        "list_functions" => dispatcher.list_functions(),
        "call_function" => {
            let mut arguments = match call.arguments {
                Some(Value::Object(map)) => map,
                None | Some(Value::Null) => Default::default(),
                Some(_) => {
                    return JsonRpcResponse::failure(id, INVALID_PARAMS, "arguments must be an object")
                }
            };
            let Some(Value::String(function_name)) = arguments.remove("function_name") else {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, "function_name is required");
            };
            dispatcher
                .call_function(&function_name, arguments.remove("parameters"))
                .await
        }
        other => {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("unknown tool: {}", other))
        }
    };

    match serde_json::to_value(ToolCallResult::from_payload(&payload)) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => {
            tracing::error!("Failed to encode tool result: {}", e);
            JsonRpcResponse::failure(id, INTERNAL_ERROR, "failed to encode tool result")
        }
    }
}
