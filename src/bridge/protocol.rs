//! Gateway wire protocol.
//!
//! Every frame is one JSON object on its own line, tagged by `"type"`.
//! Registration frames travel on the gateway connection opened by the
//! worker; call frames travel on connections the host opens against the
//! worker's callback listener.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::error::{BridgeError, BridgeResult};

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Worker → host: announce the callback object
    Register {
        interface: String,
        methods: Vec<String>,
        callback: String,
    },
    /// Host → worker: registration accepted
    Registered,
    /// Host → worker: registration refused
    Rejected { reason: String },
    /// Host → worker: invoke a method
    Call {
        id: u64,
        method: String,
        #[serde(default)]
        args: Vec<JsonValue>,
    },
    /// Worker → host: method returned this JSON string
    Return { id: u64, value: String },
    /// Worker → host: method failed
    Error { id: u64, message: String },
}

/// Read the next frame, or `None` once the peer has closed the stream.
///
/// Blank lines are skipped.
pub async fn read_frame<R>(reader: &mut R) -> BridgeResult<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let frame = serde_json::from_str(trimmed)
            .map_err(|e| BridgeError::Protocol(format!("malformed frame: {}", e)))?;
        return Ok(Some(frame));
    }
}

/// Write one frame followed by a newline and flush it.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> BridgeResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
