//! The stdio transport: one implicit session per process, newline-delimited
//! JSON-RPC frames on stdin, responses on stdout. No resumability — a
//! dropped stdio pipe just ends the process.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::protocol::{self, JsonRpcRequest};
use crate::state::AppState;

/// Runs until stdin closes. The session is created lazily on the first
/// frame so a client that never calls `initialize` never sees one.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    let session = state.sessions.create();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "malformed JSON-RPC frame on stdin");
                let body = protocol::JsonRpcResponse::error(
                    None,
                    protocol::JsonRpcErrorObject {
                        code: crate::error::PARSE_ERROR,
                        message: format!("malformed JSON-RPC frame: {err}"),
                        data: None,
                    },
                );
                write_response(&mut stdout, &body).await?;
                continue;
            }
        };

        if let Some(response) = protocol::handle_frame(&state, &session, frame).await {
            write_response(&mut stdout, &response).await?;
        }
    }

    Ok(())
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &protocol::JsonRpcResponse,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
