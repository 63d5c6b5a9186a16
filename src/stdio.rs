//! Newline-delimited JSON tool dispatch over stdin/stdout, for agent
//! harnesses that pipe this process as a subprocess. One `ToolRequest` per
//! line in, one `{result}`/`{error_code, message}` line out.

use std::sync::Arc;

use session_runtime::SessionManager;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::tools::{self, ToolRequest};

pub async fn run(manager: Arc<SessionManager>) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => tools::dispatch(&manager, request).await,
            Err(err) => {
                warn!(%err, "malformed tool request line");
                tools::ToolResponse::Err {
                    error_code: "VALIDATION_ERROR".to_string(),
                    message: format!("malformed request: {err}"),
                }
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    Ok(())
}
