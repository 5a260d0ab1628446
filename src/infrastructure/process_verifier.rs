use crate::domain::ports::Verifier;
use crate::domain::steps::{VerifierRequest, VerifierResponse};
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the verifier as a child process per exchange.
///
/// The request JSON is written to stdin, which is then closed; the verdict is
/// the whole of stdout. Stderr is diagnostic only and is forwarded line by
/// line to `tracing`. The child is killed if the exchange is dropped, which is
/// how the gateway's timeout terminates a verifier that never answers.
#[derive(Debug, Clone)]
pub struct ProcessVerifier {
    program: String,
    args: Vec<String>,
    max_output: u64,
}

/// Upper bound on a verdict read from stdout.
pub const DEFAULT_MAX_OUTPUT: u64 = 1024 * 1024;

impl ProcessVerifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    pub fn with_max_output(mut self, bytes: u64) -> Self {
        self.max_output = bytes;
        self
    }
}

#[async_trait]
impl Verifier for ProcessVerifier {
    async fn exchange(&self, request: &VerifierRequest) -> Result<VerifierResponse> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TransferError::GatewayError(format!("failed to start verifier `{}`: {e}", self.program))
            })?;

        let input = serde_json::to_vec(request)?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "verifier", "{line}");
                }
            })
        });

        // Stdin and stdout are driven together so neither pipe can fill up
        // while the other side waits.
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                // A verifier may exit without reading its input; that is
                // judged by its output, not by the write.
                if let Err(e) = stdin.write_all(&input).await {
                    debug!(error = %e, "verifier closed stdin early");
                }
            }
        };
        let stdout = child.stdout.take();
        let limit = self.max_output;
        let read = async move {
            let mut buf = Vec::new();
            if let Some(out) = stdout {
                out.take(limit + 1).read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };
        let ((), read) = tokio::join!(write, read);
        let stdout = read?;

        if stdout.len() as u64 > limit {
            // Dropping the child kills it.
            return Err(TransferError::GatewayError(format!(
                "verifier output exceeds {limit} bytes"
            )));
        }

        let status = child.wait().await?;
        if let Some(task) = stderr_task {
            let _ = task.await;
        }
        debug!(%status, bytes = stdout.len(), "verifier exited");

        let text = String::from_utf8_lossy(&stdout);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TransferError::GatewayError(format!(
                "verifier produced no output ({status})"
            )));
        }
        serde_json::from_str::<VerifierResponse>(trimmed).map_err(|e| {
            TransferError::GatewayError(format!("invalid verifier output ({status}): {e}"))
        })
    }
}
