use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Capability that turns a plaintext block payload into encrypted bytes.
///
/// Supplied by the caller of an acquisition; the pipeline only ever hands it
/// bytes and never a path.
#[async_trait]
pub trait EncryptionGateway: Send + Sync {
    async fn request_encryption(&self, plaintext: &str) -> Result<Vec<u8>>;
}

/// Encrypts by piping the plaintext through an external program.
///
/// The program receives the payload on stdin and must write the encrypted
/// bytes to stdout and exit with status 0.
pub struct CommandEncryption {
    program: String,
    args: Vec<String>,
}

impl CommandEncryption {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Build a gateway from a `[program, args...]` list. Returns None when empty.
pub fn create_gateway(command: &[String]) -> Option<Arc<dyn EncryptionGateway>> {
    let (program, args) = command.split_first()?;
    if program.is_empty() {
        return None;
    }
    Some(Arc::new(CommandEncryption::new(program.clone(), args.to_vec())))
}

#[async_trait]
impl EncryptionGateway for CommandEncryption {
    async fn request_encryption(&self, plaintext: &str) -> Result<Vec<u8>> {
        debug!(program = %self.program, bytes = plaintext.len(), "Running encryption command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn {}: {}", self.program, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to get stdin"))?;

        // stdout is drained while stdin is written; filters block once their output pipe fills.
        let feed = async move {
            let result = stdin.write_all(plaintext.as_bytes()).await;
            drop(stdin);
            result
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        fed.map_err(|e| anyhow!("Failed to write to {}: {}", self.program, e))?;

        Ok(output.stdout)
    }
}
