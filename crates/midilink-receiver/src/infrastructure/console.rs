//! Line-based operator console.
//!
//! Reads commands from any `AsyncBufRead` (stdin in the binary), runs each one
//! under the receiver state lock and writes the result to any `AsyncWrite`.
//! Sessions closed by a command are told to shut down.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::network::ReceiverNode;
use crate::application::operator::OperatorCommand;

/// Runs the console until `input` reaches end of file.
///
/// # Errors
///
/// Propagates I/O errors from reading `input` or writing `output`.
pub async fn run_console<R, W>(
    input: R,
    mut output: W,
    node: Arc<ReceiverNode>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let text = match line.parse::<OperatorCommand>() {
            Ok(command) => {
                debug!("console: {command:?}");
                let result = node.state().lock().await.execute(command);
                for remote in result.closed {
                    node.send_shutdown(remote);
                }
                result.text
            }
            Err(e) => e.to_string(),
        };
        output.write_all(text.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::state::ReceiverState;
    use crate::infrastructure::device::RecordingSink;
    use midilink_core::substrate::memory::MemoryHub;
    use midilink_core::{NameScheme, RemoteId};
    use std::time::Duration;

    fn node() -> Arc<ReceiverNode> {
        let hub = MemoryHub::new();
        ReceiverNode::new(
            Arc::new(hub.face()),
            NameScheme::default(),
            RemoteId::from("studio"),
            ReceiverState::default(),
            Arc::new(RecordingSink::new()),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_console_runs_commands_and_reports_errors() {
        // Arrange
        let node = node();
        let input: &[u8] = b"prohibit mallory\n\nbogus\nlists\n";
        let mut output = Vec::new();

        // Act
        run_console(input, &mut output, Arc::clone(&node)).await.unwrap();

        // Assert
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "mallory prohibited");
        assert!(lines[1].starts_with("unknown command"));
        assert!(text.contains("prohibited: mallory"));
        assert!(node
            .state()
            .lock()
            .await
            .access()
            .prohibited
            .contains(&RemoteId::from("mallory")));
    }
}
