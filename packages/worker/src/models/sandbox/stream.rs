//! Bounded capture of child process output.
//!
//! A pipe is read to the end no matter how much the child writes, so the child
//! can never block on a full pipe. Only the first `limit` bytes are kept; when
//! the stream offered more, [`TRUNCATED_SUFFIX`] is appended to the decoded text.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

pub const TRUNCATED_SUFFIX: &str = "\n[output truncated]";

const CHUNK_SIZE: usize = 8 * 1024;

/// Decoded text of a captured stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Lossily decoded UTF-8, with the truncation suffix if applicable.
    pub text: String,
    /// The stream offered more than the limit.
    pub truncated: bool,
}

/// Byte buffer that silently discards everything past its limit.
#[derive(Debug)]
pub struct BoundedBuffer {
    data: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl BoundedBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(limit.min(CHUNK_SIZE)),
            limit,
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let remaining = self.limit.saturating_sub(self.data.len());
        if chunk.len() > remaining {
            self.truncated = true;
        }
        let keep = chunk.len().min(remaining);
        self.data.extend_from_slice(&chunk[..keep]);
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Decode the kept bytes. A character cut in half by the limit is dropped,
    /// so the decoded content never exceeds the limit.
    pub fn to_output(&self) -> CapturedOutput {
        let kept = if self.truncated {
            &self.data[..complete_prefix_len(&self.data)]
        } else {
            &self.data[..]
        };
        let mut text = String::from_utf8_lossy(kept).into_owned();
        if self.truncated {
            text.push_str(TRUNCATED_SUFFIX);
        }
        CapturedOutput {
            text,
            truncated: self.truncated,
        }
    }
}

/// Length of `data` without a trailing, incomplete UTF-8 sequence.
fn complete_prefix_len(data: &[u8]) -> usize {
    let tail_start = data.len().saturating_sub(3);
    for i in (tail_start..data.len()).rev() {
        let byte = data[i];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if data.len() - i < width { i } else { data.len() };
    }
    data.len()
}

async fn drain_into<R>(mut reader: R, buffer: Arc<Mutex<BoundedBuffer>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.lock().await.push(&chunk[..n]);
    }
}

/// Read `reader` to the end, keeping at most `limit` bytes.
pub async fn read_bounded<R>(reader: R, limit: usize) -> io::Result<CapturedOutput>
where
    R: AsyncRead + Unpin,
{
    let buffer = Arc::new(Mutex::new(BoundedBuffer::new(limit)));
    drain_into(reader, Arc::clone(&buffer)).await?;
    let output = buffer.lock().await.to_output();
    Ok(output)
}

/// A pipe being drained by a background task.
///
/// Whatever was captured stays available even if the task has to be abandoned.
pub struct StreamDrain {
    buffer: Arc<Mutex<BoundedBuffer>>,
    handle: JoinHandle<io::Result<()>>,
}

impl StreamDrain {
    pub fn spawn<R>(reader: R, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(BoundedBuffer::new(limit)));
        let handle = tokio::spawn(drain_into(reader, Arc::clone(&buffer)));
        Self { buffer, handle }
    }

    /// Wait up to `grace` for the stream to close, then return what was captured.
    pub async fn finish(mut self, grace: Duration) -> CapturedOutput {
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "Output stream read failed, keeping partial output"),
            Ok(Err(e)) => warn!(error = %e, "Output drain task failed"),
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Output stream still open after grace period, abandoning drain"
                );
                self.handle.abort();
            }
        }
        self.buffer.lock().await.to_output()
    }
}
