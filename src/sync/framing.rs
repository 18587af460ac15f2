//! Line-delimited framing over a full-duplex byte stream

use crate::sync::error::{SyncError, SyncResult};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};

/// Reads and writes newline-terminated frames on one peer stream.
///
/// The reader refuses lines longer than `max_frame_bytes`; an overlong
/// line means a corrupt or hostile peer and aborts the session.
pub struct FrameStream<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    max_frame_bytes: usize,
}

impl<S: AsyncRead + AsyncWrite + Unpin> FrameStream<S> {
    pub fn new(stream: S, max_frame_bytes: usize) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read),
            writer: write,
            max_frame_bytes,
        }
    }

    /// Write one frame and flush it to the peer.
    pub async fn write_frame(&mut self, frame: &str) -> SyncResult<()> {
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read exactly one frame, without its newline terminator.
    pub async fn read_frame(&mut self) -> SyncResult<String> {
        let mut buf = Vec::new();
        let mut limited = (&mut self.reader).take(self.max_frame_bytes as u64 + 1);
        let n = limited.read_until(b'\n', &mut buf).await?;

        if n == 0 {
            return Err(SyncError::ConnectionClosed);
        }
        if buf.last() != Some(&b'\n') {
            if buf.len() > self.max_frame_bytes {
                return Err(SyncError::FrameTooLarge(self.max_frame_bytes));
            }
            // stream ended mid-line
            return Err(SyncError::ConnectionClosed);
        }
        buf.pop();

        String::from_utf8(buf).map_err(|e| SyncError::MalformedFrame(e.to_string()))
    }

    /// Signal end-of-stream to the peer.
    pub async fn shutdown(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}
