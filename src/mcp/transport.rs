//! Message framing over a byte stream.
//!
//! MCP stdio framing: each message is one UTF-8 JSON document terminated by
//! a newline, with no embedded newlines (JSON string escaping guarantees
//! this for arbitrary payload content, so frames of any size survive the
//! round trip). The framer knows nothing about message semantics.
//!
//! [`Transport`] is generic over the reader and writer so the same server
//! core runs over stdin/stdout in production and over in-memory pipes in
//! tests; [`StdioTransport`] is the production instantiation.
//!
//! I/O faults here are fatal to the message loop: a broken stream cannot be
//! retried at this layer.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse};

/// A newline-framed JSON transport over an async byte stream.
pub struct Transport<R, W> {
    reader: BufReader<R>,
    writer: W,
}

/// The stdio instantiation used by the binary.
pub type StdioTransport = Transport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over this process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Transport::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> Transport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over an arbitrary reader/writer pair.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `None` on clean end of stream. Trailing `\n` (and `\r\n`)
    /// terminators are stripped.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the caller must treat it as fatal.
    pub async fn read_frame(&mut self) -> io::Result<Option<String>> {
        let mut frame = String::new();
        if self.reader.read_line(&mut frame).await? == 0 {
            return Ok(None);
        }

        if frame.ends_with('\n') {
            frame.pop();
            if frame.ends_with('\r') {
                frame.pop();
            }
        }

        Ok(Some(frame))
    }

    /// Writes a success reply as one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.write_frame(&json).await
    }

    /// Writes an error reply as one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_error(&mut self, error: &JsonRpcError) -> io::Result<()> {
        let json = serde_json::to_string(error)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.write_frame(&json).await
    }

    /// Writes one already-serialised frame, newline-terminated and flushed.
    async fn write_frame(&mut self, json: &str) -> io::Result<()> {
        // Frame boundary invariant: serialised JSON never contains a raw newline.
        debug_assert!(
            !json.contains('\n'),
            "frame must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
