//! Newline-delimited framing for the stdio transport.
//!
//! Each message is one line of UTF-8 JSON terminated by `\n`. Blank lines are
//! skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single inbound line.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Raised when a line grows past the configured limit.
///
/// Reading stops at the limit, so the rest of the offending line is still
/// unread; call [`skip_line`] to resynchronise.
#[derive(Debug, thiserror::Error)]
#[error("Line too large: exceeds {limit} bytes")]
pub struct LineTooLarge {
    pub limit: usize,
}

/// Whether an I/O error from [`read_line`] came from the line limit.
pub fn is_line_too_large(err: &std::io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<LineTooLarge>())
}

/// Read the next non-blank line, without its terminator.
///
/// Returns `None` on clean EOF.
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<Option<String>> {
    read_line_with_limit(reader, MAX_LINE_BYTES).await
}

/// [`read_line`] with an explicit byte limit.
///
/// Input is pulled one buffered chunk at a time, so at most `max_bytes` plus
/// one reader chunk is consumed before an oversized line is rejected.
pub async fn read_line_with_limit<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Option<String>> {
    loop {
        let Some(buf) = read_bounded(reader, max_bytes).await? else {
            return Ok(None);
        };
        let line = String::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
    }
}

async fn read_bounded<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let mut seen = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(seen.then_some(buf));
        }
        seen = true;

        let (content, used, done) = match available.iter().position(|b| *b == b'\n') {
            Some(i) => (&available[..i], i + 1, true),
            None => (available, available.len(), false),
        };
        if buf.len() + content.len() > max_bytes {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                LineTooLarge { limit: max_bytes },
            ));
        }
        buf.extend_from_slice(content);
        reader.consume(used);
        if done {
            return Ok(Some(buf));
        }
    }
}

/// Discard input up to and including the next `\n`.
///
/// Returns `false` if EOF came first. Nothing is buffered beyond the reader's
/// own chunk.
pub async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<bool> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(false);
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(true);
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Write one message followed by `\n` and flush.
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
