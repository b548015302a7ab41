use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::line::{LineRead, LineReader};

const TERMINATOR: &[u8] = b".\r\n";

/// How a DATA transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// The client sent the lone `.` line.
    Complete,
    /// The connection failed or closed before the terminator.
    Interrupted,
}

/// Copy message lines from the client into `sink` until the terminator.
///
/// The terminator itself is not written. Any other line starting with `.`
/// loses that first character. Both rules only look at the start of a line:
/// the later pieces of a line longer than the reader's limit are copied as
/// they are. The sink is flushed on both outcomes; only sink write failures
/// are returned as errors.
pub async fn capture<R, W>(reader: &mut LineReader<R>, sink: &mut W) -> std::io::Result<Capture>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    let mut at_line_start = true;

    loop {
        let read = match reader.read_line(&mut line).await {
            Ok(LineRead::Eof) => {
                tracing::debug!("Connection closed during DATA");
                sink.flush().await?;
                return Ok(Capture::Interrupted);
            }
            Err(err) => {
                tracing::debug!("Read failed during DATA: {}", err);
                sink.flush().await?;
                return Ok(Capture::Interrupted);
            }
            Ok(read) => read,
        };

        if at_line_start && line == TERMINATOR {
            sink.flush().await?;
            return Ok(Capture::Complete);
        }

        let body = match line.first() {
            Some(&lead) if at_line_start && lead == TERMINATOR[0] => &line[1..],
            _ => &line[..],
        };
        sink.write_all(body).await?;
        at_line_start = read == LineRead::Complete;
    }
}
