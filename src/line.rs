use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Default cap on a single protocol line, CRLF included.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Outcome of one [`LineReader::read_line`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRead {
    /// The peer closed the connection before sending anything more.
    Eof,
    /// A whole line, or the unterminated tail before end of stream.
    Complete,
    /// The first `max_line_length` bytes of a longer line. The rest is still
    /// unread.
    TooLong,
}

/// Line-at-a-time reader over one side of a connection.
///
/// At most `max_line_length` bytes are buffered per call. Callers are told
/// when a line was cut short so the remainder is never mistaken for the
/// start of a new line.
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_line_length: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, max_line_length: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_line_length: max_line_length.max(1),
        }
    }

    /// Read the next line, or the next piece of an overlong one, into `buf`.
    /// The line ending is kept.
    pub async fn read_line(&mut self, buf: &mut Vec<u8>) -> std::io::Result<LineRead> {
        buf.clear();
        let limit = self.max_line_length as u64;
        let read = (&mut self.inner).take(limit).read_until(b'\n', buf).await?;

        Ok(if read == 0 {
            LineRead::Eof
        } else if !buf.ends_with(b"\n") && buf.len() >= self.max_line_length {
            LineRead::TooLong
        } else {
            LineRead::Complete
        })
    }

    /// Discard input up to and including the next line ending.
    pub async fn skip_line(&mut self) -> std::io::Result<()> {
        let mut buf = Vec::new();
        while self.read_line(&mut buf).await? == LineRead::TooLong {}
        Ok(())
    }
}

/// Strip a trailing CRLF (or a bare LF) from a received line.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// A command line split on single spaces.
///
/// Repeated or trailing spaces produce empty tokens rather than being
/// collapsed, so `"USER  bob"` has three tokens and fails an arity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens<'a> {
    parts: Vec<&'a str>,
}

impl<'a> Tokens<'a> {
    /// Returns `None` for blank lines, which callers skip without replying.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = strip_line_ending(line);
        if line.trim().is_empty() {
            return None;
        }

        Some(Self {
            parts: line.split(' ').collect(),
        })
    }

    pub fn verb(&self) -> &'a str {
        self.parts.first().copied().unwrap_or_default()
    }

    /// Number of tokens after the verb.
    pub fn argument_count(&self) -> usize {
        self.parts.len().saturating_sub(1)
    }

    /// The argument of a command that takes exactly one.
    pub fn single_argument(&self) -> Option<&'a str> {
        match self.parts.as_slice() {
            [_, arg] if !arg.is_empty() => Some(*arg),
            _ => None,
        }
    }
}
