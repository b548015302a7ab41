pub mod session;

use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter},
    net::TcpStream,
};

use crate::context::ServerContext;
use crate::line::{LineRead, LineReader, Tokens};
use crate::store::MailItem;
use session::{Pop3Session, Reply};

const GREETING: &str = "+OK POP3 server ready\r\n";
const TERMINATOR: &[u8] = b".\r\n";

pub async fn handle_connection(stream: TcpStream, context: Arc<ServerContext>) -> anyhow::Result<()> {
    let addr = stream.peer_addr()?;
    tracing::info!("New POP3 connection from {}", addr);

    serve_session(stream, context).await?;

    tracing::info!("POP3 connection from {} closed", addr);
    Ok(())
}

/// Run the POP3 command loop until QUIT or until the peer goes away.
pub async fn serve_session<S>(stream: S, context: Arc<ServerContext>) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = LineReader::new(reader, context.max_line_length);
    let mut writer = BufWriter::new(writer);

    send(&mut writer, GREETING.as_bytes()).await?;

    let mut session = Pop3Session::new(context);
    let mut line = Vec::new();

    loop {
        match reader.read_line(&mut line).await? {
            LineRead::Eof => return Ok(()),
            LineRead::TooLong => {
                tracing::debug!("Discarding overlong command line");
                reader.skip_line().await?;
                send(&mut writer, session::line_too_long().as_bytes()).await?;
                continue;
            }
            LineRead::Complete => {}
        }

        let text = String::from_utf8_lossy(&line);
        let Some(tokens) = Tokens::parse(&text) else {
            continue;
        };

        match session.handle_command(&tokens).await {
            Reply::Text(response) => send(&mut writer, response.as_bytes()).await?,
            Reply::Message { status, item } => send_message(&mut writer, &status, &item).await?,
            Reply::Close(response) => {
                send(&mut writer, response.as_bytes()).await?;
                return Ok(());
            }
        }
    }
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> anyhow::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Stream a message as a multi-line response, doubling any leading dot.
async fn send_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: &str,
    item: &MailItem,
) -> anyhow::Result<()> {
    // Open before answering so a vanished message can still get an error line.
    let mut contents = match item.open().await {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!("Could not open message contents: {}", err);
            return send(writer, b"-ERR Item does not exist\r\n").await;
        }
    };

    writer.write_all(status.as_bytes()).await?;

    let mut line = Vec::new();
    loop {
        line.clear();
        if contents.read_until(b'\n', &mut line).await? == 0 {
            break;
        }

        if line.first() == TERMINATOR.first() {
            writer.write_all(&TERMINATOR[..1]).await?;
        }
        writer.write_all(&line).await?;
        if !line.ends_with(b"\n") {
            writer.write_all(b"\r\n").await?;
        }
    }

    send(writer, TERMINATOR).await
}
