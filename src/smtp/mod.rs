pub mod codes;
pub mod data;
pub mod session;

use std::sync::Arc;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter},
    net::TcpStream,
};

use crate::context::ServerContext;
use crate::line::{LineRead, LineReader, Tokens};
use data::Capture;
use session::{Reply, SmtpSession};

pub async fn handle_connection(stream: TcpStream, context: Arc<ServerContext>) -> anyhow::Result<()> {
    let addr = stream.peer_addr()?;
    tracing::info!("New SMTP connection from {}", addr);

    serve_session(stream, context).await?;

    tracing::info!("SMTP connection from {} closed", addr);
    Ok(())
}

/// Run the SMTP command loop until QUIT, until the peer goes away, or until
/// a message transfer is cut off.
pub async fn serve_session<S>(stream: S, context: Arc<ServerContext>) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = LineReader::new(reader, context.max_line_length);
    let mut writer = BufWriter::new(writer);

    let mut session = SmtpSession::new(Arc::clone(&context));
    send(&mut writer, &session.greeting()).await?;

    let mut line = Vec::new();

    loop {
        match reader.read_line(&mut line).await? {
            LineRead::Eof => return Ok(()),
            LineRead::TooLong => {
                tracing::debug!("Discarding overlong command line");
                reader.skip_line().await?;
                send(&mut writer, &session::reply(codes::COMMAND_SYNTAX_ERROR, "Line too long")).await?;
                continue;
            }
            LineRead::Complete => {}
        }

        let text = String::from_utf8_lossy(&line);
        let Some(tokens) = Tokens::parse(&text) else {
            continue;
        };
        tracing::debug!("Received: {}", text.trim_end());

        match session.handle_command(&tokens) {
            Reply::Text(response) => send(&mut writer, &response).await?,
            Reply::Close(response) => {
                send(&mut writer, &response).await?;
                return Ok(());
            }
            Reply::StartData(response) => {
                send(&mut writer, &response).await?;
                match receive_message(&mut reader, &mut session, &context).await? {
                    Some(response) => send(&mut writer, &response).await?,
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Spool the message body to a scratch file and deliver it.
///
/// Returns `None` when the transfer was interrupted; the connection should
/// then be dropped without a reply. The scratch file is removed either way.
async fn receive_message<R>(
    reader: &mut LineReader<R>,
    session: &mut SmtpSession,
    context: &ServerContext,
) -> anyhow::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let scratch = tempfile::Builder::new()
        .prefix("mail.")
        .suffix(".tmp")
        .tempfile_in(&context.scratch_dir)?;

    let outcome = {
        let file = tokio::fs::File::from_std(scratch.reopen()?);
        let mut sink = BufWriter::new(file);
        data::capture(reader, &mut sink).await?
    };

    let response = match outcome {
        Capture::Complete => Some(session.deliver(scratch.path()).await),
        Capture::Interrupted => {
            session.abort_data();
            None
        }
    };

    if let Err(err) = scratch.close() {
        tracing::warn!("Failed to remove scratch file: {}", err);
    }
    Ok(response)
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, response: &str) -> anyhow::Result<()> {
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
