use std::future::Future;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::context::ServerContext;

/// Accept connections forever, running `handler` on its own task for each one.
pub async fn serve<H, F>(
    listener: TcpListener,
    protocol: &'static str,
    context: Arc<ServerContext>,
    handler: H,
) -> anyhow::Result<()>
where
    H: Fn(TcpStream, Arc<ServerContext>) -> F,
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tracing::info!("{} server listening on {}", protocol, listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let connection = handler(stream, Arc::clone(&context));
                tokio::spawn(async move {
                    if let Err(err) = connection.await {
                        tracing::error!("Error handling {} connection: {:?}", protocol, err);
                    }
                });
            }
            Err(err) => {
                tracing::error!("Error accepting {} connection: {:?}", protocol, err);
            }
        }
    }
}
